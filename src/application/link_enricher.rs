//! Detail-page enrichment
//!
//! Fetches every distinct detail page once, in batches of bounded
//! concurrency, and hands each page's products out to the items sharing that
//! page by order of appearance.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use scraper::Html;
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::order::{EnrichedItem, ItemRecord, ProductLink};
use crate::domain::repositories::{FetchedPage, PageSource};
use crate::infrastructure::config::EnrichmentConfig;
use crate::infrastructure::parsing::{
    ContextualParser, OrderDetailParser, ParseContext, ParsingResult,
};

/// Result of loading one detail page after its retries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailOutcome {
    Success(Vec<ProductLink>),
    /// The page could not be loaded; its items keep empty product fields
    Degraded(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct EnrichmentStats {
    pub detail_pages: usize,
    pub succeeded: usize,
    pub degraded: usize,
}

#[derive(Debug, Clone)]
pub struct EnrichmentOutcome {
    pub items: Vec<EnrichedItem>,
    pub stats: EnrichmentStats,
}

pub struct LinkEnricher {
    source: Arc<dyn PageSource>,
    parser: OrderDetailParser,
    batch_size: usize,
    batch_pause: Duration,
    max_attempts: u32,
    retry_delay: Duration,
}

impl LinkEnricher {
    pub fn new(source: Arc<dyn PageSource>, parser: OrderDetailParser, config: &EnrichmentConfig) -> Self {
        Self {
            source,
            parser,
            batch_size: config.batch_size.max(1),
            batch_pause: config.batch_pause(),
            max_attempts: config.detail_max_attempts.max(1),
            retry_delay: config.detail_retry_delay(),
        }
    }

    pub async fn enrich(&self, items: Vec<ItemRecord>) -> EnrichmentOutcome {
        let links = distinct_links(&items);
        let batch_count = links.len().div_ceil(self.batch_size);
        info!(
            "🔗 Enriching {} items from {} detail pages in {} batches",
            items.len(),
            links.len(),
            batch_count
        );

        let mut stats = EnrichmentStats {
            detail_pages: links.len(),
            ..EnrichmentStats::default()
        };
        let mut products: HashMap<String, Vec<ProductLink>> = HashMap::new();

        for (batch_index, batch) in links.chunks(self.batch_size).enumerate() {
            debug!("Batch {}/{}: {} links", batch_index + 1, batch_count, batch.len());
            let outcomes = self.fetch_batch(batch).await;

            for (link, outcome) in batch.iter().zip(outcomes) {
                match outcome {
                    DetailOutcome::Success(found) => {
                        stats.succeeded += 1;
                        products.insert(link.clone(), found);
                    }
                    DetailOutcome::Degraded(reason) => {
                        stats.degraded += 1;
                        warn!("⚠️ Detail page degraded, items keep empty fields: {} ({})", link, reason);
                    }
                }
            }

            if batch_index + 1 < batch_count && !self.batch_pause.is_zero() {
                tokio::time::sleep(self.batch_pause).await;
            }
        }

        info!(
            "✅ Enrichment done: {} pages ok, {} degraded",
            stats.succeeded, stats.degraded
        );
        EnrichmentOutcome {
            items: correlate(items, &products),
            stats,
        }
    }

    /// Fetch one batch concurrently; outcomes come back in batch order
    async fn fetch_batch(&self, batch: &[String]) -> Vec<DetailOutcome> {
        let mut indexed: Vec<(usize, DetailOutcome)> = stream::iter(batch.iter().enumerate())
            .map(|(index, link)| async move { (index, self.fetch_detail(link).await) })
            .buffer_unordered(batch.len().max(1))
            .collect()
            .await;

        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, outcome)| outcome).collect()
    }

    async fn fetch_detail(&self, link: &str) -> DetailOutcome {
        let url = match Url::parse(link) {
            Ok(url) => url,
            Err(e) => return DetailOutcome::Degraded(format!("invalid detail link: {e}")),
        };

        let mut last_error = String::new();
        for attempt in 1..=self.max_attempts {
            match self.load_products(&url).await {
                Ok(found) => {
                    if attempt > 1 {
                        debug!("Fetched {} on attempt {}", url, attempt);
                    }
                    return DetailOutcome::Success(found);
                }
                Err(e) => {
                    last_error = e;
                    if attempt < self.max_attempts {
                        warn!(
                            "Failed to load {} (attempt {}/{}), retrying in {:?}: {}",
                            url, attempt, self.max_attempts, self.retry_delay, last_error
                        );
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }
        DetailOutcome::Degraded(last_error)
    }

    async fn load_products(&self, url: &Url) -> Result<Vec<ProductLink>, String> {
        let page = self.source.fetch_page(url).await.map_err(|e| e.to_string())?;
        self.parse_products(&page).map_err(|e| e.to_string())
    }

    fn parse_products(&self, page: &FetchedPage) -> ParsingResult<Vec<ProductLink>> {
        let html = Html::parse_document(&page.body);
        self.parser
            .parse_with_context(&html, &ParseContext::new(1, page.url.clone()))
    }
}

/// Non-empty detail links, first-seen order
fn distinct_links(items: &[ItemRecord]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .iter()
        .map(ItemRecord::detail_link)
        .filter(|link| !link.is_empty() && seen.insert(*link))
        .map(ToString::to_string)
        .collect()
}

/// The n-th item with a given link takes the n-th product of that page
fn correlate(items: Vec<ItemRecord>, products: &HashMap<String, Vec<ProductLink>>) -> Vec<EnrichedItem> {
    let mut occurrences: HashMap<&str, usize> = HashMap::new();

    items
        .into_iter()
        .map(|item| {
            let product = products
                .get_key_value(item.detail_link())
                .and_then(|(link, found)| {
                    let seen = occurrences.entry(link.as_str()).or_insert(0);
                    let product = found.get(*seen);
                    *seen += 1;
                    product
                });
            EnrichedItem::new(item, product)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::StaticPageSource;
    use crate::domain::order::OrderHeader;
    use crate::infrastructure::parsing::order_detail_parser::tests::detail_page;

    const LINK_A: &str = "https://portal.test/inquiry/detail/1";
    const LINK_B: &str = "https://portal.test/inquiry/detail/2";

    fn item(order_id: &str, link: &str, name: &str) -> ItemRecord {
        let order = OrderHeader {
            order_id: order_id.to_string(),
            detail_link: link.to_string(),
            ..OrderHeader::default()
        };
        ItemRecord::new(&order, String::new(), name.to_string())
    }

    fn config(batch_size: usize) -> EnrichmentConfig {
        EnrichmentConfig {
            batch_size,
            batch_pause_ms: 1000,
            detail_max_attempts: 3,
            detail_retry_delay_ms: 2000,
        }
    }

    fn enricher(source: StaticPageSource, batch_size: usize) -> LinkEnricher {
        LinkEnricher::new(Arc::new(source), OrderDetailParser::new().unwrap(), &config(batch_size))
    }

    #[tokio::test]
    async fn surplus_items_get_empty_fields() {
        let source = StaticPageSource::new().with_page(
            LINK_A,
            detail_page(&[("https://shop.test/p1", "Red"), ("https://shop.test/p2", "Blue")]),
        );
        let items = vec![item("A", LINK_A, "one"), item("A", LINK_A, "two"), item("A", LINK_A, "three")];

        let outcome = enricher(source, 10).enrich(items).await;

        let pairs: Vec<(&str, &str)> = outcome
            .items
            .iter()
            .map(|i| (i.order_link.as_str(), i.color_size.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![("https://shop.test/p1", "Red"), ("https://shop.test/p2", "Blue"), ("", "")]
        );
        assert_eq!(outcome.stats, EnrichmentStats { detail_pages: 1, succeeded: 1, degraded: 0 });
    }

    #[tokio::test]
    async fn each_link_is_fetched_once_and_empty_links_skipped() {
        let source = Arc::new(
            StaticPageSource::new()
                .with_page(LINK_A, detail_page(&[("a1", "x"), ("a2", "y")]))
                .with_page(LINK_B, detail_page(&[("b1", "z")])),
        );
        let enricher = LinkEnricher::new(source.clone(), OrderDetailParser::new().unwrap(), &config(10));
        let items = vec![
            item("A", LINK_A, "1"),
            item("B", LINK_B, "2"),
            item("C", "", "3"),
            item("A", LINK_A, "4"),
        ];

        let outcome = enricher.enrich(items).await;

        assert_eq!(source.fetch_count(LINK_A), 1);
        assert_eq!(source.fetch_count(LINK_B), 1);
        let links: Vec<&str> = outcome.items.iter().map(|i| i.order_link.as_str()).collect();
        assert_eq!(links, vec!["a1", "b1", "", "a2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_order_completion_keeps_correlation() {
        let source = StaticPageSource::new()
            .with_page(LINK_A, detail_page(&[("slow", "s")]))
            .with_page(LINK_B, detail_page(&[("fast", "f")]))
            .with_delay(LINK_A, Duration::from_millis(500));
        let items = vec![item("A", LINK_A, "1"), item("B", LINK_B, "2")];

        let outcome = enricher(source, 2).enrich(items).await;

        assert_eq!(outcome.items[0].order_link, "slow");
        assert_eq!(outcome.items[1].order_link, "fast");
    }

    #[tokio::test(start_paused = true)]
    async fn failing_page_degrades_after_three_attempts() {
        let source = Arc::new(
            StaticPageSource::new()
                .with_page(LINK_A, detail_page(&[("a1", "x")]))
                .failing(LINK_A, 10),
        );
        let enricher = LinkEnricher::new(source.clone(), OrderDetailParser::new().unwrap(), &config(10));
        let start = tokio::time::Instant::now();

        let outcome = enricher.enrich(vec![item("A", LINK_A, "1")]).await;

        assert_eq!(source.fetch_count(LINK_A), 3);
        assert_eq!(start.elapsed().as_secs(), 4);
        assert_eq!(outcome.items[0].order_link, "");
        assert_eq!(outcome.stats.degraded, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_recovers_within_attempts() {
        let source = StaticPageSource::new()
            .with_page(LINK_A, detail_page(&[("a1", "x")]))
            .failing(LINK_A, 2);

        let outcome = enricher(source, 10).enrich(vec![item("A", LINK_A, "1")]).await;

        assert_eq!(outcome.items[0].order_link, "a1");
        assert_eq!(outcome.stats.succeeded, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_separates_batches_but_not_after_last() {
        let source = StaticPageSource::new()
            .with_page(LINK_A, detail_page(&[("a1", "x")]))
            .with_page(LINK_B, detail_page(&[("b1", "y")]));
        let start = tokio::time::Instant::now();

        enricher(source, 1)
            .enrich(vec![item("A", LINK_A, "1"), item("B", LINK_B, "2")])
            .await;

        assert_eq!(start.elapsed().as_secs(), 1);
    }

    #[test]
    fn distinct_links_keep_first_seen_order() {
        let items = vec![item("1", LINK_B, ""), item("2", "", ""), item("3", LINK_A, ""), item("4", LINK_B, "")];
        assert_eq!(distinct_links(&items), vec![LINK_B.to_string(), LINK_A.to_string()]);
    }
}
