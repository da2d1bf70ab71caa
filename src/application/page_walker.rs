//! Paginated walk over the order inquiry list
//!
//! Pages are visited strictly one after another: fetch, extract the item
//! rows, look for the next-page affordance, follow it or stop.

use std::collections::HashSet;
use std::sync::Arc;

use scraper::Html;
use tracing::{debug, info, warn};
use url::Url;

use crate::application::error::SyncResult;
use crate::domain::order::ItemRecord;
use crate::domain::repositories::{FetchedPage, PageSource};
use crate::infrastructure::parsing::{
    ContextualParser, NextPage, OrderTableParser, PaginationParser, ParseContext, ParsingResult,
    StopReason,
};

/// Why the walk ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkStop {
    Pagination(StopReason),
    PageLimit,
    RepeatedUrl(Url),
}

#[derive(Debug, Clone)]
pub struct WalkOutcome {
    pub items: Vec<ItemRecord>,
    pub pages: u32,
    pub stop: WalkStop,
}

pub struct PageWalker {
    source: Arc<dyn PageSource>,
    table_parser: OrderTableParser,
    pagination: PaginationParser,
    max_pages: u32,
}

impl PageWalker {
    pub fn new(
        source: Arc<dyn PageSource>,
        table_parser: OrderTableParser,
        pagination: PaginationParser,
        max_pages: u32,
    ) -> Self {
        Self {
            source,
            table_parser,
            pagination,
            max_pages,
        }
    }

    /// Walk from `start` until pagination says stop. A page without the order
    /// table is fatal.
    pub async fn walk(&self, start: Url) -> SyncResult<WalkOutcome> {
        let mut visited = HashSet::new();
        let mut items = Vec::new();
        let mut pages = 0u32;
        let mut url = start;

        let stop = loop {
            if pages >= self.max_pages {
                warn!("🛑 Page limit of {} reached, stopping walk", self.max_pages);
                break WalkStop::PageLimit;
            }
            if !visited.insert(url.clone()) {
                warn!("🔁 {} was already visited, stopping walk", url);
                break WalkStop::RepeatedUrl(url);
            }
            let page_number = pages + 1;

            info!("📄 Page {}: {}", page_number, url);
            let page = self.source.fetch_page(&url).await?;
            if page.url != url && !visited.insert(page.url.clone()) {
                warn!("🔁 {} redirected to already visited {}, stopping walk", url, page.url);
                break WalkStop::RepeatedUrl(page.url);
            }
            pages = page_number;

            let (page_items, next) = self.parse_page(&page, pages)?;
            debug!("Page {} yielded {} items", pages, page_items.len());
            items.extend(page_items);

            match next {
                NextPage::Follow(next_url) => url = next_url,
                NextPage::Stop(reason) => {
                    debug!("Pagination ended on page {}: {:?}", pages, reason);
                    break WalkStop::Pagination(reason);
                }
            }
        };

        info!("✅ Walked {} pages, {} items", pages, items.len());
        Ok(WalkOutcome { items, pages, stop })
    }

    // Html is not Send, so parsing stays in a synchronous helper
    fn parse_page(
        &self,
        page: &FetchedPage,
        page_number: u32,
    ) -> ParsingResult<(Vec<ItemRecord>, NextPage)> {
        let html = Html::parse_document(&page.body);
        let context = ParseContext::new(page_number, page.url.clone());
        let items = self.table_parser.parse_with_context(&html, &context)?;
        let next = self.pagination.next_page(&html, &context);
        Ok((items, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::error::SyncError;
    use crate::application::test_support::StaticPageSource;
    use crate::infrastructure::parsing::order_table_parser::tests::{item_rows, list_page, order_row};
    use crate::infrastructure::parsing::ParsingError;

    const NEXT_TO_PAGE_2: &str =
        r#"<ul class="pagination"><li class="page-item"><a rel="next" href="/inquiry?page=2">›</a></li></ul>"#;

    fn walker(source: StaticPageSource, max_pages: u32) -> PageWalker {
        PageWalker::new(
            Arc::new(source),
            OrderTableParser::new().unwrap(),
            PaginationParser::new().unwrap(),
            max_pages,
        )
    }

    fn page(order_id: &str, pagination: &str) -> String {
        let rows = format!(
            "{}{}",
            order_row(order_id, "", "/inquiry/detail/1"),
            item_rows(&[("https://img.test/1.png", "Mug")])
        );
        list_page(&rows, pagination)
    }

    fn start() -> Url {
        Url::parse("https://portal.test/inquiry").unwrap()
    }

    #[tokio::test]
    async fn follows_next_link_until_it_is_a_placeholder() {
        let source = StaticPageSource::new()
            .with_page("https://portal.test/inquiry", page("A-1", NEXT_TO_PAGE_2))
            .with_page(
                "https://portal.test/inquiry?page=2",
                page(
                    "A-2",
                    r##"<ul class="pagination"><li class="page-item"><a rel="next" href="#">›</a></li></ul>"##,
                ),
            );

        let outcome = walker(source, 10).walk(start()).await.unwrap();

        assert_eq!(outcome.pages, 2);
        let ids: Vec<&str> = outcome.items.iter().map(ItemRecord::order_id).collect();
        assert_eq!(ids, vec!["A-1", "A-2"]);
        assert_eq!(
            outcome.stop,
            WalkStop::Pagination(StopReason::InvalidTarget("#".to_string()))
        );
    }

    #[tokio::test]
    async fn javascript_target_stops_even_when_not_disabled() {
        let source = StaticPageSource::new().with_page(
            "https://portal.test/inquiry",
            page(
                "A-1",
                r#"<ul class="pagination"><li class="page-item"><a rel="next" href="javascript:void(0)">›</a></li></ul>"#,
            ),
        );

        let outcome = walker(source, 10).walk(start()).await.unwrap();

        assert_eq!(outcome.pages, 1);
        assert!(matches!(outcome.stop, WalkStop::Pagination(StopReason::InvalidTarget(_))));
    }

    #[tokio::test]
    async fn self_link_is_not_followed_twice() {
        let source = StaticPageSource::new().with_page(
            "https://portal.test/inquiry",
            page(
                "A-1",
                r#"<ul class="pagination"><li class="page-item"><a rel="next" href="/inquiry">›</a></li></ul>"#,
            ),
        );

        let outcome = walker(source, 10).walk(start()).await.unwrap();

        assert_eq!(outcome.pages, 1);
        assert_eq!(outcome.stop, WalkStop::RepeatedUrl(start()));
    }

    #[tokio::test]
    async fn redirect_back_to_a_visited_page_stops_the_walk() {
        let source = StaticPageSource::new()
            .with_page("https://portal.test/inquiry", page("A-1", NEXT_TO_PAGE_2))
            .with_redirect("https://portal.test/inquiry?page=2", "https://portal.test/inquiry");

        let outcome = walker(source, 10).walk(start()).await.unwrap();

        assert_eq!(outcome.pages, 1);
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.stop, WalkStop::RepeatedUrl(start()));
    }

    #[tokio::test]
    async fn page_limit_bounds_the_walk() {
        let source = StaticPageSource::new()
            .with_page("https://portal.test/inquiry", page("A-1", NEXT_TO_PAGE_2))
            .with_page("https://portal.test/inquiry?page=2", page("A-2", NEXT_TO_PAGE_2));

        let outcome = walker(source, 1).walk(start()).await.unwrap();

        assert_eq!(outcome.pages, 1);
        assert_eq!(outcome.stop, WalkStop::PageLimit);
    }

    #[tokio::test]
    async fn missing_order_table_is_fatal() {
        let source = StaticPageSource::new()
            .with_page("https://portal.test/inquiry", "<html><body>maintenance</body></html>");

        let error = walker(source, 10).walk(start()).await.unwrap_err();

        assert!(matches!(
            error,
            SyncError::Parsing(ParsingError::MissingStructure { .. })
        ));
    }

    #[tokio::test]
    async fn fetch_failure_is_fatal() {
        let error = walker(StaticPageSource::new(), 10).walk(start()).await.unwrap_err();
        assert!(matches!(error, SyncError::Fetch(_)));
    }
}
