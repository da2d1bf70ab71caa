//! One end-to-end sync run
//!
//! walk → enrich → project → reconcile, strictly in sequence. Every run is
//! tagged with a `run_id` span so interleaved logs of scheduled runs stay
//! separable.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{Instrument, info, info_span};
use url::Url;
use uuid::Uuid;

use crate::application::error::SyncResult;
use crate::application::link_enricher::{EnrichmentStats, LinkEnricher};
use crate::application::page_walker::PageWalker;
use crate::application::reconciler::{Reconciler, SyncSummary};
use crate::domain::errors::FetchError;
use crate::domain::repositories::{Notifier, PageSource, RemoteTableStore};
use crate::domain::sheet_row::ReconciliationRow;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::parsing::{OrderDetailParser, OrderTableParser, PaginationParser};
use crate::infrastructure::retry_executor::{RetryExecutor, RetryPolicy};

/// What a finished run did
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Local>,
    pub duration: Duration,
    pub pages_walked: u32,
    pub items_scraped: usize,
    pub enrichment: EnrichmentStats,
    pub summary: SyncSummary,
}

pub struct SyncPipeline {
    start_url: Url,
    walker: PageWalker,
    enricher: LinkEnricher,
    reconciler: Reconciler,
    store: Arc<dyn RemoteTableStore>,
    notifier: Arc<dyn Notifier>,
}

impl SyncPipeline {
    pub const fn new(
        start_url: Url,
        walker: PageWalker,
        enricher: LinkEnricher,
        reconciler: Reconciler,
        store: Arc<dyn RemoteTableStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            start_url,
            walker,
            enricher,
            reconciler,
            store,
            notifier,
        }
    }

    /// Wire the stages from configuration around the given collaborators
    pub fn from_config(
        config: &AppConfig,
        source: Arc<dyn PageSource>,
        store: Arc<dyn RemoteTableStore>,
        notifier: Arc<dyn Notifier>,
    ) -> SyncResult<Self> {
        let start_url = config.portal.inquiry_url().map_err(|e| FetchError::InvalidUrl {
            url: config.portal.base_url.clone(),
            reason: e.to_string(),
        })?;

        let walker = PageWalker::new(
            Arc::clone(&source),
            OrderTableParser::with_config(&config.selectors)?,
            PaginationParser::with_config(&config.selectors)?,
            config.portal.max_pages,
        );
        let enricher = LinkEnricher::new(
            source,
            OrderDetailParser::with_config(&config.selectors)?,
            &config.enrichment,
        );
        let reconciler = Reconciler::from_config(
            RetryExecutor::new(RetryPolicy::from_config(&config.retry)),
            &config.sync,
        );

        Ok(Self::new(start_url, walker, enricher, reconciler, store, notifier))
    }

    pub async fn run(&self) -> SyncResult<SyncReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("sync_run", %run_id);
        self.run_stages(run_id).instrument(span).await
    }

    async fn run_stages(&self, run_id: Uuid) -> SyncResult<SyncReport> {
        let started_at = Local::now();
        let clock = std::time::Instant::now();
        info!("🚀 Sync started from {}", self.start_url);

        let walk = self.walker.walk(self.start_url.clone()).await?;
        let items_scraped = walk.items.len();

        let enriched = self.enricher.enrich(walk.items).await;
        let rows = ReconciliationRow::project_all(enriched.items, &Local::now());

        let summary = self
            .reconciler
            .reconcile(&rows, self.store.as_ref(), self.notifier.as_ref())
            .await?;

        let report = SyncReport {
            run_id,
            started_at,
            duration: clock.elapsed(),
            pages_walked: walk.pages,
            items_scraped,
            enrichment: enriched.stats,
            summary,
        };
        info!(
            "🎉 Sync finished in {:?}: {} pages, {} items, {} inserted, {} updated, {} skipped, {} notified",
            report.duration,
            report.pages_walked,
            report.items_scraped,
            report.summary.inserted,
            report.summary.updated,
            report.summary.skipped,
            report.summary.notifications.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::error::SyncError;
    use crate::application::test_support::{RecordingNotifier, StaticPageSource};
    use crate::infrastructure::memory_store::MemoryTableStore;
    use crate::infrastructure::parsing::order_detail_parser::tests::detail_page;
    use crate::infrastructure::parsing::order_table_parser::tests::{item_rows, list_page, order_row};

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.portal.base_url = "https://portal.test".to_string();
        config.enrichment.batch_pause_ms = 0;
        config.sync.dry_run = true;
        config
    }

    fn portal(arrived: &str) -> StaticPageSource {
        let rows = format!(
            "{}{}",
            order_row("ORDER123", arrived, "/inquiry/detail/1"),
            item_rows(&[("https://img.test/1.png", "Mug"), ("", "Cup")])
        );
        StaticPageSource::new()
            .with_page("https://portal.test/inquiry", list_page(&rows, ""))
            .with_page(
                "https://portal.test/inquiry/detail/1",
                detail_page(&[("https://shop.test/mug", "White")]),
            )
    }

    #[tokio::test]
    async fn run_inserts_then_notifies_on_arrival() {
        let store = Arc::new(MemoryTableStore::new());
        let notifier = Arc::new(RecordingNotifier::default());

        let first = SyncPipeline::from_config(&config(), Arc::new(portal("")), store.clone(), notifier.clone())
            .unwrap()
            .run()
            .await
            .unwrap();
        assert_eq!(first.items_scraped, 2);
        assert_eq!(first.summary.inserted, 2);
        assert_eq!(first.enrichment.succeeded, 1);

        let rows = store.rows().await;
        assert_eq!(rows[1][8], "https://shop.test/mug");
        assert_eq!(rows[1][11], "White");
        assert_eq!(rows[2][8], "");

        let second = SyncPipeline::from_config(
            &config(),
            Arc::new(portal("2024-05-01")),
            store.clone(),
            notifier.clone(),
        )
        .unwrap()
        .run()
        .await
        .unwrap();
        assert_eq!(second.summary.inserted, 0);
        assert_eq!(second.summary.updated, 1);
        assert_eq!(second.summary.skipped, 1);
        assert_eq!(notifier.sent(), vec![("ORDER123".to_string(), "2024-05-01".to_string())]);
    }

    #[tokio::test]
    async fn missing_list_page_aborts_before_store_is_touched() {
        let store = Arc::new(MemoryTableStore::new());
        let pipeline = SyncPipeline::from_config(
            &config(),
            Arc::new(StaticPageSource::new()),
            store.clone(),
            Arc::new(RecordingNotifier::default()),
        )
        .unwrap();

        let error = pipeline.run().await.unwrap_err();

        assert!(matches!(error, SyncError::Fetch(FetchError::HttpStatus { status: 404, .. })));
        assert!(store.calls().await.is_empty());
    }

    #[test]
    fn invalid_selector_is_reported_at_wiring() {
        let mut config = config();
        config.selectors.order_table = "table[".to_string();

        let result = SyncPipeline::from_config(
            &config,
            Arc::new(StaticPageSource::new()),
            Arc::new(MemoryTableStore::new()),
            Arc::new(RecordingNotifier::default()),
        );

        assert!(matches!(result, Err(SyncError::Parsing(_))));
    }
}
