//! Order Sync - incremental order-portal scraping into a spreadsheet
//!
//! Walks the paginated order inquiry list of an import-agent portal, enriches
//! every item with its detail page's product link and variant, and reconciles
//! the result into a worksheet. An order whose arrival date appears for the
//! first time is announced through a webhook.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::application::{SyncError, SyncPipeline, SyncReport};
use crate::domain::repositories::RemoteTableStore;
use crate::infrastructure::{
    AppConfig, GoogleSheetsStore, HttpClient, HttpClientConfig, MemoryTableStore, SlackNotifier,
};

/// Log into the portal and run one sync against the configured sheet
pub async fn run(config: AppConfig) -> Result<SyncReport> {
    let http = HttpClient::with_config(HttpClientConfig::from_portal_config(&config.portal))?;

    if config.portal.username.is_empty() {
        warn!("No portal username configured, continuing without login");
    } else {
        http.login(
            &config.portal.login_url()?,
            &config.portal.username,
            &config.portal.password,
            &config.selectors.login_token_input,
        )
        .await
        .map_err(SyncError::Login)?;
    }

    let store: Arc<dyn RemoteTableStore> = if config.sync.dry_run {
        info!("🧪 Dry run: reconciling against an in-memory table");
        Arc::new(MemoryTableStore::new())
    } else {
        Arc::new(GoogleSheetsStore::new(&config.sheets)?)
    };
    let notifier = Arc::new(SlackNotifier::from_config(&config.notification));

    let pipeline = SyncPipeline::from_config(&config, Arc::new(http), store, notifier)?;
    Ok(pipeline.run().await?)
}
