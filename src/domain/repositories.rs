//! Collaborator interfaces for order synchronization
//!
//! Contains trait definitions for the remote table, the portal page source
//! and the arrival notifier.

use async_trait::async_trait;
use url::Url;

use crate::domain::errors::{FetchError, StoreError};

/// Row-oriented view of the remote table. Rows and columns are 1-based.
#[async_trait]
pub trait RemoteTableStore: Send + Sync {
    async fn read_all_rows(&self) -> Result<Vec<Vec<String>>, StoreError>;
    async fn read_column(&self, column: usize) -> Result<Vec<String>, StoreError>;
    async fn append_row(&self, row: &[String]) -> Result<(), StoreError>;
    async fn update_range(
        &self,
        start_row: usize,
        end_row: usize,
        start_col: usize,
        end_col: usize,
        rows: &[Vec<String>],
    ) -> Result<(), StoreError>;
    /// Grow the declared table so it covers `row_count` x `col_count`
    async fn extend_logical_boundary(&self, row_count: usize, col_count: usize)
    -> Result<(), StoreError>;
}

/// HTML document returned by the portal, with the URL it was finally served from
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: Url,
    pub body: String,
}

#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}

/// Best-effort delivery of an arrival event. Implementations swallow and log
/// their own failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, order_id: &str, arrival_date: &str);
}
