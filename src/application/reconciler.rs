//! Reconciliation of scraped rows against the remote table
//!
//! The table is read once per run. Each incoming row is then inserted,
//! skipped or rewritten in place, keyed by the order id in column B. A stored
//! order is compared once per run, against its first row, using its first
//! incoming item. Stored rows are never deleted.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::errors::StoreError;
use crate::domain::repositories::{Notifier, RemoteTableStore};
use crate::domain::sheet_row::{COL_ARRIVED_AT, COL_ORDER_ID, ReconciliationRow, header_cells};
use crate::infrastructure::config::SyncConfig;
use crate::infrastructure::retry_executor::RetryExecutor;

/// Arrival announced during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrivalNotice {
    pub order_id: String,
    pub arrival_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub notifications: Vec<ArrivalNotice>,
}

pub struct Reconciler {
    retry: RetryExecutor,
    compare_columns: usize,
    default_column_count: usize,
}

impl Reconciler {
    pub const fn new(retry: RetryExecutor, compare_columns: usize, default_column_count: usize) -> Self {
        Self {
            retry,
            compare_columns,
            default_column_count,
        }
    }

    pub const fn from_config(retry: RetryExecutor, config: &SyncConfig) -> Self {
        Self::new(retry, config.compare_columns, config.default_column_count)
    }

    pub async fn reconcile(
        &self,
        rows: &[ReconciliationRow],
        store: &dyn RemoteTableStore,
        notifier: &dyn Notifier,
    ) -> Result<SyncSummary, StoreError> {
        let snapshot = self
            .retry
            .execute("read_all_rows", || store.read_all_rows())
            .await?;
        // Header width, or the default when the first row is blank
        let mut column_count = snapshot
            .first()
            .map(Vec::len)
            .filter(|&width| width > 0)
            .unwrap_or(self.default_column_count);
        let mut total_rows = snapshot.len();

        if snapshot.is_empty() {
            info!("Remote table is empty, writing header row");
            let header = header_cells();
            self.retry
                .execute("append_row", || store.append_row(&header))
                .await?;
            column_count = header.len();
            total_rows += 1;
        }

        let index = index_order_rows(&snapshot);
        debug!("Indexed {} stored orders across {} rows", index.len(), snapshot.len());

        let mut summary = SyncSummary::default();
        // Stored orders already compared this run; later items of the same order are skipped
        let mut decided: HashSet<&str> = HashSet::new();

        for row in rows {
            if row.order_id().trim().is_empty() {
                warn!("Skipping item '{}' without an order id", row.item_name());
                summary.skipped += 1;
                continue;
            }
            let cells = row.to_cells();

            let Some(&row_number) = index.get(row.order_id()) else {
                self.retry
                    .execute("append_row", || store.append_row(&cells))
                    .await?;
                total_rows += 1;
                summary.inserted += 1;
                continue;
            };

            if !decided.insert(row.order_id()) {
                summary.skipped += 1;
                continue;
            }

            let stored = &snapshot[row_number - 1];
            if self.comparable_cells_match(stored, &cells) {
                summary.skipped += 1;
                continue;
            }

            self.retry
                .execute("update_range", || {
                    store.update_range(row_number, row_number, 1, cells.len(), std::slice::from_ref(&cells))
                })
                .await?;
            summary.updated += 1;
            debug!("Updated row {} for order {}", row_number, row.order_id());

            let stored_arrival = stored.get(COL_ARRIVED_AT).map_or("", |cell| cell.trim());
            let incoming_arrival = row.arrived_at().trim();
            if stored_arrival.is_empty() && !incoming_arrival.is_empty() {
                info!("🚚 Order {} arrived on {}", row.order_id(), incoming_arrival);
                notifier.notify(row.order_id(), incoming_arrival).await;
                summary.notifications.push(ArrivalNotice {
                    order_id: row.order_id().to_string(),
                    arrival_date: incoming_arrival.to_string(),
                });
            }
        }

        if total_rows > snapshot.len() {
            if let Err(e) = store.extend_logical_boundary(total_rows, column_count).await {
                warn!(
                    "Could not extend table boundary to {} rows x {} columns: {}",
                    total_rows, column_count, e
                );
            }
        }

        info!(
            "📊 Reconciled {} rows: {} inserted, {} updated, {} skipped, {} notified",
            rows.len(),
            summary.inserted,
            summary.updated,
            summary.skipped,
            summary.notifications.len()
        );
        Ok(summary)
    }

    /// Compare the leading columns; stored cells past the row's end read as empty
    fn comparable_cells_match(&self, stored: &[String], incoming: &[String]) -> bool {
        (0..self.compare_columns).all(|i| {
            let stored_cell = stored.get(i).map_or("", String::as_str);
            let incoming_cell = incoming.get(i).map_or("", String::as_str);
            stored_cell == incoming_cell
        })
    }
}

/// Order id → first 1-based row holding it
fn index_order_rows(snapshot: &[Vec<String>]) -> HashMap<&str, usize> {
    let mut index = HashMap::new();
    for (position, row) in snapshot.iter().enumerate() {
        if let Some(order_id) = row.get(COL_ORDER_ID).filter(|id| !id.is_empty()) {
            index.entry(order_id.as_str()).or_insert(position + 1);
        }
    }
    index
}
