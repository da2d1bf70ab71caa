//! In-memory remote table
//!
//! Backs dry runs and tests. Mirrors the spreadsheet's 1-based addressing and
//! can be primed to reject calls with quota errors or fail boundary updates.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::errors::StoreError;
use crate::domain::repositories::RemoteTableStore;

/// Store call kinds, recorded in order for inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    ReadAll,
    ReadColumn(usize),
    Append,
    Update { start_row: usize, end_row: usize },
    ExtendBoundary { rows: usize, cols: usize },
}

#[derive(Debug, Default)]
struct TableState {
    rows: Vec<Vec<String>>,
    boundary: Option<(usize, usize)>,
    calls: Vec<StoreCall>,
    pending_rate_limits: u32,
    fail_boundary: bool,
}

#[derive(Debug, Default)]
pub struct MemoryTableStore {
    state: Mutex<TableState>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<Vec<String>>) -> Self {
        Self {
            state: Mutex::new(TableState {
                rows,
                ..TableState::default()
            }),
        }
    }

    /// Reject the next `count` calls as rate limited
    pub async fn fail_next_with_rate_limit(&self, count: u32) {
        self.state.lock().await.pending_rate_limits = count;
    }

    /// Make every boundary extension fail with a non-quota error
    pub async fn fail_boundary_updates(&self) {
        self.state.lock().await.fail_boundary = true;
    }

    pub async fn rows(&self) -> Vec<Vec<String>> {
        self.state.lock().await.rows.clone()
    }

    pub async fn boundary(&self) -> Option<(usize, usize)> {
        self.state.lock().await.boundary
    }

    pub async fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn count_calls(&self, matches: impl Fn(&StoreCall) -> bool) -> usize {
        self.state.lock().await.calls.iter().filter(|c| matches(c)).count()
    }
}

impl TableState {
    fn record(&mut self, operation: &str, call: StoreCall) -> Result<(), StoreError> {
        self.calls.push(call);
        if self.pending_rate_limits > 0 {
            self.pending_rate_limits -= 1;
            return Err(StoreError::rate_limited(operation, "Quota exceeded"));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteTableStore for MemoryTableStore {
    async fn read_all_rows(&self) -> Result<Vec<Vec<String>>, StoreError> {
        let mut state = self.state.lock().await;
        state.record("read_all_rows", StoreCall::ReadAll)?;
        Ok(state.rows.clone())
    }

    async fn read_column(&self, column: usize) -> Result<Vec<String>, StoreError> {
        if column == 0 {
            return Err(StoreError::InvalidRange("column 0".to_string()));
        }
        let mut state = self.state.lock().await;
        state.record("read_column", StoreCall::ReadColumn(column))?;
        Ok(state
            .rows
            .iter()
            .map(|row| row.get(column - 1).cloned().unwrap_or_default())
            .collect())
    }

    async fn append_row(&self, row: &[String]) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.record("append_row", StoreCall::Append)?;
        state.rows.push(row.to_vec());
        Ok(())
    }

    async fn update_range(
        &self,
        start_row: usize,
        end_row: usize,
        start_col: usize,
        end_col: usize,
        rows: &[Vec<String>],
    ) -> Result<(), StoreError> {
        if start_row == 0 || start_col == 0 || end_row < start_row || end_col < start_col {
            return Err(StoreError::InvalidRange(format!(
                "rows {start_row}..={end_row}, columns {start_col}..={end_col}"
            )));
        }
        let mut state = self.state.lock().await;
        state.record("update_range", StoreCall::Update { start_row, end_row })?;

        if state.rows.len() < end_row {
            state.rows.resize(end_row, Vec::new());
        }
        for (offset, values) in rows.iter().take(end_row - start_row + 1).enumerate() {
            let target = &mut state.rows[start_row - 1 + offset];
            if target.len() < end_col {
                target.resize(end_col, String::new());
            }
            for (col, value) in values.iter().take(end_col - start_col + 1).enumerate() {
                target[start_col - 1 + col] = value.clone();
            }
        }
        Ok(())
    }

    async fn extend_logical_boundary(
        &self,
        row_count: usize,
        col_count: usize,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.record(
            "extend_logical_boundary",
            StoreCall::ExtendBoundary { rows: row_count, cols: col_count },
        )?;
        if state.fail_boundary {
            return Err(StoreError::Api {
                operation: "extend_logical_boundary".to_string(),
                status: 400,
                message: "table not found".to_string(),
            });
        }
        state.boundary = Some((row_count, col_count));
        Ok(())
    }
}
