//! Top-level failure of a sync run

use thiserror::Error;

use crate::domain::errors::{FetchError, StoreError};
use crate::infrastructure::parsing::ParsingError;

/// The single fatal cause that aborted a run
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Portal login failed: {0}")]
    Login(#[source] FetchError),

    #[error("Page fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Page structure error: {0}")]
    Parsing(#[from] ParsingError),

    #[error("Remote table error: {0}")]
    Store(#[from] StoreError),
}

pub type SyncResult<T> = Result<T, SyncError>;
