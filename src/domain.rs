//! Domain module - order records, sheet projection and collaborator contracts
//!
//! Everything here is free of I/O: the record types scraped from the portal,
//! the row shape persisted in the remote table, and the traits the
//! application layer talks to.

pub mod errors;
pub mod order;
pub mod repositories;
pub mod sheet_row;

pub use errors::{FetchError, StoreError};
pub use order::{EnrichedItem, ItemRecord, OrderHeader, ProductLink};
pub use repositories::{FetchedPage, Notifier, PageSource, RemoteTableStore};
pub use sheet_row::{ReconciliationRow, SHEET_HEADERS};
