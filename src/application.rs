//! Application layer: the order synchronization engine
//!
//! `PageWalker` collects item rows across the paginated list, `LinkEnricher`
//! correlates detail-page products with them, `Reconciler` writes the result
//! into the remote table and `SyncPipeline` runs the three in sequence.

pub mod error;
pub mod link_enricher;
pub mod page_walker;
pub mod reconciler;
pub mod sync_pipeline;

pub use error::{SyncError, SyncResult};
pub use link_enricher::{DetailOutcome, EnrichmentOutcome, EnrichmentStats, LinkEnricher};
pub use page_walker::{PageWalker, WalkOutcome, WalkStop};
pub use reconciler::{ArrivalNotice, Reconciler, SyncSummary};
pub use sync_pipeline::{SyncPipeline, SyncReport};
