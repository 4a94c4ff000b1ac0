//! Persistence for the crawl caches and the final catalog.

pub mod cache;
pub mod json;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Catalog;

// Re-export for convenience
pub use cache::{CacheSnapshot, CacheStore};
pub use json::JsonCatalog;
pub use sqlite::SqliteCatalog;

/// Metadata about a catalog write.
#[derive(Debug, Clone)]
pub struct WriteSummary {
    /// Number of records written
    pub record_count: usize,
    /// Where the catalog landed
    pub location: String,
}

/// Sink for a completed catalog.
#[async_trait]
pub trait CatalogSink: Send + Sync {
    async fn write(&self, catalog: &Catalog) -> Result<WriteSummary>;
}
