// src/storage/json.rs

//! JSON file catalog sink.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::models::Catalog;
use crate::storage::{CatalogSink, WriteSummary};

/// Writes the catalog as one pretty-printed JSON object keyed by CRN.
pub struct JsonCatalog {
    path: PathBuf,
}

impl JsonCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CatalogSink for JsonCatalog {
    async fn write(&self, catalog: &Catalog) -> Result<WriteSummary> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let bytes = serde_json::to_vec_pretty(catalog)?;

        // Atomic write: the final path never holds a partial dataset.
        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);
        tokio::fs::rename(&tmp, &self.path).await?;

        Ok(WriteSummary {
            record_count: catalog.len(),
            location: self.path.display().to_string(),
        })
    }
}
