//! Persistent crawl caches.
//!
//! Two independent key-value caches survive across runs: supplemental
//! course fields keyed by CRN, and instructor ratings keyed by display
//! name. Entries are immutable once written and never expire.
//!
//! ## Cache Layout
//!
//! ```text
//! {cache_dir}/
//! ├── course_extras.json    # CRN → {credits, prereqs}
//! └── ratings.json          # instructor name → rating statistics
//! ```
//!
//! A missing file is an empty cache, and the directory is created on the
//! first persist.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{CourseExtras, Rating};

const EXTRAS_FILE: &str = "course_extras.json";
const RATINGS_FILE: &str = "ratings.json";

/// In-memory view of both caches for one college's processing step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheSnapshot {
    /// CRN → supplemental fields
    pub extras: BTreeMap<String, CourseExtras>,

    /// Instructor display name → rating statistics
    pub ratings: BTreeMap<String, Rating>,
}

/// On-disk store for the two crawl caches.
#[derive(Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    /// Create a cache store rooted at the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Full path of the supplemental-fields cache file.
    pub fn extras_path(&self) -> PathBuf {
        self.dir.join(EXTRAS_FILE)
    }

    /// Full path of the ratings cache file.
    pub fn ratings_path(&self) -> PathBuf {
        self.dir.join(RATINGS_FILE)
    }

    /// Load both caches; a missing file is an empty cache.
    pub async fn load(&self) -> Result<CacheSnapshot> {
        Ok(CacheSnapshot {
            extras: self.read_json(EXTRAS_FILE).await?.unwrap_or_default(),
            ratings: self.read_json(RATINGS_FILE).await?.unwrap_or_default(),
        })
    }

    /// Persist both caches, creating the cache directory on demand.
    pub async fn persist(&self, snapshot: &CacheSnapshot) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        self.write_json(EXTRAS_FILE, &snapshot.extras).await?;
        self.write_json(RATINGS_FILE, &snapshot.ratings).await?;
        Ok(())
    }

    async fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.dir.join(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Write atomically (write to temp, then rename).
    async fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let bytes = serde_json::to_vec_pretty(value)?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}
