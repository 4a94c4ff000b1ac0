// src/models/stats.rs

//! Run statistics written to the report directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary of one crawl run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlStats {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub college_count: usize,
    pub subject_count: usize,
    pub record_count: usize,
    pub detail_fetches: usize,
    pub cache_hits: usize,
    pub rating_lookups: usize,
    pub skipped_subjects: usize,
    pub skipped_records: usize,
}
