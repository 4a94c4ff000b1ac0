// src/pipeline.rs

//! Run orchestration: session → crawl → write → report.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::{Config, CrawlStats};
use crate::services::catalog::CatalogCrawler;
use crate::services::session::{LoginProvider, RetryPolicy, SessionBroker};
use crate::storage::{CatalogSink, JsonCatalog, SqliteCatalog};

/// Outcome of a completed run.
#[derive(Debug)]
pub struct RunReport {
    pub stats: CrawlStats,
    pub data_path: PathBuf,
}

/// Run the full crawl pipeline.
///
/// The output dataset is only written after the crawl completes with at
/// least one record; on an aborted run the caches alone retain the
/// progress of completed colleges.
pub async fn run(config: Arc<Config>, login: Box<dyn LoginProvider>) -> Result<RunReport> {
    let started_at = Utc::now();

    let broker = SessionBroker::new(
        login,
        RetryPolicy::from_config(&config.login),
        &config.login.session_cookie,
    );
    let session = broker
        .acquire(&config.crawler, &config.portal.base_url)
        .await?;
    log::info!("Authenticated session acquired");

    let crawler = CatalogCrawler::new(Arc::clone(&config))?;
    let outcome = crawler.crawl(&session).await?;

    if outcome.catalog.is_empty() {
        return Err(AppError::EmptyCatalog);
    }

    let sink = JsonCatalog::new(&config.output.data_path);
    let summary = sink.write(&outcome.catalog).await?;
    log::info!("Found {} courses", summary.record_count);
    log::info!("Data written to {}", summary.location);

    if config.output.database {
        log::info!("Updating database...");
        let db = SqliteCatalog::new(&config.output.database_path);
        let db_summary = db.write(&outcome.catalog).await?;
        log::info!(
            "Loaded {} courses into {}",
            db_summary.record_count,
            db_summary.location
        );
    }

    let finished_at = Utc::now();
    let stats = CrawlStats {
        started_at,
        finished_at,
        duration_secs: (finished_at - started_at).num_milliseconds() as f64 / 1000.0,
        college_count: outcome.college_count,
        subject_count: outcome.subject_count,
        record_count: outcome.catalog.len(),
        detail_fetches: outcome.detail_fetches,
        cache_hits: outcome.cache_hits,
        rating_lookups: outcome.rating_lookups,
        skipped_subjects: outcome.skipped_subjects,
        skipped_records: outcome.skipped_records,
    };
    write_report(&config.output.report_dir, &stats).await?;

    Ok(RunReport {
        stats,
        data_path: config.output.data_path.clone(),
    })
}

/// Write the run report, creating the report directory on demand.
async fn write_report(dir: &Path, stats: &CrawlStats) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join("crawl_stats.json");
    let bytes = serde_json::to_vec_pretty(stats)?;
    tokio::fs::write(&path, bytes).await?;
    log::debug!("Run report written to {}", path.display());
    Ok(())
}
