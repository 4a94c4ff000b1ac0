//! tms-crawler CLI
//!
//! Crawls a university term master schedule into a keyed course catalog.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tms_crawler::{
    error::Result,
    models::{Config, ErrorPolicy},
    pipeline,
    services::session::FormLogin,
};

/// Term master schedule catalog crawler
#[derive(Parser, Debug)]
#[command(name = "tms-crawler", version, about = "University course catalog crawler")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enrich records with instructor ratings
    #[arg(long)]
    ratings: bool,

    /// Crawl every discovered college instead of the configured subset
    #[arg(long)]
    all_colleges: bool,

    /// Load the catalog into SQLite after the file write
    #[arg(long)]
    db: bool,

    /// Skip failing subject pages and records instead of aborting
    #[arg(long)]
    keep_going: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("tms-crawler starting...");

    let mut config = Config::load_or_default(&cli.config);
    if cli.ratings {
        config.ratings.enabled = true;
    }
    if cli.all_colleges {
        config.portal.all_colleges = true;
    }
    if cli.db {
        config.output.database = true;
    }
    if cli.keep_going {
        config.crawler.on_error = ErrorPolicy::Skip;
    }
    config.validate()?;

    let login = FormLogin::new(config.login.clone());
    let report = pipeline::run(Arc::new(config), Box::new(login)).await?;

    log::info!(
        "Crawled {} colleges, {} subjects, {} courses in {:.1}s",
        report.stats.college_count,
        report.stats.subject_count,
        report.stats.record_count,
        report.stats.duration_secs
    );
    log::info!("Done!");

    Ok(())
}
