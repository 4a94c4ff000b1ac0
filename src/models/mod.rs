// src/models/mod.rs

//! Domain models for the catalog crawler.

mod config;
mod course;
mod stats;

// Re-export all public types
pub use config::{
    Config, CrawlerConfig, ErrorPolicy, LoginConfig, OutputConfig, PortalConfig, RatingsConfig,
    SelectorConfig,
};
pub use course::{Catalog, CourseExtras, CourseRecord, CourseRef, Rating};
pub use stats::CrawlStats;
