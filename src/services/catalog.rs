// src/services/catalog.rs

//! Catalog crawler.
//!
//! Drives the college → subject → course-record traversal against an
//! authenticated session. Every request is awaited before the next is
//! issued, in link order, so cache warm-up and rate behavior reproduce
//! exactly across runs.
//!
//! Cache durability boundary: both on-disk caches are loaded when a
//! college's processing starts and persisted only after its whole subject
//! loop completes. A failure partway through a college discards that
//! college's accumulated cache updates; earlier colleges' updates are
//! already on disk.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Catalog, Config, CourseRef, ErrorPolicy};
use crate::services::parser::{PageParser, SelectorParser, extract_prefixed_links};
use crate::services::ratings::RatingsClient;
use crate::services::session::Session;
use crate::storage::{CacheSnapshot, CacheStore};
use crate::utils::{http, url as url_util};

/// Result of one crawl run.
#[derive(Debug, Default)]
pub struct CrawlOutcome {
    pub catalog: Catalog,
    pub college_count: usize,
    pub subject_count: usize,
    pub detail_fetches: usize,
    pub cache_hits: usize,
    pub rating_lookups: usize,
    pub skipped_subjects: usize,
    pub skipped_records: usize,
}

/// Orchestrates the hierarchical traversal.
pub struct CatalogCrawler {
    config: Arc<Config>,
    parser: Box<dyn PageParser>,
    ratings: Option<RatingsClient>,
    cache: CacheStore,
    base_url: Url,
}

impl CatalogCrawler {
    /// Build a crawler from configuration, compiling the configured
    /// selectors. The rating client is only constructed when enrichment
    /// is enabled, so a disabled run cannot reach the rating service.
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let parser = Box::new(SelectorParser::new(&config.selectors)?);
        Self::with_parser(config, parser)
    }

    /// Build a crawler with a custom page parser.
    pub fn with_parser(config: Arc<Config>, parser: Box<dyn PageParser>) -> Result<Self> {
        let ratings = if config.ratings.enabled {
            Some(RatingsClient::new(&config.ratings, &config.crawler)?)
        } else {
            None
        };
        let cache = CacheStore::new(&config.output.cache_dir);
        let base_url = Url::parse(&config.portal.base_url)?;
        Ok(Self {
            config,
            parser,
            ratings,
            cache,
            base_url,
        })
    }

    /// Crawl every selected college and assemble the catalog.
    pub async fn crawl(&self, session: &Session) -> Result<CrawlOutcome> {
        let mut outcome = CrawlOutcome::default();

        let college_codes = self.discover_college_codes(session).await?;
        log::info!("Discovered {} colleges", college_codes.len());

        for code in &college_codes {
            log::info!("Processing college {code}");
            let url = self.config.portal.college_page_url(code);
            let html = self.fetch(session, &url).await?;
            self.process_college(session, &html, &mut outcome).await?;
            outcome.college_count += 1;
        }

        Ok(outcome)
    }

    /// Discover college codes from the root listing page, in link order.
    /// Unless every college was requested, the list is filtered to the
    /// configured subset without reordering it.
    async fn discover_college_codes(&self, session: &Session) -> Result<Vec<String>> {
        let url = self.config.portal.college_page_url("");
        let html = self.fetch(session, &url).await?;

        let mut codes: Vec<String> =
            extract_prefixed_links(&html, &self.config.portal.college_link_prefix)
                .iter()
                .map(|href| url_util::college_code_from_href(href))
                .collect();

        if !self.config.portal.all_colleges {
            codes.retain(|code| self.config.portal.colleges.iter().any(|c| c == code));
        }
        Ok(codes)
    }

    /// Process one college from its subject-list page content: load the
    /// caches, walk the subject pages, and persist the caches only once
    /// the whole loop has completed.
    async fn process_college(
        &self,
        session: &Session,
        page_content: &str,
        outcome: &mut CrawlOutcome,
    ) -> Result<()> {
        let mut caches = self.cache.load().await?;

        for link in extract_prefixed_links(page_content, &self.config.portal.subject_link_prefix) {
            match self
                .process_subject(session, &link, &mut caches, outcome)
                .await
            {
                Ok(()) => outcome.subject_count += 1,
                Err(e) if self.config.crawler.on_error == ErrorPolicy::Skip => {
                    log::warn!("skipping subject page: {e}");
                    outcome.skipped_subjects += 1;
                }
                Err(e) => return Err(e),
            }
        }

        self.cache.persist(&caches).await?;
        Ok(())
    }

    /// Fetch and parse one subject page, then fill in every course it
    /// lists.
    async fn process_subject(
        &self,
        session: &Session,
        link: &str,
        caches: &mut CacheSnapshot,
        outcome: &mut CrawlOutcome,
    ) -> Result<()> {
        let url = url_util::resolve(&self.base_url, link);
        let html = self
            .fetch(session, &url)
            .await
            .map_err(|e| AppError::crawl(format!("subject page {link}"), e))?;

        // Parse into a staging map so a malformed page leaves no partial
        // summary records behind.
        let mut staged = Catalog::new();
        let refs = self
            .parser
            .parse_subject_page(&html, &mut staged)
            .map_err(|e| AppError::crawl(format!("subject page {link}"), e))?;
        outcome.catalog.append(&mut staged);

        for course_ref in refs {
            match self
                .process_record(session, &course_ref, caches, outcome)
                .await
            {
                Ok(()) => {}
                Err(e) if self.config.crawler.on_error == ErrorPolicy::Skip => {
                    log::warn!("skipping course {}: {e}", course_ref.crn);
                    // A record is only present when fully parsed.
                    outcome.catalog.remove(&course_ref.crn);
                    outcome.skipped_records += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    /// Fill one record's supplemental fields, from the cache when its CRN
    /// is already known, then apply rating enrichment.
    async fn process_record(
        &self,
        session: &Session,
        course_ref: &CourseRef,
        caches: &mut CacheSnapshot,
        outcome: &mut CrawlOutcome,
    ) -> Result<()> {
        let crn = &course_ref.crn;

        if let Some(extras) = caches.extras.get(crn) {
            if let Some(record) = outcome.catalog.get_mut(crn) {
                record.apply_extras(extras);
            }
            outcome.cache_hits += 1;
        } else {
            let url = url_util::resolve(&self.base_url, &course_ref.link);
            let html = self
                .fetch(session, &url)
                .await
                .map_err(|e| AppError::crawl(format!("course {crn}: {}", course_ref.link), e))?;
            let extras = self
                .parser
                .parse_course_page(&html, crn)
                .map_err(|e| AppError::crawl(format!("course {crn}: {}", course_ref.link), e))?;

            if let Some(record) = outcome.catalog.get_mut(crn) {
                record.apply_extras(&extras);
            }
            caches.extras.insert(crn.clone(), extras);
            outcome.detail_fetches += 1;
        }

        if let Some(record) = outcome.catalog.get(crn) {
            log::info!("parsed course {crn} ({})", record.course_title);
        }

        self.enrich(crn, caches, outcome).await
    }

    /// Attach rating statistics to a record, consulting the rating cache
    /// before the live service. A successful live lookup is written back
    /// to the cache; misses stay uncached and are re-queried next run.
    async fn enrich(
        &self,
        crn: &str,
        caches: &mut CacheSnapshot,
        outcome: &mut CrawlOutcome,
    ) -> Result<()> {
        let Some(client) = &self.ratings else {
            return Ok(());
        };
        let Some(name) = outcome
            .catalog
            .get(crn)
            .and_then(|record| record.instructors.first())
            .cloned()
        else {
            return Ok(());
        };

        let rating = if let Some(cached) = caches.ratings.get(&name) {
            Some(cached.clone())
        } else {
            outcome.rating_lookups += 1;
            let looked_up = client.rating(&name).await?;
            if let Some(rating) = &looked_up {
                caches.ratings.insert(name.clone(), rating.clone());
            }
            looked_up
        };

        if let Some(rating) = rating {
            if let Some(record) = outcome.catalog.get_mut(crn) {
                record.rating = Some(rating);
            }
        }
        Ok(())
    }

    async fn fetch(&self, session: &Session, url: &str) -> Result<String> {
        let text = http::fetch_text(session.client(), url).await?;

        let delay = Duration::from_millis(self.config.crawler.request_delay_ms);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(text)
    }
}
