//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Login handshake and retry settings
    #[serde(default)]
    pub login: LoginConfig,

    /// Registration portal layout
    #[serde(default)]
    pub portal: PortalConfig,

    /// Instructor rating enrichment settings
    #[serde(default)]
    pub ratings: RatingsConfig,

    /// CSS selectors for subject and detail pages
    #[serde(default)]
    pub selectors: SelectorConfig,

    /// Output, cache, and report locations
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::config("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::config("crawler.timeout_secs must be > 0"));
        }
        if self.login.session_cookie.trim().is_empty() {
            return Err(AppError::config("login.session_cookie is empty"));
        }
        if self.login.max_soft_failures == 0 {
            return Err(AppError::config("login.max_soft_failures must be > 0"));
        }
        if self.login.backoff_base_secs == 0 {
            return Err(AppError::config("login.backoff_base_secs must be > 0"));
        }
        if self.login.backoff_multiplier == 0 {
            return Err(AppError::config("login.backoff_multiplier must be > 0"));
        }
        if Url::parse(&self.portal.base_url).is_err() {
            return Err(AppError::config(format!(
                "portal.base_url is not a valid URL: {}",
                self.portal.base_url
            )));
        }
        if self.portal.college_link_prefix.is_empty() {
            return Err(AppError::config("portal.college_link_prefix is empty"));
        }
        if self.portal.subject_link_prefix.is_empty() {
            return Err(AppError::config("portal.subject_link_prefix is empty"));
        }
        if !self.portal.all_colleges && self.portal.colleges.is_empty() {
            return Err(AppError::config(
                "portal.colleges is empty; list college codes or enable all_colleges",
            ));
        }
        if self.ratings.enabled {
            if self.ratings.endpoint.trim().is_empty() {
                return Err(AppError::config("ratings.endpoint is empty"));
            }
            if self.ratings.school_id.trim().is_empty() {
                return Err(AppError::config("ratings.school_id is empty"));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            login: LoginConfig::default(),
            portal: PortalConfig::default(),
            ratings: RatingsConfig::default(),
            selectors: SelectorConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// What to do when a subject page or course record fails to crawl.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Abort the entire run on the first failure.
    #[default]
    FailFast,
    /// Log the failure, drop the page or record, and continue.
    Skip,
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Failure handling policy for subject and detail pages
    #[serde(default)]
    pub on_error: ErrorPolicy,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            on_error: ErrorPolicy::default(),
        }
    }
}

/// Login handshake settings and retry policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginConfig {
    /// Login endpoint the form handshake posts to
    #[serde(default = "defaults::login_url")]
    pub url: String,

    /// Session-identity cookie that proves the handshake succeeded.
    /// A login that returns without this cookie is not a login.
    #[serde(default = "defaults::session_cookie")]
    pub session_cookie: String,

    /// Environment variable holding the portal username
    #[serde(default = "defaults::username_env")]
    pub username_env: String,

    /// Environment variable holding the portal password
    #[serde(default = "defaults::password_env")]
    pub password_env: String,

    /// Soft-failure bound; exceeding it aborts the run
    #[serde(default = "defaults::max_soft_failures")]
    pub max_soft_failures: u32,

    /// Initial backoff in seconds, before the first doubling
    #[serde(default = "defaults::backoff_base")]
    pub backoff_base_secs: u64,

    /// Backoff multiplier applied before every attempt
    #[serde(default = "defaults::backoff_multiplier")]
    pub backoff_multiplier: u32,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            url: defaults::login_url(),
            session_cookie: defaults::session_cookie(),
            username_env: defaults::username_env(),
            password_env: defaults::password_env(),
            max_soft_failures: defaults::max_soft_failures(),
            backoff_base_secs: defaults::backoff_base(),
            backoff_multiplier: defaults::backoff_multiplier(),
        }
    }
}

/// Registration portal layout: base URL and the link prefixes that mark
/// each traversal level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Portal base URL
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Href prefix of college listing links
    #[serde(default = "defaults::college_link_prefix")]
    pub college_link_prefix: String,

    /// Href prefix of subject page links
    #[serde(default = "defaults::subject_link_prefix")]
    pub subject_link_prefix: String,

    /// College codes crawled when `all_colleges` is off
    #[serde(default = "defaults::colleges")]
    pub colleges: Vec<String>,

    /// Crawl every discovered college instead of the configured subset
    #[serde(default)]
    pub all_colleges: bool,
}

impl PortalConfig {
    /// URL of a college's subject listing page. An empty code yields the
    /// root page listing every college.
    pub fn college_page_url(&self, code: &str) -> String {
        format!(
            "{}{}?collegeCode={}",
            self.base_url.trim_end_matches('/'),
            self.college_link_prefix,
            code
        )
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            college_link_prefix: defaults::college_link_prefix(),
            subject_link_prefix: defaults::subject_link_prefix(),
            colleges: defaults::colleges(),
            all_colleges: false,
        }
    }
}

/// Instructor rating enrichment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingsConfig {
    /// Whether rating enrichment runs at all
    #[serde(default)]
    pub enabled: bool,

    /// GraphQL endpoint of the rating service
    #[serde(default = "defaults::ratings_endpoint")]
    pub endpoint: String,

    /// Opaque school identifier the search is scoped to
    #[serde(default = "defaults::ratings_school_id")]
    pub school_id: String,

    /// Authorization header value sent with every lookup
    #[serde(default = "defaults::ratings_authorization")]
    pub authorization: String,
}

impl Default for RatingsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: defaults::ratings_endpoint(),
            school_id: defaults::ratings_school_id(),
            authorization: defaults::ratings_authorization(),
        }
    }
}

/// CSS selectors for course rows and detail pages.
///
/// Detail pages are label/value tables, so the detail side is a row
/// selector plus the two labels to look for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Selector for one course row on a subject page
    #[serde(default = "defaults::course_row")]
    pub course_row: String,

    /// Selector for the CRN link within a row (text = CRN, href = detail page)
    #[serde(default = "defaults::crn_link")]
    pub crn_link: String,

    /// Selector for the subject code cell
    #[serde(default = "defaults::subject_code")]
    pub subject_code: String,

    /// Selector for the course number cell
    #[serde(default = "defaults::course_number")]
    pub course_number: String,

    /// Selector for the instruction type cell
    #[serde(default = "defaults::instruction_type")]
    pub instruction_type: String,

    /// Selector for the instruction method cell
    #[serde(default = "defaults::instruction_method")]
    pub instruction_method: String,

    /// Selector for the section cell
    #[serde(default = "defaults::section")]
    pub section: String,

    /// Selector for the course title cell
    #[serde(default = "defaults::title")]
    pub title: String,

    /// Selector for the days/time cell
    #[serde(default = "defaults::days_time")]
    pub days_time: String,

    /// Selector for the instructor cell
    #[serde(default = "defaults::instructor")]
    pub instructor: String,

    /// Selector for one label/value row on a detail page
    #[serde(default = "defaults::detail_row")]
    pub detail_row: String,

    /// Selector for the cells within a detail row
    #[serde(default = "defaults::detail_cell")]
    pub detail_cell: String,

    /// Label of the credits row on a detail page
    #[serde(default = "defaults::credits_label")]
    pub credits_label: String,

    /// Label of the prerequisites row on a detail page
    #[serde(default = "defaults::prereqs_label")]
    pub prereqs_label: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            course_row: defaults::course_row(),
            crn_link: defaults::crn_link(),
            subject_code: defaults::subject_code(),
            course_number: defaults::course_number(),
            instruction_type: defaults::instruction_type(),
            instruction_method: defaults::instruction_method(),
            section: defaults::section(),
            title: defaults::title(),
            days_time: defaults::days_time(),
            instructor: defaults::instructor(),
            detail_row: defaults::detail_row(),
            detail_cell: defaults::detail_cell(),
            credits_label: defaults::credits_label(),
            prereqs_label: defaults::prereqs_label(),
        }
    }
}

/// Output, cache, and report locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Path of the final catalog file
    #[serde(default = "defaults::data_path")]
    pub data_path: PathBuf,

    /// Directory holding the two crawl caches
    #[serde(default = "defaults::cache_dir")]
    pub cache_dir: PathBuf,

    /// Directory the run report is written to
    #[serde(default = "defaults::report_dir")]
    pub report_dir: PathBuf,

    /// Load the catalog into SQLite after the file write
    #[serde(default)]
    pub database: bool,

    /// Path of the SQLite database
    #[serde(default = "defaults::database_path")]
    pub database_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_path: defaults::data_path(),
            cache_dir: defaults::cache_dir(),
            report_dir: defaults::report_dir(),
            database: false,
            database_path: defaults::database_path(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; tms-crawler/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        0
    }

    // Login defaults
    pub fn login_url() -> String {
        "https://connect.drexel.edu/cas/login".into()
    }
    pub fn session_cookie() -> String {
        "shib_idp_session".into()
    }
    pub fn username_env() -> String {
        "TMS_USERNAME".into()
    }
    pub fn password_env() -> String {
        "TMS_PASSWORD".into()
    }
    pub fn max_soft_failures() -> u32 {
        8
    }
    pub fn backoff_base() -> u64 {
        1
    }
    pub fn backoff_multiplier() -> u32 {
        2
    }

    // Portal defaults
    pub fn base_url() -> String {
        "https://termmasterschedule.drexel.edu".into()
    }
    pub fn college_link_prefix() -> String {
        "/webtms_du/collegesSubjects".into()
    }
    pub fn subject_link_prefix() -> String {
        "/webtms_du/courseList".into()
    }
    pub fn colleges() -> Vec<String> {
        vec!["CI".into()]
    }

    // Rating service defaults
    pub fn ratings_endpoint() -> String {
        "https://www.ratemyprofessors.com/graphql".into()
    }
    pub fn ratings_school_id() -> String {
        "U2Nob29sLTE1MjE=".into()
    }
    pub fn ratings_authorization() -> String {
        "Basic dGVzdDp0ZXN0".into()
    }

    // Selector defaults, matching the portal's course tables
    pub fn course_row() -> String {
        "tr:has(td a)".into()
    }
    pub fn crn_link() -> String {
        "td a".into()
    }
    pub fn subject_code() -> String {
        "td:nth-child(1)".into()
    }
    pub fn course_number() -> String {
        "td:nth-child(2)".into()
    }
    pub fn instruction_type() -> String {
        "td:nth-child(3)".into()
    }
    pub fn instruction_method() -> String {
        "td:nth-child(4)".into()
    }
    pub fn section() -> String {
        "td:nth-child(5)".into()
    }
    pub fn title() -> String {
        "td:nth-child(7)".into()
    }
    pub fn days_time() -> String {
        "td:nth-child(8)".into()
    }
    pub fn instructor() -> String {
        "td:nth-child(9)".into()
    }
    pub fn detail_row() -> String {
        "tr".into()
    }
    pub fn detail_cell() -> String {
        "td".into()
    }
    pub fn credits_label() -> String {
        "Credits".into()
    }
    pub fn prereqs_label() -> String {
        "Pre-Requisites".into()
    }

    // Output defaults
    pub fn data_path() -> PathBuf {
        PathBuf::from("data.json")
    }
    pub fn cache_dir() -> PathBuf {
        PathBuf::from("cache")
    }
    pub fn report_dir() -> PathBuf {
        PathBuf::from("reports")
    }
    pub fn database_path() -> PathBuf {
        PathBuf::from("catalog.db")
    }
}
