//! End-to-end crawl tests against a mock registration portal.
//!
//! These tests use wiremock to stand in for the portal (and, where
//! enabled, the rating service) and exercise the full traversal and
//! cache cycle over HTTP.

use std::sync::Arc;

use tempfile::TempDir;
use tms_crawler::error::AppError;
use tms_crawler::models::{Catalog, Config};
use tms_crawler::pipeline;
use tms_crawler::services::catalog::{CatalogCrawler, CrawlOutcome};
use tms_crawler::services::session::{LoginProvider, RetryPolicy, Session, SessionBroker};
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Login provider that hits the mock portal's login endpoint; the mock
/// responds with the session-identity cookie.
struct PortalLogin {
    url: String,
}

#[async_trait::async_trait]
impl LoginProvider for PortalLogin {
    async fn login(&self, session: &Session) -> tms_crawler::error::Result<()> {
        session
            .client()
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

fn test_config(base_url: &str, tmp: &TempDir) -> Config {
    let mut config = Config::default();
    config.portal.base_url = base_url.to_string();
    config.portal.all_colleges = true;
    config.login.url = format!("{base_url}/login");
    config.output.data_path = tmp.path().join("data.json");
    config.output.cache_dir = tmp.path().join("cache");
    config.output.report_dir = tmp.path().join("reports");
    config.output.database_path = tmp.path().join("catalog.db");
    config
}

fn login_for(config: &Config) -> Box<PortalLogin> {
    Box::new(PortalLogin {
        url: config.login.url.clone(),
    })
}

async fn crawl_with(config: &Config) -> tms_crawler::error::Result<CrawlOutcome> {
    let config = Arc::new(config.clone());
    let broker = SessionBroker::new(
        login_for(&config),
        RetryPolicy::from_config(&config.login),
        &config.login.session_cookie,
    );
    let session = broker
        .acquire(&config.crawler, &config.portal.base_url)
        .await?;
    let crawler = CatalogCrawler::new(Arc::clone(&config))?;
    crawler.crawl(&session).await
}

async fn requests_to(server: &MockServer, to: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == to)
        .count()
}

// --- Portal fixtures ---

async fn mount_login(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("set-cookie", "shib_idp_session=test; Path=/"),
        )
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, page_path: &str, params: &[(&str, &str)], body: String) {
    let mut mock = Mock::given(method("GET")).and(path(page_path));
    for (key, value) in params {
        mock = mock.and(query_param(*key, *value));
    }
    mock.respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn college_listing(codes: &[&str]) -> String {
    codes
        .iter()
        .map(|code| format!(r#"<a href="/webtms_du/collegesSubjects?collegeCode={code}">{code}</a>"#))
        .collect()
}

fn subject_listing(subjects: &[&str]) -> String {
    subjects
        .iter()
        .map(|s| format!(r#"<a href="/webtms_du/courseList?subjectCode={s}">{s}</a>"#))
        .collect()
}

fn course_row(subject: &str, number: &str, crn: &str, title: &str, instructor: &str) -> String {
    format!(
        r#"<tr>
            <td>{subject}</td><td>{number}</td><td>Lecture</td><td>Face To Face</td><td>A</td>
            <td><a href="/webtms_du/courseDetails?crn={crn}">{crn}</a></td>
            <td>{title}</td><td>MWF 10:00-10:50</td><td>{instructor}</td>
        </tr>"#
    )
}

fn subject_page(rows: &[String]) -> String {
    format!(
        "<table><tr><th>Subject</th><th>No.</th><th>Type</th><th>Method</th>\
         <th>Sec</th><th>CRN</th><th>Title</th><th>Time</th><th>Instructor</th></tr>{}</table>",
        rows.join("")
    )
}

fn detail_page(credits: &str, prereqs: &str) -> String {
    format!(
        "<table><tr><td>Credits</td><td>{credits}</td></tr>\
         <tr><td>Pre-Requisites</td><td>{prereqs}</td></tr></table>"
    )
}

/// Two colleges: A with a CS subject (two courses), B with MATH (one).
async fn mount_portal(server: &MockServer) {
    mount_login(server).await;
    mount_page(
        server,
        "/webtms_du/collegesSubjects",
        &[("collegeCode", "")],
        college_listing(&["A", "B"]),
    )
    .await;
    mount_page(
        server,
        "/webtms_du/collegesSubjects",
        &[("collegeCode", "A")],
        subject_listing(&["CS"]),
    )
    .await;
    mount_page(
        server,
        "/webtms_du/collegesSubjects",
        &[("collegeCode", "B")],
        subject_listing(&["MATH"]),
    )
    .await;
    mount_page(
        server,
        "/webtms_du/courseList",
        &[("subjectCode", "CS")],
        subject_page(&[
            course_row("CS", "171", "12345", "Computer Programming I", "Galen Long"),
            course_row("CS", "260", "12346", "Data Structures", "Ada Lovelace"),
        ]),
    )
    .await;
    mount_page(
        server,
        "/webtms_du/courseList",
        &[("subjectCode", "MATH")],
        subject_page(&[course_row("MATH", "101", "22345", "Calculus I", "Isaac Newton")]),
    )
    .await;
    mount_page(
        server,
        "/webtms_du/courseDetails",
        &[("crn", "12345")],
        detail_page("3.00", "None"),
    )
    .await;
    mount_page(
        server,
        "/webtms_du/courseDetails",
        &[("crn", "12346")],
        detail_page("4.00", "CS 171 Minimum Grade: C"),
    )
    .await;
    mount_page(
        server,
        "/webtms_du/courseDetails",
        &[("crn", "22345")],
        detail_page("4.00", "None"),
    )
    .await;
}

fn read_extras_cache(config: &Config) -> serde_json::Value {
    let bytes = std::fs::read(config.output.cache_dir.join("course_extras.json")).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// --- Tests ---

#[tokio::test]
async fn full_crawl_writes_catalog_caches_and_report() {
    let server = MockServer::start().await;
    mount_portal(&server).await;
    let tmp = TempDir::new().unwrap();
    let config = test_config(&server.uri(), &tmp);

    let report = pipeline::run(Arc::new(config.clone()), login_for(&config))
        .await
        .unwrap();

    assert_eq!(report.stats.college_count, 2);
    assert_eq!(report.stats.subject_count, 2);
    assert_eq!(report.stats.record_count, 3);
    assert_eq!(report.stats.detail_fetches, 3);
    assert_eq!(report.stats.cache_hits, 0);
    assert_eq!(report.stats.rating_lookups, 0);

    let bytes = std::fs::read(&config.output.data_path).unwrap();
    let catalog: Catalog = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog["12345"].credits, "3.00");
    assert_eq!(catalog["12345"].course_title, "Computer Programming I");
    assert_eq!(catalog["12346"].prereqs, "CS 171 Minimum Grade: C");
    assert!(catalog["12345"].rating.is_none());

    let extras = read_extras_cache(&config);
    assert!(extras.get("12345").is_some());
    assert!(extras.get("12346").is_some());
    assert!(extras.get("22345").is_some());

    assert!(config.output.report_dir.join("crawl_stats.json").exists());
}

#[tokio::test]
async fn warm_cache_skips_detail_fetches_and_is_byte_stable() {
    let tmp = TempDir::new().unwrap();

    let first = MockServer::start().await;
    mount_portal(&first).await;
    let config1 = test_config(&first.uri(), &tmp);
    let outcome1 = crawl_with(&config1).await.unwrap();
    assert_eq!(outcome1.detail_fetches, 3);
    let cache_bytes = std::fs::read(config1.output.cache_dir.join("course_extras.json")).unwrap();

    // Second run against a fresh server, same cache directory.
    let second = MockServer::start().await;
    mount_portal(&second).await;
    let config2 = test_config(&second.uri(), &tmp);
    let outcome2 = crawl_with(&config2).await.unwrap();

    assert_eq!(outcome2.detail_fetches, 0);
    assert_eq!(outcome2.cache_hits, 3);
    assert_eq!(requests_to(&second, "/webtms_du/courseDetails").await, 0);
    assert_eq!(outcome2.catalog["12345"].credits, "3.00");
    assert_eq!(outcome2.catalog["12346"].prereqs, "CS 171 Minimum Grade: C");

    let cache_bytes2 = std::fs::read(config2.output.cache_dir.join("course_extras.json")).unwrap();
    assert_eq!(cache_bytes, cache_bytes2);
}

#[tokio::test]
async fn malformed_college_aborts_and_keeps_earlier_cache() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_page(
        &server,
        "/webtms_du/collegesSubjects",
        &[("collegeCode", "")],
        college_listing(&["A", "B"]),
    )
    .await;
    mount_page(
        &server,
        "/webtms_du/collegesSubjects",
        &[("collegeCode", "A")],
        subject_listing(&["CS"]),
    )
    .await;
    mount_page(
        &server,
        "/webtms_du/collegesSubjects",
        &[("collegeCode", "B")],
        subject_listing(&["MATH"]),
    )
    .await;
    mount_page(
        &server,
        "/webtms_du/courseList",
        &[("subjectCode", "CS")],
        subject_page(&[course_row(
            "CS",
            "171",
            "12345",
            "Computer Programming I",
            "Galen Long",
        )]),
    )
    .await;
    mount_page(
        &server,
        "/webtms_du/courseDetails",
        &[("crn", "12345")],
        detail_page("3.00", "None"),
    )
    .await;
    // College B's subject page is broken.
    Mock::given(method("GET"))
        .and(path("/webtms_du/courseList"))
        .and(query_param("subjectCode", "MATH"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let config = test_config(&server.uri(), &tmp);

    let err = crawl_with(&config).await.unwrap_err();
    match err {
        AppError::Crawl { context, .. } => assert!(context.contains("courseList")),
        other => panic!("expected Crawl error, got {other:?}"),
    }

    // College A completed, so its cache entries are durable; college B's
    // loop never finished, so nothing of it was flushed.
    let extras = read_extras_cache(&config);
    assert!(extras.get("12345").is_some());
    assert!(extras.get("22345").is_none());
}

#[tokio::test]
async fn empty_listing_fails_and_writes_no_output() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_page(
        &server,
        "/webtms_du/collegesSubjects",
        &[("collegeCode", "")],
        "<html><body>No colleges today</body></html>".to_string(),
    )
    .await;

    let tmp = TempDir::new().unwrap();
    let config = test_config(&server.uri(), &tmp);

    let err = pipeline::run(Arc::new(config.clone()), login_for(&config))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmptyCatalog));
    assert!(!config.output.data_path.exists());
}

#[tokio::test]
async fn restricted_subset_limits_traversal() {
    let server = MockServer::start().await;
    mount_portal(&server).await;
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&server.uri(), &tmp);
    config.portal.all_colleges = false;
    config.portal.colleges = vec!["B".to_string()];

    let outcome = crawl_with(&config).await.unwrap();

    assert_eq!(outcome.college_count, 1);
    assert_eq!(outcome.catalog.len(), 1);
    assert!(outcome.catalog.contains_key("22345"));

    let subject_requests = server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.query().unwrap_or("").contains("subjectCode=CS"))
        .count();
    assert_eq!(subject_requests, 0);
}

#[tokio::test]
async fn disabled_ratings_makes_no_rating_calls() {
    let server = MockServer::start().await;
    mount_portal(&server).await;
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&server.uri(), &tmp);
    config.ratings.endpoint = format!("{}/graphql", server.uri());

    // A warm rating cache must not change anything while enrichment is off.
    std::fs::create_dir_all(&config.output.cache_dir).unwrap();
    std::fs::write(
        config.output.cache_dir.join("ratings.json"),
        serde_json::to_vec_pretty(&serde_json::json!({
            "Galen Long": {"avg_rating": 4.5, "avg_difficulty": 2.5, "num_ratings": 17}
        }))
        .unwrap(),
    )
    .unwrap();

    let outcome = crawl_with(&config).await.unwrap();

    assert_eq!(requests_to(&server, "/graphql").await, 0);
    assert_eq!(outcome.rating_lookups, 0);
    assert!(outcome.catalog.values().all(|r| r.rating.is_none()));
}

#[tokio::test]
async fn unmatched_instructor_leaves_record_unenriched() {
    let server = MockServer::start().await;
    mount_portal(&server).await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("searchInstructor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"newSearch": {"teachers": {"edges": []}}}
        })))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&server.uri(), &tmp);
    config.ratings.enabled = true;
    config.ratings.endpoint = format!("{}/graphql", server.uri());

    let outcome = crawl_with(&config).await.unwrap();

    assert_eq!(outcome.catalog.len(), 3);
    assert!(outcome.catalog.values().all(|r| r.rating.is_none()));
    assert_eq!(outcome.rating_lookups, 3);
}

#[tokio::test]
async fn enrichment_attaches_ratings_and_fills_the_cache() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_page(
        &server,
        "/webtms_du/collegesSubjects",
        &[("collegeCode", "")],
        college_listing(&["A"]),
    )
    .await;
    mount_page(
        &server,
        "/webtms_du/collegesSubjects",
        &[("collegeCode", "A")],
        subject_listing(&["CS"]),
    )
    .await;
    // Two sections taught by the same instructor: one live lookup only.
    mount_page(
        &server,
        "/webtms_du/courseList",
        &[("subjectCode", "CS")],
        subject_page(&[
            course_row("CS", "171", "12345", "Computer Programming I", "Galen Long"),
            course_row("CS", "171", "12346", "Computer Programming I", "Galen Long"),
        ]),
    )
    .await;
    mount_page(
        &server,
        "/webtms_du/courseDetails",
        &[("crn", "12345")],
        detail_page("3.00", "None"),
    )
    .await;
    mount_page(
        &server,
        "/webtms_du/courseDetails",
        &[("crn", "12346")],
        detail_page("3.00", "None"),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("searchInstructor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"newSearch": {"teachers": {"edges": [
                {"node": {"id": "T1", "firstName": "Galen", "lastName": "Long", "department": "CS"}}
            ]}}}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("instructorRatings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"node": {
                "__typename": "Teacher",
                "avgRating": 4.5,
                "avgDifficulty": 2.5,
                "numRatings": 17
            }}
        })))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&server.uri(), &tmp);
    config.ratings.enabled = true;
    config.ratings.endpoint = format!("{}/graphql", server.uri());

    let outcome = crawl_with(&config).await.unwrap();

    let rating = outcome.catalog["12345"].rating.as_ref().unwrap();
    assert_eq!(rating.avg_rating, 4.5);
    assert_eq!(rating.num_ratings, 17);
    assert!(outcome.catalog["12346"].rating.is_some());

    // One search + one fetch; the second section reused the cache entry.
    assert_eq!(outcome.rating_lookups, 1);
    assert_eq!(requests_to(&server, "/graphql").await, 2);

    let bytes = std::fs::read(config.output.cache_dir.join("ratings.json")).unwrap();
    let ratings_cache: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(ratings_cache.get("Galen Long").is_some());
}
