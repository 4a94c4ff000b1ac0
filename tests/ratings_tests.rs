//! Rating service protocol tests.
//!
//! Exercise the search-then-fetch GraphQL exchange against a wiremock
//! endpoint: first-match selection, the no-match and zero-count cases,
//! and the authorization header.

use tms_crawler::models::Config;
use tms_crawler::services::ratings::RatingsClient;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> RatingsClient {
    let mut config = Config::default();
    config.ratings.endpoint = format!("{}/graphql", server.uri());
    RatingsClient::new(&config.ratings, &config.crawler).unwrap()
}

fn search_body(edges: serde_json::Value) -> serde_json::Value {
    serde_json::json!({"data": {"newSearch": {"teachers": {"edges": edges}}}})
}

fn ratings_body(avg_rating: f64, avg_difficulty: f64, num_ratings: u64) -> serde_json::Value {
    serde_json::json!({"data": {"node": {
        "__typename": "Teacher",
        "avgRating": avg_rating,
        "avgDifficulty": avg_difficulty,
        "numRatings": num_ratings
    }}})
}

async fn mount_search(server: &MockServer, edges: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("searchInstructor"))
        .and(header("authorization", "Basic dGVzdDp0ZXN0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body(edges)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn first_search_result_wins() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        serde_json::json!([
            {"node": {"id": "T1", "firstName": "Galen", "lastName": "Long", "department": "CS"}},
            {"node": {"id": "T2", "firstName": "Galen", "lastName": "Long", "department": "Math"}}
        ]),
    )
    .await;
    // Only the first match's id is answered; asking for T2 would 404.
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("instructorRatings"))
        .and(body_string_contains("T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ratings_body(4.2, 3.1, 25)))
        .mount(&server)
        .await;

    let rating = client_for(&server).rating("Galen Long").await.unwrap();
    let rating = rating.unwrap();
    assert_eq!(rating.avg_rating, 4.2);
    assert_eq!(rating.avg_difficulty, 3.1);
    assert_eq!(rating.num_ratings, 25);
}

#[tokio::test]
async fn no_search_match_is_none() {
    let server = MockServer::start().await;
    mount_search(&server, serde_json::json!([])).await;

    let rating = client_for(&server).rating("Nobody Here").await.unwrap();
    assert!(rating.is_none());
    // Only the search request went out.
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn zero_rating_count_is_none() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        serde_json::json!([{"node": {"id": "T1", "firstName": "New", "lastName": "Hire", "department": "CS"}}]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("instructorRatings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ratings_body(0.0, 0.0, 0)))
        .mount(&server)
        .await;

    let rating = client_for(&server).rating("New Hire").await.unwrap();
    assert!(rating.is_none());
}

#[tokio::test]
async fn null_node_is_none() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        serde_json::json!([{"node": {"id": "T1", "firstName": "Gone", "lastName": "Away", "department": ""}}]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("instructorRatings"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": {"node": null}})),
        )
        .mount(&server)
        .await;

    let rating = client_for(&server).rating("Gone Away").await.unwrap();
    assert!(rating.is_none());
}
