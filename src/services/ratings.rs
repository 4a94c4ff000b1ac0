// src/services/ratings.rs

//! Instructor rating lookups.
//!
//! Speaks the rating service's GraphQL protocol: a name search scoped to
//! the configured school, then a statistics fetch for the first match.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::Result;
use crate::models::{CrawlerConfig, Rating, RatingsConfig};
use crate::utils::http;

const SEARCH_QUERY: &str = "\
query searchInstructor($query: TeacherSearchQuery!) {
    newSearch {
        teachers(query: $query) {
            edges {
                node {
                    id
                    firstName
                    lastName
                    department
                }
            }
        }
    }
}";

const RATINGS_QUERY: &str = "\
query instructorRatings($id: ID!) {
    node(id: $id) {
        __typename
        ... on Teacher {
            avgRating
            avgDifficulty
            numRatings
        }
    }
}";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Option<SearchData>,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    #[serde(rename = "newSearch")]
    new_search: NewSearch,
}

#[derive(Debug, Deserialize)]
struct NewSearch {
    teachers: TeacherConnection,
}

#[derive(Debug, Deserialize)]
struct TeacherConnection {
    edges: Vec<TeacherEdge>,
}

#[derive(Debug, Deserialize)]
struct TeacherEdge {
    node: TeacherNode,
}

#[derive(Debug, Deserialize)]
struct TeacherNode {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RatingsResponse {
    data: Option<RatingsData>,
}

#[derive(Debug, Deserialize)]
struct RatingsData {
    node: Option<RatingsNode>,
}

#[derive(Debug, Deserialize)]
struct RatingsNode {
    #[serde(rename = "avgRating")]
    avg_rating: f64,
    #[serde(rename = "avgDifficulty")]
    avg_difficulty: f64,
    #[serde(rename = "numRatings")]
    num_ratings: u64,
}

/// Client for the instructor rating service.
///
/// The service is public; lookups go through a plain client rather than
/// the authenticated portal session.
pub struct RatingsClient {
    client: Client,
    endpoint: String,
    school_id: String,
    authorization: String,
}

impl RatingsClient {
    pub fn new(config: &RatingsConfig, crawler: &CrawlerConfig) -> Result<Self> {
        Ok(Self {
            client: http::create_plain_client(crawler)?,
            endpoint: config.endpoint.clone(),
            school_id: config.school_id.clone(),
            authorization: config.authorization.clone(),
        })
    }

    /// Look up aggregate rating statistics for an instructor display name.
    ///
    /// The first search result is taken unconditionally. No match, a null
    /// node, and a zero rating count all yield `Ok(None)` rather than an
    /// error.
    pub async fn rating(&self, name: &str) -> Result<Option<Rating>> {
        let Some(teacher_id) = self.search_instructor(name).await? else {
            return Ok(None);
        };
        let Some(node) = self.fetch_ratings(&teacher_id).await? else {
            return Ok(None);
        };
        if node.num_ratings == 0 {
            return Ok(None);
        }
        Ok(Some(Rating {
            avg_rating: node.avg_rating,
            avg_difficulty: node.avg_difficulty,
            num_ratings: node.num_ratings,
        }))
    }

    /// Search by display name; returns the first match's id, if any.
    async fn search_instructor(&self, name: &str) -> Result<Option<String>> {
        let body = json!({
            "query": SEARCH_QUERY,
            "variables": {
                "query": { "text": name, "schoolID": self.school_id }
            }
        });
        let response: SearchResponse = self.post(&body).await?;
        Ok(response
            .data
            .and_then(|d| d.new_search.teachers.edges.into_iter().next())
            .map(|edge| edge.node.id))
    }

    async fn fetch_ratings(&self, id: &str) -> Result<Option<RatingsNode>> {
        let body = json!({
            "query": RATINGS_QUERY,
            "variables": { "id": id }
        });
        let response: RatingsResponse = self.post(&body).await?;
        Ok(response.data.and_then(|d| d.node))
    }

    async fn post<T: serde::de::DeserializeOwned>(&self, body: &serde_json::Value) -> Result<T> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}
