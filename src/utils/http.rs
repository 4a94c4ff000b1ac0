// src/utils/http.rs

//! HTTP client utilities.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reqwest::cookie::Jar;

use crate::error::Result;
use crate::models::CrawlerConfig;

/// Create a configured HTTP client backed by the given cookie jar.
pub fn create_client(config: &CrawlerConfig, jar: Arc<Jar>) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .cookie_provider(jar)
        .build()?;
    Ok(client)
}

/// Create a configured HTTP client without a cookie jar.
pub fn create_plain_client(config: &CrawlerConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Fetch a page and return its body, treating HTTP error statuses as errors.
pub async fn fetch_text(client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.text().await?)
}
