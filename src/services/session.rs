// src/services/session.rs

//! Authenticated session acquisition.
//!
//! The login handshake itself is a black box behind [`LoginProvider`].
//! This module owns the retry policy around it and the success predicate:
//! a login only counts once the portal's session-identity cookie shows up
//! in the jar, regardless of what the handshake returned.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::cookie::{CookieStore, Jar};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{CrawlerConfig, LoginConfig};
use crate::utils::http;

/// An HTTP session against the registration portal.
#[derive(Debug)]
pub struct Session {
    client: Client,
    jar: Arc<Jar>,
    origin: Url,
}

impl Session {
    /// Build an unauthenticated session with a fresh cookie jar.
    pub fn new(config: &CrawlerConfig, base_url: &str) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let client = http::create_client(config, Arc::clone(&jar))?;
        Ok(Self {
            client,
            jar,
            origin: Url::parse(base_url)?,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The cookie jar; login providers that perform custom handshakes can
    /// deposit cookies here directly.
    pub fn jar(&self) -> &Jar {
        &self.jar
    }

    /// The portal origin cookies are matched against.
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Whether the jar holds a cookie with the given name for the portal
    /// origin.
    pub fn has_cookie(&self, name: &str) -> bool {
        let Some(header) = self.jar.cookies(&self.origin) else {
            return false;
        };
        let Ok(cookies) = header.to_str() else {
            return false;
        };
        cookies
            .split(';')
            .any(|pair| pair.trim_start().split('=').next() == Some(name))
    }
}

/// External login handshake.
///
/// Implementations perform whatever exchange the portal requires and leave
/// the resulting cookies in the session jar. Returning `Ok` does not by
/// itself mean the login worked; the broker checks the session marker.
#[async_trait]
pub trait LoginProvider: Send + Sync {
    async fn login(&self, session: &Session) -> Result<()>;
}

/// Form-POST login against the configured endpoint, with credentials read
/// from the environment.
pub struct FormLogin {
    config: LoginConfig,
}

impl FormLogin {
    pub fn new(config: LoginConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LoginProvider for FormLogin {
    async fn login(&self, session: &Session) -> Result<()> {
        let username = std::env::var(&self.config.username_env)
            .map_err(|_| AppError::config(format!("{} is not set", self.config.username_env)))?;
        let password = std::env::var(&self.config.password_env)
            .map_err(|_| AppError::config(format!("{} is not set", self.config.password_env)))?;

        session
            .client()
            .post(&self.config.url)
            .form(&[
                ("j_username", username.as_str()),
                ("j_password", password.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Retry policy for session acquisition.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Abort once the soft-failure count exceeds this bound.
    pub max_soft_failures: u32,

    /// Backoff before the multiplier is first applied.
    pub initial_backoff: Duration,

    /// Multiplier applied to the backoff before every attempt, including
    /// the first.
    pub multiplier: u32,
}

impl RetryPolicy {
    pub fn from_config(config: &LoginConfig) -> Self {
        Self {
            max_soft_failures: config.max_soft_failures,
            initial_backoff: Duration::from_secs(config.backoff_base_secs),
            multiplier: config.backoff_multiplier,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_soft_failures: 8,
            initial_backoff: Duration::from_secs(1),
            multiplier: 2,
        }
    }
}

/// Acquires an authenticated session by driving the login handshake with
/// bounded exponential backoff.
pub struct SessionBroker {
    provider: Box<dyn LoginProvider>,
    policy: RetryPolicy,
    marker: String,
}

impl SessionBroker {
    pub fn new(
        provider: Box<dyn LoginProvider>,
        policy: RetryPolicy,
        marker: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            policy,
            marker: marker.into(),
        }
    }

    /// Acquire a session whose jar carries the session-identity cookie.
    ///
    /// A provider error and a marker-less success are both soft failures:
    /// the broker sleeps the current backoff and tries again. More than
    /// `max_soft_failures` of them aborts with [`AppError::Auth`].
    pub async fn acquire(&self, config: &CrawlerConfig, base_url: &str) -> Result<Session> {
        let session = Session::new(config, base_url)?;
        let mut backoff = self.policy.initial_backoff;
        let mut failures: u32 = 0;

        loop {
            backoff *= self.policy.multiplier;

            match self.provider.login(&session).await {
                Ok(()) if session.has_cookie(&self.marker) => return Ok(session),
                Ok(()) => log::warn!(
                    "{} cookie not found in session; retrying in {}s",
                    self.marker,
                    backoff.as_secs()
                ),
                Err(e) => log::warn!(
                    "login attempt failed: {e}; retrying in {}s",
                    backoff.as_secs()
                ),
            }

            failures += 1;
            if failures > self.policy.max_soft_failures {
                return Err(AppError::Auth { attempts: failures });
            }
            tokio::time::sleep(backoff).await;
        }
    }
}
