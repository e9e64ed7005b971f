//! # exofold environment state
//!
//! This module defines [`ExofoldEnv`], the **shared network environment** of a run. It owns
//! the persistent [`reqwest::Client`] used by the remote collaborators (catalog lookups), so
//! that every worker reuses the same connection pool instead of opening its own sessions.
//!
//! ## Structure
//!
//! ```text
//! ExofoldEnv
//! └── http_client  (reqwest::Client, global timeout)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use exofold::env_state::ExofoldEnv;
//! use exofold::catalog::exoplanet_archive::ExoplanetArchive;
//!
//! let env = ExofoldEnv::new().unwrap();
//! let catalog = ExoplanetArchive::new(env);
//! ```
//!
//! ## Notes
//!
//! - The client is cheaply cloneable (internally reference counted).
//! - Requests fail with [`ExofoldError::ReqwestError`] on transport errors, timeouts and
//!   non-success HTTP statuses; callers treat these as transient source errors.
use std::time::Duration;

use reqwest::Client;

use crate::exofold_errors::ExofoldError;

/// Default timeout of a single HTTP request
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ExofoldEnv {
    pub http_client: Client,
}

impl ExofoldEnv {
    /// Create a new environment with the default request timeout.
    pub fn new() -> Result<Self, ExofoldError> {
        Self::with_timeout(HTTP_TIMEOUT)
    }

    /// Create a new environment with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ExofoldError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("exofold/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(ExofoldEnv { http_client })
    }

    /// GET a URL with query parameters and decode the JSON body.
    pub(crate) async fn get_json(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, ExofoldError> {
        let value = self
            .http_client
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;
        Ok(value)
    }
}
