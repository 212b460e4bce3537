//! Spec document fetching.
//!
//! Pure I/O boundary: given a spec URL, return the parsed JSON document or
//! a typed fetch failure. No caching here; the store decides whether a
//! fetch happens at all. No automatic retries either; retry policy belongs
//! to the transport's caller if anyone ever needs one.

use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Capability interface for retrieving a specification document.
#[async_trait]
pub trait SpecFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Value>;
}

/// reqwest-backed fetcher used in production.
pub struct HttpSpecFetcher {
    client: reqwest::Client,
}

impl HttpSpecFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Fetch(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SpecFetcher for HttpSpecFetcher {
    async fn fetch(&self, url: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Fetch(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Fetch(format!(
                "{url} returned {status}: {body}"
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AppError::Fetch(format!("{url} returned malformed JSON: {e}")))
    }
}
