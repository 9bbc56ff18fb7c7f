//! Remote scoring service client
//!
//! The scoring service receives the query and the full catalog and answers
//! with an ordered list of product ids. Its contract is owned elsewhere; any
//! deviation from the expected reply is reported as a [`ScoringError`] so the
//! resolver can fall back to local ranking.
use reqwest::{Client as HttpClient, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;

use crate::{
    error::AppResult,
    models::{Product, ScoringRequest, ScoringResponse},
};

/// Ways a scoring call can fail
#[derive(thiserror::Error, Debug)]
pub enum ScoringError {
    #[error("scoring request failed: {0}")]
    Transport(String),

    #[error("scoring service returned status {0}")]
    Status(StatusCode),

    #[error("scoring service did not answer within {0:?}")]
    Timeout(Duration),

    #[error("scoring service returned a body that is not JSON: {0}")]
    Decode(String),

    #[error("scoring service returned unexpected shape: {0}")]
    Malformed(String),
}

impl ScoringError {
    /// A reply arrived but did not carry a `recommended_ids` array
    pub fn is_malformed(&self) -> bool {
        matches!(self, ScoringError::Malformed(_))
    }
}

impl From<reqwest::Error> for ScoringError {
    fn from(err: reqwest::Error) -> Self {
        ScoringError::Transport(err.to_string())
    }
}

/// Source of remote recommendations
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ScoringProvider: Send + Sync {
    /// Asks the service to rank `products` for `query`
    async fn score(&self, query: &str, products: &[Product])
        -> Result<ScoringResponse, ScoringError>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Scoring service reached over HTTP with a bearer credential
#[derive(Clone)]
pub struct HttpScoringProvider {
    http_client: HttpClient,
    api_url: String,
    api_key: SecretString,
}

impl HttpScoringProvider {
    pub fn new(api_url: String, api_key: SecretString) -> AppResult<Self> {
        let http_client = HttpClient::builder().build()?;

        Ok(Self {
            http_client,
            api_url,
            api_key,
        })
    }
}

#[async_trait::async_trait]
impl ScoringProvider for HttpScoringProvider {
    async fn score(
        &self,
        query: &str,
        products: &[Product],
    ) -> Result<ScoringResponse, ScoringError> {
        let response = self
            .http_client
            .post(&self.api_url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&ScoringRequest::new(query, products))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = %status,
                body = %body,
                "Scoring service request failed"
            );
            return Err(ScoringError::Status(status));
        }

        let body = response.text().await?;
        let value: Value =
            serde_json::from_str(&body).map_err(|e| ScoringError::Decode(e.to_string()))?;

        let reply = ScoringResponse::from_json(&value).ok_or_else(|| {
            tracing::debug!(response = %body, "Scoring reply without recommended_ids");
            ScoringError::Malformed("missing recommended_ids array".to_string())
        })?;

        tracing::info!(
            recommended = reply.recommended_ids.len(),
            provider = self.name(),
            "Scoring completed"
        );

        Ok(reply)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
