//! Translation oracle abstraction
//!
//! The AI layer only sees [`TranslationOracle`]; the production client for
//! xAI Grok lives in [`crate::services::grok_client`].

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// Oracle invocation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OracleError {
    #[error("Oracle request timed out")]
    Timeout,

    #[error("Oracle rate limit exceeded")]
    RateLimited,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error {0}: {1}")]
    Server(u16, String),
}

impl OracleError {
    /// Transient failures that may succeed on another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OracleError::Timeout | OracleError::RateLimited | OracleError::Connection(_)
        )
    }
}

/// Live-search restrictions for one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchConfig {
    pub allowed_websites: Vec<String>,
    pub include_news: bool,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub return_citations: bool,
}

/// A single chat-style completion request
#[derive(Debug, Clone, PartialEq)]
pub struct OracleRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    /// `Some` requests live search; ignored by oracles without the capability
    pub search: Option<SearchConfig>,
}

impl OracleRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            temperature: 0.0,
            search: None,
        }
    }

    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = Some(search);
        self
    }
}

/// Raw oracle answer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OracleReply {
    pub content: String,
    /// Source URLs cited by live search
    pub citations: Vec<String>,
}

/// External generative service used when local strategies are inconclusive
#[async_trait]
pub trait TranslationOracle: Send + Sync {
    /// Short identifier used in result provenance (e.g. "grok")
    fn name(&self) -> &str;

    /// Whether the oracle can consult the web while answering
    fn supports_live_search(&self) -> bool;

    async fn complete(&self, request: &OracleRequest) -> Result<OracleReply, OracleError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(OracleError::Timeout.is_retryable());
        assert!(OracleError::RateLimited.is_retryable());
        assert!(OracleError::Connection("reset".into()).is_retryable());
        assert!(!OracleError::Auth("bad key".into()).is_retryable());
        assert!(!OracleError::BadRequest("schema".into()).is_retryable());
        assert!(!OracleError::Server(500, "boom".into()).is_retryable());
    }

    #[test]
    fn test_request_defaults_to_zero_temperature() {
        let request = OracleRequest::new("sys", "prompt");
        assert_eq!(request.temperature, 0.0);
        assert!(request.search.is_none());
    }
}
