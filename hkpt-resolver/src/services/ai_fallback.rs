//! AI fallback layer
//!
//! Last layer of the waterfall. Builds a prompt, calls the oracle with a
//! bounded retry policy, normalizes whatever comes back and, when all of
//! that fails, returns the synthetic `"{name} Residence"` translation.
//! [`AiFallback::resolve_via_ai`] therefore always yields a result.
//!
//! Retry policy per attempt:
//! - `RateLimited`: sleep `base × 2^attempt`, then retry (no sleep after the last attempt)
//! - `Timeout` / `Connection`: retry immediately
//! - `Auth` / `BadRequest` / `Server`: abort

use crate::services::oracle::{
    OracleError, OracleReply, OracleRequest, SearchConfig, TranslationOracle,
};
use crate::services::prompts;
use crate::services::response_parser::parse_response;
use crate::types::{layer, method, Context, TranslationResult};
use chrono::{NaiveDate, Utc};
use hkpt_common::config::OracleConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

/// Confidence of the synthetic fallback
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

/// Confidence ceiling after the live-search boost
const LIVE_SEARCH_CAP: f64 = 0.95;
const LIVE_SEARCH_BOOST: f64 = 0.1;
const LIVE_SEARCH_METHOD_PREFIX: &str = "live_search";

/// Why the oracle produced nothing usable
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AiFailure {
    /// Retryable errors until the attempt budget ran out
    #[error("Oracle unavailable after {attempts} attempts: {last}")]
    Transient { attempts: u32, last: OracleError },

    /// Non-retryable error; aborted on first occurrence
    #[error("Oracle call aborted: {0}")]
    Fatal(OracleError),

    #[error("Oracle returned empty content")]
    EmptyReply,
}

/// Attempt budget and rate-limit backoff
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Sleep before retrying after a rate limit on `attempt` (0-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(attempt)
    }
}

/// Live-search source restrictions
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    pub allowed_websites: Vec<String>,
    pub from_date: NaiveDate,
}

impl SearchSettings {
    /// Window from the configured start date to today, with news and citations
    fn to_request_config(&self) -> SearchConfig {
        SearchConfig {
            allowed_websites: self.allowed_websites.clone(),
            include_news: true,
            from_date: self.from_date,
            to_date: Utc::now().date_naive(),
            return_citations: true,
        }
    }
}

/// Oracle-backed terminal layer
pub struct AiFallback {
    oracle: Arc<dyn TranslationOracle>,
    policy: RetryPolicy,
    search: SearchSettings,
}

impl AiFallback {
    pub fn new(oracle: Arc<dyn TranslationOracle>, policy: RetryPolicy, search: SearchSettings) -> Self {
        Self {
            oracle,
            policy,
            search,
        }
    }

    pub fn from_config(oracle: Arc<dyn TranslationOracle>, config: &OracleConfig) -> Self {
        Self::new(
            oracle,
            RetryPolicy {
                max_attempts: config.max_attempts,
                backoff_base: Duration::from_millis(config.backoff_base_ms),
            },
            SearchSettings {
                allowed_websites: config.allowed_websites.clone(),
                from_date: config.search_from_date,
            },
        )
    }

    /// Ask the oracle for a translation; never fails
    pub async fn resolve_via_ai(&self, name: &str, context: Option<&Context>) -> TranslationResult {
        let live = self.oracle.supports_live_search();
        info!(name = %name, oracle = self.oracle.name(), live_search = live, "AI translation");

        let request = if live {
            OracleRequest::new(
                prompts::PROPERTY_SYSTEM_PROMPT,
                prompts::live_search_prompt(name, context),
            )
            .with_search(self.search.to_request_config())
        } else {
            OracleRequest::new(
                prompts::PROPERTY_SYSTEM_PROMPT,
                prompts::knowledge_prompt(name, context),
            )
        };

        let reply = match self.invoke_with_retry(&request).await {
            Ok(reply) => reply,
            Err(failure) => {
                error!(name = %name, error = %failure, "Oracle failed, using synthetic fallback");
                return synthetic_fallback(name, &failure.to_string());
            }
        };

        let Some(parsed) = parse_response(&reply.content) else {
            warn!(name = %name, "No translation in oracle reply, using synthetic fallback");
            return synthetic_fallback(name, "oracle reply contained no usable translation");
        };
        let normalized = parsed.normalize();

        let mut confidence = normalized.confidence;
        let mut reasoning = normalized.reason;
        let source = if normalized.method.starts_with(LIVE_SEARCH_METHOD_PREFIX) {
            confidence = (confidence + LIVE_SEARCH_BOOST).min(LIVE_SEARCH_CAP);
            reasoning.push_str(" (verified with live search)");
            format!("{}_live_search", self.oracle.name())
        } else {
            self.oracle.name().to_string()
        };

        let mut result = TranslationResult::new(
            name,
            normalized.english,
            confidence,
            normalized.method,
            layer::AI,
            source,
        )
        .with_reasoning(reasoning);
        result.search_analysis = attach_citations(normalized.search_metadata, reply.citations);
        result
    }

    /// Call the oracle under the retry policy
    pub async fn invoke_with_retry(&self, request: &OracleRequest) -> Result<OracleReply, AiFailure> {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let err = match self.oracle.complete(request).await {
                Ok(reply) => return Ok(reply),
                Err(err) => err,
            };

            if !err.is_retryable() {
                error!(attempt = attempt + 1, error = %err, "Oracle call failed permanently");
                return Err(AiFailure::Fatal(err));
            }

            attempt += 1;
            if attempt >= attempts {
                warn!(attempts, error = %err, "Oracle retry budget exhausted");
                return Err(AiFailure::Transient {
                    attempts,
                    last: err,
                });
            }

            if err == OracleError::RateLimited {
                let wait = self.policy.backoff(attempt - 1);
                warn!(attempt, wait_ms = wait.as_millis() as u64, "Oracle rate limited, backing off");
                tokio::time::sleep(wait).await;
            } else {
                warn!(attempt, error = %err, "Oracle call failed, retrying");
            }
        }
    }

    /// Translate free text, preserving `@@TOKEN@@` placeholders
    pub async fn translate_text(&self, text: &str) -> Result<String, AiFailure> {
        let request = OracleRequest::new(
            prompts::TEXT_SYSTEM_PROMPT,
            prompts::text_translation_prompt(text),
        );

        let reply = self.invoke_with_retry(&request).await?;
        let translated = reply.content.trim();
        if translated.is_empty() {
            return Err(AiFailure::EmptyReply);
        }

        info!(
            input_chars = text.chars().count(),
            output_chars = translated.chars().count(),
            "Text translation complete"
        );
        Ok(translated.to_string())
    }
}

/// Deterministic last resort: `"{name} Residence"` at confidence 0.3
pub fn synthetic_fallback(name: &str, reason: &str) -> TranslationResult {
    TranslationResult::new(
        name,
        format!("{} Residence", name),
        FALLBACK_CONFIDENCE,
        method::FALLBACK,
        layer::AI,
        method::FALLBACK,
    )
    .with_reasoning(format!("Synthetic fallback: {}", reason))
}

/// Merge live-search citations into the search metadata
fn attach_citations(metadata: Option<Value>, citations: Vec<String>) -> Option<Value> {
    if citations.is_empty() {
        return metadata;
    }

    match metadata {
        Some(Value::Object(mut map)) => {
            map.insert("citations".to_string(), json!(citations));
            Some(Value::Object(map))
        }
        Some(other) => Some(json!({ "summary": other, "citations": citations })),
        None => Some(json!({ "citations": citations })),
    }
}
