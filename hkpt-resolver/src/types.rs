//! Core types and trait definitions for hkpt-resolver
//!
//! - [`TranslationResult`]: the single structured answer every resolution returns
//! - [`LookupRecord`]: one row of a lookup table with its provenance
//! - [`LookupStore`]: the persistence seam the waterfall reads and writes

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Free-form caller context (developer, location, ...)
pub type Context = serde_json::Map<String, serde_json::Value>;

/// Store failures are reported with the shared error type
pub type StoreResult<T> = hkpt_common::Result<T>;

/// Layer indices, in precedence order
pub mod layer {
    /// Input validation and fixed geo / slang dictionary
    pub const FIXED: u8 = 0;
    /// Official and verified corpus
    pub const CORPUS: u8 = 1;
    /// Fuzzy similarity against the known corpus
    pub const FUZZY: u8 = 2;
    /// AI oracle (always terminal)
    pub const AI: u8 = 3;
}

/// Method tags attached to results
pub mod method {
    pub const ALREADY_TRANSLATED: &str = "already_translated";
    pub const GEO_LOOKUP: &str = "geo_lookup";
    pub const SLANG_LOOKUP: &str = "slang_lookup";
    pub const OFFICIAL_LOOKUP: &str = "official_lookup";
    pub const VERIFIED_LOOKUP: &str = "verified_lookup";
    pub const FUZZY_MATCHING: &str = "fuzzy_matching";
    pub const ENHANCED_FUZZY_MATCHING: &str = "enhanced_fuzzy_matching";
    pub const TEXT_EXTRACTION: &str = "text_extraction";
    pub const FALLBACK: &str = "fallback";
}

/// Result of resolving one property name
///
/// Serialized flat as the HTTP response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub chinese_name: String,
    /// Never empty
    pub english_name: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f64,
    pub method: String,
    /// Which layer produced the answer (0-3)
    pub layer: u8,
    pub source: String,
    pub reasoning: String,
    /// Runner-up translations, best first
    pub alternatives: Option<Vec<String>>,
    /// Oracle search metadata, passed through opaquely
    pub search_analysis: Option<serde_json::Value>,
}

impl TranslationResult {
    /// Create a result with clamped confidence and no optional fields
    pub fn new(
        chinese_name: impl Into<String>,
        english_name: impl Into<String>,
        confidence: f64,
        method: impl Into<String>,
        layer: u8,
        source: impl Into<String>,
    ) -> Self {
        Self {
            chinese_name: chinese_name.into(),
            english_name: english_name.into(),
            confidence: confidence.clamp(0.0, 1.0),
            method: method.into(),
            layer,
            source: source.into(),
            reasoning: String::new(),
            alternatives: None,
            search_analysis: None,
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }
}

/// Where a lookup record came from
#[derive(Debug, Clone, PartialEq)]
pub enum Provenance {
    /// Fixed place-name dictionary
    Geo { category: String },
    /// Curated colloquial names
    Slang,
    /// Static trusted corpus, labelled with its source
    Official { source: String, usage_count: i64 },
    /// Learned corpus, mutated on every hit
    Verified {
        usage_count: i64,
        last_used: Option<DateTime<Utc>>,
    },
}

/// One lookup-table row
#[derive(Debug, Clone, PartialEq)]
pub struct LookupRecord {
    pub chinese_name: String,
    pub english_name: String,
    pub confidence: f64,
    pub provenance: Provenance,
}

/// Corpus tier whose usage counter is incremented on a layer-1 hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusTier {
    Official,
    Verified,
}

/// Aggregates over the translation history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationStats {
    pub layer_distribution: BTreeMap<u8, i64>,
    pub method_distribution: BTreeMap<String, i64>,
    /// Rounded to 3 decimal places; 0 when the history is empty
    pub average_confidence: f64,
    pub total_translations: i64,
}

/// Persistence seam for lookup tables and history
///
/// Implementations must make `increment_usage` and `record_history` safe under
/// concurrent callers (no lost updates).
#[async_trait]
pub trait LookupStore: Send + Sync {
    /// Exact match in the geo dictionary
    async fn get_geo(&self, chinese_name: &str) -> StoreResult<Option<LookupRecord>>;

    /// Exact match in the slang dictionary with confidence >= `min_confidence`
    async fn get_slang(
        &self,
        chinese_name: &str,
        min_confidence: f64,
    ) -> StoreResult<Option<LookupRecord>>;

    /// Exact match in the official corpus
    async fn get_official(&self, chinese_name: &str) -> StoreResult<Option<LookupRecord>>;

    /// Exact match in the verified corpus
    async fn get_verified(&self, chinese_name: &str) -> StoreResult<Option<LookupRecord>>;

    /// Official + verified mappings; verified wins on duplicate keys
    async fn list_all_known(&self) -> StoreResult<HashMap<String, String>>;

    /// Append a resolution to the history
    async fn record_history(&self, result: &TranslationResult) -> StoreResult<()>;

    /// Bump the usage counter (and last-used time) of a corpus record
    async fn increment_usage(&self, chinese_name: &str, tier: CorpusTier) -> StoreResult<()>;

    /// History aggregates
    async fn stats(&self) -> StoreResult<TranslationStats>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_clamped() {
        let result = TranslationResult::new("a", "b", 1.7, "m", layer::AI, "s");
        assert_eq!(result.confidence, 1.0);
        let result = TranslationResult::new("a", "b", -0.2, "m", layer::AI, "s");
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_serializes_flat_with_null_optionals() {
        let result = TranslationResult::new("中環", "Central", 0.99, method::GEO_LOOKUP, layer::FIXED, "geo_locations");
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["english_name"], "Central");
        assert_eq!(json["layer"], 0);
        assert!(json["alternatives"].is_null());
        assert!(json["search_analysis"].is_null());
        assert_eq!(json["reasoning"], "");
    }
}
