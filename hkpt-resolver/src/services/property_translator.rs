//! Waterfall resolution of property names
//!
//! Stages run strictly in order and the first hit wins:
//!
//! | Stage | Strategy | Confidence |
//! |-------|----------|------------|
//! | pre-check | input already English | 0.98 |
//! | 0 | geo dictionary, then slang terms (≥ 0.8) | 0.99 / stored |
//! | 1 | official corpus, then verified corpus | stored |
//! | 2 | fuzzy match against the known corpus (optional) | score × damping |
//! | 3 | AI oracle, synthetic fallback on failure | oracle / 0.3 |
//!
//! Store failures inside a stage are logged and treated as a miss. Every
//! result, whichever stage produced it, is written to the history.

use crate::services::ai_fallback::{AiFailure, AiFallback};
use crate::services::fuzzy_matcher::FuzzyMatcher;
use crate::types::{
    layer, method, Context, CorpusTier, LookupRecord, LookupStore, Provenance, StoreResult,
    TranslationResult, TranslationStats,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

const ALREADY_TRANSLATED_CONFIDENCE: f64 = 0.98;
const ASCII_LETTER_RATIO: f64 = 0.99;
const SLANG_MIN_CONFIDENCE: f64 = 0.8;
const PROMOTION_MIN_CONFIDENCE: f64 = 0.8;
const STATION_MARKER: char = '站';

static ASCII_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9\s]+$").expect("valid ascii pattern"));

/// Resolution service
///
/// Holds its collaborators explicitly; build one at startup and share it
/// behind an `Arc`.
pub struct PropertyTranslator {
    store: Arc<dyn LookupStore>,
    matcher: Option<FuzzyMatcher>,
    ai: AiFallback,
}

impl PropertyTranslator {
    /// Translator without the fuzzy stage
    pub fn new(store: Arc<dyn LookupStore>, ai: AiFallback) -> Self {
        Self {
            store,
            matcher: None,
            ai,
        }
    }

    /// Enable the fuzzy stage
    pub fn with_fuzzy_matcher(mut self, matcher: FuzzyMatcher) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub fn fuzzy_enabled(&self) -> bool {
        self.matcher.is_some()
    }

    /// Resolve one name; always returns a result
    pub async fn resolve(&self, name: &str, context: Option<&Context>) -> TranslationResult {
        let name = name.trim();

        let result = match self.precheck(name) {
            Some(result) => result,
            None => match self.fixed_lookup(name).await {
                Some(result) => result,
                None => match self.corpus_lookup(name).await {
                    Some(result) => result,
                    None => match self.fuzzy_lookup(name).await {
                        Some(result) => result,
                        None => self.ai.resolve_via_ai(name, context).await,
                    },
                },
            },
        };

        info!(
            name = %name,
            english = %result.english_name,
            layer = result.layer,
            method = %result.method,
            confidence = result.confidence,
            "Resolved property name"
        );

        self.persist(&result).await;
        result
    }

    /// Placeholder-preserving free-text translation
    pub async fn translate_text(&self, text: &str) -> Result<String, AiFailure> {
        self.ai.translate_text(text).await
    }

    /// History aggregates
    pub async fn stats(&self) -> StoreResult<TranslationStats> {
        self.store.stats().await
    }

    fn precheck(&self, name: &str) -> Option<TranslationResult> {
        if !is_already_translated(name) {
            return None;
        }

        Some(
            TranslationResult::new(
                name,
                name,
                ALREADY_TRANSLATED_CONFIDENCE,
                method::ALREADY_TRANSLATED,
                layer::FIXED,
                "input_validation",
            )
            .with_reasoning("Input is already in English"),
        )
    }

    /// Stage 0: geo dictionary (with station suffix) then slang terms
    async fn fixed_lookup(&self, name: &str) -> Option<TranslationResult> {
        if let Some(record) = swallow("geo lookup", self.store.get_geo(name).await) {
            return Some(geo_result(name, record, false));
        }

        if let Some(base) = name.strip_suffix(STATION_MARKER).filter(|b| !b.is_empty()) {
            if let Some(record) = swallow("geo lookup", self.store.get_geo(base).await) {
                return Some(geo_result(name, record, true));
            }
        }

        let slang = swallow(
            "slang lookup",
            self.store.get_slang(name, SLANG_MIN_CONFIDENCE).await,
        )?;
        Some(
            TranslationResult::new(
                name,
                slang.english_name,
                slang.confidence,
                method::SLANG_LOOKUP,
                layer::FIXED,
                "slang_terms",
            )
            .with_reasoning("Matched curated slang term"),
        )
    }

    /// Stage 1: official then verified corpus; bumps the usage counter on hit
    async fn corpus_lookup(&self, name: &str) -> Option<TranslationResult> {
        let (record, tier) =
            match swallow("official lookup", self.store.get_official(name).await) {
                Some(record) => (record, CorpusTier::Official),
                None => (
                    swallow("verified lookup", self.store.get_verified(name).await)?,
                    CorpusTier::Verified,
                ),
            };

        if let Err(e) = self.store.increment_usage(name, tier).await {
            warn!(name = %name, error = %e, "Failed to increment usage count");
        }

        let (tag, source, reasoning) = match &record.provenance {
            Provenance::Official { source, .. } => (
                method::OFFICIAL_LOOKUP,
                source.clone(),
                "Matched official translation".to_string(),
            ),
            Provenance::Verified { usage_count, .. } => (
                method::VERIFIED_LOOKUP,
                "verified_database".to_string(),
                format!("Matched verified translation (used {} times before)", usage_count),
            ),
            other => {
                debug!(?other, "Unexpected provenance in corpus lookup");
                (method::VERIFIED_LOOKUP, "verified_database".to_string(), String::new())
            }
        };

        Some(
            TranslationResult::new(
                name,
                record.english_name,
                record.confidence,
                tag,
                layer::CORPUS,
                source,
            )
            .with_reasoning(reasoning),
        )
    }

    /// Stage 2: fuzzy match against official + verified names
    async fn fuzzy_lookup(&self, name: &str) -> Option<TranslationResult> {
        let matcher = self.matcher.as_ref()?;
        let corpus = swallow("corpus listing", self.store.list_all_known().await.map(Some))?;

        match matcher.find_match(name, &corpus).await {
            Some(found) => {
                debug!(
                    name = %name,
                    matched = %found.matched_name,
                    score = found.score,
                    "Fuzzy match accepted"
                );
                Some(matcher.to_result(name, &found))
            }
            None => {
                debug!(name = %name, corpus_size = corpus.len(), "No fuzzy match");
                None
            }
        }
    }

    async fn persist(&self, result: &TranslationResult) {
        if let Err(e) = self.store.record_history(result).await {
            warn!(name = %result.chinese_name, error = %e, "Failed to record translation history");
        }

        if result.layer == layer::AI && result.confidence >= PROMOTION_MIN_CONFIDENCE {
            info!(
                name = %result.chinese_name,
                english = %result.english_name,
                confidence = result.confidence,
                "High-confidence AI translation is a candidate for the verified corpus"
            );
        }
    }
}

/// True when the input needs no translation
///
/// Either at least 99% of its word characters are ASCII letters, or the
/// trimmed input consists only of ASCII letters, digits and whitespace.
pub fn is_already_translated(text: &str) -> bool {
    let word_chars: Vec<char> = text
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();

    if !word_chars.is_empty() {
        let ascii_letters = word_chars.iter().filter(|c| c.is_ascii_alphabetic()).count();
        if ascii_letters as f64 / word_chars.len() as f64 >= ASCII_LETTER_RATIO {
            return true;
        }
    }

    ASCII_NAME.is_match(text.trim())
}

fn geo_result(name: &str, record: LookupRecord, station: bool) -> TranslationResult {
    let category = match &record.provenance {
        Provenance::Geo { category } => category.as_str(),
        _ => "geo",
    };
    let english = if station {
        format!("{} Station", record.english_name)
    } else {
        record.english_name
    };

    TranslationResult::new(
        name,
        english,
        record.confidence,
        method::GEO_LOOKUP,
        layer::FIXED,
        "geo_locations",
    )
    .with_reasoning(format!("Matched {} in geo dictionary", category))
}

/// Log a store error and treat it as a miss
fn swallow<T>(stage: &str, outcome: StoreResult<Option<T>>) -> Option<T> {
    match outcome {
        Ok(found) => found,
        Err(e) => {
            warn!(stage, error = %e, "Store error, treating as no match");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_translated() {
        assert!(is_already_translated("ABC Garden"));
        assert!(is_already_translated("The Arch, Tower"));
        assert!(!is_already_translated("The Arch, Tower 1"));
        assert!(is_already_translated("Harbour-Green"));
        assert!(is_already_translated("123"));
        assert!(!is_already_translated("慧安園"));
        assert!(!is_already_translated("太古城 Phase 2"));
        assert!(!is_already_translated("!!!"));
        assert!(!is_already_translated(""));
    }
}
