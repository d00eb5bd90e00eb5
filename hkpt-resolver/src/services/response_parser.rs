//! Oracle response normalization
//!
//! Oracle replies come in three shapes. They are tried in a fixed order:
//!
//! 1. [`OracleResponse::StructuredNew`]: `search_summary` + `translation`
//! 2. [`OracleResponse::StructuredOld`]: `search_analysis` + `translation_result`
//! 3. [`OracleResponse::FreeText`]: labelled or quoted English name in prose
//!
//! A structured shape is accepted only when every required key is present
//! and the English name is non-blank. When nothing matches the caller
//! falls back to the synthetic translation.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};

/// Method tag for free-text extraction
pub const TEXT_EXTRACTION: &str = crate::types::method::TEXT_EXTRACTION;

/// Confidence used when the oracle's value is missing or non-numeric
pub const DEFAULT_CONFIDENCE: f64 = 0.6;

const AUTHORITY_KEYWORDS: &[&str] = &["官方", "official", "確認", "confirmed"];
const HEDGING_KEYWORDS: &[&str] = &["可能", "possibly", "推測", "likely"];

static LABELLED_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"英文名稱[：:]\s*["']?([A-Za-z\s]+)["']?"#,
        r#"English name[：:]\s*["']?([A-Za-z\s]+)["']?"#,
        r#"翻譯[：:]\s*["']?([A-Za-z\s]+)["']?"#,
        r#"Translation[：:]\s*["']?([A-Za-z\s]+)["']?"#,
        r#"["']([A-Z][A-Za-z\s]{2,30})["']"#,
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid extraction pattern"))
    .collect()
});

#[derive(Debug, Deserialize)]
struct NewSchema {
    search_summary: NewSummary,
    translation: NewTranslation,
}

#[derive(Debug, Deserialize)]
struct NewSummary {
    #[allow(dead_code)]
    official_found: Value,
    confidence: Value,
}

#[derive(Debug, Deserialize)]
struct NewTranslation {
    english: String,
    method: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct OldAnalysis {
    official_name_found: Value,
    source_reliability: Value,
    consistency_check: Value,
}

#[derive(Debug, Deserialize)]
struct OldTranslation {
    english_name: String,
    confidence: Value,
    method: String,
    reasoning: String,
}

#[derive(Debug, Deserialize)]
struct OldSchema {
    #[allow(dead_code)]
    search_analysis: OldAnalysis,
    translation_result: OldTranslation,
}

/// A recognized oracle reply
#[derive(Debug, Clone, PartialEq)]
pub enum OracleResponse {
    StructuredNew {
        english: String,
        confidence: f64,
        method: String,
        reason: String,
        search_summary: Value,
    },
    StructuredOld {
        english: String,
        confidence: f64,
        method: String,
        reasoning: String,
        search_analysis: Value,
    },
    FreeText {
        english: String,
        confidence: f64,
    },
}

/// Canonical fields every response shape maps onto
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedReply {
    pub english: String,
    pub confidence: f64,
    pub method: String,
    pub reason: String,
    pub search_metadata: Option<Value>,
}

impl OracleResponse {
    pub fn normalize(self) -> NormalizedReply {
        match self {
            OracleResponse::StructuredNew {
                english,
                confidence,
                method,
                reason,
                search_summary,
            } => NormalizedReply {
                english,
                confidence,
                method,
                reason,
                search_metadata: Some(search_summary),
            },
            OracleResponse::StructuredOld {
                english,
                confidence,
                method,
                reasoning,
                search_analysis,
            } => NormalizedReply {
                english,
                confidence,
                method,
                reason: reasoning,
                search_metadata: Some(search_analysis),
            },
            OracleResponse::FreeText {
                english,
                confidence,
            } => NormalizedReply {
                reason: format!("Extracted from oracle free text: {}", english),
                search_metadata: Some(json!({
                    "official_name_found": confidence > 0.8,
                    "source_reliability": "medium",
                    "consistency_check": "mixed",
                })),
                english,
                confidence,
                method: TEXT_EXTRACTION.to_string(),
            },
        }
    }
}

/// Run the parser chain over raw oracle content
pub fn parse_response(content: &str) -> Option<OracleResponse> {
    let body = strip_code_fence(content);

    match serde_json::from_str::<Value>(body) {
        Ok(value) => {
            if let Some(parsed) = parse_structured_new(&value) {
                return Some(parsed);
            }
            if let Some(parsed) = parse_structured_old(&value) {
                return Some(parsed);
            }
            tracing::warn!("Oracle JSON matches neither schema, trying free-text extraction");
        }
        Err(_) => {
            tracing::debug!("Oracle reply is not JSON, trying free-text extraction");
        }
    }

    extract_free_text(body)
}

/// Remove an enclosing Markdown code fence (```json ... ```)
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening line
    match inner.find('\n') {
        Some(newline) => inner[newline + 1..].trim(),
        None => inner.trim(),
    }
}

fn parse_structured_new(value: &Value) -> Option<OracleResponse> {
    let schema: NewSchema = serde_json::from_value(value.clone()).ok()?;
    let english = schema.translation.english.trim();
    if english.is_empty() {
        return None;
    }

    Some(OracleResponse::StructuredNew {
        english: english.to_string(),
        confidence: confidence_value(&schema.search_summary.confidence),
        method: schema.translation.method,
        reason: schema.translation.reason.unwrap_or_default(),
        search_summary: value.get("search_summary").cloned().unwrap_or(Value::Null),
    })
}

fn parse_structured_old(value: &Value) -> Option<OracleResponse> {
    let schema: OldSchema = serde_json::from_value(value.clone()).ok()?;
    let english = schema.translation_result.english_name.trim();
    if english.is_empty() {
        return None;
    }

    Some(OracleResponse::StructuredOld {
        english: english.to_string(),
        confidence: confidence_value(&schema.translation_result.confidence),
        method: schema.translation_result.method,
        reasoning: schema.translation_result.reasoning,
        search_analysis: value.get("search_analysis").cloned().unwrap_or(Value::Null),
    })
}

/// Numeric (or numeric-string) confidence clamped to [0, 1]
fn confidence_value(value: &Value) -> f64 {
    let raw = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    raw.filter(|c| c.is_finite())
        .unwrap_or(DEFAULT_CONFIDENCE)
        .clamp(0.0, 1.0)
}

/// Pull an English name out of prose
fn extract_free_text(content: &str) -> Option<OracleResponse> {
    let english = LABELLED_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(content)
            .map(|caps| caps[1].trim().to_string())
            .filter(|name| !name.is_empty())
    })?;

    Some(OracleResponse::FreeText {
        english,
        confidence: keyword_confidence(content),
    })
}

fn keyword_confidence(content: &str) -> f64 {
    let lowered = content.to_lowercase();
    if AUTHORITY_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        0.9
    } else if HEDGING_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        0.6
    } else {
        0.75
    }
}
