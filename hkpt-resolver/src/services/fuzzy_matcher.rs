//! Fuzzy matching against the known-name corpus
//!
//! Scores every known Chinese name against the query and accepts the best
//! one when it clears the threshold. Two scoring backends exist:
//!
//! - [`CharacterSimilarity`]: gestalt string similarity only
//! - [`HybridSimilarity`]: 0.4 × character + 0.6 × embedding cosine
//!
//! The backend is chosen once when the matcher is built.

use crate::services::embedding::{cosine_similarity, Embedder, EmbeddingCache};
use crate::services::suffix_translator::translate_suffix;
use crate::types::{layer, method, TranslationResult};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default acceptance threshold for the top score
pub const DEFAULT_THRESHOLD: f64 = 0.75;

const SOURCE: &str = "similar_property";
const MAX_ALTERNATIVES: usize = 2;

/// Phase / block / floor / number tokens removed before the "clean" comparison
static CLEAN_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"第[一二三四五六七八九十\d]+期",
        r"[一二三四五六七八九十\d]+期",
        r"[一二三四五六七八九十ABCD\d]+座",
        r"[ABCD\d]+棟",
        r"\d+樓",
        r"\d+層",
        r"\d+號",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid clean pattern"))
    .collect()
});

/// Ratcliff/Obershelp similarity `2·M / (|a| + |b|)` over chars
///
/// Two empty strings are identical (1.0).
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matches = matching_chars(&a, &b);
    2.0 * matches as f64 / total as f64
}

/// Sum of the sizes of recursively found longest common blocks
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_common_block(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        total += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    total
}

/// Longest common substring of `a[alo..ahi]` and `b[blo..bhi]`
///
/// Earliest block in `a` (then in `b`) wins ties.
fn longest_common_block(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    // run[j] = length of the common run ending at a[i-1], b[j-1]
    let mut previous = vec![0usize; bhi - blo + 1];

    for i in alo..ahi {
        let mut current = vec![0usize; bhi - blo + 1];
        for j in blo..bhi {
            if a[i] == b[j] {
                let run = previous[j - blo] + 1;
                current[j - blo + 1] = run;
                if run > best_size {
                    best_i = i + 1 - run;
                    best_j = j + 1 - run;
                    best_size = run;
                }
            }
        }
        previous = current;
    }

    (best_i, best_j, best_size)
}

/// Strip phase/block/floor/number tokens
pub fn clean_name(name: &str) -> String {
    let mut cleaned = name.to_string();
    for pattern in CLEAN_PATTERNS.iter() {
        cleaned = pattern.replace_all(&cleaned, "").into_owned();
    }
    cleaned.trim().to_string()
}

/// 0.6 × raw ratio + 0.4 × ratio of cleaned names
///
/// When either cleaned name is empty the raw ratio stands in for both terms.
pub fn char_similarity(a: &str, b: &str) -> f64 {
    let raw = sequence_ratio(a, b);
    let (clean_a, clean_b) = (clean_name(a), clean_name(b));
    let clean = if clean_a.is_empty() || clean_b.is_empty() {
        raw
    } else {
        sequence_ratio(&clean_a, &clean_b)
    };
    0.6 * raw + 0.4 * clean
}

/// Per-query state computed once before the corpus is ranked
pub struct PreparedQuery {
    pub text: String,
    /// Query embedding; `None` disables semantic scoring for this query
    embedding: Option<Arc<Vec<f32>>>,
    /// Set once a candidate embedding fails; later candidates skip the embedder
    semantic_down: AtomicBool,
}

impl PreparedQuery {
    /// Query scored on characters only
    pub fn text_only(text: &str) -> Self {
        Self {
            text: text.to_string(),
            embedding: None,
            semantic_down: AtomicBool::new(false),
        }
    }

    fn with_embedding(text: &str, embedding: Arc<Vec<f32>>) -> Self {
        Self {
            embedding: Some(embedding),
            ..Self::text_only(text)
        }
    }
}

/// Scoring strategy for a (query, known name) pair
#[async_trait]
pub trait SimilarityBackend: Send + Sync {
    /// Method tag reported on accepted matches
    fn method(&self) -> &'static str;

    /// Factor applied to the top score to produce the reported confidence
    fn damping(&self) -> f64;

    /// Called once per ranking, before any `score`
    async fn prepare(&self, query: &str) -> PreparedQuery {
        PreparedQuery::text_only(query)
    }

    async fn score(&self, query: &PreparedQuery, candidate: &str) -> f64;
}

/// Character-only scoring
pub struct CharacterSimilarity;

#[async_trait]
impl SimilarityBackend for CharacterSimilarity {
    fn method(&self) -> &'static str {
        method::FUZZY_MATCHING
    }

    fn damping(&self) -> f64 {
        0.89
    }

    async fn score(&self, query: &PreparedQuery, candidate: &str) -> f64 {
        char_similarity(&query.text, candidate)
    }
}

/// Character + semantic scoring
pub struct HybridSimilarity {
    cache: EmbeddingCache,
}

impl HybridSimilarity {
    const CHAR_WEIGHT: f64 = 0.4;
    const SEMANTIC_WEIGHT: f64 = 0.6;

    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            cache: EmbeddingCache::new(embedder),
        }
    }

    /// Cosine similarity against the prepared query embedding
    ///
    /// 0.0 when the query has no embedding or the candidate's fails. The
    /// first candidate failure turns semantic scoring off for the rest of
    /// the ranking.
    async fn semantic_similarity(&self, query: &PreparedQuery, candidate: &str) -> f64 {
        let Some(query_embedding) = &query.embedding else {
            return 0.0;
        };
        if query.semantic_down.load(Ordering::Relaxed) {
            return 0.0;
        }

        match self.cache.get(candidate).await {
            Ok(candidate_embedding) => cosine_similarity(query_embedding, &candidate_embedding),
            Err(e) => {
                tracing::warn!(
                    candidate = %candidate,
                    error = %e,
                    "Candidate embedding failed, scoring remaining candidates on characters only"
                );
                query.semantic_down.store(true, Ordering::Relaxed);
                0.0
            }
        }
    }
}

#[async_trait]
impl SimilarityBackend for HybridSimilarity {
    fn method(&self) -> &'static str {
        method::ENHANCED_FUZZY_MATCHING
    }

    fn damping(&self) -> f64 {
        0.92
    }

    async fn prepare(&self, query: &str) -> PreparedQuery {
        match self.cache.get(query).await {
            Ok(embedding) => PreparedQuery::with_embedding(query, embedding),
            Err(e) => {
                tracing::warn!(
                    query = %query,
                    error = %e,
                    "Query embedding failed, scoring on characters only"
                );
                PreparedQuery::text_only(query)
            }
        }
    }

    async fn score(&self, query: &PreparedQuery, candidate: &str) -> f64 {
        let char_sim = char_similarity(&query.text, candidate);
        let semantic_sim = self.semantic_similarity(query, candidate).await;
        Self::CHAR_WEIGHT * char_sim + Self::SEMANTIC_WEIGHT * semantic_sim
    }
}

/// Best corpus entry for a query
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch {
    pub matched_name: String,
    pub matched_translation: String,
    pub score: f64,
    /// Runner-up translations, best first (at most two)
    pub alternatives: Vec<String>,
}

/// Threshold-gated nearest-name search
pub struct FuzzyMatcher {
    backend: Box<dyn SimilarityBackend>,
    threshold: f64,
}

impl FuzzyMatcher {
    pub fn new(backend: Box<dyn SimilarityBackend>, threshold: f64) -> Self {
        Self { backend, threshold }
    }

    /// Character-only matcher
    pub fn character(threshold: f64) -> Self {
        Self::new(Box::new(CharacterSimilarity), threshold)
    }

    /// Character + semantic matcher
    pub fn hybrid(embedder: Arc<dyn Embedder>, threshold: f64) -> Self {
        Self::new(Box::new(HybridSimilarity::new(embedder)), threshold)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn method(&self) -> &'static str {
        self.backend.method()
    }

    /// Rank the corpus and return the top entry if it clears the threshold
    pub async fn find_match(
        &self,
        name: &str,
        corpus: &HashMap<String, String>,
    ) -> Option<FuzzyMatch> {
        if corpus.is_empty() {
            return None;
        }

        let query = self.backend.prepare(name).await;
        let mut scored = Vec::with_capacity(corpus.len());
        for (known_name, translation) in corpus {
            let score = self.backend.score(&query, known_name).await;
            scored.push((known_name, translation, score));
        }

        scored.sort_by(|a, b| b.2.total_cmp(&a.2).then_with(|| a.0.cmp(b.0)));

        let (matched_name, matched_translation, score) = *scored.first()?;
        if score < self.threshold {
            tracing::debug!(
                name = %name,
                best = %matched_name,
                score,
                threshold = self.threshold,
                "Best fuzzy candidate below threshold"
            );
            return None;
        }

        let alternatives = scored
            .iter()
            .skip(1)
            .take(MAX_ALTERNATIVES)
            .map(|(_, translation, _)| (*translation).clone())
            .collect();

        Some(FuzzyMatch {
            matched_name: matched_name.clone(),
            matched_translation: matched_translation.clone(),
            score,
            alternatives,
        })
    }

    /// Build the layer-2 result, translating any residual suffix
    pub fn to_result(&self, name: &str, found: &FuzzyMatch) -> TranslationResult {
        let english = adjust_translation(name, &found.matched_name, &found.matched_translation);

        let mut result = TranslationResult::new(
            name,
            english,
            found.score * self.backend.damping(),
            self.backend.method(),
            layer::FUZZY,
            SOURCE,
        )
        .with_reasoning(format!(
            "Adjusted from similar property '{}' (similarity {:.3})",
            found.matched_name, found.score
        ));

        if !found.alternatives.is_empty() {
            result.alternatives = Some(found.alternatives.clone());
        }

        result
    }
}

/// Append the translated residual when the query extends the matched name
fn adjust_translation(name: &str, matched_name: &str, matched_translation: &str) -> String {
    if name.chars().count() > matched_name.chars().count() {
        let residual = name.replacen(matched_name, "", 1);
        let residual = residual.trim();
        if !residual.is_empty() {
            if let Some(suffix) = translate_suffix(residual) {
                return format!("{} {}", matched_translation, suffix);
            }
        }
    }

    matched_translation.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::embedding::EmbeddingError;
    use std::sync::atomic::AtomicUsize;

    /// Embeds only texts in `working`; counts every call
    struct FlakyEmbedder {
        working: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl FlakyEmbedder {
        fn new(working: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                working,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.working.iter().any(|w| *w == text) {
                Ok(vec![1.0, 0.0])
            } else {
                Err(EmbeddingError::Network("connection refused".to_string()))
            }
        }
    }

    fn estates(count: usize) -> HashMap<String, String> {
        (0..count)
            .map(|i| (format!("屋苑{}", i), format!("Estate {}", i)))
            .collect()
    }

    #[test]
    fn test_sequence_ratio_basics() {
        assert_eq!(sequence_ratio("", ""), 1.0);
        assert_eq!(sequence_ratio("abc", "abc"), 1.0);
        assert_eq!(sequence_ratio("abc", "xyz"), 0.0);
        // difflib: SequenceMatcher(None, "abcd", "bcde").ratio() == 0.75
        assert!((sequence_ratio("abcd", "bcde") - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_sequence_ratio_recurses_both_sides() {
        // Blocks "ab" and "d": M = 3
        assert!((sequence_ratio("abxd", "abyd") - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_sequence_ratio_counts_chars_not_bytes() {
        // 太古城 vs 太古城二期: M = 3, lengths 3 + 5
        assert!((sequence_ratio("太古城", "太古城二期") - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("太古城第二期"), "太古城");
        assert_eq!(clean_name("太古城2期"), "太古城");
        assert_eq!(clean_name("海怡半島A座"), "海怡半島");
        assert_eq!(clean_name("某大廈12樓"), "某大廈");
        assert_eq!(clean_name("二期"), "");
    }

    #[test]
    fn test_char_similarity_weights_cleaned_names() {
        let raw = sequence_ratio("太古城", "太古城二期");
        let expected = 0.6 * raw + 0.4 * 1.0;
        assert!((char_similarity("太古城", "太古城二期") - expected).abs() < 1e-9);
    }

    #[test]
    fn test_char_similarity_empty_clean_uses_raw() {
        let raw = sequence_ratio("二期", "三期");
        assert!((char_similarity("二期", "三期") - raw).abs() < 1e-9);
    }

    #[test]
    fn test_adjust_translation() {
        assert_eq!(
            adjust_translation("太古城二期", "太古城", "Taikoo Shing"),
            "Taikoo Shing Phase 2"
        );
        assert_eq!(
            adjust_translation("太古城", "太古城", "Taikoo Shing"),
            "Taikoo Shing"
        );
        // Unrecognized residual leaves the translation untouched
        assert_eq!(
            adjust_translation("太古城園", "太古城", "Taikoo Shing"),
            "Taikoo Shing"
        );
    }

    #[tokio::test]
    async fn test_find_match_orders_by_score_then_key() {
        let matcher = FuzzyMatcher::character(0.0);
        let corpus: HashMap<String, String> = [
            ("乙園".to_string(), "B Garden".to_string()),
            ("甲園".to_string(), "A Garden".to_string()),
        ]
        .into_iter()
        .collect();

        let found = matcher.find_match("丙園", &corpus).await.unwrap();
        // Equal scores: the smaller key wins
        assert_eq!(found.matched_name, "乙園");
        assert_eq!(found.alternatives, vec!["A Garden".to_string()]);
    }

    #[tokio::test]
    async fn test_find_match_below_threshold() {
        let matcher = FuzzyMatcher::character(DEFAULT_THRESHOLD);
        let corpus: HashMap<String, String> =
            [("太古城".to_string(), "Taikoo Shing".to_string())].into_iter().collect();

        assert!(matcher.find_match("美孚新邨", &corpus).await.is_none());
        assert!(matcher.find_match("美孚新邨", &HashMap::new()).await.is_none());
    }

    #[tokio::test]
    async fn test_to_result_damps_confidence() {
        let matcher = FuzzyMatcher::character(DEFAULT_THRESHOLD);
        let corpus: HashMap<String, String> =
            [("太古城".to_string(), "Taikoo Shing".to_string())].into_iter().collect();

        let found = matcher.find_match("太古城二期", &corpus).await.unwrap();
        let result = matcher.to_result("太古城二期", &found);

        assert_eq!(result.english_name, "Taikoo Shing Phase 2");
        assert_eq!(result.method, method::FUZZY_MATCHING);
        assert_eq!(result.layer, layer::FUZZY);
        assert_eq!(result.source, "similar_property");
        assert!(result.confidence < found.score);
        assert!((result.confidence - found.score * 0.89).abs() < 1e-9);
        assert_eq!(result.alternatives, None);
    }

    #[tokio::test]
    async fn test_failed_query_embedding_is_attempted_once() {
        let embedder = FlakyEmbedder::new(vec![]);
        let matcher = FuzzyMatcher::hybrid(embedder.clone(), DEFAULT_THRESHOLD);
        let mut corpus = estates(49);
        corpus.insert("太古城".to_string(), "Taikoo Shing".to_string());

        let found = matcher.find_match("太古城二期", &corpus).await;

        assert_eq!(embedder.calls(), 1);
        // 0.4 × 0.85 with no semantic term stays under the threshold
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_candidate_embedding_failure_stops_semantic_scoring() {
        let embedder = FlakyEmbedder::new(vec!["太古城二期"]);
        let matcher = FuzzyMatcher::hybrid(embedder.clone(), 0.0);
        let corpus = estates(20);

        let found = matcher.find_match("太古城二期", &corpus).await;

        // One query embedding plus the first failing candidate
        assert_eq!(embedder.calls(), 2);
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_empty_corpus_skips_embedding() {
        let embedder = FlakyEmbedder::new(vec!["太古城二期"]);
        let matcher = FuzzyMatcher::hybrid(embedder.clone(), DEFAULT_THRESHOLD);

        assert!(matcher.find_match("太古城二期", &HashMap::new()).await.is_none());
        assert_eq!(embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_hybrid_uses_query_embedding() {
        let embedder = FlakyEmbedder::new(vec!["太古城二期", "太古城"]);
        let matcher = FuzzyMatcher::hybrid(embedder.clone(), DEFAULT_THRESHOLD);
        let corpus: HashMap<String, String> =
            [("太古城".to_string(), "Taikoo Shing".to_string())].into_iter().collect();

        let found = matcher.find_match("太古城二期", &corpus).await.unwrap();

        // 0.4 × 0.85 + 0.6 × 1.0
        assert!((found.score - 0.94).abs() < 1e-9);
        assert_eq!(matcher.method(), method::ENHANCED_FUZZY_MATCHING);
        assert_eq!(embedder.calls(), 2);
    }
}
