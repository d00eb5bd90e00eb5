//! Test Helper Utilities
//!
//! Shared fixtures for hkpt-resolver integration tests: an in-memory store,
//! a scripted oracle and a table-driven embedder.

#![allow(dead_code)]

use async_trait::async_trait;
use hkpt_resolver::db::SqliteLookupStore;
use hkpt_resolver::services::{
    AiFallback, Embedder, EmbeddingError, OracleError, OracleReply, OracleRequest,
    PropertyTranslator, RetryPolicy, SearchSettings, TranslationOracle,
};
use hkpt_resolver::types::{
    CorpusTier, LookupRecord, LookupStore, StoreResult, TranslationResult, TranslationStats,
};
use chrono::NaiveDate;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Single-connection in-memory database with schema and geo seed
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    hkpt_common::db::init::create_schema(&pool).await.unwrap();
    hkpt_common::db::seed_geo_locations(&pool).await.unwrap();
    pool
}

pub async fn memory_store() -> Arc<SqliteLookupStore> {
    Arc::new(SqliteLookupStore::new(memory_pool().await))
}

pub async fn history_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM translation_history")
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn usage_count(pool: &SqlitePool, table: &str, chinese_name: &str) -> i64 {
    let sql = format!("SELECT usage_count FROM {} WHERE chinese_name = ?", table);
    sqlx::query_scalar(&sql)
        .bind(chinese_name)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Oracle that replays a script of outcomes, then reports a connection error
pub struct MockOracle {
    script: Mutex<VecDeque<Result<OracleReply, OracleError>>>,
    requests: Mutex<Vec<OracleRequest>>,
    calls: AtomicUsize,
    live_search: bool,
}

impl MockOracle {
    pub fn new(script: Vec<Result<OracleReply, OracleError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            live_search: false,
        }
    }

    /// Oracle whose every call fails to connect
    pub fn unreachable() -> Self {
        Self::new(Vec::new())
    }

    /// Oracle that always answers with `content`
    pub fn replying(content: &str) -> Self {
        Self::new(vec![Ok(reply(content))])
    }

    pub fn with_live_search(mut self) -> Self {
        self.live_search = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<OracleRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TranslationOracle for MockOracle {
    fn name(&self) -> &str {
        "mock"
    }

    fn supports_live_search(&self) -> bool {
        self.live_search
    }

    async fn complete(&self, request: &OracleRequest) -> Result<OracleReply, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(OracleError::Connection("unreachable".to_string())))
    }
}

pub fn reply(content: &str) -> OracleReply {
    OracleReply {
        content: content.to_string(),
        citations: Vec::new(),
    }
}

/// New-schema JSON reply
pub fn structured_reply(english: &str, confidence: f64, method: &str) -> String {
    serde_json::json!({
        "search_summary": {
            "official_found": true,
            "sources_considered": ["knowledge_base"],
            "confidence": confidence
        },
        "translation": {
            "english": english,
            "method": method,
            "reason": "test reply"
        }
    })
    .to_string()
}

/// Embedder backed by a fixed table; unknown text is an error
pub struct TableEmbedder {
    vectors: HashMap<String, Vec<f32>>,
}

impl TableEmbedder {
    pub fn new(entries: &[(&str, Vec<f32>)]) -> Self {
        Self {
            vectors: entries
                .iter()
                .map(|(text, v)| (text.to_string(), v.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl Embedder for TableEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| EmbeddingError::Network(format!("no vector for {}", text)))
    }
}

/// Store whose every operation fails
pub struct FailingStore;

fn store_down<T>() -> StoreResult<T> {
    Err(hkpt_common::Error::Internal("store unavailable".to_string()))
}

#[async_trait]
impl LookupStore for FailingStore {
    async fn get_geo(&self, _: &str) -> StoreResult<Option<LookupRecord>> {
        store_down()
    }
    async fn get_slang(&self, _: &str, _: f64) -> StoreResult<Option<LookupRecord>> {
        store_down()
    }
    async fn get_official(&self, _: &str) -> StoreResult<Option<LookupRecord>> {
        store_down()
    }
    async fn get_verified(&self, _: &str) -> StoreResult<Option<LookupRecord>> {
        store_down()
    }
    async fn list_all_known(&self) -> StoreResult<HashMap<String, String>> {
        store_down()
    }
    async fn record_history(&self, _: &TranslationResult) -> StoreResult<()> {
        store_down()
    }
    async fn increment_usage(&self, _: &str, _: CorpusTier) -> StoreResult<()> {
        store_down()
    }
    async fn stats(&self) -> StoreResult<TranslationStats> {
        store_down()
    }
}

pub fn search_settings() -> SearchSettings {
    SearchSettings {
        allowed_websites: vec!["midland.com.hk".to_string(), "gov.hk".to_string()],
        from_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
    }
}

pub fn ai_fallback(oracle: Arc<dyn TranslationOracle>) -> AiFallback {
    AiFallback::new(oracle, RetryPolicy::default(), search_settings())
}

/// AI layer with zero backoff, for tests that don't measure time
pub fn fast_ai_fallback(oracle: Arc<dyn TranslationOracle>) -> AiFallback {
    AiFallback::new(
        oracle,
        RetryPolicy {
            max_attempts: 3,
            backoff_base: Duration::ZERO,
        },
        search_settings(),
    )
}

pub fn translator(store: Arc<dyn LookupStore>, oracle: Arc<dyn TranslationOracle>) -> PropertyTranslator {
    PropertyTranslator::new(store, fast_ai_fallback(oracle))
}
