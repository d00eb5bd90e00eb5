//! Sentence embeddings for semantic name similarity
//!
//! [`HttpEmbedder`] talks to an OpenAI-compatible `/embeddings` endpoint.
//! [`EmbeddingCache`] memoizes vectors per trimmed input for the lifetime of
//! the process. The cache is unbounded.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

/// Embedding backend errors
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Empty embedding returned")]
    Empty,
}

/// Produces a dense vector for a piece of text
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// OpenAI-compatible embeddings client
pub struct HttpEmbedder {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpEmbedder {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| EmbeddingError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/embeddings", self.base_url);
        let mut request = self.client.post(&url).json(&EmbeddingRequest {
            model: &self.model,
            input: text,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EmbeddingError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api(status.as_u16(), error_text));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Parse(e.to_string()))?;

        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or(EmbeddingError::Empty)
    }
}

/// Process-lifetime memo of embeddings, keyed by trimmed text
pub struct EmbeddingCache {
    embedder: Arc<dyn Embedder>,
    entries: RwLock<HashMap<String, Arc<Vec<f32>>>>,
}

impl EmbeddingCache {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Cached embedding for `text`, computing it on first use
    pub async fn get(&self, text: &str) -> Result<Arc<Vec<f32>>, EmbeddingError> {
        let key = text.trim();

        if let Some(hit) = self.entries.read().await.get(key) {
            return Ok(Arc::clone(hit));
        }

        // Computed outside the lock; a concurrent miss may embed twice, last write wins
        let vector = Arc::new(self.embedder.embed(key).await?);
        self.entries
            .write()
            .await
            .insert(key.to_string(), Arc::clone(&vector));

        Ok(vector)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}
