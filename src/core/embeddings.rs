use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::Deserialize;
use tokio::sync::Semaphore;

use crate::error::{AppError, Result};

/// Embedding model used when none is configured.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";

/// Output dimension of `text-embedding-3-large`.
pub const TEXT_EMBEDDING_3_LARGE_DIM: usize = 3072;

/// Turns text into a fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Name of the model producing the vectors; vectors from different
    /// models are never compared.
    fn model_name(&self) -> &str;

    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Client for an OpenAI-compatible `/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: Option<usize>,
}

impl OpenAiEmbedder {
    /// Create a new embedder
    ///
    /// When `dimensions` is set, vectors of any other length are rejected.
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: &str,
        model: &str,
        dimensions: Option<usize>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            dimensions,
        }
    }

    /// Build an HTTP client with the given request timeout
    pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {}", e)))
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "input": text,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "embedding API returned {}: {}",
                status, body
            )));
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("malformed embedding response: {}", e)))?;

        let embedding = result
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Upstream("no embedding returned".to_string()))?;

        if let Some(expected) = self.dimensions {
            if embedding.len() != expected {
                return Err(AppError::Upstream(format!(
                    "expected {}-dimensional embedding, got {}",
                    expected,
                    embedding.len()
                )));
            }
        }

        Ok(embedding)
    }
}

/// Embed a batch of texts concurrently.
///
/// Identical texts are embedded once. Every call holds a permit from
/// `limiter`, and the first failure fails the batch. Output order matches
/// `texts`.
pub async fn embed_texts(
    embedder: &dyn Embedder,
    texts: &[String],
    limiter: &Semaphore,
) -> Result<Vec<Vec<f32>>> {
    let mut unique: Vec<&str> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let positions: Vec<usize> = texts
        .iter()
        .map(|text| {
            *slots.entry(text.as_str()).or_insert_with(|| {
                unique.push(text.as_str());
                unique.len() - 1
            })
        })
        .collect();

    log::debug!(
        "Embedding {} texts ({} distinct) with {}",
        texts.len(),
        unique.len(),
        embedder.model_name()
    );

    let vectors = try_join_all(unique.iter().map(|text| async move {
        let _permit = limiter
            .acquire()
            .await
            .map_err(|e| AppError::Internal(format!("concurrency limiter closed: {}", e)))?;
        embedder.embed(text).await
    }))
    .await?;

    Ok(positions.into_iter().map(|i| vectors[i].clone()).collect())
}
