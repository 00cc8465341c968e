//! Embedding provider abstraction and vector utilities.
//!
//! Defines the [`Embedder`] trait and the [`OpenAIEmbedder`] implementation,
//! which calls an OpenAI-compatible `POST {base_url}/embeddings` endpoint
//! (OpenRouter by default). Tests substitute their own [`Embedder`] so the
//! pipeline never touches the network.
//!
//! Also provides [`cosine_similarity`], used by the retriever.

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{Credentials, EmbeddingConfig, LlmConfig};
use crate::error::{AdvisorError, AdvisorResult};
use crate::transport::{post_json, Endpoint};

/// Trait for embedding providers.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"openai/text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;
    /// Embed a single text. Exactly one upstream call per invocation.
    async fn embed(&self, text: &str) -> AdvisorResult<Vec<f32>>;
}

/// Embedding provider for OpenAI-compatible APIs.
#[derive(Debug)]
pub struct OpenAIEmbedder {
    /// Model name (e.g. `"openai/text-embedding-3-small"`).
    model: String,
    /// Vector dimensionality (e.g. `1536`).
    dims: usize,
    endpoint: Endpoint,
}

impl OpenAIEmbedder {
    pub fn new(
        config: &EmbeddingConfig,
        llm: &LlmConfig,
        credentials: &Credentials,
    ) -> AdvisorResult<Self> {
        let url = format!(
            "{}/embeddings",
            config.effective_base_url(llm).trim_end_matches('/')
        );
        let endpoint = Endpoint::new(
            "embedding",
            url,
            credentials.api_key.clone(),
            config.timeout_secs,
            config.max_retries,
        )?;
        Ok(Self {
            model: config.model.clone(),
            dims: config.dims,
            endpoint,
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> AdvisorResult<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });
        let json = post_json(&self.endpoint, &body).await?;
        parse_embedding_response(&json)
    }
}

/// Extract `data[0].embedding` from an embeddings API response.
fn parse_embedding_response(json: &Value) -> AdvisorResult<Vec<f32>> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| {
            AdvisorError::Schema("embedding response missing data[0].embedding".to_string())
        })?;

    embedding
        .iter()
        .map(|v| {
            v.as_f64().map(|f| f as f32).ok_or_else(|| {
                AdvisorError::Schema("embedding contains a non-numeric value".to_string())
            })
        })
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors, vectors of different lengths, or when
/// either vector has zero norm.
///
/// # Formula
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    (dot / denom).clamp(-1.0, 1.0)
}
