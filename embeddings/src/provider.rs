//! Embedding providers.
//!
//! A provider turns text into fixed-length vectors. Every provider embeds
//! deterministically: the same input always yields the same vector, and every
//! vector has the provider's declared dimension. `embed` is batched so a
//! caller can amortize provider overhead across a whole document.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::similarity::normalize;

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Get the dimension of the vectors this provider produces.
    fn dimension(&self) -> usize;

    /// Check if the provider is ready to serve requests (API key set, etc.).
    fn is_available(&self) -> bool;

    /// Embed a batch of texts.
    ///
    /// Returns one vector per input text, in input order. An empty input
    /// yields an empty output without touching the backend.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Embed a single text.
    async fn embed_one(&self, text: &str) -> Result<Embedding> {
        let texts = [text.to_string()];
        let mut embeddings = self.embed(&texts).await?;
        embeddings.pop().ok_or_else(|| {
            EmbeddingError::InvalidResponse("provider returned no embedding".to_string())
        })
    }
}

/// Embedding provider backed by an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAIProvider {
    /// API key.
    api_key: Option<String>,

    /// API base URL.
    base_url: String,

    /// HTTP client.
    client: reqwest::Client,

    /// Model requested from the endpoint.
    model: String,

    /// Dimension of the configured model.
    dimension: usize,
}

impl OpenAIProvider {
    /// Create a provider, reading the API key from `OPENAI_API_KEY`.
    pub fn new() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: "https://api.openai.com/v1".to_string(),
            client: reqwest::Client::new(),
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the base URL (useful for proxies and tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the model and its known dimension.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self.dimension = match self.model.as_str() {
            "text-embedding-3-large" => 3072,
            _ => 1536,
        };
        self
    }
}

impl Default for OpenAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let api_key = self.api_key.as_ref().ok_or_else(|| {
            EmbeddingError::ProviderUnavailable("OPENAI_API_KEY is not set".to_string())
        })?;

        debug!("Embedding {} texts with model {}", texts.len(), self.model);

        let body = serde_json::json!({
            "input": texts,
            "model": self.model,
        });

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(EmbeddingError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ApiRequest(format!(
                "{status}: {error_text}"
            )));
        }

        let result: ApiEmbeddingResponse = response.json().await?;

        if result.data.len() != texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                result.data.len()
            )));
        }

        // The API documents an explicit index per item; order by it rather
        // than trusting response order.
        let mut data = result.data;
        data.sort_by_key(|item| item.index);

        if let Some(usage) = result.usage {
            debug!("Embedded batch used {} tokens", usage.total_tokens);
        }

        Ok(data.into_iter().map(|item| item.embedding).collect())
    }
}

/// Response format of the `/embeddings` endpoint.
#[derive(Debug, Deserialize)]
struct ApiEmbeddingResponse {
    data: Vec<ApiEmbeddingData>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiEmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    total_tokens: u64,
}

/// Offline embedding provider using feature hashing.
///
/// Tokenizes on non-alphanumeric boundaries, hashes each lowercased token
/// into one of `dimension` buckets, and L2-normalizes the resulting counts.
/// Texts sharing vocabulary land close together under cosine similarity,
/// which makes the provider usable for real (if crude) retrieval as well as
/// for deterministic tests — no network, no model files.
pub struct HashingProvider {
    dimension: usize,
}

impl HashingProvider {
    /// Create a provider with the default dimension (256).
    pub fn new() -> Self {
        Self { dimension: 256 }
    }

    /// Set the number of hash buckets.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension.max(1);
        self
    }

    fn bucket(&self, token: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        (hasher.finish() % self.dimension as u64) as usize
    }

    fn embed_text(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            vector[self.bucket(&token)] += 1.0;
        }
        normalize(&mut vector);
        vector
    }
}

impl Default for HashingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    fn name(&self) -> &str {
        "hashing"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}
