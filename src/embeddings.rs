//! Embedding provider seam.
//!
//! Indexing and querying must share one embedding space: mixing models
//! breaks similarity semantics, so a single [`EmbeddingProvider`] instance
//! is constructed at startup and injected into both the ingestion pipeline
//! and the retriever.
//!
//! Two implementations ship with the crate:
//!
//! * [`HttpEmbeddingProvider`] — talks to an Ollama-compatible
//!   `/api/embed` endpoint.
//! * [`MockEmbeddingProvider`] — deterministic, offline, suitable for CI.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::types::{DocError, Result};

/// Computes dense embedding vectors for text.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Identifier of the underlying model, for logging and diagnostics.
    fn id(&self) -> &str;

    /// Embeds a batch of inputs, one vector per input, in order.
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embeds a single input.
    async fn embed(&self, input: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[input.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| DocError::Embedding("provider returned no vector".to_string()))
    }
}

/// Ollama-compatible HTTP embedding provider (`POST /api/embed`).
#[derive(Clone, Debug)]
pub struct HttpEmbeddingProvider {
    client: Client,
    endpoint: Url,
    model: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl HttpEmbeddingProvider {
    pub fn new(client: Client, endpoint: Url, model: impl Into<String>) -> Self {
        Self {
            client,
            endpoint,
            model: model.into(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn id(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.endpoint.join("api/embed")?;
        let response = self
            .client
            .post(url)
            .json(&json!({ "model": self.model, "input": inputs }))
            .send()
            .await?
            .error_for_status()?;

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|err| DocError::Embedding(err.to_string()))?;

        if parsed.embeddings.len() != inputs.len() {
            return Err(DocError::Embedding(format!(
                "expected {} vectors, got {}",
                inputs.len(),
                parsed.embeddings.len()
            )));
        }
        Ok(parsed.embeddings)
    }
}

/// Deterministic hashing-based embedder for tests and offline runs.
///
/// Each word is hashed into one of a fixed number of buckets and the
/// resulting count vector is L2-normalized, so texts sharing vocabulary
/// land near each other under cosine distance. Not semantically meaningful
/// beyond lexical overlap, but stable across runs and processes.
#[derive(Clone, Debug, Default)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub const DEFAULT_DIMENSIONS: usize = 64;

    pub fn new() -> Self {
        Self {
            dimensions: Self::DEFAULT_DIMENSIONS,
        }
    }

    fn embed_one(&self, input: &str) -> Vec<f32> {
        let dims = if self.dimensions == 0 {
            Self::DEFAULT_DIMENSIONS
        } else {
            self.dimensions
        };
        let mut vector = vec![0.0f32; dims];
        for word in input
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            let bucket = (hasher.finish() % dims as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn id(&self) -> &str {
        "mock-hash-embedder"
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(inputs.iter().map(|input| self.embed_one(input)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn mock_embeddings_are_deterministic() {
        let provider = MockEmbeddingProvider::new();
        let inputs = vec![
            "hello world".to_string(),
            "goodbye world".to_string(),
            "hello world".to_string(),
        ];

        let first = provider.embed_batch(&inputs).await.unwrap();
        let second = provider.embed_batch(&inputs).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0], first[2], "identical text, identical vector");
        assert_ne!(first[0], first[1], "different text, different vector");
    }

    #[tokio::test]
    async fn mock_embeddings_are_normalized() {
        let provider = MockEmbeddingProvider::new();
        let vector = provider.embed("some words to embed").await.unwrap();
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5, "norm was {norm}");
    }

    #[tokio::test]
    async fn http_provider_parses_embed_response() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/embed");
            then.status(200)
                .json_body(serde_json::json!({ "embeddings": [[0.1, 0.2], [0.3, 0.4]] }));
        });

        let endpoint = Url::parse(&server.base_url()).unwrap();
        let provider = HttpEmbeddingProvider::new(Client::new(), endpoint, "test-model");
        let vectors = provider
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[tokio::test]
    async fn http_provider_rejects_vector_count_mismatch() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/embed");
            then.status(200)
                .json_body(serde_json::json!({ "embeddings": [[0.1]] }));
        });

        let endpoint = Url::parse(&server.base_url()).unwrap();
        let provider = HttpEmbeddingProvider::new(Client::new(), endpoint, "test-model");
        let err = provider
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, DocError::Embedding(_)));
    }
}
