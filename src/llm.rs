//! Language-model backend seam.
//!
//! The whole crate issues exactly two kinds of prompts: one per intent
//! classification and one per answer generation. Both go through
//! [`LanguageModel::generate`], so swapping providers means swapping one
//! trait object. No streaming, no provider-native multi-turn context; the
//! orchestrator flattens history into the prompt text itself.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::types::{DocError, Result};

/// Text-in, text-out generation capability.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Ollama-compatible HTTP generator (`POST /api/generate`, non-streaming).
#[derive(Clone, Debug)]
pub struct OllamaModel {
    client: Client,
    endpoint: Url,
    model: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaModel {
    pub fn new(client: Client, endpoint: Url, model: impl Into<String>) -> Self {
        Self {
            client,
            endpoint,
            model: model.into(),
        }
    }
}

#[async_trait]
impl LanguageModel for OllamaModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = self.endpoint.join("api/generate")?;
        let response = self
            .client
            .post(url)
            .json(&json!({ "model": self.model, "prompt": prompt, "stream": false }))
            .send()
            .await?
            .error_for_status()?;

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|err| DocError::Generation(err.to_string()))?;
        Ok(parsed.response)
    }
}

/// Returns pre-scripted replies in order; errors once the script runs dry.
///
/// Used by tests to drive the classification and generation steps without a
/// live backend.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedModel {
    pub fn new(replies: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.replies
            .lock()
            .expect("scripted replies mutex poisoned")
            .pop_front()
            .ok_or_else(|| DocError::Generation("scripted model exhausted".to_string()))
    }
}
