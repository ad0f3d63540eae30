//! OpenAI-compatible HTTP embedding backend.
//!
//! Posts to the `/v1/embeddings` endpoint of an OpenAI-compatible server.
//! Any transport or API failure is classified as `EmbeddingUnavailable` so
//! callers can degrade (discovery returns empty) instead of erroring out.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::CapabilityEmbedder;
use crate::errors::RegistryError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "text-embedding-3-small";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Remote embedder speaking the OpenAI embeddings API.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    /// Create an embedder against the default OpenAI endpoint and model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_endpoint(api_key, DEFAULT_BASE_URL, DEFAULT_MODEL)
    }

    /// Create an embedder against a custom OpenAI-compatible endpoint.
    pub fn with_endpoint(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl CapabilityEmbedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RegistryError> {
        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "input": text,
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RegistryError::EmbeddingUnavailable {
                message: format!("embedding request failed: {}", e),
            })?;

        if !resp.status().is_success() {
            return Err(RegistryError::EmbeddingUnavailable {
                message: format!("embedding API returned HTTP {}", resp.status()),
            });
        }

        let parsed: EmbeddingsResponse =
            resp.json()
                .await
                .map_err(|e| RegistryError::EmbeddingUnavailable {
                    message: format!("malformed embedding response: {}", e),
                })?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| RegistryError::EmbeddingUnavailable {
                message: "embedding response contained no vectors".to_string(),
            })
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_id_reflects_configuration() {
        let embedder = OpenAiEmbedder::with_endpoint("key", "http://localhost:9999/v1", "my-model");
        assert_eq!(embedder.model_id(), "my-model");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_embedding_unavailable() {
        // Port 9 (discard) is not listening; the request must fail fast
        // and classify as EmbeddingUnavailable.
        let embedder =
            OpenAiEmbedder::with_endpoint("key", "http://127.0.0.1:9/v1", DEFAULT_MODEL);
        let err = embedder.embed("hello").await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::EmbeddingUnavailable { .. }
        ));
    }
}
