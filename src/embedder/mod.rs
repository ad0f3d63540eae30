//! Capability embedding seam.
//!
//! The registry and discovery service vectorize text through the
//! [`CapabilityEmbedder`] trait so the embedding backend can change without
//! touching registry or ranking logic. Two backends ship here: a
//! deterministic local hashing embedder (the default, no external
//! dependencies) and an OpenAI-compatible HTTP embedder.

pub mod hashing;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::MeshConfig;
use crate::errors::RegistryError;

pub use hashing::HashingEmbedder;
pub use openai::OpenAiEmbedder;

/// Converts free text into a fixed-size dense vector.
///
/// Implementations must be deterministic for a fixed model version:
/// identical input text always produces the identical vector.
#[async_trait]
pub trait CapabilityEmbedder: Send + Sync {
    /// Embed one text into a dense vector.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EmbeddingUnavailable`] when the backend
    /// cannot produce a vector (network failure, quota, bad response).
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RegistryError>;

    /// Identifier of the backing model, for logging and trace entries.
    fn model_id(&self) -> &str;
}

/// Build an embedder from the configured backend name.
///
/// Mirrors the startup selection of the registry service: OpenAI when
/// requested (and keyed), the local hashing embedder otherwise.
pub fn build_embedder(config: &MeshConfig) -> Result<Arc<dyn CapabilityEmbedder>, anyhow::Error> {
    match config.embedder.as_str() {
        "hashing" => Ok(Arc::new(HashingEmbedder::default())),
        "openai" => {
            let api_key = std::env::var("OPENAI_API_KEY")
                .map_err(|_| anyhow::anyhow!("MESH_EMBEDDER=openai but OPENAI_API_KEY not set"))?;
            Ok(Arc::new(OpenAiEmbedder::new(api_key)))
        }
        other => Err(anyhow::anyhow!(
            "Unknown embedder backend '{}'. Available: hashing, openai",
            other
        )),
    }
}
