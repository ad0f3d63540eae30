//! Deterministic local hashing embedder.
//!
//! Default backend when no external embedding service is configured.
//! Tokenizes the input into lowercase words and character trigrams, hashes
//! each token into a fixed number of buckets (FNV-1a), and L2-normalizes
//! the bucket counts. Not a semantic model, but stable, dependency-free,
//! and good enough for capability phrases that share vocabulary with the
//! intents that should match them.

use async_trait::async_trait;

use super::CapabilityEmbedder;
use crate::errors::RegistryError;

/// Dimensionality of the hashed embedding space.
pub const HASHING_DIMENSIONS: usize = 256;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Local feature-hashing embedder. Deterministic and side-effect free.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimensions: HASHING_DIMENSIONS,
        }
    }
}

impl HashingEmbedder {
    /// Create an embedder with a custom dimensionality (mostly for tests).
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Embed synchronously. The async trait method delegates here.
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut buckets = vec![0f32; self.dimensions];

        for token in tokenize(text) {
            let bucket = (fnv1a(token.as_bytes()) as usize) % self.dimensions;
            buckets[bucket] += 1.0;
        }

        let norm = buckets.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in buckets.iter_mut() {
                *v /= norm;
            }
        }
        buckets
    }
}

#[async_trait]
impl CapabilityEmbedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RegistryError> {
        Ok(self.embed_sync(text))
    }

    fn model_id(&self) -> &str {
        "hashing-fnv1a-256"
    }
}

/// Lowercase word tokens plus character trigrams of each word.
///
/// Trigrams let "visualization" and "visualize" share mass without a
/// stemmer.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for word in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        tokens.push(word.to_string());
        let chars: Vec<char> = word.chars().collect();
        if chars.len() > 3 {
            for window in chars.windows(3) {
                tokens.push(window.iter().collect());
            }
        }
    }
    tokens
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_deterministic() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed("data retrieval").await.unwrap();
        let b = embedder.embed("data retrieval").await.unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_normalized() {
        let embedder = HashingEmbedder::default();
        let v = embedder.embed_sync("chart generation for energy data");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::default();
        let v = embedder.embed_sync("");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_related_text_scores_higher_than_unrelated() {
        let embedder = HashingEmbedder::default();
        let cap = embedder.embed_sync("data.retrieval - fetch tabular datasets");
        let related = embedder.embed_sync("retrieve the energy dataset");
        let unrelated = embedder.embed_sync("xylophone quartz zeppelin");
        assert!(cosine(&cap, &related) > cosine(&cap, &unrelated));
    }
}
