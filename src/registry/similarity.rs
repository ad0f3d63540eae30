//! Similarity scoring over dense capability vectors.
//!
//! The registry ranks agents through the [`SimilarityIndex`] trait so the
//! scoring scheme can change without touching store or discovery logic.
//! The shipped implementation is cosine similarity clamped into [0, 1].

/// Scores the similarity of two dense vectors into [0, 1].
pub trait SimilarityIndex: Send + Sync {
    /// Relevance of `candidate` with respect to `query`, in [0, 1].
    fn score(&self, query: &[f32], candidate: &[f32]) -> f32;
}

/// Cosine similarity, clamped to [0, 1].
///
/// Mismatched or zero-length vectors score 0.0 rather than erroring —
/// a registered vector from an older embedder version should rank last,
/// not poison the whole query.
#[derive(Debug, Clone, Copy, Default)]
pub struct CosineIndex;

impl SimilarityIndex for CosineIndex {
    fn score(&self, query: &[f32], candidate: &[f32]) -> f32 {
        if query.len() != candidate.len() || query.is_empty() {
            return 0.0;
        }

        let mut dot = 0f32;
        let mut norm_q = 0f32;
        let mut norm_c = 0f32;
        for (q, c) in query.iter().zip(candidate) {
            dot += q * c;
            norm_q += q * q;
            norm_c += c * c;
        }

        if norm_q == 0.0 || norm_c == 0.0 {
            return 0.0;
        }

        (dot / (norm_q.sqrt() * norm_c.sqrt())).clamp(0.0, 1.0)
    }
}
