//! Intent-to-agent resolution.
//!
//! Turns a free-text intent into a ranked candidate list: embed the
//! intent, delegate ranking to the registry store, drop anything below
//! the configured relevance floor. For a fixed registry snapshot,
//! embedder, and intent text the ranked output is identical on every
//! call.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::registry::{RegistryStore, ScoredAgent};

/// Default result cap when a query does not specify one.
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// A discovery request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryQuery {
    /// Free-text user intent.
    pub intent_text: String,
    /// Result cap; the service default applies when omitted.
    #[serde(default)]
    pub max_results: Option<usize>,
}

/// One ranked match, as exposed over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryMatch {
    /// Matched agent.
    pub agent_id: String,
    /// Relevance in [0, 1].
    pub relevance_score: f32,
    /// Capability phrase(s) that drove the match, for explainability.
    pub matched_capabilities: Vec<String>,
}

impl From<&ScoredAgent> for DiscoveryMatch {
    fn from(scored: &ScoredAgent) -> Self {
        Self {
            agent_id: scored.descriptor.agent_id.clone(),
            relevance_score: scored.score,
            matched_capabilities: scored.matched_capabilities.clone(),
        }
    }
}

/// Resolves intents against the registry.
pub struct DiscoveryService {
    store: Arc<RegistryStore>,
    /// Matches scoring below this are omitted. 0.0 = keep everything.
    relevance_floor: f32,
    default_max_results: usize,
}

impl DiscoveryService {
    /// Create a service with no relevance floor and the default cap.
    pub fn new(store: Arc<RegistryStore>) -> Self {
        Self {
            store,
            relevance_floor: 0.0,
            default_max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// Set the minimum relevance kept in results.
    pub fn with_floor(mut self, floor: f32) -> Self {
        self.relevance_floor = floor;
        self
    }

    /// Set the default result cap.
    pub fn with_default_max_results(mut self, max_results: usize) -> Self {
        self.default_max_results = max_results;
        self
    }

    /// Rank agents for an intent.
    ///
    /// An unreachable embedder degrades to an empty candidate list (logged);
    /// "no capable agent found" is a reportable outcome, not a fault.
    pub async fn discover(&self, intent_text: &str, max_results: Option<usize>) -> Vec<ScoredAgent> {
        let vector = match self.store.embedder().embed(intent_text).await {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "intent embedding failed; discovery degrades to empty");
                return Vec::new();
            }
        };

        let cap = max_results.unwrap_or(self.default_max_results);
        let mut results = self.store.query(&vector, cap);
        if self.relevance_floor > 0.0 {
            results.retain(|r| r.score >= self.relevance_floor);
        }

        tracing::debug!(
            intent = intent_text,
            candidates = results.len(),
            "discovery complete"
        );
        results
    }
}
