//! In-memory agent directory with similarity query.
//!
//! The store is the single resource shared by every request path:
//! registration writes, health monitor writes, discovery and orchestrator
//! reads. Both maps are keyed by `agent_id` and backed by `DashMap`, so
//! writes serialize per agent while reads proceed concurrently against
//! other agents — there is no global directory lock.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;

use crate::embedder::CapabilityEmbedder;
use crate::errors::RegistryError;
use crate::health::{HealthRecord, HealthStatus};

use super::descriptor::{AgentDescriptor, RegisterAgent};
use super::similarity::{CosineIndex, SimilarityIndex};

/// One ranked candidate from a similarity query.
#[derive(Debug, Clone)]
pub struct ScoredAgent {
    /// The matched agent's full descriptor.
    pub descriptor: AgentDescriptor,
    /// Relevance in [0, 1]: the maximum similarity across the agent's
    /// capability phrases.
    pub score: f32,
    /// Capability phrase(s) that achieved that maximum, in declaration order.
    pub matched_capabilities: Vec<String>,
}

/// Authoritative in-memory directory of agents and their health records.
pub struct RegistryStore {
    agents: DashMap<String, AgentDescriptor>,
    health: DashMap<String, HealthRecord>,
    embedder: Arc<dyn CapabilityEmbedder>,
    index: Box<dyn SimilarityIndex>,
}

impl std::fmt::Debug for RegistryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryStore")
            .field("agents", &self.agents.len())
            .field("embedder", &self.embedder.model_id())
            .finish()
    }
}

impl RegistryStore {
    /// Create a store backed by the given embedder and cosine ranking.
    pub fn new(embedder: Arc<dyn CapabilityEmbedder>) -> Self {
        Self::with_index(embedder, Box::new(CosineIndex))
    }

    /// Create a store with a custom similarity index.
    pub fn with_index(
        embedder: Arc<dyn CapabilityEmbedder>,
        index: Box<dyn SimilarityIndex>,
    ) -> Self {
        Self {
            agents: DashMap::new(),
            health: DashMap::new(),
            embedder,
            index,
        }
    }

    /// The embedder this store vectorizes with.
    pub fn embedder(&self) -> &Arc<dyn CapabilityEmbedder> {
        &self.embedder
    }

    /// Idempotent upsert keyed by `agent_id`.
    ///
    /// Computes capability vectors through the embedder, preserves
    /// `registered_at` across re-registrations, refreshes `last_seen_at`,
    /// and initializes an `unknown` health record if none exists. The
    /// final map insert is a single whole-descriptor write, so concurrent
    /// registrations for the same id never interleave partial state.
    ///
    /// # Errors
    ///
    /// `Validation` for a malformed draft, `EmbeddingUnavailable` when a
    /// capability phrase cannot be vectorized.
    pub async fn register(&self, draft: RegisterAgent) -> Result<AgentDescriptor, RegistryError> {
        draft.validate()?;

        // Vectorize outside any map access; embedding may be a network call.
        let mut vectors = HashMap::with_capacity(draft.capabilities.len());
        for cap in &draft.capabilities {
            let vector = self.embedder.embed(&cap.embedding_text()).await?;
            vectors.insert(cap.name.clone(), vector);
        }

        let now = Utc::now();
        let category = draft.effective_category();
        let registered_at = self
            .agents
            .get(&draft.agent_id)
            .map(|existing| existing.registered_at)
            .unwrap_or(now);

        let descriptor = AgentDescriptor {
            agent_id: draft.agent_id.clone(),
            name: draft.name,
            category,
            description: draft.description,
            endpoint: draft.endpoint,
            capabilities: draft.capabilities,
            capability_vectors: vectors,
            metadata: draft.metadata,
            registered_at,
            last_seen_at: now,
        };

        self.agents
            .insert(draft.agent_id.clone(), descriptor.clone());
        self.health
            .entry(draft.agent_id.clone())
            .or_insert_with(HealthRecord::default);

        tracing::info!(agent_id = %draft.agent_id, "agent registered");
        Ok(descriptor)
    }

    /// Remove an agent and its health record. Returns false if absent.
    pub fn deregister(&self, agent_id: &str) -> bool {
        let removed = self.agents.remove(agent_id).is_some();
        self.health.remove(agent_id);
        if removed {
            tracing::info!(agent_id = %agent_id, "agent deregistered");
        }
        removed
    }

    /// Look up one agent's descriptor.
    pub fn get(&self, agent_id: &str) -> Result<AgentDescriptor, RegistryError> {
        self.agents
            .get(agent_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| RegistryError::NotFound {
                agent_id: agent_id.to_string(),
            })
    }

    /// Current health record for one agent.
    pub fn health_of(&self, agent_id: &str) -> Option<HealthRecord> {
        self.health.get(agent_id).map(|entry| entry.clone())
    }

    /// Snapshot of every agent's health record, for observability.
    pub fn health_snapshot(&self) -> HashMap<String, HealthRecord> {
        self.health
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// All registered agent ids (unsorted).
    pub fn agent_ids(&self) -> Vec<String> {
        self.agents.iter().map(|e| e.key().clone()).collect()
    }

    /// Enumerate descriptors, sorted by agent id. Unhealthy agents are
    /// filtered out unless explicitly requested.
    pub fn list_all(&self, include_unhealthy: bool) -> Vec<AgentDescriptor> {
        let mut out: Vec<AgentDescriptor> = self
            .agents
            .iter()
            .filter(|entry| {
                include_unhealthy || self.status_of(entry.key()) != HealthStatus::Unhealthy
            })
            .map(|entry| entry.clone())
            .collect();
        out.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        out
    }

    /// Apply one successful health check: advances the state machine and
    /// refreshes the descriptor's `last_seen_at`.
    pub fn record_health_success(&self, agent_id: &str) {
        if let Some(mut record) = self.health.get_mut(agent_id) {
            record.observe_success(Utc::now());
        }
        if let Some(mut descriptor) = self.agents.get_mut(agent_id) {
            descriptor.last_seen_at = Utc::now();
        }
    }

    /// Apply one failed health check.
    pub fn record_health_failure(&self, agent_id: &str, error: &str) {
        if let Some(mut record) = self.health.get_mut(agent_id) {
            record.observe_failure(Utc::now(), error);
        }
    }

    /// Rank agents against a query vector.
    ///
    /// Scores every capability vector of every non-unhealthy agent; an
    /// agent's relevance is the *maximum* similarity across its phrases
    /// (one strong capability makes a match — irrelevant siblings must not
    /// dilute it). Results sort by score descending, ties broken by
    /// ascending agent id so identical inputs always rank identically.
    pub fn query(&self, query_vector: &[f32], max_results: usize) -> Vec<ScoredAgent> {
        let mut scored: Vec<ScoredAgent> = Vec::new();

        for entry in self.agents.iter() {
            // Known-dead agents are never recommended, even on a raw-score win.
            if self.status_of(entry.key()) == HealthStatus::Unhealthy {
                continue;
            }

            let descriptor = entry.value();
            let mut best = 0f32;
            let mut per_phrase: Vec<(String, f32)> = Vec::new();
            for cap in &descriptor.capabilities {
                let score = descriptor
                    .capability_vectors
                    .get(&cap.name)
                    .map(|v| self.index.score(query_vector, v))
                    .unwrap_or(0.0);
                if score > best {
                    best = score;
                }
                per_phrase.push((cap.name.clone(), score));
            }

            let matched: Vec<String> = per_phrase
                .into_iter()
                .filter(|(_, s)| (best - s).abs() <= f32::EPSILON)
                .map(|(name, _)| name)
                .collect();

            scored.push(ScoredAgent {
                descriptor: descriptor.clone(),
                score: best,
                matched_capabilities: matched,
            });
        }

        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.descriptor.agent_id.cmp(&b.descriptor.agent_id))
        });
        scored.truncate(max_results);
        scored
    }

    fn status_of(&self, agent_id: &str) -> HealthStatus {
        self.health
            .get(agent_id)
            .map(|record| record.status)
            .unwrap_or(HealthStatus::Unknown)
    }
}
