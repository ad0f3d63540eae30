//! Dispatch planning: producers before consumers.
//!
//! The pipelines this core coordinates are two-tier by nature — data and
//! research agents produce material that visualization, narrative, and
//! prediction agents consume. Ordering therefore uses a coarse category
//! precedence, not a general dependency graph: producer-category agents
//! dispatch first (in parallel with each other), then everything else
//! (also in parallel), with producer outputs forwarded to the second tier.

use crate::registry::ScoredAgent;

/// Execution plan for one orchestration: tiers dispatch sequentially,
/// agents inside a tier dispatch in parallel.
#[derive(Debug, Clone, Default)]
pub struct DispatchPlan {
    /// Dispatch tiers, in execution order. Never contains empty tiers.
    pub tiers: Vec<Vec<ScoredAgent>>,
}

impl DispatchPlan {
    /// Build a plan from discovered candidates, preserving the ranked
    /// order within each tier.
    pub fn build(candidates: Vec<ScoredAgent>) -> Self {
        let mut producers = Vec::new();
        let mut consumers = Vec::new();
        for candidate in candidates {
            if candidate.descriptor.category.is_producer() {
                producers.push(candidate);
            } else {
                consumers.push(candidate);
            }
        }

        let mut tiers = Vec::new();
        if !producers.is_empty() {
            tiers.push(producers);
        }
        if !consumers.is_empty() {
            tiers.push(consumers);
        }
        Self { tiers }
    }

    /// Total number of agents across all tiers.
    pub fn agent_count(&self) -> usize {
        self.tiers.iter().map(Vec::len).sum()
    }

    /// Whether the plan dispatches nothing.
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}
