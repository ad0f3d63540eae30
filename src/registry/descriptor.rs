//! Agent descriptors and capability metadata.
//!
//! An [`AgentDescriptor`] is the registry's authoritative record for one
//! agent: identity, endpoint, capability phrases, and the embedding vectors
//! computed for those phrases at registration time.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::RegistryError;

/// Coarse category of an agent, used by the orchestrator's
/// producer-before-consumer dispatch ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentCategory {
    Data,
    Visualization,
    Research,
    Narrative,
    Prediction,
    Gui,
    Custom,
}

impl AgentCategory {
    /// Producers run before consumers: data and research agents emit the
    /// material the remaining categories transform.
    pub fn is_producer(self) -> bool {
        matches!(self, Self::Data | Self::Research)
    }

    /// Derive a category from an agent name when none was declared,
    /// matching the conventions agents themselves use at startup.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("data") {
            Self::Data
        } else if lower.contains("viz") || lower.contains("visual") {
            Self::Visualization
        } else if lower.contains("research") {
            Self::Research
        } else if lower.contains("narrative") {
            Self::Narrative
        } else if lower.contains("predict") || lower.contains("forecast") {
            Self::Prediction
        } else if lower.contains("gui") {
            Self::Gui
        } else {
            Self::Custom
        }
    }
}

/// One thing an agent can do, described richly enough to embed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCapability {
    /// Capability phrase, the unit of semantic matching (e.g. "data.retrieval").
    pub name: String,
    /// What the capability does.
    pub description: String,
    /// Required parameters, as an opaque schema map.
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
    /// Type of output produced (e.g. "chart", "text", "table").
    #[serde(default)]
    pub output_type: String,
    /// Example queries this capability handles.
    #[serde(default)]
    pub examples: Vec<String>,
}

impl AgentCapability {
    /// Create a capability with just a phrase and description.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: HashMap::new(),
            output_type: String::new(),
            examples: Vec::new(),
        }
    }

    /// Text handed to the embedder for this capability.
    ///
    /// Folds in the output type and examples for semantic richness, the
    /// same enrichment the registry applies when indexing agents.
    pub fn embedding_text(&self) -> String {
        let mut parts = vec![format!("{} - {}", self.name, self.description)];
        if !self.output_type.is_empty() {
            parts.push(format!("Output: {}", self.output_type));
        }
        if !self.examples.is_empty() {
            parts.push(format!("Examples: {}", self.examples.join(", ")));
        }
        if !self.parameters.is_empty() {
            let mut names: Vec<&str> = self.parameters.keys().map(String::as_str).collect();
            names.sort_unstable();
            parts.push(format!("Parameters: {}", names.join(", ")));
        }
        parts.join(" | ")
    }
}

/// Registration payload submitted by an agent.
///
/// This is the wire shape; the store turns it into an [`AgentDescriptor`]
/// by computing capability vectors and stamping timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterAgent {
    /// Globally unique, immutable agent identifier.
    pub agent_id: String,
    /// Human-readable name.
    pub name: String,
    /// Declared category; derived from the name when omitted.
    #[serde(default)]
    pub category: Option<AgentCategory>,
    /// What the agent does.
    #[serde(default)]
    pub description: String,
    /// Network address of the agent's tool-execution and health interfaces.
    pub endpoint: String,
    /// Capabilities, each independently embeddable.
    #[serde(default)]
    pub capabilities: Vec<AgentCapability>,
    /// Additional opaque metadata.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl RegisterAgent {
    /// Validate the registration constraints: id, endpoint, and at least
    /// one capability phrase are required.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.agent_id.trim().is_empty() {
            return Err(RegistryError::validation("agent_id is required"));
        }
        if self.endpoint.trim().is_empty() {
            return Err(RegistryError::validation("endpoint is required"));
        }
        if self.capabilities.is_empty() {
            return Err(RegistryError::validation(
                "at least one capability is required",
            ));
        }
        if let Some(cap) = self.capabilities.iter().find(|c| c.name.trim().is_empty()) {
            return Err(RegistryError::validation(format!(
                "capability with empty name (description: {:?})",
                cap.description
            )));
        }
        Ok(())
    }

    /// Effective category: declared, or derived from the agent name.
    pub fn effective_category(&self) -> AgentCategory {
        self.category
            .unwrap_or_else(|| AgentCategory::from_name(&self.name))
    }
}

/// Stored directory entry for one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Globally unique, immutable agent identifier.
    pub agent_id: String,
    /// Human-readable name.
    pub name: String,
    /// Category used for dispatch ordering.
    pub category: AgentCategory,
    /// What the agent does.
    pub description: String,
    /// Network address of the agent's tool-execution and health interfaces.
    pub endpoint: String,
    /// Capabilities, in declaration order.
    pub capabilities: Vec<AgentCapability>,
    /// Capability phrase → embedding vector, computed at registration.
    /// Not serialized: vectors are internal ranking state, not wire data.
    #[serde(skip)]
    pub capability_vectors: HashMap<String, Vec<f32>>,
    /// Additional opaque metadata.
    pub metadata: HashMap<String, Value>,
    /// First successful registration; never updated on re-registration.
    pub registered_at: DateTime<Utc>,
    /// Last successful registration or health check.
    pub last_seen_at: DateTime<Utc>,
}

impl AgentDescriptor {
    /// Ordered capability phrases.
    pub fn capability_phrases(&self) -> Vec<&str> {
        self.capabilities.iter().map(|c| c.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(agent_id: &str, endpoint: &str, caps: Vec<AgentCapability>) -> RegisterAgent {
        RegisterAgent {
            agent_id: agent_id.to_string(),
            name: "Test Agent".to_string(),
            category: None,
            description: "test".to_string(),
            endpoint: endpoint.to_string(),
            capabilities: caps,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn test_validate_requires_agent_id() {
        let d = draft("", "http://localhost:1", vec![AgentCapability::new("x", "y")]);
        assert!(matches!(
            d.validate(),
            Err(RegistryError::Validation { .. })
        ));
    }

    #[test]
    fn test_validate_requires_endpoint() {
        let d = draft("a1", "  ", vec![AgentCapability::new("x", "y")]);
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_validate_requires_capability() {
        let d = draft("a1", "http://localhost:1", vec![]);
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_complete_draft() {
        let d = draft(
            "a1",
            "http://localhost:1",
            vec![AgentCapability::new("data.retrieval", "fetch data")],
        );
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_category_derived_from_name() {
        assert_eq!(AgentCategory::from_name("viz-agent"), AgentCategory::Visualization);
        assert_eq!(AgentCategory::from_name("Data Agent"), AgentCategory::Data);
        assert_eq!(AgentCategory::from_name("forecaster"), AgentCategory::Prediction);
        assert_eq!(AgentCategory::from_name("mystery"), AgentCategory::Custom);
    }

    #[test]
    fn test_producer_categories() {
        assert!(AgentCategory::Data.is_producer());
        assert!(AgentCategory::Research.is_producer());
        assert!(!AgentCategory::Visualization.is_producer());
        assert!(!AgentCategory::Narrative.is_producer());
    }

    #[test]
    fn test_embedding_text_includes_examples_and_output() {
        let mut cap = AgentCapability::new("chart.generate", "render charts");
        cap.output_type = "chart".to_string();
        cap.examples = vec!["plot energy by country".to_string()];
        let text = cap.embedding_text();
        assert!(text.contains("chart.generate - render charts"));
        assert!(text.contains("Output: chart"));
        assert!(text.contains("plot energy by country"));
    }
}
