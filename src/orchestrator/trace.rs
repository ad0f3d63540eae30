//! Ordered trace of discovery and dispatch events.
//!
//! Every orchestration carries its own trace so the observability surface
//! can replay what happened — which agents were discovered, when each was
//! dispatched, and how each call settled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phase of the orchestration state machine a trace entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrchestrationPhase {
    Received,
    Discovering,
    Dispatching,
    Aggregating,
    Completed,
    Failed,
}

/// One observability event within an orchestration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    /// When the event occurred.
    pub at: DateTime<Utc>,
    /// Phase the orchestration was in.
    pub phase: OrchestrationPhase,
    /// Agent this event concerns, when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// Human-readable description.
    pub message: String,
}

impl TraceEvent {
    /// Event not tied to a specific agent.
    pub fn phase(phase: OrchestrationPhase, message: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            phase,
            agent_id: None,
            message: message.into(),
        }
    }

    /// Event concerning one agent.
    pub fn agent(
        phase: OrchestrationPhase,
        agent_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            at: Utc::now(),
            phase,
            agent_id: Some(agent_id.into()),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_event_carries_agent_id() {
        let event = TraceEvent::agent(OrchestrationPhase::Dispatching, "a1", "dispatched");
        assert_eq!(event.agent_id.as_deref(), Some("a1"));
        assert_eq!(event.phase, OrchestrationPhase::Dispatching);
    }

    #[test]
    fn test_phase_event_serializes_without_agent_id() {
        let event = TraceEvent::phase(OrchestrationPhase::Discovering, "querying registry");
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("agent_id").is_none());
        assert_eq!(json["phase"], "discovering");
    }
}
