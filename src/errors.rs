//! Error taxonomy for the discovery and orchestration core.
//!
//! Per-agent failures (unreachable, timeout, tool error) are recovered
//! locally into result maps and never abort a whole orchestration; only
//! invalid input or a total failure (zero successful agents) surfaces as
//! a request-level error.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by the registry store and discovery path.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Malformed registration — rejected, never retried by the server.
    #[error("Invalid registration: {message}")]
    Validation { message: String },

    /// Lookup of an unknown agent id.
    #[error("Agent not found: {agent_id}")]
    NotFound { agent_id: String },

    /// The capability embedder could not produce a vector.
    ///
    /// Discovery degrades to an empty result set when this occurs;
    /// registration surfaces it to the caller so the agent retries.
    #[error("Embedding unavailable: {message}")]
    EmbeddingUnavailable { message: String },
}

impl RegistryError {
    /// Build a `Validation` error from any displayable message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Errors from a single remote agent call through the tool gateway.
///
/// These are per-agent and isolated: one agent failing never cancels the
/// calls in flight to other agents.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The agent endpoint could not be reached (connect/DNS/non-2xx).
    #[error("Agent unreachable: {message}")]
    Unreachable { message: String },

    /// The call did not settle within its configured timeout.
    #[error("Agent call timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// The agent responded but reported a tool failure of its own.
    #[error("Agent tool error: {message}")]
    Tool { message: String },
}

impl GatewayError {
    /// Classify a reqwest transport error.
    pub fn from_transport(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout { timeout }
        } else {
            Self::Unreachable {
                message: err.to_string(),
            }
        }
    }
}

/// Request-level orchestration failure: every dispatched agent failed.
///
/// Partial success is *not* an error — it completes normally with a mixed
/// outcome map.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// Zero of the dispatched agents succeeded.
    #[error("Orchestration failed: none of {dispatched} dispatched agents succeeded")]
    AllAgentsFailed { dispatched: usize },
}
