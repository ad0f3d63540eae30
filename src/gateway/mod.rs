//! Tool execution gateway: the wire to remote agents.
//!
//! Every network interaction with an agent — liveness probes and tool
//! calls — goes through the [`ToolGateway`] trait, so health monitoring
//! and orchestration can be exercised against in-memory fakes. The
//! shipped implementation speaks the agents' HTTP protocol:
//!
//! - `GET  {endpoint}/health` — liveness probe, 2xx means alive
//! - `POST {endpoint}/a2a/message` — tool call with a
//!   `{success, result | error}` response envelope

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::errors::GatewayError;

/// Abstract transport to a remote agent's health and execute interfaces.
#[async_trait]
pub trait ToolGateway: Send + Sync {
    /// Probe the agent's liveness endpoint.
    ///
    /// # Errors
    ///
    /// `Unreachable` on transport failure or non-2xx, `Timeout` when the
    /// probe does not settle within `timeout`.
    async fn health(&self, endpoint: &str, timeout: Duration) -> Result<(), GatewayError>;

    /// Invoke a tool on the agent and return its raw result value.
    ///
    /// # Errors
    ///
    /// `Unreachable`/`Timeout` for transport problems; `Tool` when the
    /// agent responded but reported a failure of its own.
    async fn execute(
        &self,
        endpoint: &str,
        action: &str,
        payload: Value,
        timeout: Duration,
    ) -> Result<Value, GatewayError>;
}

/// Response envelope agents return from `/a2a/message`.
#[derive(Debug, Deserialize)]
struct ExecuteEnvelope {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

fn default_success() -> bool {
    true
}

/// HTTP implementation of the gateway, one shared client for all agents.
#[derive(Debug, Clone, Default)]
pub struct HttpToolGateway {
    client: reqwest::Client,
}

impl HttpToolGateway {
    /// Create a gateway with a fresh HTTP client. Timeouts are applied
    /// per call, not on the client, since probe and dispatch budgets differ.
    pub fn new() -> Self {
        Self::default()
    }

    fn normalize(endpoint: &str) -> String {
        let trimmed = endpoint.trim_end_matches('/');
        if trimmed.starts_with("http") {
            trimmed.to_string()
        } else {
            format!("http://{}", trimmed)
        }
    }
}

#[async_trait]
impl ToolGateway for HttpToolGateway {
    async fn health(&self, endpoint: &str, timeout: Duration) -> Result<(), GatewayError> {
        let url = format!("{}/health", Self::normalize(endpoint));
        let resp = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| GatewayError::from_transport(&e, timeout))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(GatewayError::Unreachable {
                message: format!("health probe returned HTTP {}", resp.status()),
            })
        }
    }

    async fn execute(
        &self,
        endpoint: &str,
        action: &str,
        payload: Value,
        timeout: Duration,
    ) -> Result<Value, GatewayError> {
        let url = format!("{}/a2a/message", Self::normalize(endpoint));
        let body = json!({
            "from_agent": "orchestrator",
            "action": action,
            "payload": payload,
            "correlation_id": Uuid::new_v4().to_string(),
            "message_type": "request",
        });

        let resp = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::from_transport(&e, timeout))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Unreachable {
                message: format!("HTTP {}: {}", status, text),
            });
        }

        let envelope: ExecuteEnvelope =
            resp.json().await.map_err(|e| GatewayError::Unreachable {
                message: format!("malformed agent response: {}", e),
            })?;

        if envelope.success {
            Ok(envelope.result.unwrap_or(Value::Null))
        } else {
            Err(GatewayError::Tool {
                message: envelope
                    .error
                    .unwrap_or_else(|| "agent reported failure without detail".to_string()),
            })
        }
    }
}
