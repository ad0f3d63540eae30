//! Multi-agent orchestration: discovery, planned fan-out, fan-in.
//!
//! One orchestration walks `received → discovering → dispatching →
//! aggregating → completed | failed`. Dispatch is structured concurrency:
//! one task per selected agent, every task joined before aggregation, each
//! outcome recorded individually. Partial success is a normal, first-class
//! result — the orchestration only reports `failed` when *zero* dispatched
//! agents succeeded.

pub mod plan;
pub mod trace;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::watch;
use uuid::Uuid;

use crate::discovery::DiscoveryService;
use crate::errors::{GatewayError, OrchestrationError};
use crate::gateway::ToolGateway;
use crate::registry::ScoredAgent;

pub use plan::DispatchPlan;
pub use trace::{OrchestrationPhase, TraceEvent};

/// A user query to coordinate across agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationRequest {
    /// Free-text query.
    pub query_text: String,
    /// Opaque context forwarded to every dispatched agent.
    #[serde(default)]
    pub context: HashMap<String, Value>,
    /// Cap on the number of agents considered; discovery default applies
    /// when omitted.
    #[serde(default)]
    pub max_agents: Option<usize>,
}

/// Terminal status of one orchestration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrchestrationStatus {
    /// At least one agent succeeded, or no agent was capable (empty result).
    Completed,
    /// Agents were dispatched and every one of them failed.
    Failed,
}

/// How a per-agent dispatch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Transport-level failure reaching the agent.
    AgentUnreachable,
    /// The call did not settle within its timeout.
    AgentTimeout,
    /// The agent responded but reported a tool failure.
    AgentToolError,
    /// The orchestration was cancelled while this call was pending.
    Cancelled,
}

/// Settled outcome of one agent dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutcome {
    /// Whether the call succeeded.
    pub success: bool,
    /// Tool output on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Error description on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure classification, when failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    /// Wall-clock duration of the call in milliseconds.
    pub duration_ms: u64,
}

impl AgentOutcome {
    fn success(output: Value, duration_ms: u64) -> Self {
        Self {
            success: true,
            output: Some(output),
            error: None,
            failure: None,
            duration_ms,
        }
    }

    fn failure(kind: FailureKind, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
            failure: Some(kind),
            duration_ms,
        }
    }
}

/// Assembled result of one orchestration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationResult {
    /// Unique id for this orchestration.
    pub orchestration_id: Uuid,
    /// Terminal status.
    pub status: OrchestrationStatus,
    /// Per-agent outcome map.
    pub outcomes: HashMap<String, AgentOutcome>,
    /// Ordered discovery and dispatch events.
    pub trace: Vec<TraceEvent>,
}

impl OrchestrationResult {
    /// Request-level view of the terminal status. `Err` only when agents
    /// were dispatched and every one of them failed.
    pub fn as_request_result(&self) -> Result<(), OrchestrationError> {
        match self.status {
            OrchestrationStatus::Completed => Ok(()),
            OrchestrationStatus::Failed => Err(OrchestrationError::AllAgentsFailed {
                dispatched: self.outcomes.len(),
            }),
        }
    }
}

/// Handle for best-effort cancellation of one in-flight orchestration.
///
/// Cancelling aborts that orchestration's still-pending dispatches without
/// touching other in-flight orchestrations or the health monitor.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Create a cancellation pair: keep the handle, pass the signal to
/// [`Orchestrator::orchestrate_with_cancel`].
pub fn cancellation() -> (CancelHandle, watch::Receiver<bool>) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx: Arc::new(tx) }, rx)
}

async fn wait_cancelled(mut signal: watch::Receiver<bool>) {
    loop {
        if *signal.borrow() {
            return;
        }
        if signal.changed().await.is_err() {
            // Sender dropped without cancelling: never resolves.
            std::future::pending::<()>().await;
        }
    }
}

/// Coordinates one user query across discovered agents.
pub struct Orchestrator {
    discovery: Arc<DiscoveryService>,
    gateway: Arc<dyn ToolGateway>,
    dispatch_timeout: Duration,
}

impl Orchestrator {
    /// Create an orchestrator over a discovery service and tool gateway.
    pub fn new(
        discovery: Arc<DiscoveryService>,
        gateway: Arc<dyn ToolGateway>,
        dispatch_timeout: Duration,
    ) -> Self {
        Self {
            discovery,
            gateway,
            dispatch_timeout,
        }
    }

    /// Run an orchestration to completion without external cancellation.
    pub async fn orchestrate(&self, request: OrchestrationRequest) -> OrchestrationResult {
        let (_handle, signal) = cancellation();
        self.orchestrate_with_cancel(request, signal).await
    }

    /// Run an orchestration, aborting pending dispatches when `cancel`
    /// flips to true.
    pub async fn orchestrate_with_cancel(
        &self,
        request: OrchestrationRequest,
        cancel: watch::Receiver<bool>,
    ) -> OrchestrationResult {
        let orchestration_id = Uuid::new_v4();
        let mut trace = vec![TraceEvent::phase(
            OrchestrationPhase::Received,
            format!("query: {:?}", request.query_text),
        )];

        // -- discovering --------------------------------------------------
        trace.push(TraceEvent::phase(
            OrchestrationPhase::Discovering,
            "resolving intent against the registry",
        ));
        let candidates = self
            .discovery
            .discover(&request.query_text, request.max_agents)
            .await;

        if candidates.is_empty() {
            // A valid, reportable outcome — not a system fault.
            trace.push(TraceEvent::phase(
                OrchestrationPhase::Completed,
                "no capable agent found for this query",
            ));
            return OrchestrationResult {
                orchestration_id,
                status: OrchestrationStatus::Completed,
                outcomes: HashMap::new(),
                trace,
            };
        }

        for candidate in &candidates {
            trace.push(TraceEvent::agent(
                OrchestrationPhase::Discovering,
                &candidate.descriptor.agent_id,
                format!(
                    "matched with score {:.3} via {:?}",
                    candidate.score, candidate.matched_capabilities
                ),
            ));
        }

        // -- dispatching --------------------------------------------------
        let plan = DispatchPlan::build(candidates);
        let mut outcomes: HashMap<String, AgentOutcome> = HashMap::new();
        let mut producer_results: HashMap<String, Value> = HashMap::new();

        for (tier_index, tier) in plan.tiers.into_iter().enumerate() {
            trace.push(TraceEvent::phase(
                OrchestrationPhase::Dispatching,
                format!("tier {}: dispatching {} agent(s)", tier_index, tier.len()),
            ));

            let tier_outcomes = self
                .dispatch_tier(&request, tier, &producer_results, cancel.clone())
                .await;

            for (agent_id, outcome) in tier_outcomes {
                trace.push(TraceEvent::agent(
                    OrchestrationPhase::Dispatching,
                    &agent_id,
                    match (&outcome.success, &outcome.failure) {
                        (true, _) => format!("succeeded in {}ms", outcome.duration_ms),
                        (false, Some(kind)) => {
                            format!("failed ({:?}) in {}ms", kind, outcome.duration_ms)
                        }
                        (false, None) => "failed".to_string(),
                    },
                ));
                if outcome.success {
                    if let Some(output) = &outcome.output {
                        producer_results.insert(agent_id.clone(), output.clone());
                    }
                }
                outcomes.insert(agent_id, outcome);
            }
        }

        // -- aggregating --------------------------------------------------
        trace.push(TraceEvent::phase(
            OrchestrationPhase::Aggregating,
            format!("collected {} outcome(s)", outcomes.len()),
        ));

        let successes = outcomes.values().filter(|o| o.success).count();
        let status = if successes == 0 {
            OrchestrationStatus::Failed
        } else {
            OrchestrationStatus::Completed
        };
        trace.push(TraceEvent::phase(
            match status {
                OrchestrationStatus::Completed => OrchestrationPhase::Completed,
                OrchestrationStatus::Failed => OrchestrationPhase::Failed,
            },
            format!("{}/{} agent(s) succeeded", successes, outcomes.len()),
        ));

        tracing::info!(
            orchestration_id = %orchestration_id,
            ?status,
            successes,
            dispatched = outcomes.len(),
            "orchestration finished"
        );
        OrchestrationResult {
            orchestration_id,
            status,
            outcomes,
            trace,
        }
    }

    /// Dispatch one tier concurrently and join every call.
    ///
    /// Calls are isolated failure domains: a timeout or error in one task
    /// never cancels its siblings. Cancellation is the only exception —
    /// it aborts every still-pending call in the tier.
    async fn dispatch_tier(
        &self,
        request: &OrchestrationRequest,
        tier: Vec<ScoredAgent>,
        producer_results: &HashMap<String, Value>,
        cancel: watch::Receiver<bool>,
    ) -> Vec<(String, AgentOutcome)> {
        let mut handles = Vec::with_capacity(tier.len());

        for candidate in tier {
            let agent_id = candidate.descriptor.agent_id.clone();
            let endpoint = candidate.descriptor.endpoint.clone();
            let action = candidate
                .matched_capabilities
                .first()
                .cloned()
                .or_else(|| {
                    candidate
                        .descriptor
                        .capabilities
                        .first()
                        .map(|c| c.name.clone())
                })
                .unwrap_or_default();

            let mut payload = json!({
                "intent": request.query_text,
                "context": request.context,
            });
            if !producer_results.is_empty() {
                payload["producer_results"] = json!(producer_results);
            }

            let gateway = self.gateway.clone();
            let timeout = self.dispatch_timeout;
            let cancel = cancel.clone();

            handles.push(tokio::spawn(async move {
                let started = std::time::Instant::now();
                let elapsed_ms = |s: std::time::Instant| s.elapsed().as_millis() as u64;

                let outcome = tokio::select! {
                    biased;
                    _ = wait_cancelled(cancel) => AgentOutcome::failure(
                        FailureKind::Cancelled,
                        "orchestration cancelled before the call settled",
                        elapsed_ms(started),
                    ),
                    settled = tokio::time::timeout(
                        timeout,
                        gateway.execute(&endpoint, &action, payload, timeout),
                    ) => match settled {
                        Ok(Ok(output)) => AgentOutcome::success(output, elapsed_ms(started)),
                        Ok(Err(e)) => {
                            let kind = match &e {
                                GatewayError::Timeout { .. } => FailureKind::AgentTimeout,
                                GatewayError::Unreachable { .. } => FailureKind::AgentUnreachable,
                                GatewayError::Tool { .. } => FailureKind::AgentToolError,
                            };
                            AgentOutcome::failure(kind, e.to_string(), elapsed_ms(started))
                        }
                        Err(_) => AgentOutcome::failure(
                            FailureKind::AgentTimeout,
                            format!("call exceeded {:?}", timeout),
                            elapsed_ms(started),
                        ),
                    },
                };
                (agent_id, outcome)
            }));
        }

        join_all(handles)
            .await
            .into_iter()
            .map(|joined| {
                joined.unwrap_or_else(|e| {
                    (
                        String::from("<join-error>"),
                        AgentOutcome::failure(
                            FailureKind::AgentUnreachable,
                            format!("dispatch task panicked: {}", e),
                            0,
                        ),
                    )
                })
            })
            .collect()
    }
}
