//! Background liveness polling.
//!
//! A single recurring task probes every registered agent once per cycle
//! through the tool gateway, one concurrent check per agent, each bounded
//! by the probe timeout. A cycle fully settles before the next interval
//! tick, so cycles never overlap. A failing agent only affects its own
//! record; the loop itself never aborts.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;

use crate::gateway::ToolGateway;
use crate::registry::RegistryStore;

/// Periodic health poller over the registry.
pub struct HealthMonitor {
    store: Arc<RegistryStore>,
    gateway: Arc<dyn ToolGateway>,
    interval: Duration,
    probe_timeout: Duration,
}

impl HealthMonitor {
    /// Create a monitor over the given store and gateway.
    pub fn new(
        store: Arc<RegistryStore>,
        gateway: Arc<dyn ToolGateway>,
        interval: Duration,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            store,
            gateway,
            interval,
            probe_timeout,
        }
    }

    /// Spawn the monitor loop onto the runtime. The task runs until the
    /// handle is aborted or the runtime shuts down.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.run_cycle().await;
            }
        })
    }

    /// Run one polling cycle: fan out a probe per registered agent and
    /// fold every settled outcome into the registry.
    pub async fn run_cycle(&self) {
        let agents: Vec<(String, String)> = self
            .store
            .agent_ids()
            .into_iter()
            .filter_map(|id| self.store.get(&id).ok().map(|d| (id, d.endpoint)))
            .collect();

        if agents.is_empty() {
            return;
        }
        tracing::debug!(agents = agents.len(), "health cycle starting");

        let checks = agents.into_iter().map(|(agent_id, endpoint)| {
            let gateway = self.gateway.clone();
            let timeout = self.probe_timeout;
            async move {
                // Belt over the gateway's own timeout so a misbehaving
                // implementation cannot stall the cycle.
                let outcome =
                    tokio::time::timeout(timeout, gateway.health(&endpoint, timeout)).await;
                let result = match outcome {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(_) => Err(format!("health probe exceeded {:?}", timeout)),
                };
                (agent_id, result)
            }
        });

        for (agent_id, result) in join_all(checks).await {
            match result {
                Ok(()) => self.store.record_health_success(&agent_id),
                Err(error) => {
                    tracing::warn!(agent_id = %agent_id, error = %error, "health check failed");
                    self.store.record_health_failure(&agent_id, &error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashingEmbedder;
    use crate::errors::GatewayError;
    use crate::health::HealthStatus;
    use crate::registry::{AgentCapability, RegisterAgent};

    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::collections::HashSet;
    use parking_lot::Mutex;

    /// Gateway fake: agents whose endpoint host is in `down` fail probes.
    struct ScriptedGateway {
        down: Mutex<HashSet<String>>,
    }

    impl ScriptedGateway {
        fn new(down: &[&str]) -> Self {
            Self {
                down: Mutex::new(down.iter().map(|s| s.to_string()).collect()),
            }
        }

        fn set_down(&self, endpoint: &str, is_down: bool) {
            let mut down = self.down.lock();
            if is_down {
                down.insert(endpoint.to_string());
            } else {
                down.remove(endpoint);
            }
        }
    }

    #[async_trait]
    impl ToolGateway for ScriptedGateway {
        async fn health(&self, endpoint: &str, _timeout: Duration) -> Result<(), GatewayError> {
            if self.down.lock().contains(endpoint) {
                Err(GatewayError::Unreachable {
                    message: "connection refused".to_string(),
                })
            } else {
                Ok(())
            }
        }

        async fn execute(
            &self,
            _endpoint: &str,
            _action: &str,
            _payload: Value,
            _timeout: Duration,
        ) -> Result<Value, GatewayError> {
            unimplemented!("monitor tests never execute tools")
        }
    }

    async fn register(store: &RegistryStore, agent_id: &str) {
        store
            .register(RegisterAgent {
                agent_id: agent_id.to_string(),
                name: agent_id.to_string(),
                category: None,
                description: String::new(),
                endpoint: format!("http://{}:8080", agent_id),
                capabilities: vec![AgentCapability::new("data.retrieval", "fetch")],
                metadata: HashMap::new(),
            })
            .await
            .unwrap();
    }

    fn monitor(store: Arc<RegistryStore>, gateway: Arc<ScriptedGateway>) -> HealthMonitor {
        HealthMonitor::new(
            store,
            gateway,
            Duration::from_secs(30),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_cycle_marks_reachable_agents_healthy() {
        let store = Arc::new(RegistryStore::new(Arc::new(HashingEmbedder::default())));
        register(&store, "a1").await;

        let gateway = Arc::new(ScriptedGateway::new(&[]));
        monitor(store.clone(), gateway).run_cycle().await;

        let record = store.health_of("a1").unwrap();
        assert_eq!(record.status, HealthStatus::Healthy);
        assert!(record.last_check_at.is_some());
    }

    #[tokio::test]
    async fn test_one_failing_agent_does_not_affect_others() {
        let store = Arc::new(RegistryStore::new(Arc::new(HashingEmbedder::default())));
        register(&store, "up-agent").await;
        register(&store, "down-agent").await;

        let gateway = Arc::new(ScriptedGateway::new(&["http://down-agent:8080"]));
        let mon = monitor(store.clone(), gateway);
        for _ in 0..3 {
            mon.run_cycle().await;
        }

        assert_eq!(
            store.health_of("up-agent").unwrap().status,
            HealthStatus::Healthy
        );
        let down = store.health_of("down-agent").unwrap();
        assert_eq!(down.status, HealthStatus::Unhealthy);
        assert_eq!(down.last_error.as_deref(), Some("Agent unreachable: connection refused"));
    }

    #[tokio::test]
    async fn test_recovery_from_unhealthy_requires_two_cycles() {
        let store = Arc::new(RegistryStore::new(Arc::new(HashingEmbedder::default())));
        register(&store, "a1").await;

        let gateway = Arc::new(ScriptedGateway::new(&["http://a1:8080"]));
        let mon = monitor(store.clone(), gateway.clone());
        for _ in 0..3 {
            mon.run_cycle().await;
        }
        assert_eq!(store.health_of("a1").unwrap().status, HealthStatus::Unhealthy);

        gateway.set_down("http://a1:8080", false);
        mon.run_cycle().await;
        assert_eq!(store.health_of("a1").unwrap().status, HealthStatus::Degraded);
        mon.run_cycle().await;
        assert_eq!(store.health_of("a1").unwrap().status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_successful_probe_refreshes_last_seen() {
        let store = Arc::new(RegistryStore::new(Arc::new(HashingEmbedder::default())));
        register(&store, "a1").await;
        let before = store.get("a1").unwrap().last_seen_at;

        let gateway = Arc::new(ScriptedGateway::new(&[]));
        monitor(store.clone(), gateway).run_cycle().await;

        assert!(store.get("a1").unwrap().last_seen_at >= before);
    }

    #[tokio::test]
    async fn test_empty_registry_cycle_is_a_no_op() {
        let store = Arc::new(RegistryStore::new(Arc::new(HashingEmbedder::default())));
        let gateway = Arc::new(ScriptedGateway::new(&[]));
        // Must simply return, not panic or hang.
        monitor(store, gateway).run_cycle().await;
    }
}
