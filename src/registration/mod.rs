//! Agent-side registration protocol.
//!
//! Runs inside each agent process: on startup, POST the agent's descriptor
//! to the registry and retry with exponential backoff (1s, 2s, 4s, …,
//! capped at 60s) until it lands. There is no maximum attempt count —
//! startup races against the registry are expected, not exceptional, so
//! failures here are logged and retried, never surfaced to the caller.
//!
//! Backoff state lives in an explicit [`RegistrationAttempt`] object
//! (driven by a timer, not recursion) so it stays inspectable in tests
//! and over the agent's own health endpoint.

use std::time::Duration;

use serde::Serialize;

use crate::registry::{AgentDescriptor, RegisterAgent};

/// First retry delay.
pub const BASE_BACKOFF: Duration = Duration::from_secs(1);
/// Ceiling on the retry delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Transient client-side retry state. Created fresh per process start,
/// discarded once registration succeeds.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationAttempt {
    /// Attempts made so far.
    pub attempt_count: u32,
    /// Delay that will follow the next failure.
    pub next_backoff: Duration,
    /// Error from the most recent failed attempt.
    pub last_error: Option<String>,
}

impl Default for RegistrationAttempt {
    fn default() -> Self {
        Self {
            attempt_count: 0,
            next_backoff: BASE_BACKOFF,
            last_error: None,
        }
    }
}

impl RegistrationAttempt {
    /// Fresh state, first failure will wait [`BASE_BACKOFF`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one failed attempt and return the delay to sleep before
    /// the next one. The delay doubles per failure and caps at
    /// [`MAX_BACKOFF`].
    pub fn record_failure(&mut self, error: impl Into<String>) -> Duration {
        self.attempt_count += 1;
        self.last_error = Some(error.into());
        let delay = self.next_backoff;
        self.next_backoff = (self.next_backoff * 2).min(MAX_BACKOFF);
        delay
    }
}

/// Registers one agent with the registry, retrying until success.
#[derive(Debug, Clone)]
pub struct RegistrationClient {
    registry_url: String,
    client: reqwest::Client,
}

impl RegistrationClient {
    /// Create a client targeting the registry's base URL.
    pub fn new(registry_url: impl Into<String>) -> Self {
        Self {
            registry_url: registry_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// One registration attempt. Independent of any prior attempt; carries
    /// no state beyond what [`RegistrationAttempt`] tracks.
    pub async fn register_once(
        &self,
        draft: &RegisterAgent,
    ) -> Result<AgentDescriptor, String> {
        let url = format!(
            "{}/agents/register",
            self.registry_url.trim_end_matches('/')
        );
        let resp = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(10))
            .json(draft)
            .send()
            .await
            .map_err(|e| format!("registration request failed: {}", e))?;

        if !resp.status().is_success() {
            return Err(format!("registry returned HTTP {}", resp.status()));
        }

        resp.json::<AgentDescriptor>()
            .await
            .map_err(|e| format!("malformed registry response: {}", e))
    }

    /// Retry until the registry accepts the registration or the task is
    /// dropped. Returns the stored descriptor on success.
    pub async fn run_until_registered(&self, draft: RegisterAgent) -> AgentDescriptor {
        let mut attempt = RegistrationAttempt::new();
        loop {
            match self.register_once(&draft).await {
                Ok(descriptor) => {
                    log::info!(
                        "agent '{}' registered after {} failed attempt(s)",
                        draft.agent_id,
                        attempt.attempt_count
                    );
                    return descriptor;
                }
                Err(error) => {
                    let delay = attempt.record_failure(error);
                    log::warn!(
                        "registration attempt {} for '{}' failed: {} (retrying in {:?})",
                        attempt.attempt_count,
                        draft.agent_id,
                        attempt.last_error.as_deref().unwrap_or("unknown"),
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_from_one_second() {
        let mut attempt = RegistrationAttempt::new();
        let delays: Vec<u64> = (0..6)
            .map(|_| attempt.record_failure("refused").as_secs())
            .collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 32]);
        assert_eq!(attempt.attempt_count, 6);
    }

    #[test]
    fn test_backoff_caps_at_sixty_seconds() {
        let mut attempt = RegistrationAttempt::new();
        for _ in 0..6 {
            attempt.record_failure("refused");
        }
        // Every delay after the sixth failure is capped, not unbounded.
        assert_eq!(attempt.record_failure("refused").as_secs(), 60);
        assert_eq!(attempt.record_failure("refused").as_secs(), 60);
    }

    #[test]
    fn test_attempt_tracks_last_error() {
        let mut attempt = RegistrationAttempt::new();
        attempt.record_failure("connection refused");
        attempt.record_failure("HTTP 503");
        assert_eq!(attempt.last_error.as_deref(), Some("HTTP 503"));
    }

    #[tokio::test]
    async fn test_register_once_reports_unreachable_registry() {
        let client = RegistrationClient::new("http://127.0.0.1:9");
        let draft = RegisterAgent {
            agent_id: "a1".to_string(),
            name: "a1".to_string(),
            category: None,
            description: String::new(),
            endpoint: "http://a1:8080".to_string(),
            capabilities: vec![crate::registry::AgentCapability::new("x", "y")],
            metadata: Default::default(),
        };
        let err = client.register_once(&draft).await.unwrap_err();
        assert!(err.contains("registration request failed"));
    }
}
