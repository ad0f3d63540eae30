//! Per-agent liveness state.
//!
//! State machine (inputs: one check succeeded / failed):
//!
//! - `unknown`  → first success → `healthy`; stays `unknown` until three
//!   consecutive failures, then → `unhealthy`.
//! - `healthy`  → any failure → `degraded`.
//! - `degraded` → success → `healthy`; three consecutive failures → `unhealthy`.
//! - `unhealthy`→ success → `degraded` first, a second consecutive success
//!   reaches `healthy` — recovery steps through `degraded` to avoid flapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Consecutive failures at which an agent is declared dead.
pub const UNHEALTHY_FAILURE_THRESHOLD: u32 = 3;

/// Liveness classification for one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Registered but not yet probed (or not probed conclusively).
    Unknown,
    /// Passing checks.
    Healthy,
    /// Recently failed or recovering; still eligible for discovery.
    Degraded,
    /// Persistently failing; excluded from discovery but never auto-deleted.
    Unhealthy,
}

/// Rolling health state, one per registered agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthRecord {
    /// Current classification.
    pub status: HealthStatus,
    /// Consecutive failed checks.
    pub consecutive_failures: u32,
    /// Consecutive successful checks.
    pub consecutive_successes: u32,
    /// Time of the most recent check, if any.
    pub last_check_at: Option<DateTime<Utc>>,
    /// Error from the most recent failed check.
    pub last_error: Option<String>,
}

impl Default for HealthRecord {
    fn default() -> Self {
        Self {
            status: HealthStatus::Unknown,
            consecutive_failures: 0,
            consecutive_successes: 0,
            last_check_at: None,
            last_error: None,
        }
    }
}

impl HealthRecord {
    /// Fold in one successful check.
    pub fn observe_success(&mut self, at: DateTime<Utc>) {
        self.consecutive_successes += 1;
        self.consecutive_failures = 0;
        self.last_check_at = Some(at);
        self.last_error = None;

        self.status = match self.status {
            HealthStatus::Unknown => HealthStatus::Healthy,
            HealthStatus::Healthy => HealthStatus::Healthy,
            HealthStatus::Degraded => HealthStatus::Healthy,
            // Never straight back to healthy: one success earns degraded,
            // the next one (still consecutive) earns healthy.
            HealthStatus::Unhealthy => HealthStatus::Degraded,
        };
    }

    /// Fold in one failed check.
    pub fn observe_failure(&mut self, at: DateTime<Utc>, error: &str) {
        self.consecutive_failures += 1;
        self.consecutive_successes = 0;
        self.last_check_at = Some(at);
        self.last_error = Some(error.to_string());

        self.status = match self.status {
            HealthStatus::Unknown => {
                if self.consecutive_failures >= UNHEALTHY_FAILURE_THRESHOLD {
                    HealthStatus::Unhealthy
                } else {
                    HealthStatus::Unknown
                }
            }
            HealthStatus::Healthy => HealthStatus::Degraded,
            HealthStatus::Degraded => {
                if self.consecutive_failures >= UNHEALTHY_FAILURE_THRESHOLD {
                    HealthStatus::Unhealthy
                } else {
                    HealthStatus::Degraded
                }
            }
            HealthStatus::Unhealthy => HealthStatus::Unhealthy,
        };
    }
}
