//! Agent liveness: health records and the background monitor.

pub mod monitor;
pub mod record;

pub use monitor::HealthMonitor;
pub use record::{HealthRecord, HealthStatus, UNHEALTHY_FAILURE_THRESHOLD};
