//! # agentmesh
//!
//! Agent discovery and orchestration core.
//!
//! Maintains a live directory of autonomous agents and their capabilities,
//! resolves free-text intents into ranked agent matches via semantic
//! similarity, tracks agent liveness over time, and coordinates multi-agent
//! execution plans with fan-out/fan-in dispatch tolerant of partial failure.

pub mod config;
pub mod discovery;
pub mod embedder;
pub mod errors;
pub mod gateway;
pub mod health;
pub mod orchestrator;
pub mod registration;
pub mod registry;
pub mod server;

pub use config::MeshConfig;
pub use discovery::DiscoveryService;
pub use embedder::{CapabilityEmbedder, HashingEmbedder};
pub use errors::{GatewayError, OrchestrationError, RegistryError};
pub use gateway::{HttpToolGateway, ToolGateway};
pub use health::{HealthMonitor, HealthRecord, HealthStatus};
pub use orchestrator::{OrchestrationRequest, OrchestrationResult, Orchestrator};
pub use registration::{RegistrationAttempt, RegistrationClient};
pub use registry::{AgentCapability, AgentDescriptor, RegistryStore};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
