//! HTTP surface of the discovery and orchestration core.
//!
//! Consumed by agents (registration), the UI layer (discovery and
//! orchestration), and observability tooling (listing and health
//! snapshots).
//!
//! # Endpoints
//!
//! - `GET    /health`             — Liveness probe
//! - `POST   /agents/register`    — Idempotent agent registration
//! - `DELETE /agents/:id`        — Deregistration
//! - `GET    /agents`             — Agent listing (`?include_unhealthy=true`)
//! - `GET    /agents/health`      — Health snapshot for all agents
//! - `GET    /agents/:id`        — Single descriptor + health record
//! - `POST   /discover`           — Intent → ranked agent matches
//! - `POST   /orchestrate`        — Query → multi-agent execution

pub mod routes;

pub use routes::{app_router, AppState};
