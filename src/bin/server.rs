//! agentmesh HTTP server binary.
//!
//! Starts the axum server exposing agent registration, discovery, and
//! orchestration, and spawns the background health monitor.
//!
//! # Environment Variables
//!
//! - `PORT` — HTTP port (default: 8000)
//! - `MESH_EMBEDDER` — "hashing" (default) or "openai"
//! - `OPENAI_API_KEY` — required when `MESH_EMBEDDER=openai`
//! - `MESH_HEALTH_INTERVAL_SECS` / `MESH_HEALTH_TIMEOUT_SECS`
//! - `MESH_DISPATCH_TIMEOUT_SECS`
//! - `MESH_DISCOVERY_FLOOR` / `MESH_MAX_RESULTS`
//! - `RUST_LOG` — Tracing filter (default: "info")
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin server
//! ```

use std::sync::Arc;

use agentmesh::embedder::build_embedder;
use agentmesh::gateway::HttpToolGateway;
use agentmesh::health::HealthMonitor;
use agentmesh::server::{app_router, AppState};
use agentmesh::MeshConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,agentmesh=debug".into()),
        )
        .init();

    let config = MeshConfig::from_env();
    let embedder = build_embedder(&config)?;
    tracing::info!(model = embedder.model_id(), "embedder ready");

    let gateway = Arc::new(HttpToolGateway::new());
    let state = AppState::new(&config, embedder, gateway.clone());

    // Background liveness polling over the shared registry.
    let monitor = HealthMonitor::new(
        state.registry.clone(),
        gateway,
        config.health_interval,
        config.health_timeout,
    );
    let monitor_handle = monitor.spawn();

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let app = app_router(state);

    tracing::info!("agentmesh server starting on {}", bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET    /health          — liveness probe");
    tracing::info!("  POST   /agents/register — agent registration");
    tracing::info!("  DELETE /agents/:id      — deregistration");
    tracing::info!("  GET    /agents          — agent listing");
    tracing::info!("  GET    /agents/health   — health snapshot");
    tracing::info!("  POST   /discover        — intent discovery");
    tracing::info!("  POST   /orchestrate     — multi-agent orchestration");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    monitor_handle.abort();
    Ok(())
}
