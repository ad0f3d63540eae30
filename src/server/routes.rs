//! Axum route handlers for the agentmesh HTTP server.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::config::MeshConfig;
use crate::discovery::{DiscoveryMatch, DiscoveryQuery, DiscoveryService};
use crate::embedder::CapabilityEmbedder;
use crate::errors::RegistryError;
use crate::gateway::ToolGateway;
use crate::orchestrator::{OrchestrationRequest, Orchestrator};
use crate::registry::{RegisterAgent, RegistryStore};

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// The shared agent directory.
    pub registry: Arc<RegistryStore>,
    /// Intent resolution service.
    pub discovery: Arc<DiscoveryService>,
    /// Multi-agent coordinator.
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    /// Wire up state from its collaborators.
    pub fn new(
        config: &MeshConfig,
        embedder: Arc<dyn CapabilityEmbedder>,
        gateway: Arc<dyn ToolGateway>,
    ) -> Self {
        let registry = Arc::new(RegistryStore::new(embedder));
        let discovery = Arc::new(
            DiscoveryService::new(registry.clone())
                .with_floor(config.discovery_floor)
                .with_default_max_results(config.max_results),
        );
        let orchestrator = Arc::new(Orchestrator::new(
            discovery.clone(),
            gateway,
            config.dispatch_timeout,
        ));
        Self {
            registry,
            discovery,
            orchestrator,
        }
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/agents/register", post(register_handler))
        .route("/agents/health", get(health_snapshot_handler))
        .route("/agents", get(list_agents_handler))
        .route("/agents/:id", get(get_agent_handler).delete(deregister_handler))
        .route("/discover", post(discover_handler))
        .route("/orchestrate", post(orchestrate_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /health — liveness probe.
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": "agentmesh",
    }))
}

/// POST /agents/register — idempotent upsert of an agent descriptor.
async fn register_handler(
    State(state): State<AppState>,
    Json(draft): Json<RegisterAgent>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match state.registry.register(draft).await {
        Ok(descriptor) => Ok(Json(
            serde_json::to_value(descriptor).unwrap_or(Value::Null),
        )),
        Err(RegistryError::Validation { message }) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"error": message})),
        )),
        Err(RegistryError::EmbeddingUnavailable { message }) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": message})),
        )),
        Err(other) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": other.to_string()})),
        )),
    }
}

/// DELETE /agents/:id — remove an agent. Absence is not an error.
async fn deregister_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<Value> {
    let removed = state.registry.deregister(&id);
    Json(json!({"removed": removed}))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    #[serde(default)]
    include_unhealthy: bool,
}

/// GET /agents — enumerate descriptors, unhealthy filtered by default.
async fn list_agents_handler(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<Value> {
    let agents = state.registry.list_all(params.include_unhealthy);
    Json(json!({ "agents": agents }))
}

/// GET /agents/:id — one descriptor plus its health record.
async fn get_agent_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match state.registry.get(&id) {
        Ok(descriptor) => {
            let health = state.registry.health_of(&id);
            Ok(Json(json!({
                "agent": descriptor,
                "health": health,
            })))
        }
        Err(e) => Err((StatusCode::NOT_FOUND, Json(json!({"error": e.to_string()})))),
    }
}

/// GET /agents/health — full health snapshot for observability tooling.
async fn health_snapshot_handler(State(state): State<AppState>) -> Json<Value> {
    let snapshot: HashMap<String, _> = state.registry.health_snapshot();
    Json(json!({ "health": snapshot }))
}

/// POST /discover — rank agents for an intent.
async fn discover_handler(
    State(state): State<AppState>,
    Json(query): Json<DiscoveryQuery>,
) -> Json<Value> {
    let results = state
        .discovery
        .discover(&query.intent_text, query.max_results)
        .await;
    let matches: Vec<DiscoveryMatch> = results.iter().map(DiscoveryMatch::from).collect();
    Json(json!({
        "intent_text": query.intent_text,
        "matches": matches,
    }))
}

/// POST /orchestrate — coordinate a query across discovered agents.
///
/// Always answers 200: partial failure and the all-failed case are
/// reported through the result's `status` and per-agent outcome map.
async fn orchestrate_handler(
    State(state): State<AppState>,
    Json(request): Json<OrchestrationRequest>,
) -> Json<Value> {
    let result = state.orchestrator.orchestrate(request).await;
    Json(serde_json::to_value(result).unwrap_or(Value::Null))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashingEmbedder;
    use crate::errors::GatewayError;
    use crate::registry::AgentCapability;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    struct AlwaysHealthyGateway;

    #[async_trait]
    impl ToolGateway for AlwaysHealthyGateway {
        async fn health(&self, _endpoint: &str, _timeout: Duration) -> Result<(), GatewayError> {
            Ok(())
        }

        async fn execute(
            &self,
            _endpoint: &str,
            action: &str,
            _payload: Value,
            _timeout: Duration,
        ) -> Result<Value, GatewayError> {
            Ok(json!({"echo": action}))
        }
    }

    fn state() -> AppState {
        AppState::new(
            &MeshConfig::default(),
            Arc::new(HashingEmbedder::default()),
            Arc::new(AlwaysHealthyGateway),
        )
    }

    fn register_body(agent_id: &str, phrase: &str) -> String {
        serde_json::to_string(&RegisterAgent {
            agent_id: agent_id.to_string(),
            name: agent_id.to_string(),
            category: None,
            description: format!("{} agent", agent_id),
            endpoint: format!("http://{}:8080", agent_id),
            capabilities: vec![AgentCapability::new(phrase, format!("{} capability", phrase))],
            metadata: HashMap::new(),
        })
        .unwrap()
    }

    async fn post(app: Router, uri: &str, body: String) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (status, json) = get_json(app_router(state()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "agentmesh");
        assert_eq!(json["version"], crate::VERSION);
    }

    #[tokio::test]
    async fn test_register_and_get_agent() {
        let state = state();
        let app = app_router(state.clone());

        let (status, stored) = post(
            app.clone(),
            "/agents/register",
            register_body("data-agent", "data.retrieval"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stored["agent_id"], "data-agent");

        let (status, fetched) = get_json(app, "/agents/data-agent").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["agent"]["agent_id"], "data-agent");
        assert_eq!(fetched["health"]["status"], "unknown");
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_payload() {
        let app = app_router(state());
        let body = json!({
            "agent_id": "a1",
            "name": "a1",
            "endpoint": "http://a1:8080",
            "capabilities": [],
        })
        .to_string();
        let (status, json) = post(app, "/agents/register", body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json["error"].as_str().unwrap().contains("capability"));
    }

    #[tokio::test]
    async fn test_get_unknown_agent_is_404() {
        let (status, _) = get_json(app_router(state()), "/agents/ghost").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_deregister_reports_removal() {
        let state = state();
        let app = app_router(state.clone());
        post(
            app.clone(),
            "/agents/register",
            register_body("a1", "data.retrieval"),
        )
        .await;

        let delete_req = |uri: &str| {
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(delete_req("/agents/a1")).await.unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["removed"], true);

        // Second delete on the same id: absent, not an error.
        let response = app.oneshot(delete_req("/agents/a1")).await.unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["removed"], false);
    }

    #[tokio::test]
    async fn test_discover_returns_ranked_matches() {
        let state = state();
        let app = app_router(state.clone());
        post(
            app.clone(),
            "/agents/register",
            register_body("data-agent", "data.retrieval"),
        )
        .await;
        post(
            app.clone(),
            "/agents/register",
            register_body("viz-agent", "visualization.charts"),
        )
        .await;

        let (status, json) = post(
            app,
            "/discover",
            json!({"intent_text": "retrieve data tables"}).to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let matches = json["matches"].as_array().unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0]["agent_id"], "data-agent");
    }

    #[tokio::test]
    async fn test_orchestrate_end_to_end() {
        let state = state();
        let app = app_router(state.clone());
        post(
            app.clone(),
            "/agents/register",
            register_body("data-agent", "data.retrieval"),
        )
        .await;
        post(
            app.clone(),
            "/agents/register",
            register_body("viz-agent", "visualization.charts"),
        )
        .await;

        let (status, json) = post(
            app,
            "/orchestrate",
            json!({"query_text": "show renewable energy by country"}).to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "completed");
        assert_eq!(json["outcomes"]["data-agent"]["success"], true);
        assert_eq!(json["outcomes"]["viz-agent"]["success"], true);
        assert!(!json["trace"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_orchestrate_with_empty_registry_completes() {
        let (status, json) = post(
            app_router(state()),
            "/orchestrate",
            json!({"query_text": "anything"}).to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "completed");
        assert!(json["outcomes"].as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_agents_and_health_snapshot() {
        let state = state();
        let app = app_router(state.clone());
        post(
            app.clone(),
            "/agents/register",
            register_body("a1", "data.retrieval"),
        )
        .await;

        let (_, listing) = get_json(app.clone(), "/agents").await;
        assert_eq!(listing["agents"].as_array().unwrap().len(), 1);

        let (_, snapshot) = get_json(app, "/agents/health").await;
        assert_eq!(snapshot["health"]["a1"]["status"], "unknown");
    }
}
