//! HTTP endpoints
//!
//! Health probes, metrics, session introspection, and the WebSocket
//! upgrade route.

use axum::{
    extract::{Path, State},
    http::{HeaderValue, Method, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::websocket::ws_handler;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let config = state.config.read();
    let cors_layer = build_cors_layer(&config.server.cors_origins, config.server.cors_enabled);
    let ws_path = config.server.ws_path.clone();
    drop(config);

    Router::new()
        // Client transport
        .route(&ws_path, get(ws_handler))
        // Session introspection
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id", delete(delete_session))
        // Health probes
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Prometheus metrics
        .route("/metrics", get(metrics_handler))
        // Admin
        .route("/admin/reload-config", post(reload_config))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// Disabled CORS means a permissive layer (development only). With CORS
/// enabled and no origins configured, localhost is the safe default.
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            let value = origin.parse::<HeaderValue>().ok();
            if value.is_none() {
                tracing::warn!("Invalid CORS origin: {}", origin);
            }
            value
        })
        .collect();

    if parsed.is_empty() {
        tracing::info!("No valid CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin(HeaderValue::from_static("http://localhost:3000"))
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any);
    }

    tracing::info!("CORS configured with {} origins", parsed.len());
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(true)
}

/// Liveness probe
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness probe: up and accepting sessions
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let active = state.sessions.count();
    let max = state.get_config().server.max_connections;
    let ready = active < max;
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(serde_json::json!({
            "ready": ready,
            "active_sessions": active,
            "max_sessions": max,
        })),
    )
}

async fn list_sessions(State(state): State<AppState>) -> Json<serde_json::Value> {
    let ids = state.sessions.list_ids();
    Json(serde_json::json!({
        "sessions": ids,
        "count": ids.len(),
    }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let session = state.sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(serde_json::json!({
        "session_id": session.id(),
        "phase": format!("{:?}", session.phase()),
        "transcript_events": session.emit_count(),
        "recent_transcripts": session.recent_transcripts(),
        "history_turns": session.history_len(),
    })))
}

async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    state.sessions.remove(&id).await;
    StatusCode::NO_CONTENT
}

async fn reload_config(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.reload_config() {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({"status": "reloaded"})),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"status": "error", "message": e})),
        ),
    }
}
