//! System endpoints: health check.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    version: String,
    runtime_alive: bool,
    active_sessions: usize,
    commands_published: u64,
    topic: String,
}

/// `GET /health`: bridge health status.
///
/// Reports `503` once the control runtime has stopped or shutdown began.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let runtime_alive = state.runtime.ok();
    let healthy = runtime_alive && !state.shutdown.is_cancelled();
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if healthy { "healthy" } else { "unavailable" },
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            runtime_alive,
            active_sessions: state.sessions.len(),
            commands_published: state.sink.published_count(),
            topic: state.sink.topic().to_string(),
        }),
    )
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}
