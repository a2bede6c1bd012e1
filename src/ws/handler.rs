//! Axum WebSocket upgrade handler.

use std::net::SocketAddr;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::connection::{SessionContext, run_session};
use crate::app_state::AppState;
use crate::domain::SessionId;

/// `GET /ws`: upgrades the HTTP connection to WebSocket.
///
/// The session is registered with the session tracker before the upgrade
/// response is sent and stays registered until its loop returns, so
/// shutdown waits for it. Upgrades requested after
/// shutdown began are refused with `503`.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    if state.shutdown.is_cancelled() {
        return (StatusCode::SERVICE_UNAVAILABLE, "bridge is shutting down").into_response();
    }

    let session_id = SessionId::new();
    tracing::debug!(%session_id, %peer, "ws upgrade accepted");

    let ctx = SessionContext {
        session_id,
        peer,
        sink: state.sink.clone(),
        events: state.events.clone(),
        shutdown: state.shutdown.child_token(),
    };
    // Counted from acceptance, not from when the upgraded socket arrives.
    let tracked = state.sessions.token();

    ws.max_message_size(state.max_message_bytes)
        .on_failed_upgrade(move |e| {
            tracing::warn!(%session_id, %peer, error = %e, "ws upgrade failed");
        })
        .on_upgrade(move |socket| async move {
            run_session(socket, ctx).await;
            drop(tracked);
        })
}
