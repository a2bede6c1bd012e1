//! HTTP API layer: system endpoints and router composition.

pub mod system;

use axum::Router;
use axum::routing::get;

use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// Builds the complete router: the `/ws` upgrade endpoint plus system
/// routes.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws_handler))
        .merge(system::routes())
}
