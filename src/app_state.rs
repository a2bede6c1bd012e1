//! Shared application state injected into all Axum handlers.

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::domain::EventBus;
use crate::runtime::RuntimeHandle;
use crate::service::CommandSink;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Control runtime handle, read for liveness.
    pub runtime: RuntimeHandle,
    /// Command sink shared by every session.
    pub sink: CommandSink,
    /// Session lifecycle events.
    pub events: EventBus,
    /// Tracks every running session so shutdown can wait for them.
    pub sessions: TaskTracker,
    /// Process-wide shutdown signal; sessions get child tokens.
    pub shutdown: CancellationToken,
    /// Largest accepted inbound message, in bytes.
    pub max_message_bytes: usize,
}

impl AppState {
    /// Builds state with a fresh session tracker.
    #[must_use]
    pub fn new(
        runtime: RuntimeHandle,
        sink: CommandSink,
        events: EventBus,
        shutdown: CancellationToken,
        max_message_bytes: usize,
    ) -> Self {
        Self {
            runtime,
            sink,
            events,
            sessions: TaskTracker::new(),
            shutdown,
            max_message_bytes,
        }
    }
}
