//! Session lifecycle events.
//!
//! Every session announces its transitions through the
//! [`super::EventBus`]. Observers learn about state changes without touching
//! the session's own [`super::ConnectionState`].

use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{MotionCommand, SessionId};

/// Why a session reached `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The client sent a close frame.
    ClientClosed,
    /// The stream ended without a close frame.
    StreamEnded,
    /// A read failed at the transport level.
    TransportError,
    /// The bridge is shutting down.
    Shutdown,
}

/// Lifecycle event emitted by a connection session.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Upgrade completed, the session is open.
    Opened {
        /// Session identifier.
        session_id: SessionId,
        /// Remote address of the client.
        peer: SocketAddr,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// A command was forwarded to the control topic.
    CommandPublished {
        /// Session identifier.
        session_id: SessionId,
        /// The command that was published.
        command: MotionCommand,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// The control runtime rejected a command.
    PublishFailed {
        /// Session identifier.
        session_id: SessionId,
        /// Rendered error.
        error: String,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// The session reached `Closed` and released its connection.
    Closed {
        /// Session identifier.
        session_id: SessionId,
        /// Why the session closed.
        reason: CloseReason,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// Returns the session this event belongs to.
    #[must_use]
    pub const fn session_id(&self) -> SessionId {
        match self {
            Self::Opened { session_id, .. }
            | Self::CommandPublished { session_id, .. }
            | Self::PublishFailed { session_id, .. }
            | Self::Closed { session_id, .. } => *session_id,
        }
    }

    /// Returns the event type as a static string.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::Opened { .. } => "opened",
            Self::CommandPublished { .. } => "command_published",
            Self::PublishFailed { .. } => "publish_failed",
            Self::Closed { .. } => "closed",
        }
    }
}
