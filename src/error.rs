//! Bridge error types.
//!
//! [`BridgeError`] is the central error type for the bridge. Each variant is
//! either process-scoped (startup, runtime death) or session-scoped
//! (publish failures, transport errors). Per-message decode failures use the
//! separate [`DecodeError`] so they can never be confused with errors that
//! end a connection.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Errors raised by the control runtime collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    /// The runtime has been shut down and no longer accepts work.
    #[error("control runtime is shut down")]
    ShutDown,

    /// The runtime refused to create a publisher.
    #[error("cannot create publisher on {topic}: {reason}")]
    PublisherRejected {
        /// Topic the publisher was requested for.
        topic: String,
        /// Reason reported by the runtime.
        reason: String,
    },

    /// The runtime rejected a published message.
    #[error("publish on {topic} rejected: {reason}")]
    PublishRejected {
        /// Topic the message was published on.
        topic: String,
        /// Reason reported by the runtime.
        reason: String,
    },

    /// Internal runtime state became unusable (poisoned lock, dead worker).
    #[error("control runtime failure: {0}")]
    Internal(String),
}

/// Per-message decode failure.
///
/// Never fatal to the owning connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The frame is not a valid JSON document.
    #[error("malformed: {0}")]
    Malformed(String),

    /// The frame is valid JSON but not an object.
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// A command field holds a value that cannot be converted to a number.
    #[error("invalid field `{field}`: {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Server-side error enum for the bridge.
///
/// # Scope
///
/// | Variant           | Scope      | Effect                          |
/// |-------------------|------------|---------------------------------|
/// | `Config`          | process    | startup aborted                 |
/// | `Tls`             | process    | startup aborted                 |
/// | `Bind`            | process    | startup aborted                 |
/// | `RuntimeInit`     | process    | startup aborted                 |
/// | `Runtime`         | process    | bridge shut down                |
/// | `Serve`           | process    | bridge shut down                |
/// | `ShutdownTimeout` | process    | reported after shutdown         |
/// | `Publish`         | session    | logged, session continues       |
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Configuration value could not be parsed or is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Certificate or private key could not be loaded.
    #[error("tls material at {path}: {source}")]
    Tls {
        /// Path of the offending file.
        path: PathBuf,
        /// Underlying I/O or parse error.
        #[source]
        source: io::Error,
    },

    /// Listening socket could not be bound.
    #[error("cannot bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The control runtime could not be initialised.
    #[error("control runtime init failed: {0}")]
    RuntimeInit(#[source] RuntimeError),

    /// The control runtime failed while being serviced.
    #[error("control runtime failed: {0}")]
    Runtime(#[source] RuntimeError),

    /// Publishing a command to the control topic failed.
    #[error("publish failed: {0}")]
    Publish(#[source] RuntimeError),

    /// The HTTP/WebSocket server loop failed.
    #[error("server error: {0}")]
    Serve(#[source] io::Error),

    /// Sessions were still open when the shutdown deadline expired.
    #[error("{remaining} session(s) still open after shutdown timeout")]
    ShutdownTimeout {
        /// Number of sessions that had not closed.
        remaining: usize,
    },
}

impl BridgeError {
    /// Returns `true` if this error must terminate the whole bridge.
    ///
    /// Session-scoped errors (publish failures) return `false`.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Publish(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_errors_are_session_scoped() {
        let err = BridgeError::Publish(RuntimeError::ShutDown);
        assert!(!err.is_fatal());
    }

    #[test]
    fn startup_errors_are_fatal() {
        let err = BridgeError::Tls {
            path: PathBuf::from("cert.pem"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.is_fatal());
        assert!(BridgeError::Config("bad".to_string()).is_fatal());
        assert!(BridgeError::Runtime(RuntimeError::ShutDown).is_fatal());
    }

    #[test]
    fn decode_error_messages_carry_reason() {
        let err = DecodeError::InvalidField {
            field: "linear",
            reason: "null is not a number".to_string(),
        };
        assert_eq!(err.to_string(), "invalid field `linear`: null is not a number");
    }
}
