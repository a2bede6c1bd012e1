//! Per-session lifecycle state.

use std::fmt;

use serde::Serialize;

/// Lifecycle of one connection: `Connecting -> Open -> Closed`.
///
/// Owned by exactly one session; transitions only move forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Upgrade accepted, handshake not yet complete.
    #[default]
    Connecting,
    /// Frames are being received.
    Open,
    /// Connection released. Terminal.
    Closed,
}

impl ConnectionState {
    /// Moves `Connecting` to `Open`. Any other state is left unchanged.
    #[must_use]
    pub const fn open(self) -> Self {
        match self {
            Self::Connecting => Self::Open,
            other => other,
        }
    }

    /// Moves any state to `Closed`.
    #[must_use]
    pub const fn close(self) -> Self {
        Self::Closed
    }

    /// Returns `true` while frames should still be read.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}
