//! Domain layer: command values, session identity, and lifecycle events.
//!
//! This module contains the bridge's domain model: the validated
//! [`MotionCommand`] and its [`Twist`] topic form, per-connection identity and
//! state, and the event bus that broadcasts session lifecycle changes.

pub mod connection_state;
pub mod event_bus;
pub mod motion_command;
pub mod session_event;
pub mod session_id;

pub use connection_state::ConnectionState;
pub use event_bus::EventBus;
pub use motion_command::{MotionCommand, Twist, Vector3};
pub use session_event::{CloseReason, SessionEvent};
pub use session_id::SessionId;
