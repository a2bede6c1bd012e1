//! WebSocket layer: wire contract, decoding, and connection sessions.
//!
//! The endpoint at `/ws` accepts a one-directional stream of command frames.
//! Nothing is ever sent back except a close frame on shutdown.

pub mod connection;
pub mod decoder;
pub mod handler;
pub mod messages;

pub use decoder::{Decoded, decode};
