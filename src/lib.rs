//! # teleop-bridge
//!
//! Secure WebSocket command bridge for robot teleoperation.
//!
//! A remote controller (typically a VR headset page) streams JSON velocity
//! commands over a TLS WebSocket. The bridge decodes each frame, validates
//! it into a [`domain::MotionCommand`], and publishes it on the robot's
//! control topic. A runtime pump keeps the control runtime serviced on a
//! fixed cadence, independently of network traffic.
//!
//! ## Architecture
//!
//! ```text
//! Controller (wss://…/ws)
//!     │
//!     ├── BridgeServer (server)        ── accept, TLS, shutdown
//!     ├── Session per client (ws/)     ── receive loop
//!     │     └── decode (ws/decoder)
//!     │
//!     ├── CommandSink (service/)
//!     │
//!     └── ControlRuntime (runtime/)    ◄── RuntimePump ticks
//! ```

pub mod api;
pub mod app_state;
pub mod bridge;
pub mod config;
pub mod domain;
pub mod error;
pub mod runtime;
pub mod server;
pub mod service;
pub mod ws;
