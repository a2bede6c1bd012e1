//! Control runtime seam.
//!
//! The bridge talks to the robot control runtime only through the two
//! traits in this module: [`ControlRuntime`] (liveness, periodic servicing,
//! publisher creation) and [`TwistPublisher`] (the control topic). The
//! binary ships with [`SimRuntime`], an in-process turtlesim-style runtime;
//! a real middleware binding implements the same traits.
//!
//! # Thread safety
//!
//! Both traits require `Send + Sync`. Implementations must accept concurrent
//! calls from any number of sessions plus the pump without the caller
//! holding a lock; [`SimRuntime`] serializes internally with a mutex.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::Twist;
use crate::error::RuntimeError;

pub mod pump;
pub mod sim;

pub use pump::{PumpExit, RuntimePump};
pub use sim::SimRuntime;

/// Shared handle to the control runtime, created once at startup.
pub type RuntimeHandle = Arc<dyn ControlRuntime>;

/// The external control runtime.
pub trait ControlRuntime: Send + Sync + Debug {
    /// Returns `true` while the runtime accepts work.
    fn ok(&self) -> bool;

    /// Processes pending work, waiting at most `timeout` for some to arrive.
    ///
    /// May block the calling thread; callers run it off the async workers.
    ///
    /// # Errors
    ///
    /// Returns a [`RuntimeError`] if the runtime can no longer be serviced.
    fn spin_once(&self, timeout: Duration) -> Result<(), RuntimeError>;

    /// Creates a publisher for `topic` keeping at most `depth` queued
    /// messages.
    ///
    /// # Errors
    ///
    /// Returns a [`RuntimeError`] if the runtime refuses the publisher.
    fn create_twist_publisher(
        &self,
        topic: &str,
        depth: usize,
    ) -> Result<Arc<dyn TwistPublisher>, RuntimeError>;

    /// Stops the runtime. Idempotent.
    fn shutdown(&self);
}

/// Publisher bound to one control topic.
pub trait TwistPublisher: Send + Sync + Debug {
    /// Topic this publisher writes to.
    fn topic(&self) -> &str;

    /// Publishes one message. Must not block.
    ///
    /// # Errors
    ///
    /// Returns a [`RuntimeError`] if the runtime rejects the message.
    fn publish(&self, twist: Twist) -> Result<(), RuntimeError>;
}
