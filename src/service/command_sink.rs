//! Command sink: forwards validated commands to the control topic.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::{MotionCommand, Twist};
use crate::error::BridgeError;
use crate::runtime::{RuntimeHandle, TwistPublisher};

/// Narrow publish interface shared by every session.
///
/// Holds the control-topic publisher obtained once at startup.
///
/// # Concurrency
///
/// `CommandSink` is cheap to clone and every clone shares one publisher.
/// It takes no lock of its own: concurrent calls rely on the
/// [`TwistPublisher`] `Send + Sync` contract, and the runtime decides how to
/// serialize them. Conflicting commands from different sessions reach the
/// runtime in arrival order, so the last write wins.
#[derive(Debug, Clone)]
pub struct CommandSink {
    publisher: Arc<dyn TwistPublisher>,
    published: Arc<AtomicU64>,
}

impl CommandSink {
    /// Wraps an existing publisher.
    #[must_use]
    pub fn new(publisher: Arc<dyn TwistPublisher>) -> Self {
        Self {
            publisher,
            published: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Creates the control-topic publisher on `runtime` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::RuntimeInit`] if the runtime refuses to create
    /// the publisher.
    pub fn from_runtime(
        runtime: &RuntimeHandle,
        topic: &str,
        depth: usize,
    ) -> Result<Self, BridgeError> {
        let publisher = runtime
            .create_twist_publisher(topic, depth)
            .map_err(BridgeError::RuntimeInit)?;
        Ok(Self::new(publisher))
    }

    /// Publishes one command as a [`Twist`].
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Publish`] if the runtime rejects the message.
    pub fn publish(&self, cmd: MotionCommand) -> Result<(), BridgeError> {
        self.publisher
            .publish(Twist::from(cmd))
            .map_err(BridgeError::Publish)?;
        self.published.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            topic = self.publisher.topic(),
            linear = cmd.linear(),
            angular = cmd.angular(),
            "published command"
        );
        Ok(())
    }

    /// Topic the sink publishes to.
    #[must_use]
    pub fn topic(&self) -> &str {
        self.publisher.topic()
    }

    /// Number of commands published successfully since startup.
    #[must_use]
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}
