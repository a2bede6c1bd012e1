//! Runtime pump: services the control runtime on a fixed cadence.
//!
//! The pump is an independent task. It shares only the [`RuntimeHandle`]
//! and the process [`CancellationToken`] with the server, so neither side
//! can starve the other: each spin runs on the blocking pool and the pump
//! suspends only on its interval timer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::RuntimeHandle;
use crate::error::{BridgeError, RuntimeError};

/// Why the pump stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpExit {
    /// The runtime reported it is no longer alive.
    RuntimeStopped,
    /// The shared shutdown token was cancelled.
    ShutdownRequested,
}

/// Periodic driver for [`super::ControlRuntime::spin_once`].
#[derive(Debug)]
pub struct RuntimePump {
    runtime: RuntimeHandle,
    interval: Duration,
    spin_timeout: Duration,
    shutdown: CancellationToken,
    ticks: Arc<AtomicU64>,
}

impl RuntimePump {
    /// Creates a pump spinning `runtime` every `interval`.
    ///
    /// `spin_timeout` bounds how long a single spin may wait for work.
    #[must_use]
    pub fn new(
        runtime: RuntimeHandle,
        interval: Duration,
        spin_timeout: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            runtime,
            interval,
            spin_timeout,
            shutdown,
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shared counter of completed spins.
    #[must_use]
    pub fn tick_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.ticks)
    }

    /// Runs until the runtime stops, a spin fails, or shutdown is requested.
    ///
    /// Whatever the cause, the shutdown token is cancelled and the runtime
    /// is shut down before returning, so the server stops as well.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Runtime`] if a spin fails while the runtime
    /// still reports itself alive.
    pub async fn run(self) -> Result<PumpExit, BridgeError> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval = ?self.interval, "runtime pump started");

        let result = loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break Ok(PumpExit::ShutdownRequested),
                _ = ticker.tick() => {}
            }

            if !self.runtime.ok() {
                break Ok(PumpExit::RuntimeStopped);
            }

            let runtime = Arc::clone(&self.runtime);
            let timeout = self.spin_timeout;
            match tokio::task::spawn_blocking(move || runtime.spin_once(timeout)).await {
                Ok(Ok(())) => {
                    self.ticks.fetch_add(1, Ordering::Relaxed);
                }
                Ok(Err(_)) if !self.runtime.ok() => break Ok(PumpExit::RuntimeStopped),
                Ok(Err(e)) => break Err(BridgeError::Runtime(e)),
                Err(e) => {
                    break Err(BridgeError::Runtime(RuntimeError::Internal(format!(
                        "spin task failed: {e}"
                    ))));
                }
            }
        };

        self.shutdown.cancel();
        self.runtime.shutdown();

        match &result {
            Ok(exit) => tracing::info!(
                ?exit,
                ticks = self.ticks.load(Ordering::Relaxed),
                "runtime pump stopped"
            ),
            Err(e) => tracing::error!(error = %e, "runtime pump failed"),
        }
        result
    }
}
