//! Bridge assembly: wires the sink, server, and runtime pump together.
//!
//! The server and the pump run as two independent tasks. They share the
//! [`RuntimeHandle`] and one [`CancellationToken`]; whichever stops first
//! cancels the token and the other follows.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use tokio_util::sync::CancellationToken;

use crate::app_state::AppState;
use crate::config::BridgeConfig;
use crate::domain::EventBus;
use crate::error::{BridgeError, RuntimeError};
use crate::runtime::{PumpExit, RuntimeHandle, RuntimePump};
use crate::server::{BridgeServer, Transport};
use crate::service::CommandSink;

/// A fully started bridge, bound and ready to run.
#[derive(Debug)]
pub struct Bridge {
    server: BridgeServer,
    pump: RuntimePump,
    shutdown: CancellationToken,
}

impl Bridge {
    /// Creates the control-topic publisher, binds the listener, and prepares
    /// the pump.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::RuntimeInit`] if the runtime is already down or
    /// refuses the publisher, and [`BridgeError::Bind`] if the listen address
    /// is unavailable.
    pub fn start(
        config: &BridgeConfig,
        runtime: RuntimeHandle,
        transport: Transport,
    ) -> Result<Self, BridgeError> {
        if !runtime.ok() {
            return Err(BridgeError::RuntimeInit(RuntimeError::ShutDown));
        }

        let sink = CommandSink::from_runtime(
            &runtime,
            &config.cmd_vel_topic,
            config.publisher_queue_depth,
        )?;
        let shutdown = CancellationToken::new();
        let state = AppState::new(
            Arc::clone(&runtime),
            sink,
            EventBus::new(config.event_bus_capacity),
            shutdown.clone(),
            config.max_message_bytes,
        );

        let server = BridgeServer::bind(
            config.listen_addr,
            transport,
            state,
            config.shutdown_timeout,
        )?;
        let pump = RuntimePump::new(
            runtime,
            config.pump_interval,
            config.spin_timeout,
            shutdown.clone(),
        );

        Ok(Self {
            server,
            pump,
            shutdown,
        })
    }

    /// Address the server is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    /// Token that stops the whole bridge when cancelled.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Session lifecycle event bus.
    #[must_use]
    pub fn events(&self) -> EventBus {
        self.server.state().events.clone()
    }

    /// Command sink shared by all sessions.
    #[must_use]
    pub fn sink(&self) -> CommandSink {
        self.server.state().sink.clone()
    }

    /// Counter of completed runtime spins.
    #[must_use]
    pub fn pump_ticks(&self) -> Arc<AtomicU64> {
        self.pump.tick_counter()
    }

    /// Runs server and pump concurrently until shutdown.
    ///
    /// # Errors
    ///
    /// Returns the pump's [`BridgeError::Runtime`] if the runtime failed,
    /// otherwise any server error.
    pub async fn run(self) -> Result<(), BridgeError> {
        let Self {
            server,
            pump,
            shutdown,
        } = self;

        let pump_task = tokio::spawn(pump.run());
        let served = server.run().await;
        shutdown.cancel();

        let pumped = match pump_task.await {
            Ok(result) => result,
            Err(e) => Err(BridgeError::Runtime(RuntimeError::Internal(format!(
                "pump task failed: {e}"
            )))),
        };

        match (pumped, served) {
            (Err(e), _) | (Ok(_), Err(e)) => Err(e),
            (Ok(exit), Ok(())) => {
                if exit == PumpExit::RuntimeStopped {
                    tracing::info!("bridge stopped because the control runtime stopped");
                }
                Ok(())
            }
        }
    }
}
