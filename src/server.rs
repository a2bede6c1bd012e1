//! Bridge server: owns the listening socket and the session lifecycle.
//!
//! [`BridgeServer`] binds the listener up front (so bind failures surface at
//! startup), serves the router over plain TCP or TLS, and on shutdown stops
//! accepting, lets the cancelled sessions close, and waits for every one of
//! them within a bounded deadline.

use std::fmt;
use std::net::{SocketAddr, TcpListener};
use std::path::Path;
use std::time::Duration;

use axum_server::Handle;
use tokio::time::Instant;
use tokio_util::task::TaskTracker;
use axum_server::tls_rustls::RustlsConfig;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::AppState;
use crate::error::BridgeError;

/// How accepted connections are secured.
#[derive(Clone)]
pub enum Transport {
    /// Plain TCP, for embedding behind a TLS terminator and for tests.
    Plain,
    /// TLS with the given rustls server configuration.
    Tls(RustlsConfig),
}

impl Transport {
    /// Loads a PEM certificate chain and private key.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Tls`] if either file is missing or the
    /// material cannot be parsed.
    pub async fn tls_from_pem_files(cert: &Path, key: &Path) -> Result<Self, BridgeError> {
        for path in [cert, key] {
            tokio::fs::metadata(path)
                .await
                .map_err(|source| BridgeError::Tls {
                    path: path.to_path_buf(),
                    source,
                })?;
        }
        let config = RustlsConfig::from_pem_file(cert, key)
            .await
            .map_err(|source| BridgeError::Tls {
                path: cert.to_path_buf(),
                source,
            })?;
        Ok(Self::Tls(config))
    }

    /// Returns `true` for [`Transport::Tls`].
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => f.write_str("Plain"),
            Self::Tls(_) => f.write_str("Tls(..)"),
        }
    }
}

/// WebSocket server accepting controller connections.
#[derive(Debug)]
pub struct BridgeServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    transport: Transport,
    state: AppState,
    shutdown_timeout: Duration,
}

impl BridgeServer {
    /// Binds `addr` without accepting yet.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Bind`] if the address is unavailable.
    pub fn bind(
        addr: SocketAddr,
        transport: Transport,
        state: AppState,
        shutdown_timeout: Duration,
    ) -> Result<Self, BridgeError> {
        let bind_err = |source| BridgeError::Bind { addr, source };
        let listener = TcpListener::bind(addr).map_err(bind_err)?;
        listener.set_nonblocking(true).map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        Ok(Self {
            listener,
            local_addr,
            transport,
            state,
            shutdown_timeout,
        })
    }

    /// Address actually bound (resolves port `0`).
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared state handed to every handler.
    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// Serves until the shutdown token is cancelled, then drains sessions.
    ///
    /// The shutdown token is cancelled on the way out whatever the cause,
    /// so the runtime pump stops with the server.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Serve`] if the accept loop fails and
    /// [`BridgeError::ShutdownTimeout`] if sessions are still open after the
    /// shutdown deadline.
    pub async fn run(self) -> Result<(), BridgeError> {
        let Self {
            listener,
            local_addr,
            transport,
            state,
            shutdown_timeout,
        } = self;

        let shutdown = state.shutdown.clone();
        let sessions = state.sessions.clone();
        let app = api::build_router()
            .layer(TraceLayer::new_for_http())
            .with_state(state)
            .into_make_service_with_connect_info::<SocketAddr>();

        let handle = Handle::new();
        let watcher = {
            let handle = handle.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                shutdown.cancelled().await;
                tracing::info!("shutdown requested, no longer accepting connections");
                let deadline = Instant::now() + shutdown_timeout;
                handle.graceful_shutdown(Some(shutdown_timeout));
                deadline
            })
        };

        tracing::info!(addr = %local_addr, tls = transport.is_tls(), "bridge listening");

        let served = match transport {
            Transport::Plain => {
                axum_server::from_tcp(listener)
                    .handle(handle)
                    .serve(app)
                    .await
            }
            Transport::Tls(config) => {
                axum_server::from_tcp_rustls(listener, config)
                    .handle(handle)
                    .serve(app)
                    .await
            }
        };

        shutdown.cancel();
        // One deadline, taken when shutdown began, bounds both the listener
        // drain and the session drain.
        let deadline = watcher
            .await
            .unwrap_or_else(|_| Instant::now() + shutdown_timeout);
        tracing::info!(addr = %local_addr, "listener released");

        let drained = drain_sessions(&sessions, deadline).await;
        served.map_err(BridgeError::Serve)?;
        drained
    }
}

/// Closes `sessions` to new work and waits until every session has finished
/// or `deadline` passes.
///
/// # Errors
///
/// Returns [`BridgeError::ShutdownTimeout`] with the number of sessions still
/// running at the deadline.
pub async fn drain_sessions(sessions: &TaskTracker, deadline: Instant) -> Result<(), BridgeError> {
    sessions.close();
    if tokio::time::timeout_at(deadline, sessions.wait()).await.is_err() {
        let remaining = sessions.len();
        tracing::warn!(remaining, "sessions still open after shutdown timeout");
        return Err(BridgeError::ShutdownTimeout { remaining });
    }
    tracing::info!("all sessions closed");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drain_returns_once_sessions_finish() {
        let sessions = TaskTracker::new();
        let token = sessions.token();
        let finisher = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(token);
        });

        let deadline = Instant::now() + Duration::from_secs(5);
        assert!(drain_sessions(&sessions, deadline).await.is_ok());
        assert!(finisher.await.is_ok());
    }

    #[tokio::test]
    async fn drain_stops_at_the_deadline() {
        let sessions = TaskTracker::new();
        let _stuck = sessions.token();

        let started = Instant::now();
        let deadline = started + Duration::from_millis(50);
        let result = drain_sessions(&sessions, deadline).await;

        assert!(matches!(
            result,
            Err(BridgeError::ShutdownTimeout { remaining: 1 })
        ));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn elapsed_deadline_does_not_wait_again() {
        let sessions = TaskTracker::new();
        let _stuck = sessions.token();

        let started = Instant::now();
        let result = drain_sessions(&sessions, started).await;

        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_millis(500));
    }
}
