//! teleop-bridge entry point.
//!
//! Starts the simulated control runtime, the TLS WebSocket server, and the
//! runtime pump, and stops all of them on Ctrl-C.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use teleop_bridge::bridge::Bridge;
use teleop_bridge::config::{BridgeConfig, LogFormat};
use teleop_bridge::runtime::{RuntimeHandle, SimRuntime};
use teleop_bridge::server::Transport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = BridgeConfig::from_env().context("loading configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
    tracing::info!(addr = %config.listen_addr, node = %config.node_name, "starting teleop-bridge");

    // Load TLS material
    let transport = Transport::tls_from_pem_files(&config.tls_cert_path, &config.tls_key_path)
        .await
        .context("loading TLS certificate and key")?;

    // Start the control runtime
    let runtime: RuntimeHandle = Arc::new(SimRuntime::new(config.node_name.clone()));

    // Bind server and prepare pump
    let bridge = Bridge::start(&config, runtime, transport).context("starting bridge")?;
    tracing::info!(addr = %bridge.local_addr(), topic = %config.cmd_vel_topic, "bridge ready");

    let shutdown = bridge.shutdown_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("ctrl-c received");
                shutdown.cancel();
            }
            Err(e) => tracing::error!(error = %e, "cannot listen for ctrl-c"),
        }
    });

    bridge.run().await.context("bridge stopped with an error")?;
    tracing::info!("teleop-bridge exited cleanly");
    Ok(())
}
