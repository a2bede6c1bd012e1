//! Bridge configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::BridgeError;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Top-level bridge configuration.
///
/// Loaded once at startup via [`BridgeConfig::from_env`].
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Socket address to bind the WebSocket server to (e.g. `0.0.0.0:8765`).
    pub listen_addr: SocketAddr,

    /// PEM certificate chain.
    pub tls_cert_path: PathBuf,

    /// PEM private key.
    pub tls_key_path: PathBuf,

    /// Name of the control runtime node.
    pub node_name: String,

    /// Control topic receiving motion commands.
    pub cmd_vel_topic: String,

    /// Keep-last depth of the control topic publisher.
    pub publisher_queue_depth: usize,

    /// Cadence of the runtime pump.
    pub pump_interval: Duration,

    /// Longest a single runtime spin may wait for work.
    pub spin_timeout: Duration,

    /// Deadline for open sessions to close during shutdown.
    pub shutdown_timeout: Duration,

    /// Largest accepted inbound WebSocket message, in bytes.
    pub max_message_bytes: usize,

    /// Capacity of the session EventBus broadcast channel.
    pub event_bus_capacity: usize,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8765)),
            tls_cert_path: PathBuf::from("cert.pem"),
            tls_key_path: PathBuf::from("key.pem"),
            node_name: "vr_teleop_bridge".to_string(),
            cmd_vel_topic: "turtle1/cmd_vel".to_string(),
            publisher_queue_depth: 10,
            pump_interval: Duration::from_millis(10),
            spin_timeout: Duration::ZERO,
            shutdown_timeout: Duration::from_secs(5),
            max_message_bytes: 64 * 1024,
            event_bus_capacity: 1024,
            log_format: LogFormat::Text,
        }
    }
}

impl BridgeConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to the [`Default`] values when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] if `LISTEN_ADDR` is set but cannot be
    /// parsed as a [`SocketAddr`], or if a duration or size that must be
    /// positive (pump interval, shutdown timeout, queue depth, message size)
    /// is zero.
    pub fn from_env() -> Result<Self, BridgeError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`BridgeConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BridgeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let listen_addr = match lookup("LISTEN_ADDR") {
            Some(raw) => raw
                .parse()
                .map_err(|e| BridgeError::Config(format!("LISTEN_ADDR {raw:?}: {e}")))?,
            None => defaults.listen_addr,
        };

        let config = Self {
            listen_addr,
            tls_cert_path: lookup("TLS_CERT_PATH")
                .map_or(defaults.tls_cert_path, PathBuf::from),
            tls_key_path: lookup("TLS_KEY_PATH").map_or(defaults.tls_key_path, PathBuf::from),
            node_name: lookup("NODE_NAME").unwrap_or(defaults.node_name),
            cmd_vel_topic: lookup("CMD_VEL_TOPIC").unwrap_or(defaults.cmd_vel_topic),
            publisher_queue_depth: parse_or(
                &lookup,
                "PUBLISHER_QUEUE_DEPTH",
                defaults.publisher_queue_depth,
            ),
            pump_interval: parse_millis_or(&lookup, "PUMP_INTERVAL_MS", defaults.pump_interval),
            spin_timeout: parse_millis_or(&lookup, "SPIN_TIMEOUT_MS", defaults.spin_timeout),
            shutdown_timeout: Duration::from_secs(parse_or(
                &lookup,
                "SHUTDOWN_TIMEOUT_SECS",
                defaults.shutdown_timeout.as_secs(),
            )),
            max_message_bytes: parse_or(&lookup, "MAX_MESSAGE_BYTES", defaults.max_message_bytes),
            event_bus_capacity: parse_or(
                &lookup,
                "EVENT_BUS_CAPACITY",
                defaults.event_bus_capacity,
            ),
            log_format: match lookup("LOG_FORMAT").as_deref() {
                Some("json") | Some("JSON") => LogFormat::Json,
                _ => LogFormat::Text,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), BridgeError> {
        if self.pump_interval.is_zero() {
            return Err(BridgeError::Config(
                "PUMP_INTERVAL_MS must be greater than zero".to_string(),
            ));
        }
        if self.shutdown_timeout.is_zero() {
            return Err(BridgeError::Config(
                "SHUTDOWN_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        if self.publisher_queue_depth == 0 {
            return Err(BridgeError::Config(
                "PUBLISHER_QUEUE_DEPTH must be greater than zero".to_string(),
            ));
        }
        if self.max_message_bytes == 0 {
            return Err(BridgeError::Config(
                "MAX_MESSAGE_BYTES must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parses a variable as `T`, returning `default` on missing or invalid
/// values.
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Parses a millisecond variable, returning `default` on missing or invalid
/// values.
fn parse_millis_or<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .map_or(default, Duration::from_millis)
}
