//! Shared helpers for end-to-end tests: a recording control runtime, a
//! bridge launcher over plain TCP, and a WebSocket client.

#![allow(dead_code, clippy::panic)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::SinkExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName};
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use teleop_bridge::bridge::Bridge;
use teleop_bridge::config::BridgeConfig;
use teleop_bridge::domain::{SessionEvent, Twist};
use teleop_bridge::error::{BridgeError, RuntimeError};
use teleop_bridge::runtime::{ControlRuntime, RuntimeHandle, TwistPublisher};
use teleop_bridge::server::Transport;

/// Client side of a test connection.
pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Client side of a test connection over TLS.
pub type TlsClient = WebSocketStream<TlsStream<TcpStream>>;

/// How long any single wait in a test may take.
pub const WAIT: Duration = Duration::from_secs(5);

/// Publisher that records every twist it accepts.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    sent: Mutex<Vec<Twist>>,
    reject: AtomicBool,
}

impl RecordingPublisher {
    /// `(linear.x, angular.z)` of every accepted twist, in arrival order.
    pub fn sent(&self) -> Vec<(f64, f64)> {
        let Ok(sent) = self.sent.lock() else {
            panic!("recording lock poisoned");
        };
        sent.iter().map(|t| (t.linear.x, t.angular.z)).collect()
    }

    /// Makes subsequent publishes fail (or succeed again).
    pub fn set_reject(&self, reject: bool) {
        self.reject.store(reject, Ordering::Release);
    }
}

impl TwistPublisher for RecordingPublisher {
    fn topic(&self) -> &str {
        "turtle1/cmd_vel"
    }

    fn publish(&self, twist: Twist) -> Result<(), RuntimeError> {
        if self.reject.load(Ordering::Acquire) {
            return Err(RuntimeError::PublishRejected {
                topic: self.topic().to_string(),
                reason: "rejected by test".to_string(),
            });
        }
        let Ok(mut sent) = self.sent.lock() else {
            panic!("recording lock poisoned");
        };
        sent.push(twist);
        Ok(())
    }
}

/// Control runtime that counts spins and records published twists.
#[derive(Debug)]
pub struct RecordingRuntime {
    alive: AtomicBool,
    spins: AtomicU64,
    publisher: Arc<RecordingPublisher>,
}

impl RecordingRuntime {
    /// A live runtime with an empty recording.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            alive: AtomicBool::new(true),
            spins: AtomicU64::new(0),
            publisher: Arc::new(RecordingPublisher::default()),
        })
    }

    /// The single publisher handed to the bridge.
    pub fn publisher(&self) -> &RecordingPublisher {
        &self.publisher
    }

    /// Spins completed so far.
    pub fn spins(&self) -> u64 {
        self.spins.load(Ordering::Acquire)
    }
}

impl ControlRuntime for RecordingRuntime {
    fn ok(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    fn spin_once(&self, _timeout: Duration) -> Result<(), RuntimeError> {
        if !self.ok() {
            return Err(RuntimeError::ShutDown);
        }
        self.spins.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn create_twist_publisher(
        &self,
        _topic: &str,
        _depth: usize,
    ) -> Result<Arc<dyn TwistPublisher>, RuntimeError> {
        Ok(Arc::clone(&self.publisher) as Arc<dyn TwistPublisher>)
    }

    fn shutdown(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

/// A running bridge under test.
#[derive(Debug)]
pub struct TestBridge {
    /// Bound address.
    pub addr: SocketAddr,
    /// Cancels the whole bridge.
    pub shutdown: CancellationToken,
    /// Subscribed before any client connects.
    pub events: broadcast::Receiver<SessionEvent>,
    /// Completed runtime spins.
    pub ticks: Arc<AtomicU64>,
    /// The bridge's `run` task.
    pub task: JoinHandle<Result<(), BridgeError>>,
}

/// Test configuration: loopback, ephemeral port, 10 ms pump.
pub fn test_config() -> BridgeConfig {
    BridgeConfig {
        listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        shutdown_timeout: Duration::from_secs(3),
        ..BridgeConfig::default()
    }
}

/// Starts a bridge over plain TCP backed by `runtime`.
pub fn start_bridge(runtime: &Arc<RecordingRuntime>) -> TestBridge {
    start_bridge_with(runtime, &test_config(), Transport::Plain)
}

/// Starts a bridge with an explicit configuration and transport.
pub fn start_bridge_with(
    runtime: &Arc<RecordingRuntime>,
    config: &BridgeConfig,
    transport: Transport,
) -> TestBridge {
    let handle: RuntimeHandle = Arc::clone(runtime) as RuntimeHandle;
    let bridge = match Bridge::start(config, handle, transport) {
        Ok(bridge) => bridge,
        Err(e) => panic!("bridge failed to start: {e}"),
    };
    let addr = bridge.local_addr();
    let shutdown = bridge.shutdown_token();
    let events = bridge.events().subscribe();
    let ticks = bridge.pump_ticks();
    let task = tokio::spawn(bridge.run());
    TestBridge {
        addr,
        shutdown,
        events,
        ticks,
        task,
    }
}

/// Opens a WebSocket connection to the bridge.
pub async fn connect(addr: SocketAddr) -> Client {
    let url = format!("ws://{addr}/ws");
    match tokio::time::timeout(WAIT, tokio_tungstenite::connect_async(url)).await {
        Ok(Ok((client, _response))) => client,
        Ok(Err(e)) => panic!("ws connect failed: {e}"),
        Err(_) => panic!("ws connect timed out"),
    }
}

/// Sends one text frame over a plain or TLS connection.
pub async fn send_text<S>(client: &mut WebSocketStream<S>, text: &str)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if let Err(e) = client.send(Message::text(text)).await {
        panic!("ws send failed: {e}");
    }
}

/// Waits for the next event matching `pred`, skipping others.
pub async fn next_event<F>(events: &mut broadcast::Receiver<SessionEvent>, pred: F) -> SessionEvent
where
    F: Fn(&SessionEvent) -> bool,
{
    let wait = async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
            }
        }
    };
    match tokio::time::timeout(WAIT, wait).await {
        Ok(event) => event,
        Err(_) => panic!("timed out waiting for session event"),
    }
}

/// Returns `true` for `CommandPublished` events.
pub fn is_published(event: &SessionEvent) -> bool {
    matches!(event, SessionEvent::CommandPublished { .. })
}

/// Returns `true` for `Opened` events.
pub fn is_opened(event: &SessionEvent) -> bool {
    matches!(event, SessionEvent::Opened { .. })
}

/// Returns `true` for `Closed` events.
pub fn is_closed(event: &SessionEvent) -> bool {
    matches!(event, SessionEvent::Closed { .. })
}

/// Self-signed certificate for `localhost`, as written to disk.
#[derive(Debug)]
pub struct TestCert {
    /// Directory holding both files; removed on drop.
    pub dir: PathBuf,
    /// PEM certificate path.
    pub cert_path: PathBuf,
    /// PEM private key path.
    pub key_path: PathBuf,
    /// DER certificate, trusted by [`connect_tls`].
    pub der: CertificateDer<'static>,
}

impl Drop for TestCert {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

/// A fresh directory under the system temp dir.
pub async fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("teleop-bridge-{}", uuid::Uuid::new_v4()));
    if let Err(e) = tokio::fs::create_dir_all(&dir).await {
        panic!("cannot create {}: {e}", dir.display());
    }
    dir
}

/// Generates a self-signed `localhost` certificate and writes it as PEM.
pub async fn write_test_cert() -> TestCert {
    let certified = match rcgen::generate_simple_self_signed(vec!["localhost".to_string()]) {
        Ok(certified) => certified,
        Err(e) => panic!("certificate generation failed: {e}"),
    };
    let dir = scratch_dir().await;
    let cert_path = dir.join("cert.pem");
    let key_path = dir.join("key.pem");
    if let Err(e) = tokio::fs::write(&cert_path, certified.cert.pem()).await {
        panic!("cannot write certificate: {e}");
    }
    if let Err(e) = tokio::fs::write(&key_path, certified.key_pair.serialize_pem()).await {
        panic!("cannot write key: {e}");
    }
    TestCert {
        dir,
        cert_path,
        key_path,
        der: certified.cert.der().clone(),
    }
}

/// Opens a `wss://` connection that trusts only `cert`.
pub async fn connect_tls(addr: SocketAddr, cert: &TestCert) -> TlsClient {
    let mut roots = RootCertStore::empty();
    if let Err(e) = roots.add(cert.der.clone()) {
        panic!("cannot trust test certificate: {e}");
    }
    let provider = Arc::new(tokio_rustls::rustls::crypto::aws_lc_rs::default_provider());
    let config = match ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
    {
        Ok(builder) => builder.with_root_certificates(roots).with_no_client_auth(),
        Err(e) => panic!("tls client config failed: {e}"),
    };
    let connector = TlsConnector::from(Arc::new(config));

    let connecting = async {
        let tcp = match TcpStream::connect(addr).await {
            Ok(tcp) => tcp,
            Err(e) => panic!("tcp connect failed: {e}"),
        };
        let Ok(server_name) = ServerName::try_from("localhost") else {
            panic!("invalid server name");
        };
        let tls = match connector.connect(server_name, tcp).await {
            Ok(tls) => tls,
            Err(e) => panic!("tls handshake failed: {e}"),
        };
        match tokio_tungstenite::client_async("wss://localhost/ws", tls).await {
            Ok((client, _response)) => client,
            Err(e) => panic!("wss upgrade failed: {e}"),
        }
    };
    match tokio::time::timeout(WAIT, connecting).await {
        Ok(client) => client,
        Err(_) => panic!("wss connect timed out"),
    }
}
