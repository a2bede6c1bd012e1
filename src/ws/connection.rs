//! WebSocket connection session.
//!
//! Handles the receive loop for a single WebSocket connection: every frame
//! is decoded and valid commands are forwarded to the [`CommandSink`].
//! Bad messages are logged and skipped; only transport failures, a client
//! close, or process shutdown end the session.

use std::net::SocketAddr;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, close_code};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio_util::sync::CancellationToken;

use super::decoder::{Decoded, decode};
use crate::domain::{CloseReason, ConnectionState, EventBus, SessionEvent, SessionId};
use crate::service::CommandSink;

/// Longest message excerpt written to logs, in characters.
pub const EXCERPT_CHARS: usize = 120;

/// Everything a session needs, owned by the session task.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Identity used in logs and events.
    pub session_id: SessionId,
    /// Remote address of the client.
    pub peer: SocketAddr,
    /// Shared command sink.
    pub sink: CommandSink,
    /// Lifecycle event bus.
    pub events: EventBus,
    /// Cancelled when the bridge shuts down.
    pub shutdown: CancellationToken,
}

/// Runs the receive loop for a single upgraded WebSocket connection.
///
/// Frames are processed strictly in receipt order. Returns why the session
/// closed.
pub async fn run_session(socket: WebSocket, ctx: SessionContext) -> CloseReason {
    let mut state = ConnectionState::Connecting.open();
    tracing::info!(session_id = %ctx.session_id, peer = %ctx.peer, %state, "ws client connected");
    ctx.events.publish(SessionEvent::Opened {
        session_id: ctx.session_id,
        peer: ctx.peer,
        timestamp: Utc::now(),
    });

    let (mut ws_tx, mut ws_rx) = socket.split();

    let reason = loop {
        tokio::select! {
            biased;
            () = ctx.shutdown.cancelled() => {
                let frame = CloseFrame {
                    code: close_code::AWAY,
                    reason: Utf8Bytes::from_static("bridge shutting down"),
                };
                if let Err(e) = ws_tx.send(Message::Close(Some(frame))).await {
                    tracing::debug!(session_id = %ctx.session_id, error = %e, "close frame not delivered");
                }
                break CloseReason::Shutdown;
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => handle_frame(&ctx, text.as_str().as_bytes()),
                    Some(Ok(Message::Binary(bytes))) => handle_frame(&ctx, &bytes),
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                    Some(Ok(Message::Close(frame))) => {
                        tracing::debug!(session_id = %ctx.session_id, ?frame, "client sent close");
                        break CloseReason::ClientClosed;
                    }
                    Some(Err(e)) => {
                        tracing::warn!(
                            session_id = %ctx.session_id,
                            peer = %ctx.peer,
                            error = %e,
                            "ws read failed"
                        );
                        break CloseReason::TransportError;
                    }
                    None => break CloseReason::StreamEnded,
                }
            }
        }
    };

    drop(ws_tx);
    drop(ws_rx);
    state = state.close();

    tracing::info!(
        session_id = %ctx.session_id,
        peer = %ctx.peer,
        %state,
        ?reason,
        "ws client disconnected"
    );
    ctx.events.publish(SessionEvent::Closed {
        session_id: ctx.session_id,
        reason,
        timestamp: Utc::now(),
    });
    reason
}

/// Decodes one frame and forwards it. Never ends the session.
fn handle_frame(ctx: &SessionContext, raw: &[u8]) {
    match decode(raw) {
        Ok(Decoded::Command(command)) => match ctx.sink.publish(command) {
            Ok(()) => {
                ctx.events.publish(SessionEvent::CommandPublished {
                    session_id: ctx.session_id,
                    command,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                tracing::error!(
                    session_id = %ctx.session_id,
                    peer = %ctx.peer,
                    error = %e,
                    excerpt = %excerpt(raw),
                    "command publish failed"
                );
                ctx.events.publish(SessionEvent::PublishFailed {
                    session_id: ctx.session_id,
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        },
        Ok(Decoded::Skip { kind }) => {
            tracing::trace!(session_id = %ctx.session_id, ?kind, "ignoring message kind");
        }
        Err(e) => {
            tracing::warn!(
                session_id = %ctx.session_id,
                peer = %ctx.peer,
                error = %e,
                excerpt = %excerpt(raw),
                "dropping undecodable message"
            );
        }
    }
}

/// Lossy UTF-8 excerpt of `raw`, capped at [`EXCERPT_CHARS`] characters.
#[must_use]
pub fn excerpt(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let mut out: String = text.chars().take(EXCERPT_CHARS).collect();
    if text.chars().count() > EXCERPT_CHARS {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_messages_are_kept_whole() {
        assert_eq!(excerpt(b"not json"), "not json");
    }

    #[test]
    fn long_messages_are_truncated() {
        let raw = "x".repeat(EXCERPT_CHARS + 10);
        let out = excerpt(raw.as_bytes());
        assert_eq!(out.chars().count(), EXCERPT_CHARS + 1);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        assert_eq!(excerpt(&[0x66, 0xff, 0x6f]), "f\u{fffd}o");
    }
}
