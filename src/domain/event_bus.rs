//! Fan-out of session lifecycle events.
//!
//! Each WebSocket session reports when it opens, when a command reaches the
//! control topic, when a publish fails, and when it closes. Embedding code
//! and tests observe those reports through [`crate::bridge::Bridge::events`]
//! without the session loop knowing who is listening.

use tokio::sync::broadcast;

use super::SessionEvent;

/// Broadcast bus carrying [`SessionEvent`]s from sessions to observers.
///
/// A session never waits on an observer: when an observer falls more than
/// `capacity` events behind it misses the oldest ones and gets
/// [`broadcast::error::RecvError::Lagged`] on its next receive.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per observer.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Reports a session event to every current observer.
    ///
    /// Returns how many observers got it; with none attached the event is
    /// dropped.
    pub fn publish(&self, event: SessionEvent) -> usize {
        tracing::trace!(
            session_id = %event.session_id(),
            event_type = event.event_type_str(),
            "session event"
        );
        self.sender.send(event).unwrap_or(0)
    }

    /// Attaches an observer that sees events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Number of attached observers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{CloseReason, SessionId};
    use chrono::Utc;

    fn make_event(session_id: SessionId) -> SessionEvent {
        SessionEvent::Closed {
            session_id,
            reason: CloseReason::ClientClosed,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn publish_without_receivers_returns_zero() {
        let bus = EventBus::new(16);
        assert_eq!(bus.publish(make_event(SessionId::new())), 0);
    }

    #[tokio::test]
    async fn subscriber_receives_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let id = SessionId::new();
        bus.publish(make_event(id));

        let Ok(event) = rx.recv().await else {
            panic!("expected to receive event");
        };
        assert_eq!(event.session_id(), id);
    }

    #[test]
    fn receiver_count_tracks_subscribers() {
        let bus = EventBus::new(16);
        assert_eq!(bus.receiver_count(), 0);

        let rx1 = bus.subscribe();
        let _rx2 = bus.subscribe();
        assert_eq!(bus.receiver_count(), 2);

        drop(rx1);
        assert_eq!(bus.receiver_count(), 1);
    }

    #[tokio::test]
    async fn slow_observer_skips_oldest_events() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        let ids: Vec<SessionId> = (0..3).map(|_| SessionId::new()).collect();
        for id in &ids {
            bus.publish(make_event(*id));
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        let Ok(event) = rx.recv().await else {
            panic!("expected a retained event");
        };
        assert_eq!(Some(event.session_id()), ids.get(1).copied());
    }

    #[test]
    fn zero_capacity_is_accepted() {
        let bus = EventBus::new(0);
        let _rx = bus.subscribe();
        assert_eq!(bus.publish(make_event(SessionId::new())), 1);
    }
}
