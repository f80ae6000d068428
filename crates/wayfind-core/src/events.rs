use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::{ChatMessage, Coordinate, TurnState};

/// Default capacity of the session event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Observable changes to a conversation session.
///
/// Views subscribe to these instead of polling the session:
/// - The transcript view re-renders on message events
/// - The map view follows result and selection events
/// - The terminal front end logs state changes
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SessionEvent {
    /// A message was appended at `index`.
    MessageAppended { index: usize, message: ChatMessage },

    /// The transient entry at `removed` was withdrawn and `message` appended
    /// at `appended`, as one mutation.
    TransientReplaced {
        removed: Option<usize>,
        appended: usize,
        message: ChatMessage,
    },

    /// The transient entry at `index` was withdrawn with no successor
    /// (the turn was abandoned).
    TransientWithdrawn { index: usize },

    /// The turn state machine moved between phases.
    TurnStateChanged { from: TurnState, to: TurnState },

    /// A new result set reached the map.
    ResultsPublished { count: usize },

    /// The highlighted place changed (or was cleared).
    SelectionChanged { place_id: Option<String> },

    /// The session location was resolved for the first (and only) time.
    LocationResolved { coordinate: Option<Coordinate> },
}

impl SessionEvent {
    /// Short name used as the `event` field in logs.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::MessageAppended { .. } => "message_appended",
            SessionEvent::TransientReplaced { .. } => "transient_replaced",
            SessionEvent::TransientWithdrawn { .. } => "transient_withdrawn",
            SessionEvent::TurnStateChanged { .. } => "turn_state_changed",
            SessionEvent::ResultsPublished { .. } => "results_published",
            SessionEvent::SelectionChanged { .. } => "selection_changed",
            SessionEvent::LocationResolved { .. } => "location_resolved",
        }
    }
}

/// Broadcast channel carrying [`SessionEvent`]s to any number of subscribers.
///
/// Publishing never fails: with no subscribers the event is dropped.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: SessionEvent) {
        tracing::trace!(event = event.name(), "Session event");
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(SessionEvent::ResultsPublished { count: 3 });
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(SessionEvent::TurnStateChanged {
            from: TurnState::Idle,
            to: TurnState::AwaitingIntent,
        });
        bus.publish(SessionEvent::SelectionChanged {
            place_id: Some("p1".to_string()),
        });

        let first = rx.recv().await.unwrap();
        assert_eq!(first.name(), "turn_state_changed");
        match rx.recv().await.unwrap() {
            SessionEvent::SelectionChanged { place_id } => {
                assert_eq!(place_id.as_deref(), Some("p1"))
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_event_serializes() {
        let event = SessionEvent::LocationResolved {
            coordinate: Some(Coordinate::new(1.0, 2.0)),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("LocationResolved"));
    }
}
