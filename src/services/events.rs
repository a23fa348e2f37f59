// src/services/events.rs

use serde::Serialize;
use tokio::sync::broadcast;

/// Lifecycle notifications emitted by the attempt manager.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AttemptEvent {
    Started {
        attempt_id: String,
        track_slug: String,
        test_id: String,
        user_id: Option<String>,
    },
    Submitted {
        attempt_id: String,
        score: f64,
        total: f64,
    },
    Terminated {
        attempt_id: String,
    },
}

/// Destination for attempt events, owned by the service instance that emits them.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: AttemptEvent);
}

/// Fans events out to any number of live subscribers.
#[derive(Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<AttemptEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AttemptEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: AttemptEvent) {
        // No subscribers is normal.
        if self.tx.send(event).is_err() {
            tracing::debug!("attempt event dropped: no subscribers");
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn publish(&self, _event: AttemptEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_subscribers() {
        let sink = BroadcastSink::new(8);
        let mut rx = sink.subscribe();
        sink.publish(AttemptEvent::Terminated {
            attempt_id: "a1".to_string(),
        });
        let received = rx.recv().await.unwrap();
        assert_eq!(
            received,
            AttemptEvent::Terminated {
                attempt_id: "a1".to_string()
            }
        );
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let sink = BroadcastSink::new(1);
        sink.publish(AttemptEvent::Terminated {
            attempt_id: "a1".to_string(),
        });
    }

    #[test]
    fn events_serialize_with_tag() {
        let json = serde_json::to_value(AttemptEvent::Submitted {
            attempt_id: "a1".to_string(),
            score: 2.0,
            total: 3.0,
        })
        .unwrap();
        assert_eq!(json["event"], "submitted");
        assert_eq!(json["score"], 2.0);
    }
}
