//! Event Subscriber Implementations

use tokio::sync::broadcast;

use casehub::{DomainError, DomainEvent, EventSubscriber};

/// Forwards events to live-update consumers over a broadcast channel
///
/// Having no receivers is not an error; slow receivers lag and lose the
/// oldest events.
pub struct LiveUpdateBroadcaster {
    sender: broadcast::Sender<DomainEvent>,
}

impl LiveUpdateBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventSubscriber for LiveUpdateBroadcaster {
    fn name(&self) -> &str {
        "live-updates"
    }

    fn on_event(&self, event: &DomainEvent) -> Result<(), DomainError> {
        // Err only means nobody is listening right now
        let _ = self.sender.send(event.clone());
        Ok(())
    }
}

/// Writes every event to the log
#[derive(Debug, Default)]
pub struct EventLogger;

impl EventSubscriber for EventLogger {
    fn name(&self) -> &str {
        "event-logger"
    }

    fn on_event(&self, event: &DomainEvent) -> Result<(), DomainError> {
        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            case_id = %event.case_id,
            payload = %event.payload,
            "Case event"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casehub::CaseEventType;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_broadcaster_forwards_events() {
        let broadcaster = LiveUpdateBroadcaster::new(16);
        let mut rx = broadcaster.subscribe();

        let event = DomainEvent::new(
            CaseEventType::Assigned,
            Uuid::new_v4(),
            serde_json::json!({"account_id": "a"}),
        );
        broadcaster.on_event(&event).unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, event.id);
        assert_eq!(received.event_type, CaseEventType::Assigned);
    }

    #[test]
    fn test_broadcaster_without_receivers_is_ok() {
        let broadcaster = LiveUpdateBroadcaster::new(4);
        assert_eq!(broadcaster.receiver_count(), 0);
        let event = DomainEvent::new(CaseEventType::Created, Uuid::new_v4(), serde_json::json!({}));
        assert!(broadcaster.on_event(&event).is_ok());
    }
}
