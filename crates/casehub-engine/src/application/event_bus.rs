//! Event Bus
//!
//! Synchronous fan-out of case events to registered subscribers.
//! A failing (or panicking) subscriber is logged and skipped; the
//! publisher never sees it.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use casehub::{CaseEventType, DomainEvent, EventSubscriber};

/// Outcome of a single publish call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<Vec<Arc<dyn EventSubscriber>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for all case events
    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        tracing::info!(subscriber = %subscriber.name(), "Event subscriber registered");
        self.subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(subscriber);
    }

    pub fn subscriber_count(&self) -> usize {
        self.snapshot().len()
    }

    /// Build an event and publish it
    pub fn publish(
        &self,
        event_type: CaseEventType,
        case_id: Uuid,
        payload: serde_json::Value,
    ) -> PublishReport {
        self.publish_event(&DomainEvent::new(event_type, case_id, payload))
    }

    /// Deliver an event to every subscriber, in registration order
    pub fn publish_event(&self, event: &DomainEvent) -> PublishReport {
        let mut report = PublishReport::default();

        // Subscribers run without the lock held so they may subscribe others
        for subscriber in self.snapshot() {
            let outcome = catch_unwind(AssertUnwindSafe(|| subscriber.on_event(event)));
            match outcome {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    tracing::warn!(
                        subscriber = %subscriber.name(),
                        event_type = %event.event_type,
                        case_id = %event.case_id,
                        error = %e,
                        "Event subscriber failed"
                    );
                }
                Err(_) => {
                    report.failed += 1;
                    tracing::error!(
                        subscriber = %subscriber.name(),
                        event_type = %event.event_type,
                        case_id = %event.case_id,
                        "Event subscriber panicked"
                    );
                }
            }
        }

        tracing::debug!(
            event_type = %event.event_type,
            case_id = %event.case_id,
            delivered = report.delivered,
            failed = report.failed,
            "Event published"
        );

        report
    }

    fn snapshot(&self) -> Vec<Arc<dyn EventSubscriber>> {
        self.subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casehub::DomainError;
    use std::sync::Mutex;

    struct Recorder {
        seen: Mutex<Vec<CaseEventType>>,
    }

    impl EventSubscriber for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn on_event(&self, event: &DomainEvent) -> Result<(), DomainError> {
            self.seen.lock().unwrap().push(event.event_type);
            Ok(())
        }
    }

    struct Failing;

    impl EventSubscriber for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn on_event(&self, _event: &DomainEvent) -> Result<(), DomainError> {
            Err(DomainError::Repository("sink offline".into()))
        }
    }

    struct Panicking;

    impl EventSubscriber for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        fn on_event(&self, _event: &DomainEvent) -> Result<(), DomainError> {
            panic!("subscriber bug");
        }
    }

    #[test]
    fn test_failures_do_not_stop_fan_out() {
        let bus = EventBus::new();
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        bus.subscribe(Arc::new(Failing));
        bus.subscribe(Arc::new(Panicking));
        bus.subscribe(recorder.clone());

        let report = bus.publish(
            CaseEventType::Assigned,
            Uuid::new_v4(),
            serde_json::json!({}),
        );

        assert_eq!(report, PublishReport { delivered: 1, failed: 2 });
        assert_eq!(*recorder.seen.lock().unwrap(), vec![CaseEventType::Assigned]);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        let report = bus.publish(CaseEventType::Created, Uuid::new_v4(), serde_json::json!({}));
        assert_eq!(report, PublishReport::default());
        assert_eq!(bus.subscriber_count(), 0);
    }
}
