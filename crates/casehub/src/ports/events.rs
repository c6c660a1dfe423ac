//! Event Subscriber Port
//!
//! Contract for external consumers of case events (live-update
//! broadcasters, audit sinks, outbound integrations).

use crate::domain::entities::DomainEvent;
use crate::domain::errors::DomainError;

/// Receives events synchronously from the event bus
///
/// Errors are logged by the bus and never reach the publisher, so a
/// subscriber should return quickly and hand slow work off to its own task.
pub trait EventSubscriber: Send + Sync {
    /// Subscriber name used in logs
    fn name(&self) -> &str;

    fn on_event(&self, event: &DomainEvent) -> Result<(), DomainError>;
}
