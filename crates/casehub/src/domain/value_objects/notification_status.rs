//! NotificationStatus - Delivery state of a notification

use serde::{Deserialize, Serialize};

/// Notification delivery status
///
/// `Failed` only moves back to `Pending` while the notification still has
/// retries left; that budget lives on the entity, not here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    #[default]
    Pending,
    Sent,
    Delivered,
    Read,
    Failed,
    Bounced,
    Cancelled,
}

impl NotificationStatus {
    pub fn can_transition(&self, next: NotificationStatus) -> bool {
        use NotificationStatus::*;
        matches!(
            (self, next),
            (Pending, Sent)
                | (Pending, Failed)
                | (Pending, Cancelled)
                | (Sent, Delivered)
                | (Sent, Failed)
                | (Sent, Bounced)
                | (Delivered, Read)
                | (Failed, Pending)
        )
    }

    /// Statuses after which no send will ever happen again, regardless of retries
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            NotificationStatus::Delivered
                | NotificationStatus::Read
                | NotificationStatus::Bounced
                | NotificationStatus::Cancelled
        )
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotificationStatus::Pending => "PENDING",
            NotificationStatus::Sent => "SENT",
            NotificationStatus::Delivered => "DELIVERED",
            NotificationStatus::Read => "READ",
            NotificationStatus::Failed => "FAILED",
            NotificationStatus::Bounced => "BOUNCED",
            NotificationStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_delivery_path() {
        use NotificationStatus::*;
        assert!(Pending.can_transition(Sent));
        assert!(Sent.can_transition(Delivered));
        assert!(Delivered.can_transition(Read));
        assert!(!Read.can_transition(Pending));
    }

    #[test]
    fn test_bounce_only_from_sent() {
        use NotificationStatus::*;
        assert!(Sent.can_transition(Bounced));
        assert!(!Pending.can_transition(Bounced));
        assert!(!Delivered.can_transition(Bounced));
    }
}
