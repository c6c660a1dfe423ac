//! Dry-run channel
//!
//! Accepts every notification, logs it and keeps a copy. Stands in for a
//! channel with no configured gateway when running locally.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use casehub::{Channel, ChannelAdapter, ChannelReceipt, DomainError, Notification};

pub struct LoggingChannelAdapter {
    channel: Channel,
    sent: Mutex<Vec<Notification>>,
}

impl LoggingChannelAdapter {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Notifications accepted so far, oldest first
    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl ChannelAdapter for LoggingChannelAdapter {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send(&self, notification: &Notification) -> Result<ChannelReceipt, DomainError> {
        tracing::info!(
            notification_id = %notification.id,
            channel = %self.channel,
            to = %notification.recipient,
            kind = %notification.kind,
            subject = ?notification.subject,
            "[dry-run] {}",
            notification.body
        );

        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notification.clone());

        Ok(ChannelReceipt {
            external_id: format!("dry-run-{}", notification.id),
            provider_response: json!({ "dry_run": true }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casehub::{NotificationKind, NotificationRequest};
    use chrono::Utc;

    #[tokio::test]
    async fn test_records_sent_notifications() {
        let adapter = LoggingChannelAdapter::new(Channel::Sms);
        let notification = Notification::from_request(
            NotificationRequest::new(NotificationKind::CaseAssigned, Channel::Sms, "+81", "hi"),
            3,
            Utc::now(),
        );

        let receipt = adapter.send(&notification).await.unwrap();

        assert_eq!(receipt.external_id, format!("dry-run-{}", notification.id));
        assert_eq!(adapter.sent().len(), 1);
        assert_eq!(adapter.sent()[0].id, notification.id);
    }
}
