//! Notification - Outbound message over SMS, Email or IM
//!
//! Carries its own delivery log and retry budget so that failures are
//! captured on the entity instead of being raised to whoever created it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::value_objects::{Channel, NotificationStatus};

/// Default retry budget for new notifications
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub channel: Channel,
    pub recipient: String,
    pub subject: Option<String>,
    pub body: String,
    pub status: NotificationStatus,
    pub case_id: Option<Uuid>,
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivery_attempts: Vec<DeliveryAttempt>,
    pub metadata: NotificationMetadata,
    /// Provider-side message id of the last successful send
    pub external_id: Option<String>,
    pub provider_response: Option<serde_json::Value>,
    pub last_error: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What the notification is about
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    CaseAssigned,
    StatusChanged,
    HearingScheduled,
    HearingReminder,
    Custom(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryAttempt {
    pub timestamp: DateTime<Utc>,
    pub outcome: AttemptOutcome,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Sent,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationMetadata {
    pub retry_count: u32,
    pub max_retries: u32,
}

/// Result of recording a failed send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Back to pending; `retry_count` is the new count
    RetryScheduled { retry_count: u32 },
    /// No retries left, `Failed` is final
    Exhausted,
}

/// Request to create a notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequest {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub channel: Channel,
    pub recipient: String,
    pub subject: Option<String>,
    pub body: String,
    pub case_id: Option<Uuid>,
    pub scheduled_for: Option<DateTime<Utc>>,
    /// Overrides the dispatcher's default retry budget
    pub max_retries: Option<u32>,
}

impl NotificationRequest {
    pub fn new(
        kind: NotificationKind,
        channel: Channel,
        recipient: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            channel,
            recipient: recipient.into(),
            subject: None,
            body: body.into(),
            case_id: None,
            scheduled_for: None,
            max_retries: None,
        }
    }

    pub fn for_case(mut self, case_id: Uuid) -> Self {
        self.case_id = Some(case_id);
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn scheduled_for(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_for = Some(at);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

impl Notification {
    /// Create a pending notification from a request
    pub fn from_request(request: NotificationRequest, default_max_retries: u32, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: request.kind,
            channel: request.channel,
            recipient: request.recipient,
            subject: request.subject,
            body: request.body,
            status: NotificationStatus::Pending,
            case_id: request.case_id,
            scheduled_for: request.scheduled_for,
            delivery_attempts: Vec::new(),
            metadata: NotificationMetadata {
                retry_count: 0,
                max_retries: request.max_retries.unwrap_or(default_max_retries),
            },
            external_id: None,
            provider_response: None,
            last_error: None,
            sent_at: None,
            delivered_at: None,
            read_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a send is allowed right now (ignores retry timers)
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_for.map_or(true, |at| at <= now)
    }

    pub fn retries_exhausted(&self) -> bool {
        self.status == NotificationStatus::Failed
            && self.metadata.retry_count >= self.metadata.max_retries
    }

    /// No further sends will ever happen
    pub fn is_terminal(&self) -> bool {
        self.status.is_final() || self.retries_exhausted()
    }

    /// Record a successful hand-off to the provider
    pub fn mark_sent(
        &mut self,
        external_id: String,
        provider_response: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.move_to(NotificationStatus::Sent)?;
        self.external_id = Some(external_id);
        self.provider_response = Some(provider_response);
        self.last_error = None;
        self.sent_at = Some(now);
        self.updated_at = now;
        self.delivery_attempts.push(DeliveryAttempt {
            timestamp: now,
            outcome: AttemptOutcome::Sent,
            error: None,
        });
        Ok(())
    }

    /// Record a failed send and consume one retry if any remain
    pub fn mark_failed(
        &mut self,
        error: String,
        now: DateTime<Utc>,
    ) -> Result<FailureOutcome, DomainError> {
        self.move_to(NotificationStatus::Failed)?;
        self.delivery_attempts.push(DeliveryAttempt {
            timestamp: now,
            outcome: AttemptOutcome::Failed,
            error: Some(error.clone()),
        });
        self.last_error = Some(error);
        self.updated_at = now;

        if self.metadata.retry_count < self.metadata.max_retries {
            self.metadata.retry_count += 1;
            self.move_to(NotificationStatus::Pending)?;
            Ok(FailureOutcome::RetryScheduled {
                retry_count: self.metadata.retry_count,
            })
        } else {
            Ok(FailureOutcome::Exhausted)
        }
    }

    pub fn mark_delivered(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.move_to(NotificationStatus::Delivered)?;
        self.delivered_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_read(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.move_to(NotificationStatus::Read)?;
        self.read_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_bounced(&mut self, reason: String, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.move_to(NotificationStatus::Bounced)?;
        self.last_error = Some(reason);
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_cancelled(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.move_to(NotificationStatus::Cancelled)?;
        self.updated_at = now;
        Ok(())
    }

    fn move_to(&mut self, next: NotificationStatus) -> Result<(), DomainError> {
        if !self.status.can_transition(next) {
            return Err(DomainError::Validation(format!(
                "notification {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CaseAssigned => write!(f, "case_assigned"),
            Self::StatusChanged => write!(f, "status_changed"),
            Self::HearingScheduled => write!(f, "hearing_scheduled"),
            Self::HearingReminder => write!(f, "hearing_reminder"),
            Self::Custom(name) => write!(f, "custom:{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(max_retries: u32) -> Notification {
        let request = NotificationRequest::new(
            NotificationKind::CaseAssigned,
            Channel::Email,
            "ops@example.com",
            "New case",
        )
        .with_max_retries(max_retries);
        Notification::from_request(request, DEFAULT_MAX_RETRIES, Utc::now())
    }

    #[test]
    fn test_failure_consumes_retry_and_returns_to_pending() {
        let mut n = pending(2);
        let outcome = n.mark_failed("timeout".into(), Utc::now()).unwrap();
        assert_eq!(outcome, FailureOutcome::RetryScheduled { retry_count: 1 });
        assert_eq!(n.status, NotificationStatus::Pending);
        assert_eq!(n.delivery_attempts.len(), 1);
        assert_eq!(n.last_error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_failure_without_budget_is_terminal() {
        let mut n = pending(0);
        let outcome = n.mark_failed("refused".into(), Utc::now()).unwrap();
        assert_eq!(outcome, FailureOutcome::Exhausted);
        assert_eq!(n.status, NotificationStatus::Failed);
        assert!(n.retries_exhausted());
        assert!(n.is_terminal());
    }

    #[test]
    fn test_receipts_follow_delivery_path() {
        let mut n = pending(3);
        n.mark_sent("ext-1".into(), serde_json::json!({"ok": true}), Utc::now())
            .unwrap();
        assert!(n.mark_read(Utc::now()).is_err());
        n.mark_delivered(Utc::now()).unwrap();
        n.mark_read(Utc::now()).unwrap();
        assert_eq!(n.status, NotificationStatus::Read);
        assert!(n.is_terminal());
    }

    #[test]
    fn test_is_due_respects_schedule() {
        let mut n = pending(3);
        let now = Utc::now();
        assert!(n.is_due(now));
        n.scheduled_for = Some(now + chrono::Duration::hours(1));
        assert!(!n.is_due(now));
    }
}
