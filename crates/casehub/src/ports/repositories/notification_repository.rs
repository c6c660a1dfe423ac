//! Notification Repository Port

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{errors::DomainError, Notification, NotificationStatus};

#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pub case_id: Option<Uuid>,
    pub status: Option<NotificationStatus>,
}

impl NotificationFilter {
    pub fn for_case(case_id: Uuid) -> Self {
        Self {
            case_id: Some(case_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, notification: &Notification) -> bool {
        self.case_id
            .map_or(true, |id| notification.case_id == Some(id))
            && self.status.map_or(true, |s| notification.status == s)
    }
}

/// Repository interface for Notification entities
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>, DomainError>;

    /// Find notifications matching a filter, oldest first
    async fn find(&self, filter: &NotificationFilter) -> Result<Vec<Notification>, DomainError>;

    async fn insert(&self, notification: &Notification) -> Result<Notification, DomainError>;

    /// Compare-and-swap write on `version`
    async fn save(
        &self,
        notification: &Notification,
        expected_version: u64,
    ) -> Result<Notification, DomainError>;

    async fn get(&self, id: Uuid) -> Result<Notification, DomainError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Notification", id))
    }
}
