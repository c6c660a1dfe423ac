//! Domain Errors
//!
//! Error types for domain operations.

use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::CaseStatus;

/// Domain layer errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid transition: cannot move case from {current} to {attempted}")]
    InvalidTransition {
        current: CaseStatus,
        attempted: CaseStatus,
    },

    #[error("Assignment rejected: {0}")]
    AssignmentRejected(String),

    #[error("Optimistic lock conflict on {entity_type} {id}: expected version {expected}, found {actual}")]
    OptimisticLockConflict {
        entity_type: String,
        id: String,
        expected: u64,
        actual: u64,
    },

    #[error("Channel unavailable: {0}")]
    ChannelUnavailable(String),

    #[error("Retry exhausted for notification {id} after {attempts} attempts")]
    RetryExhausted { id: Uuid, attempts: u32 },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Repository error: {0}")]
    Repository(String),
}

impl DomainError {
    pub fn not_found<T: AsRef<str>>(entity_type: T, id: Uuid) -> Self {
        Self::NotFound {
            entity_type: entity_type.as_ref().to_string(),
            id: id.to_string(),
        }
    }

    pub fn assignment_rejected(reason: impl Into<String>) -> Self {
        Self::AssignmentRejected(reason.into())
    }

    pub fn lock_conflict<T: AsRef<str>>(entity_type: T, id: Uuid, expected: u64, actual: u64) -> Self {
        Self::OptimisticLockConflict {
            entity_type: entity_type.as_ref().to_string(),
            id: id.to_string(),
            expected,
            actual,
        }
    }

    /// Whether the caller may re-read and try the operation again
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::OptimisticLockConflict { .. })
    }
}
