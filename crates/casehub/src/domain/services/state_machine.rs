//! Case State Machine
//!
//! Validates status transitions against the fixed lifecycle graph and
//! appends the audit entry. Pure: no I/O, no version bump (the store
//! owns the version).

use chrono::{DateTime, Utc};

use crate::domain::entities::{Case, StatusChange};
use crate::domain::errors::DomainError;
use crate::domain::value_objects::CaseStatus;

pub struct CaseStateMachine;

impl CaseStateMachine {
    /// True iff `next` is a direct successor of `current`
    pub fn can_transition(current: CaseStatus, next: CaseStatus) -> bool {
        current.successors().contains(&next)
    }

    /// Move a case to `next`, returning the updated copy
    ///
    /// On error the input case is left as it was.
    pub fn transition(
        case: &Case,
        next: CaseStatus,
        actor: &str,
        comment: Option<String>,
    ) -> Result<Case, DomainError> {
        Self::transition_at(case, next, actor, comment, Utc::now())
    }

    /// Same as [`CaseStateMachine::transition`] with an explicit timestamp
    pub fn transition_at(
        case: &Case,
        next: CaseStatus,
        actor: &str,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Case, DomainError> {
        if !Self::can_transition(case.status, next) {
            return Err(DomainError::InvalidTransition {
                current: case.status,
                attempted: next,
            });
        }

        let mut updated = case.clone();
        updated.status_history.push(StatusChange {
            previous_status: case.status,
            new_status: next,
            timestamp: at,
            actor: actor.to_string(),
            comment,
        });
        updated.status = next;
        updated.updated_at = at;

        tracing::debug!(
            case_id = %case.id,
            from = %case.status,
            to = %next,
            actor = %actor,
            "Case transitioned"
        );

        Ok(updated)
    }
}
