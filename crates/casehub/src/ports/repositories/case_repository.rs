//! Case Repository Port
//!
//! Abstract interface for Case persistence operations.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{errors::DomainError, Case, CaseStatus};

/// Query filter for cases; `None` fields match everything
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    pub status: Option<CaseStatus>,
    pub assigned_account_id: Option<Uuid>,
    pub prefecture: Option<String>,
}

impl CaseFilter {
    pub fn with_status(status: CaseStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn matches(&self, case: &Case) -> bool {
        self.status.map_or(true, |s| case.status == s)
            && self
                .assigned_account_id
                .map_or(true, |id| case.assigned_account_id == Some(id))
            && self
                .prefecture
                .as_deref()
                .map_or(true, |p| case.address.prefecture == p)
    }
}

/// Repository interface for Case entities
///
/// Writes are compare-and-swap on `version`: `save` succeeds only when the
/// stored version equals `expected_version`, and stores the case with
/// `expected_version + 1`. A mismatch is `DomainError::OptimisticLockConflict`.
#[async_trait]
pub trait CaseRepository: Send + Sync {
    /// Find a case by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Case>, DomainError>;

    /// Find cases matching a filter, ordered by case number
    async fn find(&self, filter: &CaseFilter) -> Result<Vec<Case>, DomainError>;

    /// Allocate the next sequential case number
    async fn next_case_number(&self) -> Result<u64, DomainError>;

    /// Insert a new case (version 0)
    async fn insert(&self, case: &Case) -> Result<Case, DomainError>;

    /// Compare-and-swap write
    async fn save(&self, case: &Case, expected_version: u64) -> Result<Case, DomainError>;

    /// Find a case by ID, treating absence as an error
    async fn get(&self, id: Uuid) -> Result<Case, DomainError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Case", id))
    }
}
