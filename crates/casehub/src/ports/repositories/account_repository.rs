//! Account Repository Port

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{errors::DomainError, Account};

#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    pub active_only: bool,
    pub company_id: Option<Uuid>,
    /// Only accounts operating in this area
    pub area: Option<String>,
}

impl AccountFilter {
    pub fn active() -> Self {
        Self {
            active_only: true,
            ..Default::default()
        }
    }

    pub fn matches(&self, account: &Account) -> bool {
        (!self.active_only || account.is_active)
            && self.company_id.map_or(true, |id| account.company_id == id)
            && self
                .area
                .as_ref()
                .map_or(true, |area| account.operating_areas.contains(area))
    }
}

/// Repository interface for Account entities
///
/// Same compare-and-swap contract as `CaseRepository::save`.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, DomainError>;

    /// Find accounts matching a filter, ordered by id
    async fn find(&self, filter: &AccountFilter) -> Result<Vec<Account>, DomainError>;

    async fn insert(&self, account: &Account) -> Result<Account, DomainError>;

    async fn save(&self, account: &Account, expected_version: u64)
        -> Result<Account, DomainError>;

    async fn get(&self, id: Uuid) -> Result<Account, DomainError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Account", id))
    }
}
