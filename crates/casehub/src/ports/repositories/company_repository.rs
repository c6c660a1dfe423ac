//! Company Repository Port

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{errors::DomainError, Company};

/// Repository interface for Company entities
#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Company>, DomainError>;

    async fn find_all(&self) -> Result<Vec<Company>, DomainError>;

    async fn insert(&self, company: &Company) -> Result<Company, DomainError>;

    /// Compare-and-swap write on `version`
    async fn save(&self, company: &Company, expected_version: u64)
        -> Result<Company, DomainError>;

    async fn get(&self, id: Uuid) -> Result<Company, DomainError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Company", id))
    }
}
