//! In-memory Repository Implementations
//!
//! Process-local stores honouring the same compare-and-swap contract as
//! the PostgreSQL adapters. Used for default runs and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use casehub::{
    Account, AccountFilter, AccountRepository, Case, CaseFilter, CaseRepository, Company,
    CompanyRepository, DomainError, Notification, NotificationFilter, NotificationRepository,
};

use super::versioned::{prepare_write, Versioned};

/// Versioned map guarded by a single lock; CAS happens under the write lock
struct MemoryTable<T: Versioned> {
    rows: RwLock<HashMap<Uuid, T>>,
}

impl<T: Versioned> MemoryTable<T> {
    fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }

    async fn get(&self, id: Uuid) -> Option<T> {
        self.rows.read().await.get(&id).cloned()
    }

    async fn all(&self) -> Vec<T> {
        self.rows.read().await.values().cloned().collect()
    }

    async fn insert(&self, entity: &T) -> Result<T, DomainError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&entity.id()) {
            return Err(DomainError::Repository(format!(
                "{} {} already exists",
                T::ENTITY,
                entity.id()
            )));
        }
        rows.insert(entity.id(), entity.clone());
        Ok(entity.clone())
    }

    async fn save(&self, entity: &T, expected_version: u64) -> Result<T, DomainError> {
        let mut rows = self.rows.write().await;
        let stored_version = rows.get(&entity.id()).map(Versioned::version);
        let next = prepare_write(entity, stored_version, expected_version)?;
        rows.insert(next.id(), next.clone());
        Ok(next)
    }
}

pub struct InMemoryCaseRepository {
    table: MemoryTable<Case>,
    sequence: AtomicU64,
}

impl InMemoryCaseRepository {
    pub fn new() -> Self {
        Self {
            table: MemoryTable::new(),
            sequence: AtomicU64::new(0),
        }
    }
}

impl Default for InMemoryCaseRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaseRepository for InMemoryCaseRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Case>, DomainError> {
        Ok(self.table.get(id).await)
    }

    async fn find(&self, filter: &CaseFilter) -> Result<Vec<Case>, DomainError> {
        let mut cases: Vec<Case> = self
            .table
            .all()
            .await
            .into_iter()
            .filter(|c| filter.matches(c))
            .collect();
        cases.sort_by_key(|c| c.case_number);
        Ok(cases)
    }

    async fn next_case_number(&self) -> Result<u64, DomainError> {
        Ok(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn insert(&self, case: &Case) -> Result<Case, DomainError> {
        self.table.insert(case).await
    }

    async fn save(&self, case: &Case, expected_version: u64) -> Result<Case, DomainError> {
        self.table.save(case, expected_version).await
    }
}

pub struct InMemoryAccountRepository {
    table: MemoryTable<Account>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self {
            table: MemoryTable::new(),
        }
    }
}

impl Default for InMemoryAccountRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, DomainError> {
        Ok(self.table.get(id).await)
    }

    async fn find(&self, filter: &AccountFilter) -> Result<Vec<Account>, DomainError> {
        let mut accounts: Vec<Account> = self
            .table
            .all()
            .await
            .into_iter()
            .filter(|a| filter.matches(a))
            .collect();
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }

    async fn insert(&self, account: &Account) -> Result<Account, DomainError> {
        self.table.insert(account).await
    }

    async fn save(&self, account: &Account, expected_version: u64) -> Result<Account, DomainError> {
        self.table.save(account, expected_version).await
    }
}

pub struct InMemoryCompanyRepository {
    table: MemoryTable<Company>,
}

impl InMemoryCompanyRepository {
    pub fn new() -> Self {
        Self {
            table: MemoryTable::new(),
        }
    }
}

impl Default for InMemoryCompanyRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompanyRepository for InMemoryCompanyRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Company>, DomainError> {
        Ok(self.table.get(id).await)
    }

    async fn find_all(&self) -> Result<Vec<Company>, DomainError> {
        let mut companies = self.table.all().await;
        companies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(companies)
    }

    async fn insert(&self, company: &Company) -> Result<Company, DomainError> {
        self.table.insert(company).await
    }

    async fn save(&self, company: &Company, expected_version: u64) -> Result<Company, DomainError> {
        self.table.save(company, expected_version).await
    }
}

pub struct InMemoryNotificationRepository {
    table: MemoryTable<Notification>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self {
            table: MemoryTable::new(),
        }
    }
}

impl Default for InMemoryNotificationRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>, DomainError> {
        Ok(self.table.get(id).await)
    }

    async fn find(&self, filter: &NotificationFilter) -> Result<Vec<Notification>, DomainError> {
        let mut notifications: Vec<Notification> = self
            .table
            .all()
            .await
            .into_iter()
            .filter(|n| filter.matches(n))
            .collect();
        notifications.sort_by_key(|n| n.created_at);
        Ok(notifications)
    }

    async fn insert(&self, notification: &Notification) -> Result<Notification, DomainError> {
        self.table.insert(notification).await
    }

    async fn save(
        &self,
        notification: &Notification,
        expected_version: u64,
    ) -> Result<Notification, DomainError> {
        self.table.save(notification, expected_version).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casehub::{Address, NewCase, Urgency};

    fn new_case(number: u64) -> Case {
        Case::new(
            number,
            NewCase {
                urgency: Urgency::Normal,
                property_type: "house".into(),
                address: Address::new("Tokyo"),
            },
        )
    }

    #[tokio::test]
    async fn test_case_numbers_are_sequential() {
        let repo = InMemoryCaseRepository::new();
        assert_eq!(repo.next_case_number().await.unwrap(), 1);
        assert_eq!(repo.next_case_number().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_save_is_compare_and_swap() {
        let repo = InMemoryCaseRepository::new();
        let case = repo.insert(&new_case(1)).await.unwrap();

        let first = repo.save(&case, 0).await.unwrap();
        assert_eq!(first.version, 1);

        // a second writer still holding version 0 loses
        let err = repo.save(&case, 0).await.unwrap_err();
        assert!(matches!(err, DomainError::OptimisticLockConflict { .. }));
        assert_eq!(repo.get(case.id).await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let repo = InMemoryAccountRepository::new();
        assert!(matches!(
            repo.get(Uuid::new_v4()).await,
            Err(DomainError::NotFound { .. })
        ));
    }
}
