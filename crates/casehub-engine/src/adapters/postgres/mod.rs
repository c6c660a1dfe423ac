//! PostgreSQL Repository Implementations
//!
//! Entities live as JSONB documents; `save` is an
//! `UPDATE ... WHERE id = $1 AND version = $2` compare-and-swap.
//! Filters become a JSONB containment document evaluated in SQL.

mod document_store;

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use casehub::{
    Account, AccountFilter, AccountRepository, Case, CaseFilter, CaseRepository, Company,
    CompanyRepository, DomainError, Notification, NotificationFilter, NotificationRepository,
};

use document_store::{repository_error, DocumentStore};

/// Apply pending migrations from `migrations/`
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!().run(pool).await
}

pub struct PgCaseRepository {
    store: DocumentStore<Case>,
}

impl PgCaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            store: DocumentStore::new(pool, "cases"),
        }
    }
}

#[async_trait]
impl CaseRepository for PgCaseRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Case>, DomainError> {
        self.store.get(id).await
    }

    async fn find(&self, filter: &CaseFilter) -> Result<Vec<Case>, DomainError> {
        let mut cases = self.store.find_containing(&case_criteria(filter)).await?;
        cases.sort_by_key(|c| c.case_number);
        Ok(cases)
    }

    async fn next_case_number(&self) -> Result<u64, DomainError> {
        let next = sqlx::query_scalar::<_, i64>("SELECT nextval('case_number_seq')")
            .fetch_one(self.store.pool())
            .await
            .map_err(repository_error)?;
        Ok(next.max(0) as u64)
    }

    async fn insert(&self, case: &Case) -> Result<Case, DomainError> {
        self.store.insert(case).await
    }

    async fn save(&self, case: &Case, expected_version: u64) -> Result<Case, DomainError> {
        self.store.save(case, expected_version).await
    }
}

pub struct PgAccountRepository {
    store: DocumentStore<Account>,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            store: DocumentStore::new(pool, "accounts"),
        }
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, DomainError> {
        self.store.get(id).await
    }

    async fn find(&self, filter: &AccountFilter) -> Result<Vec<Account>, DomainError> {
        let mut accounts = self.store.find_containing(&account_criteria(filter)).await?;
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }

    async fn insert(&self, account: &Account) -> Result<Account, DomainError> {
        self.store.insert(account).await
    }

    async fn save(&self, account: &Account, expected_version: u64) -> Result<Account, DomainError> {
        self.store.save(account, expected_version).await
    }
}

pub struct PgCompanyRepository {
    store: DocumentStore<Company>,
}

impl PgCompanyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            store: DocumentStore::new(pool, "companies"),
        }
    }
}

#[async_trait]
impl CompanyRepository for PgCompanyRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Company>, DomainError> {
        self.store.get(id).await
    }

    async fn find_all(&self) -> Result<Vec<Company>, DomainError> {
        let mut companies = self.store.all().await?;
        companies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(companies)
    }

    async fn insert(&self, company: &Company) -> Result<Company, DomainError> {
        self.store.insert(company).await
    }

    async fn save(&self, company: &Company, expected_version: u64) -> Result<Company, DomainError> {
        self.store.save(company, expected_version).await
    }
}

pub struct PgNotificationRepository {
    store: DocumentStore<Notification>,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            store: DocumentStore::new(pool, "notifications"),
        }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>, DomainError> {
        self.store.get(id).await
    }

    async fn find(&self, filter: &NotificationFilter) -> Result<Vec<Notification>, DomainError> {
        let mut notifications = self
            .store
            .find_containing(&notification_criteria(filter))
            .await?;
        notifications.sort_by_key(|n| n.created_at);
        Ok(notifications)
    }

    async fn insert(&self, notification: &Notification) -> Result<Notification, DomainError> {
        self.store.insert(notification).await
    }

    async fn save(
        &self,
        notification: &Notification,
        expected_version: u64,
    ) -> Result<Notification, DomainError> {
        self.store.save(notification, expected_version).await
    }
}

fn case_criteria(filter: &CaseFilter) -> Value {
    let mut criteria = json!({});
    if let Some(status) = filter.status {
        criteria["status"] = json!(status);
    }
    if let Some(account_id) = filter.assigned_account_id {
        criteria["assigned_account_id"] = json!(account_id);
    }
    if let Some(prefecture) = &filter.prefecture {
        criteria["address"] = json!({ "prefecture": prefecture });
    }
    criteria
}

fn account_criteria(filter: &AccountFilter) -> Value {
    let mut criteria = json!({});
    if filter.active_only {
        criteria["is_active"] = json!(true);
    }
    if let Some(company_id) = filter.company_id {
        criteria["company_id"] = json!(company_id);
    }
    // array containment: the area is one of operating_areas
    if let Some(area) = &filter.area {
        criteria["operating_areas"] = json!([area]);
    }
    criteria
}

fn notification_criteria(filter: &NotificationFilter) -> Value {
    let mut criteria = json!({});
    if let Some(case_id) = filter.case_id {
        criteria["case_id"] = json!(case_id);
    }
    if let Some(status) = filter.status {
        criteria["status"] = json!(status);
    }
    criteria
}
