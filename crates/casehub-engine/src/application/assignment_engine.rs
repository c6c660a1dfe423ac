//! Assignment Engine (Use Case)
//!
//! Binds cases to a company/account pair, either as requested (`assign`)
//! or by scoring every eligible account (`auto_assign`).
//!
//! Commit order: reserve account capacity, reserve the company's monthly
//! slot, then write the case. Each step is a compare-and-swap; if a later
//! step fails the earlier reservations are released again.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use casehub::domain::services::assignment_policy::{self, check_account, check_company};
use casehub::{
    Account, AccountFilter, AccountRepository, AssignmentMethod, Candidate, Case, CaseEventType,
    CaseRepository, CaseStateMachine, CaseStatus, Company, CompanyRepository, DomainError,
    Ineligibility, NotificationKind, Reassignment,
};

use super::event_bus::EventBus;
use super::notification_dispatcher::NotificationDispatcher;
use super::notify::{notify_account, AccountMessage};

/// Actor recorded for automatic assignments
pub const SYSTEM_ACTOR: &str = "system";

/// Engine tuning
#[derive(Debug, Clone)]
pub struct AssignmentConfig {
    /// Re-read attempts when a capacity reservation loses a CAS race
    pub reservation_attempts: u32,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            reservation_attempts: 3,
        }
    }
}

/// Request to bind a case to a company/account pair
#[derive(Debug, Clone)]
pub struct AssignRequest {
    pub case_id: Uuid,
    pub company_id: Uuid,
    pub account_id: Uuid,
    pub actor: String,
    pub note: Option<String>,
    /// Reject with `OptimisticLockConflict` unless the case is at this version
    pub expected_version: Option<u64>,
    method: AssignmentMethod,
}

impl AssignRequest {
    pub fn new(case_id: Uuid, company_id: Uuid, account_id: Uuid, actor: impl Into<String>) -> Self {
        Self {
            case_id,
            company_id,
            account_id,
            actor: actor.into(),
            note: None,
            expected_version: None,
            method: AssignmentMethod::Manual,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn expecting_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }

    fn automatic(mut self) -> Self {
        self.method = AssignmentMethod::Automatic;
        self
    }
}

pub struct AssignmentEngine {
    cases: Arc<dyn CaseRepository>,
    accounts: Arc<dyn AccountRepository>,
    companies: Arc<dyn CompanyRepository>,
    dispatcher: Arc<NotificationDispatcher>,
    events: Arc<EventBus>,
    config: AssignmentConfig,
}

impl AssignmentEngine {
    pub fn new(
        cases: Arc<dyn CaseRepository>,
        accounts: Arc<dyn AccountRepository>,
        companies: Arc<dyn CompanyRepository>,
        dispatcher: Arc<NotificationDispatcher>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            cases,
            accounts,
            companies,
            dispatcher,
            events,
            config: AssignmentConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AssignmentConfig) -> Self {
        self.config = config;
        self
    }

    /// Assign a case to a specific company/account
    pub async fn assign(&self, request: AssignRequest) -> Result<Case, DomainError> {
        let case = self.cases.get(request.case_id).await?;

        if let Some(expected) = request.expected_version {
            if case.version != expected {
                return Err(DomainError::lock_conflict(
                    "Case",
                    case.id,
                    expected,
                    case.version,
                ));
            }
        }

        if !case.status.accepts_assignment() {
            return Err(DomainError::assignment_rejected(format!(
                "case {} is {} and cannot be assigned",
                case.reference(),
                case.status
            )));
        }
        if case.assigned_account_id == Some(request.account_id) {
            return Err(DomainError::assignment_rejected(format!(
                "case {} is already assigned to account {}",
                case.reference(),
                request.account_id
            )));
        }

        let now = self.dispatcher.now();
        let company = self.companies.get(request.company_id).await?;
        check_company(&company, &case, now).map_err(|reason| reject(&company.name, reason))?;

        let account = self.accounts.get(request.account_id).await?;
        if account.company_id != company.id {
            return Err(reject(&account.name, Ineligibility::CompanyMismatch));
        }
        check_account(&account, &case).map_err(|reason| reject(&account.name, reason))?;

        let updated = self.apply_assignment(&case, &request, now)?;
        let changes_company = case.assigned_company_id != Some(company.id);

        // Commit: capacity is re-validated against fresh reads here
        let account = self.reserve_account(&case, account.id).await?;
        if changes_company {
            if let Err(e) = self.reserve_company(&case, company.id, now).await {
                self.release_account(account.id).await;
                return Err(e);
            }
        }

        let saved = match self.cases.save(&updated, case.version).await {
            Ok(saved) => saved,
            Err(e) => {
                self.release_account(account.id).await;
                if changes_company {
                    self.release_company(company.id, now).await;
                }
                return Err(e);
            }
        };

        if let Some(previous) = case.assigned_account_id {
            self.release_account(previous).await;
        }

        tracing::info!(
            case_id = %saved.id,
            case_number = saved.case_number,
            company_id = %company.id,
            account_id = %account.id,
            method = ?saved.assignment_method,
            actor = %request.actor,
            "Case assigned"
        );

        notify_account(
            &self.dispatcher,
            &account,
            &saved,
            AccountMessage {
                kind: NotificationKind::CaseAssigned,
                subject: format!("Case {} assigned", saved.reference()),
                body: format!(
                    "Case {} ({}, {}, urgency {}) has been assigned to you.",
                    saved.reference(),
                    saved.address.prefecture,
                    saved.property_type,
                    saved.urgency
                ),
                scheduled_for: None,
            },
        )
        .await;

        self.events.publish(
            CaseEventType::Assigned,
            saved.id,
            json!({
                "case_number": saved.case_number,
                "company_id": company.id,
                "account_id": account.id,
                "previous_account_id": case.assigned_account_id,
                "assignment_method": saved.assignment_method,
                "actor": request.actor,
                "version": saved.version,
            }),
        );

        Ok(saved)
    }

    /// Pick the best-scoring eligible account and assign the case to it
    ///
    /// Equal scores go to the lowest account id.
    pub async fn auto_assign(&self, case_id: Uuid) -> Result<Case, DomainError> {
        let case = self.cases.get(case_id).await?;
        if !case.status.accepts_assignment() {
            return Err(DomainError::assignment_rejected(format!(
                "case {} is {} and cannot be assigned",
                case.reference(),
                case.status
            )));
        }

        let candidates = self.rank_candidates(&case).await?;
        let best = assignment_policy::pick_best(&candidates)
            .cloned()
            .ok_or_else(|| DomainError::assignment_rejected("no eligible accounts"))?;

        tracing::info!(
            case_id = %case.id,
            account_id = %best.account_id,
            score = best.score,
            candidates = candidates.len(),
            "Auto-assignment selected account"
        );

        self.assign(
            AssignRequest::new(case.id, best.company_id, best.account_id, SYSTEM_ACTOR)
                .with_note(format!("auto-assigned (score {})", best.score))
                .expecting_version(case.version)
                .automatic(),
        )
        .await
    }

    /// Every eligible account for a case, with its score
    pub async fn rank_candidates(&self, case: &Case) -> Result<Vec<Candidate>, DomainError> {
        let now = self.dispatcher.now();
        let accounts = self.accounts.find(&AccountFilter::active()).await?;
        let mut companies: HashMap<Uuid, Option<Company>> = HashMap::new();
        let mut candidates = Vec::new();

        for account in &accounts {
            if case.assigned_account_id == Some(account.id) {
                continue;
            }

            if !companies.contains_key(&account.company_id) {
                let company = self.companies.find_by_id(account.company_id).await?;
                companies.insert(account.company_id, company);
            }
            let Some(Some(company)) = companies.get(&account.company_id) else {
                tracing::debug!(account_id = %account.id, "Account company missing, skipped");
                continue;
            };

            let eligibility =
                check_company(company, case, now).and_then(|_| check_account(account, case));
            if let Err(reason) = eligibility {
                tracing::debug!(
                    case_id = %case.id,
                    account_id = %account.id,
                    %reason,
                    "Account not eligible"
                );
                continue;
            }

            candidates.push(Candidate {
                account_id: account.id,
                company_id: account.company_id,
                score: assignment_policy::score(account, case),
            });
        }

        Ok(candidates)
    }

    fn apply_assignment(
        &self,
        case: &Case,
        request: &AssignRequest,
        now: DateTime<Utc>,
    ) -> Result<Case, DomainError> {
        let mut updated = case.clone();

        let method = if case.is_assigned() {
            updated.reassignment_history.push(Reassignment {
                previous_company_id: case.assigned_company_id,
                previous_account_id: case.assigned_account_id,
                new_company_id: request.company_id,
                new_account_id: request.account_id,
                actor: request.actor.clone(),
                reason: request.note.clone(),
                timestamp: now,
            });
            AssignmentMethod::Reassigned
        } else {
            request.method
        };

        updated.assigned_company_id = Some(request.company_id);
        updated.assigned_account_id = Some(request.account_id);
        updated.assigned_at = Some(now);
        updated.assignment_method = Some(method);
        updated.updated_at = now;

        if updated.status == CaseStatus::PendingAssignment {
            updated = CaseStateMachine::transition_at(
                &updated,
                CaseStatus::Assigned,
                &request.actor,
                request.note.clone(),
                now,
            )?;
        }

        Ok(updated)
    }

    /// Take one unit of the account's capacity, re-checking eligibility
    async fn reserve_account(&self, case: &Case, account_id: Uuid) -> Result<Account, DomainError> {
        let mut last_error = None;

        for _ in 0..self.config.reservation_attempts {
            let account = self.accounts.get(account_id).await?;
            check_account(&account, case).map_err(|reason| {
                tracing::warn!(
                    case_id = %case.id,
                    account_id = %account_id,
                    %reason,
                    "Account became ineligible before commit"
                );
                reject(&account.name, reason)
            })?;

            let mut reserved = account.clone();
            reserved.availability.current_load += 1;
            match self.accounts.save(&reserved, account.version).await {
                Ok(saved) => return Ok(saved),
                Err(e) if e.is_retryable() => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| DomainError::assignment_rejected("account reservation failed")))
    }

    /// Take one monthly slot, starting a new period when the month rolled over
    async fn reserve_company(
        &self,
        case: &Case,
        company_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Company, DomainError> {
        let mut last_error = None;

        for _ in 0..self.config.reservation_attempts {
            let company = self.companies.get(company_id).await?;
            check_company(&company, case, now).map_err(|reason| reject(&company.name, reason))?;

            let mut reserved = company.clone();
            reserved.record_case(now);
            match self.companies.save(&reserved, company.version).await {
                Ok(saved) => return Ok(saved),
                Err(e) if e.is_retryable() => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| DomainError::assignment_rejected("company reservation failed")))
    }

    /// Give back one unit of capacity; errors are logged only
    async fn release_account(&self, account_id: Uuid) {
        for _ in 0..self.config.reservation_attempts {
            let account = match self.accounts.get(account_id).await {
                Ok(account) => account,
                Err(e) => {
                    tracing::warn!(account_id = %account_id, error = %e, "Load release failed");
                    return;
                }
            };
            let mut released = account.clone();
            released.availability.current_load = released.availability.current_load.saturating_sub(1);
            match self.accounts.save(&released, account.version).await {
                Ok(_) => return,
                Err(e) if e.is_retryable() => continue,
                Err(e) => {
                    tracing::warn!(account_id = %account_id, error = %e, "Load release failed");
                    return;
                }
            }
        }
        tracing::warn!(account_id = %account_id, "Load release gave up after repeated conflicts");
    }

    async fn release_company(&self, company_id: Uuid, now: DateTime<Utc>) {
        for _ in 0..self.config.reservation_attempts {
            let company = match self.companies.get(company_id).await {
                Ok(company) => company,
                Err(e) => {
                    tracing::warn!(company_id = %company_id, error = %e, "Monthly slot release failed");
                    return;
                }
            };
            let mut released = company.clone();
            released.release_case(now);
            match self.companies.save(&released, company.version).await {
                Ok(_) => return,
                Err(e) if e.is_retryable() => continue,
                Err(e) => {
                    tracing::warn!(company_id = %company_id, error = %e, "Monthly slot release failed");
                    return;
                }
            }
        }
        tracing::warn!(company_id = %company_id, "Monthly slot release gave up after repeated conflicts");
    }
}

fn reject(name: &str, reason: Ineligibility) -> DomainError {
    DomainError::assignment_rejected(format!("{}: {}", name, reason))
}
