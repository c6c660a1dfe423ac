//! Case Application Service (Use Case)
//!
//! Intake and workflow operations on a case after routing: status updates,
//! contact logging and hearing scheduling. Assignment itself lives in
//! `AssignmentEngine`.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use casehub::{
    AccountRepository, Case, CaseEventType, CaseFilter, CaseRepository, CaseStateMachine,
    CaseStatus, ContactLog, DomainError, NewCase, NotificationKind,
};

use super::event_bus::EventBus;
use super::notification_dispatcher::NotificationDispatcher;
use super::notify::{notify_account, AccountMessage};

#[derive(Debug, Clone)]
pub struct CaseServiceConfig {
    /// How long before a hearing the reminder goes out
    pub hearing_reminder_lead: Duration,
}

impl Default for CaseServiceConfig {
    fn default() -> Self {
        Self {
            hearing_reminder_lead: Duration::hours(24),
        }
    }
}

pub struct CaseService {
    cases: Arc<dyn CaseRepository>,
    accounts: Arc<dyn AccountRepository>,
    dispatcher: Arc<NotificationDispatcher>,
    events: Arc<EventBus>,
    config: CaseServiceConfig,
}

impl CaseService {
    pub fn new(
        cases: Arc<dyn CaseRepository>,
        accounts: Arc<dyn AccountRepository>,
        dispatcher: Arc<NotificationDispatcher>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            cases,
            accounts,
            dispatcher,
            events,
            config: CaseServiceConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CaseServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a new case awaiting assignment
    pub async fn create_case(&self, intake: NewCase) -> Result<Case, DomainError> {
        if intake.address.prefecture.trim().is_empty() {
            return Err(DomainError::Validation("prefecture is required".into()));
        }
        if intake.property_type.trim().is_empty() {
            return Err(DomainError::Validation("property type is required".into()));
        }

        let number = self.cases.next_case_number().await?;
        let case = self.cases.insert(&Case::new(number, intake)).await?;

        tracing::info!(
            case_id = %case.id,
            case_number = case.case_number,
            prefecture = %case.address.prefecture,
            urgency = %case.urgency,
            "Case created"
        );

        self.events.publish(
            CaseEventType::Created,
            case.id,
            json!({
                "case_number": case.case_number,
                "urgency": case.urgency,
                "property_type": case.property_type,
                "prefecture": case.address.prefecture,
            }),
        );

        Ok(case)
    }

    pub async fn get_case(&self, id: Uuid) -> Result<Case, DomainError> {
        self.cases.get(id).await
    }

    pub async fn find_cases(&self, filter: &CaseFilter) -> Result<Vec<Case>, DomainError> {
        self.cases.find(filter).await
    }

    /// Move a case along its lifecycle
    ///
    /// `Assigned` and `HearingScheduled` carry extra data and are only
    /// reachable through the assignment engine and `schedule_hearing`.
    pub async fn update_status(
        &self,
        case_id: Uuid,
        next: CaseStatus,
        actor: &str,
        comment: Option<String>,
        expected_version: Option<u64>,
    ) -> Result<Case, DomainError> {
        if matches!(next, CaseStatus::Assigned | CaseStatus::HearingScheduled) {
            return Err(DomainError::Validation(format!(
                "status {} cannot be set directly",
                next
            )));
        }

        let case = self.load(case_id, expected_version).await?;
        let updated = CaseStateMachine::transition_at(
            &case,
            next,
            actor,
            comment.clone(),
            self.dispatcher.now(),
        )?;
        let saved = self.cases.save(&updated, case.version).await?;

        tracing::info!(
            case_id = %saved.id,
            from = %case.status,
            to = %saved.status,
            actor = %actor,
            "Case status updated"
        );

        self.notify_assignee(
            &saved,
            AccountMessage {
                kind: NotificationKind::StatusChanged,
                subject: format!("Case {} is now {}", saved.reference(), saved.status),
                body: match &comment {
                    Some(c) => format!(
                        "Case {} moved from {} to {}: {}",
                        saved.reference(),
                        case.status,
                        saved.status,
                        c
                    ),
                    None => format!(
                        "Case {} moved from {} to {}.",
                        saved.reference(),
                        case.status,
                        saved.status
                    ),
                },
                scheduled_for: None,
            },
        )
        .await;

        self.events.publish(
            CaseEventType::Updated,
            saved.id,
            json!({
                "previous_status": case.status,
                "new_status": saved.status,
                "actor": actor,
                "comment": comment,
                "version": saved.version,
            }),
        );

        Ok(saved)
    }

    /// Record an interaction with the customer
    ///
    /// The first contact on an `Assigned` case moves it to `ContactPending`.
    pub async fn log_contact(&self, case_id: Uuid, entry: ContactLog) -> Result<Case, DomainError> {
        let case = self.cases.get(case_id).await?;
        if !case.is_assigned() {
            return Err(DomainError::Validation(format!(
                "case {} has no assignee to log contact for",
                case.reference()
            )));
        }

        let mut updated = if case.status == CaseStatus::Assigned {
            CaseStateMachine::transition_at(
                &case,
                CaseStatus::ContactPending,
                &entry.actor,
                Some(format!("contact via {}", entry.method)),
                entry.timestamp,
            )?
        } else {
            case.clone()
        };
        updated.contact_logs.push(entry.clone());

        let saved = self.cases.save(&updated, case.version).await?;

        tracing::info!(
            case_id = %saved.id,
            actor = %entry.actor,
            method = %entry.method,
            status = %saved.status,
            "Contact logged"
        );

        self.events.publish(
            CaseEventType::ContactLogged,
            saved.id,
            json!({
                "actor": entry.actor,
                "method": entry.method,
                "note": entry.note,
                "status": saved.status,
            }),
        );

        Ok(saved)
    }

    /// Fix the hearing date, notify the assignee and queue a reminder
    pub async fn schedule_hearing(
        &self,
        case_id: Uuid,
        at: DateTime<Utc>,
        actor: &str,
    ) -> Result<Case, DomainError> {
        let now = self.dispatcher.now();
        let case = self.cases.get(case_id).await?;
        let mut updated = CaseStateMachine::transition_at(
            &case,
            CaseStatus::HearingScheduled,
            actor,
            Some(format!("hearing at {}", at.to_rfc3339())),
            now,
        )?;
        updated.hearing_at = Some(at);

        let saved = self.cases.save(&updated, case.version).await?;

        tracing::info!(
            case_id = %saved.id,
            hearing_at = %at,
            actor = %actor,
            "Hearing scheduled"
        );

        let when = at.format("%Y-%m-%d %H:%M UTC");
        self.notify_assignee(
            &saved,
            AccountMessage {
                kind: NotificationKind::HearingScheduled,
                subject: format!("Hearing scheduled for case {}", saved.reference()),
                body: format!("Hearing for case {} is set for {}.", saved.reference(), when),
                scheduled_for: None,
            },
        )
        .await;

        let remind_at = at - self.config.hearing_reminder_lead;
        // same clock the dispatcher schedules against
        if remind_at > now {
            self.notify_assignee(
                &saved,
                AccountMessage {
                    kind: NotificationKind::HearingReminder,
                    subject: format!("Reminder: hearing for case {}", saved.reference()),
                    body: format!(
                        "Reminder: hearing for case {} at {}.",
                        saved.reference(),
                        when
                    ),
                    scheduled_for: Some(remind_at),
                },
            )
            .await;
        } else {
            tracing::debug!(case_id = %saved.id, "Hearing too close for a reminder");
        }

        self.events.publish(
            CaseEventType::HearingScheduled,
            saved.id,
            json!({
                "hearing_at": at,
                "actor": actor,
                "version": saved.version,
            }),
        );

        Ok(saved)
    }

    async fn load(&self, case_id: Uuid, expected_version: Option<u64>) -> Result<Case, DomainError> {
        let case = self.cases.get(case_id).await?;
        match expected_version {
            Some(expected) if expected != case.version => Err(DomainError::lock_conflict(
                "Case",
                case.id,
                expected,
                case.version,
            )),
            _ => Ok(case),
        }
    }

    async fn notify_assignee(&self, case: &Case, message: AccountMessage) {
        let Some(account_id) = case.assigned_account_id else {
            return;
        };
        match self.accounts.find_by_id(account_id).await {
            Ok(Some(account)) => {
                notify_account(&self.dispatcher, &account, case, message).await;
            }
            Ok(None) => {
                tracing::warn!(case_id = %case.id, account_id = %account_id, "Assignee not found");
            }
            Err(e) => {
                tracing::warn!(case_id = %case.id, error = %e, "Assignee lookup failed");
            }
        }
    }
}
