//! Case - A service request moving through the fixed lifecycle
//!
//! Pure domain entity without infrastructure dependencies.
//! Status changes go through `CaseStateMachine`; nothing else should
//! write `status` or `status_history`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{AssignmentMethod, CaseStatus, Urgency};

/// Case - single service request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Case {
    pub id: Uuid,
    /// Unique, sequential, allocated by the case store
    pub case_number: u64,
    pub status: CaseStatus,
    /// Append-only audit trail, one entry per transition
    #[serde(default)]
    pub status_history: Vec<StatusChange>,
    #[serde(default)]
    pub urgency: Urgency,
    pub property_type: String,
    pub address: Address,
    pub assigned_company_id: Option<Uuid>,
    pub assigned_account_id: Option<Uuid>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub assignment_method: Option<AssignmentMethod>,
    #[serde(default)]
    pub reassignment_history: Vec<Reassignment>,
    #[serde(default)]
    pub contact_logs: Vec<ContactLog>,
    pub hearing_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency token, bumped by the store on every write
    #[serde(default)]
    pub version: u64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// Location of the property; prefecture is the routing area
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Address {
    pub prefecture: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

/// One entry of the status audit trail
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusChange {
    pub previous_status: CaseStatus,
    pub new_status: CaseStatus,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub comment: Option<String>,
}

/// Record of a case moving from one company/account to another
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reassignment {
    pub previous_company_id: Option<Uuid>,
    pub previous_account_id: Option<Uuid>,
    pub new_company_id: Uuid,
    pub new_account_id: Uuid,
    pub actor: String,
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A contact attempt with the customer, logged by the assigned account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactLog {
    pub actor: String,
    /// e.g. "phone", "email", "visit"
    pub method: String,
    pub note: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Intake data for a new case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCase {
    #[serde(default)]
    pub urgency: Urgency,
    pub property_type: String,
    pub address: Address,
}

impl Address {
    pub fn new(prefecture: impl Into<String>) -> Self {
        Self {
            prefecture: prefecture.into(),
            ..Default::default()
        }
    }
}

impl Case {
    /// Create a new case awaiting assignment
    pub fn new(case_number: u64, intake: NewCase) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            case_number,
            status: CaseStatus::PendingAssignment,
            status_history: Vec::new(),
            urgency: intake.urgency,
            property_type: intake.property_type,
            address: intake.address,
            assigned_company_id: None,
            assigned_account_id: None,
            assigned_at: None,
            assignment_method: None,
            reassignment_history: Vec::new(),
            contact_logs: Vec::new(),
            hearing_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Routing area of the case
    pub fn area(&self) -> &str {
        &self.address.prefecture
    }

    pub fn is_assigned(&self) -> bool {
        self.assigned_account_id.is_some()
    }

    /// Human-facing case reference, e.g. `C-000042`
    pub fn reference(&self) -> String {
        format!("C-{:06}", self.case_number)
    }
}

impl ContactLog {
    pub fn new(actor: impl Into<String>, method: impl Into<String>, note: Option<String>) -> Self {
        Self {
            actor: actor.into(),
            method: method.into(),
            note,
            timestamp: Utc::now(),
        }
    }
}
