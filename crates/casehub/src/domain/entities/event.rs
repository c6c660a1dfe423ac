//! DomainEvent - Something that happened to a case

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event types published on the event bus
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CaseEventType {
    #[serde(rename = "case.created")]
    Created,
    #[serde(rename = "case.assigned")]
    Assigned,
    #[serde(rename = "case.updated")]
    Updated,
    #[serde(rename = "case.contact-logged")]
    ContactLogged,
    #[serde(rename = "case.hearing-scheduled")]
    HearingScheduled,
}

impl CaseEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "case.created",
            Self::Assigned => "case.assigned",
            Self::Updated => "case.updated",
            Self::ContactLogged => "case.contact-logged",
            Self::HearingScheduled => "case.hearing-scheduled",
        }
    }
}

impl std::fmt::Display for CaseEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event envelope handed to subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub id: Uuid,
    pub event_type: CaseEventType,
    pub case_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    /// Event-specific data
    pub payload: serde_json::Value,
}

impl DomainEvent {
    pub fn new(event_type: CaseEventType, case_id: Uuid, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            case_id,
            occurred_at: Utc::now(),
            payload,
        }
    }
}
