//! CaseStatus - Lifecycle stage of a case

use serde::{Deserialize, Serialize};

/// Case lifecycle status
///
/// The allowed moves between statuses are fixed; see [`CaseStatus::successors`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    #[default]
    PendingAssignment,
    Assigned,
    ContactPending,
    HearingScheduled,
    HearingComplete,
    EstimateRequested,
    EstimateReceived,
    EstimateSubmitted,
    ContractPending,
    Contracted,
}

impl CaseStatus {
    /// Every status, in lifecycle order
    pub const ALL: [CaseStatus; 10] = [
        CaseStatus::PendingAssignment,
        CaseStatus::Assigned,
        CaseStatus::ContactPending,
        CaseStatus::HearingScheduled,
        CaseStatus::HearingComplete,
        CaseStatus::EstimateRequested,
        CaseStatus::EstimateReceived,
        CaseStatus::EstimateSubmitted,
        CaseStatus::ContractPending,
        CaseStatus::Contracted,
    ];

    /// Statuses reachable from this one in a single transition
    pub fn successors(&self) -> &'static [CaseStatus] {
        use CaseStatus::*;
        match self {
            PendingAssignment => &[Assigned],
            Assigned => &[ContactPending],
            ContactPending => &[HearingScheduled],
            HearingScheduled => &[HearingComplete],
            HearingComplete => &[EstimateRequested],
            EstimateRequested => &[EstimateReceived],
            EstimateReceived => &[EstimateSubmitted],
            EstimateSubmitted => &[ContractPending, Contracted],
            ContractPending => &[Contracted],
            Contracted => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.successors().is_empty()
    }

    /// Whether the assignment engine may (re)bind this case
    pub fn accepts_assignment(&self) -> bool {
        matches!(self, CaseStatus::PendingAssignment | CaseStatus::Assigned)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::PendingAssignment => "PENDING_ASSIGNMENT",
            CaseStatus::Assigned => "ASSIGNED",
            CaseStatus::ContactPending => "CONTACT_PENDING",
            CaseStatus::HearingScheduled => "HEARING_SCHEDULED",
            CaseStatus::HearingComplete => "HEARING_COMPLETE",
            CaseStatus::EstimateRequested => "ESTIMATE_REQUESTED",
            CaseStatus::EstimateReceived => "ESTIMATE_RECEIVED",
            CaseStatus::EstimateSubmitted => "ESTIMATE_SUBMITTED",
            CaseStatus::ContractPending => "CONTRACT_PENDING",
            CaseStatus::Contracted => "CONTRACTED",
        }
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        CaseStatus::ALL
            .iter()
            .find(|status| status.as_str() == normalized)
            .copied()
            .ok_or_else(|| format!("Unknown case status: {}", s))
    }
}
