//! AssignmentMethod - How a case got its current account

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentMethod {
    Manual,
    Automatic,
    Reassigned,
}

impl std::fmt::Display for AssignmentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssignmentMethod::Manual => write!(f, "manual"),
            AssignmentMethod::Automatic => write!(f, "automatic"),
            AssignmentMethod::Reassigned => write!(f, "reassigned"),
        }
    }
}
