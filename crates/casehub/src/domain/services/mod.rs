//! Domain Services
//!
//! Stateless domain logic that spans entities.

pub mod assignment_policy;
mod state_machine;

pub use assignment_policy::{Candidate, Ineligibility};
pub use state_machine::CaseStateMachine;
