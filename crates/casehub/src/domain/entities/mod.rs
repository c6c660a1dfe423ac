//! Domain Entities
//!
//! Pure domain models without infrastructure dependencies.
//! - Case: Service request and its audit trail
//! - Account: Fulfillment party receiving cases
//! - Company: Organisation owning accounts
//! - Notification: Outbound message with delivery log
//! - DomainEvent: Published case event

mod account;
mod case;
mod company;
mod event;
mod notification;

pub use account::*;
pub use case::*;
pub use company::*;
pub use event::*;
pub use notification::*;
