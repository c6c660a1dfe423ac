//! Value Objects
//!
//! Immutable objects defined by their attributes rather than identity.

mod assignment_method;
mod case_status;
mod channel;
mod notification_status;
mod urgency;

pub use assignment_method::*;
pub use case_status::*;
pub use channel::*;
pub use notification_status::*;
pub use urgency::*;
