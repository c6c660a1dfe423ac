//! Repository Ports
//!
//! Abstract interfaces for data persistence operations.

mod account_repository;
mod case_repository;
mod company_repository;
mod notification_repository;

pub use account_repository::*;
pub use case_repository::*;
pub use company_repository::*;
pub use notification_repository::*;
