//! Application Layer (Use Cases)
//!
//! Orchestrates domain operations and coordinates between
//! repositories, channel adapters and event subscribers.

mod assignment_engine;
mod case_service;
mod event_bus;
mod notification_dispatcher;
mod notify;

pub use assignment_engine::{AssignRequest, AssignmentConfig, AssignmentEngine, SYSTEM_ACTOR};
pub use case_service::{CaseService, CaseServiceConfig};
pub use event_bus::{EventBus, PublishReport};
pub use notification_dispatcher::{DispatcherConfig, NotificationDispatcher};
pub use notify::{notify_account, requests_for, AccountMessage};
