//! Infrastructure Adapters
//!
//! Implementations of domain ports for external systems.

pub mod dry_run;
pub mod http_channel;
pub mod memory;
pub mod postgres;
pub mod scheduler;
pub mod subscribers;
mod versioned;

// Re-exports
pub use dry_run::LoggingChannelAdapter;
pub use http_channel::{HttpChannelAdapter, HttpChannelConfig};
pub use memory::{
    InMemoryAccountRepository, InMemoryCaseRepository, InMemoryCompanyRepository,
    InMemoryNotificationRepository,
};
pub use postgres::{
    PgAccountRepository, PgCaseRepository, PgCompanyRepository, PgNotificationRepository,
};
pub use scheduler::{ManualScheduler, TokioScheduler};
pub use subscribers::{EventLogger, LiveUpdateBroadcaster};
