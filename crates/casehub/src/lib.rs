//! Casehub Domain Library
//!
//! Core domain types and interfaces for routing service requests ("cases")
//! to fulfillment accounts and notifying the parties involved.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain/`): Pure business entities and logic
//!   - `entities/`: Core domain models (Case, Account, Company, Notification, DomainEvent)
//!   - `value_objects/`: Immutable value types (CaseStatus, Urgency, Channel, ...)
//!   - `services/`: Case state machine and assignment policy
//!   - `errors/`: Domain-specific error types
//!
//! - **Ports** (`ports/`): Abstract interfaces (traits)
//!   - `repositories/`: Data access interfaces (compare-and-swap on `version`)
//!   - `channel`: Notification delivery adapters
//!   - `scheduler`: Clock and cancellable delayed jobs
//!   - `events`: Event bus subscribers
//!
//! # Usage
//!
//! ```rust,ignore
//! use casehub::domain::{Case, CaseStateMachine, CaseStatus};
//! use casehub::ports::{CaseRepository, ChannelAdapter};
//! ```

pub mod domain;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    Account, AccountContact, Address, AssignmentMethod, AttemptOutcome, Availability, Candidate,
    Case, CaseEventType, CaseStateMachine, CaseStatus, Channel, Company, ContactLog,
    DeliveryAttempt, DomainError, DomainEvent, FailureOutcome, Ineligibility, NewCase,
    Notification, NotificationKind, NotificationMetadata, NotificationRequest,
    NotificationStatus, PerformanceMetrics, Preferences, Reassignment, StatusChange, Urgency,
    DEFAULT_MAX_RETRIES,
};
pub use ports::{
    // Repositories
    AccountFilter,
    AccountRepository,
    // Time
    CancelToken,
    CaseFilter,
    CaseRepository,
    // Channels
    ChannelAdapter,
    ChannelReceipt,
    Clock,
    CompanyRepository,
    // Events
    EventSubscriber,
    NotificationFilter,
    NotificationRepository,
    ScheduledJob,
    Scheduler,
};
