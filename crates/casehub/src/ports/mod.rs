//! Ports (Interfaces)
//!
//! Abstract interfaces that define how the domain layer
//! interacts with external systems (repositories, channels, time, events).
//!
//! Implementations of these traits live in the infrastructure layer.

pub mod channel;
pub mod events;
pub mod repositories;
pub mod scheduler;

// Re-exports
pub use channel::*;
pub use events::*;
pub use repositories::*;
pub use scheduler::*;
