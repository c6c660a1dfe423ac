//! Casehub Engine
//!
//! Application services (assignment, case workflow, notification dispatch,
//! event fan-out) and the infrastructure adapters they run on.
//!
//! # Usage
//!
//! ```rust,ignore
//! use casehub_engine::{Engine, EngineConfig, Stores};
//! use casehub_engine::adapters::TokioScheduler;
//!
//! let config = EngineConfig::load(None)?;
//! let engine = Engine::build(&config, Stores::in_memory(), Arc::new(TokioScheduler::current()))?;
//! let case = engine.cases.create_case(intake).await?;
//! engine.assignments.auto_assign(case.id).await?;
//! ```

pub mod adapters;
pub mod application;
pub mod config;
pub mod engine;

pub use application::{
    AssignRequest, AssignmentEngine, CaseService, DispatcherConfig, EventBus,
    NotificationDispatcher,
};
pub use config::EngineConfig;
pub use engine::{AssignSummary, Engine, Seed, Stores};
