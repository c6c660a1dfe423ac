//! Clock & Scheduler Port
//!
//! Time source and delayed-task runner used by the notification pipeline.
//! Implementations must be safe to call from any worker thread.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// A one-shot unit of delayed work
pub type ScheduledJob = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Runs jobs after a delay
pub trait Scheduler: Clock {
    /// Run `job` once after `delay`, unless the returned token is cancelled first
    fn after(&self, delay: Duration, job: ScheduledJob) -> CancelToken;
}

/// Handle used to cancel a scheduled job before it fires
///
/// Cancelling after the job started has no effect on the running job.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
