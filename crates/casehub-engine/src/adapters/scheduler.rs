//! Scheduler Implementations
//!
//! - `TokioScheduler`: wall-clock timers on the tokio runtime
//! - `ManualScheduler`: virtual time advanced explicitly, for simulations
//!   and deterministic tests of retry behaviour

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;

use casehub::{CancelToken, Clock, ScheduledJob, Scheduler};

/// Spawns one tokio task per scheduled job
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Bind to the runtime of the calling task
    ///
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl Clock for TokioScheduler {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl Scheduler for TokioScheduler {
    fn after(&self, delay: Duration, job: ScheduledJob) -> CancelToken {
        let token = CancelToken::new();
        let guard = token.clone();

        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if guard.is_cancelled() {
                tracing::debug!("Scheduled job cancelled before firing");
                return;
            }
            job.await;
        });

        token
    }
}

struct PendingJob {
    due: DateTime<Utc>,
    seq: u64,
    token: CancelToken,
    job: ScheduledJob,
}

struct ManualState {
    now: DateTime<Utc>,
    next_seq: u64,
    jobs: Vec<PendingJob>,
}

/// Virtual-time scheduler; nothing fires until `advance` is awaited
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            state: Mutex::new(ManualState {
                now,
                next_seq: 0,
                jobs: Vec::new(),
            }),
        }
    }

    /// Number of jobs waiting to fire (cancelled ones excluded)
    pub fn pending(&self) -> usize {
        self.lock()
            .jobs
            .iter()
            .filter(|j| !j.token.is_cancelled())
            .count()
    }

    /// Move virtual time forward, running every job that falls due
    ///
    /// Jobs run in due-time order, and the clock reads each job's due time
    /// while it runs, so jobs scheduled by a running job are placed
    /// relative to that moment and also fire if they fall inside the window.
    pub async fn advance(&self, by: Duration) {
        let step = chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::days(36_500));
        let target = self.lock().now + step;

        loop {
            let next = {
                let mut state = self.lock();
                state.jobs.retain(|j| !j.token.is_cancelled());
                let index = state
                    .jobs
                    .iter()
                    .enumerate()
                    .filter(|(_, j)| j.due <= target)
                    .min_by_key(|(_, j)| (j.due, j.seq))
                    .map(|(i, _)| i);

                match index {
                    Some(i) => {
                        let job = state.jobs.remove(i);
                        if job.due > state.now {
                            state.now = job.due;
                        }
                        Some(job)
                    }
                    None => {
                        if target > state.now {
                            state.now = target;
                        }
                        None
                    }
                }
            };

            match next {
                Some(pending) if !pending.token.is_cancelled() => pending.job.await,
                Some(_) => continue,
                None => break,
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for ManualScheduler {
    fn now(&self) -> DateTime<Utc> {
        self.lock().now
    }
}

impl Scheduler for ManualScheduler {
    fn after(&self, delay: Duration, job: ScheduledJob) -> CancelToken {
        let token = CancelToken::new();
        let mut state = self.lock();
        let due = state.now + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::days(36_500));
        let seq = state.next_seq;
        state.next_seq += 1;
        state.jobs.push(PendingJob {
            due,
            seq,
            token: token.clone(),
            job,
        });
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_job(counter: &Arc<AtomicUsize>) -> ScheduledJob {
        let counter = Arc::clone(counter);
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn test_manual_scheduler_fires_in_order_and_skips_cancelled() {
        let scheduler = ManualScheduler::new();
        let start = scheduler.now();
        let fired = Arc::new(AtomicUsize::new(0));

        scheduler.after(Duration::from_secs(10), counting_job(&fired));
        let cancelled = scheduler.after(Duration::from_secs(5), counting_job(&fired));
        cancelled.cancel();
        assert_eq!(scheduler.pending(), 1);

        scheduler.advance(Duration::from_secs(9)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        scheduler.advance(Duration::from_secs(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.now() - start, chrono::Duration::seconds(10));
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn test_tokio_scheduler_runs_job() {
        let scheduler = TokioScheduler::current();
        let (tx, rx) = tokio::sync::oneshot::channel();
        scheduler.after(
            Duration::from_millis(10),
            Box::pin(async move {
                let _ = tx.send(());
            }),
        );
        tokio::time::timeout(Duration::from_secs(2), rx)
            .await
            .expect("job should fire")
            .unwrap();
    }

    #[tokio::test]
    async fn test_tokio_scheduler_cancel() {
        let scheduler = TokioScheduler::current();
        let fired = Arc::new(AtomicUsize::new(0));
        let token = scheduler.after(Duration::from_millis(20), counting_job(&fired));
        token.cancel();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
