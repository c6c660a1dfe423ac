//! Notification Dispatcher (Use Case)
//!
//! Creates notifications, hands them to channel adapters, and drives
//! retries with exponential backoff through the `Scheduler` port.
//!
//! Delivery failures never propagate to the code that created the
//! notification: they are recorded on the notification itself (status,
//! attempt log, last error) and surfaced through queries.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use casehub::{
    CancelToken, Channel, ChannelAdapter, ChannelReceipt, DomainError, FailureOutcome,
    Notification, NotificationFilter, NotificationRepository, NotificationRequest,
    NotificationStatus, ScheduledJob, Scheduler, DEFAULT_MAX_RETRIES,
};

/// Dispatcher tuning
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Upper bound on a single adapter call; hitting it counts as a failure
    pub send_timeout: Duration,
    /// Backoff unit; retry `n` waits `retry_unit * 2^n`
    pub retry_unit: Duration,
    /// Retry budget for requests that do not set their own
    pub default_max_retries: u32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_secs(30),
            retry_unit: Duration::from_secs(60),
            default_max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

pub struct NotificationDispatcher {
    repo: Arc<dyn NotificationRepository>,
    adapters: HashMap<Channel, Arc<dyn ChannelAdapter>>,
    scheduler: Arc<dyn Scheduler>,
    config: DispatcherConfig,
    /// Pending one-shot timers (scheduled sends and retries), by notification id
    timers: Mutex<HashMap<Uuid, CancelToken>>,
    /// Notifications currently inside an adapter call
    in_flight: Mutex<HashSet<Uuid>>,
}

impl NotificationDispatcher {
    pub fn new(
        repo: Arc<dyn NotificationRepository>,
        scheduler: Arc<dyn Scheduler>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            repo,
            adapters: HashMap::new(),
            scheduler,
            config,
            timers: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Register the adapter for its channel, replacing any previous one
    pub fn with_adapter(mut self, adapter: Arc<dyn ChannelAdapter>) -> Self {
        tracing::info!(channel = %adapter.channel(), "Channel adapter registered");
        self.adapters.insert(adapter.channel(), adapter);
        self
    }

    pub fn has_adapter(&self, channel: Channel) -> bool {
        self.adapters.contains_key(&channel)
    }

    /// Current time on the scheduler's clock
    pub fn now(&self) -> DateTime<Utc> {
        self.scheduler.now()
    }

    /// Persist a new notification and send it now or at `scheduled_for`
    ///
    /// Only persistence of the new record can fail here; send failures end
    /// up in the returned notification's state.
    pub async fn create(
        self: &Arc<Self>,
        request: NotificationRequest,
    ) -> Result<Notification, DomainError> {
        let now = self.scheduler.now();
        let notification =
            Notification::from_request(request, self.config.default_max_retries, now);
        let stored = self.repo.insert(&notification).await?;

        tracing::info!(
            notification_id = %stored.id,
            kind = %stored.kind,
            channel = %stored.channel,
            case_id = ?stored.case_id,
            "Notification created"
        );

        match stored.scheduled_for {
            Some(at) if !stored.is_due(now) => {
                let delay = (at - now).to_std().unwrap_or_default();
                tracing::info!(
                    notification_id = %stored.id,
                    scheduled_for = %at,
                    "Notification scheduled"
                );
                self.schedule_send(stored.id, delay);
                Ok(stored)
            }
            _ => match self.send(stored.id).await {
                Ok(sent) => Ok(sent),
                Err(e) => {
                    tracing::warn!(
                        notification_id = %stored.id,
                        error = %e,
                        "Immediate send failed to run"
                    );
                    Ok(stored)
                }
            },
        }
    }

    /// Attempt delivery of a pending notification
    ///
    /// No-op for anything not `Pending`. Channel errors and timeouts are
    /// recorded on the notification and trigger a retry while budget remains.
    pub async fn send(self: &Arc<Self>, id: Uuid) -> Result<Notification, DomainError> {
        // Whoever sends now supersedes a pending timer
        if let Some(token) = self.take_timer(id) {
            token.cancel();
        }

        let Some(claim) = InFlightClaim::acquire(&self.in_flight, id) else {
            tracing::debug!(notification_id = %id, "Send already in flight, skipping");
            return self.repo.get(id).await;
        };

        let notification = self.repo.get(id).await?;
        if notification.status != NotificationStatus::Pending {
            tracing::debug!(
                notification_id = %id,
                status = %notification.status,
                "Notification not pending, send skipped"
            );
            return Ok(notification);
        }

        let expected_version = notification.version;
        let mut updated = notification.clone();
        let result = self.deliver(&notification).await;
        let now = self.scheduler.now();

        match result {
            Ok(receipt) => {
                updated.mark_sent(receipt.external_id, receipt.provider_response, now)?;
                let saved = self.repo.save(&updated, expected_version).await?;
                tracing::info!(
                    notification_id = %id,
                    channel = %saved.channel,
                    external_id = ?saved.external_id,
                    attempts = saved.delivery_attempts.len(),
                    "Notification sent"
                );
                Ok(saved)
            }
            Err(error) => {
                let outcome = updated.mark_failed(error.to_string(), now)?;
                let saved = self.repo.save(&updated, expected_version).await?;
                match outcome {
                    FailureOutcome::RetryScheduled { retry_count } => {
                        let delay = self.retry_delay(retry_count);
                        tracing::warn!(
                            notification_id = %id,
                            channel = %saved.channel,
                            error = %error,
                            retry_count,
                            max_retries = saved.metadata.max_retries,
                            retry_in = ?delay,
                            "Notification send failed, retry scheduled"
                        );
                        // the retry must find the claim released, however short the delay
                        drop(claim);
                        self.schedule_send(id, delay);
                    }
                    FailureOutcome::Exhausted => {
                        tracing::warn!(
                            notification_id = %id,
                            channel = %saved.channel,
                            error = %error,
                            attempts = saved.delivery_attempts.len(),
                            "Notification failed permanently, retries exhausted"
                        );
                    }
                }
                Ok(saved)
            }
        }
    }

    /// Send a pending notification right away, superseding its timer
    pub async fn resend(self: &Arc<Self>, id: Uuid) -> Result<Notification, DomainError> {
        let notification = self.repo.get(id).await?;
        if notification.retries_exhausted() {
            return Err(DomainError::RetryExhausted {
                id,
                attempts: notification.delivery_attempts.len() as u32,
            });
        }
        if notification.status != NotificationStatus::Pending {
            return Err(DomainError::Validation(format!(
                "notification {} is {} and cannot be resent",
                id, notification.status
            )));
        }
        self.send(id).await
    }

    /// Cancel a pending notification and its timer
    pub async fn cancel(&self, id: Uuid) -> Result<Notification, DomainError> {
        if let Some(token) = self.take_timer(id) {
            token.cancel();
        }
        let now = self.scheduler.now();
        self.update(id, |n| n.mark_cancelled(now)).await
    }

    /// Provider receipt: message reached the recipient
    pub async fn mark_delivered(&self, id: Uuid) -> Result<Notification, DomainError> {
        let now = self.scheduler.now();
        self.update(id, |n| n.mark_delivered(now)).await
    }

    /// Provider receipt: recipient opened the message
    pub async fn mark_read(&self, id: Uuid) -> Result<Notification, DomainError> {
        let now = self.scheduler.now();
        self.update(id, |n| n.mark_read(now)).await
    }

    /// Provider receipt: message bounced after being accepted
    pub async fn mark_bounced(
        &self,
        id: Uuid,
        reason: impl Into<String>,
    ) -> Result<Notification, DomainError> {
        let now = self.scheduler.now();
        let reason = reason.into();
        self.update(id, move |n| n.mark_bounced(reason, now)).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Notification, DomainError> {
        self.repo.get(id).await
    }

    pub async fn find_by_case(&self, case_id: Uuid) -> Result<Vec<Notification>, DomainError> {
        self.repo.find(&NotificationFilter::for_case(case_id)).await
    }

    /// Number of scheduled sends/retries not yet fired or cancelled
    pub fn pending_timers(&self) -> usize {
        self.lock_timers().len()
    }

    /// Backoff before retry number `retry_count` (1-based)
    pub fn retry_delay(&self, retry_count: u32) -> Duration {
        let factor = 2u32.checked_pow(retry_count).unwrap_or(u32::MAX);
        self.config.retry_unit.saturating_mul(factor)
    }

    async fn deliver(&self, notification: &Notification) -> Result<ChannelReceipt, DomainError> {
        let adapter = self.adapters.get(&notification.channel).ok_or_else(|| {
            DomainError::ChannelUnavailable(format!(
                "no adapter registered for channel {}",
                notification.channel
            ))
        })?;

        match tokio::time::timeout(self.config.send_timeout, adapter.send(notification)).await {
            Ok(result) => result,
            Err(_) => Err(DomainError::ChannelUnavailable(format!(
                "{} send timed out after {:?}",
                notification.channel, self.config.send_timeout
            ))),
        }
    }

    fn schedule_send(self: &Arc<Self>, id: Uuid, delay: Duration) {
        let dispatcher = Arc::clone(self);
        let job: ScheduledJob = Box::pin(async move {
            if let Err(e) = dispatcher.send(id).await {
                tracing::warn!(notification_id = %id, error = %e, "Scheduled send failed to run");
            }
        });

        // a job firing right away blocks in `take_timer` until its token is stored
        let mut timers = self.lock_timers();
        let token = self.scheduler.after(delay, job);
        if let Some(previous) = timers.insert(id, token) {
            previous.cancel();
        }
    }

    async fn update<F>(&self, id: Uuid, apply: F) -> Result<Notification, DomainError>
    where
        F: FnOnce(&mut Notification) -> Result<(), DomainError> + Send,
    {
        let notification = self.repo.get(id).await?;
        let expected_version = notification.version;
        let mut updated = notification;
        apply(&mut updated)?;
        let saved = self.repo.save(&updated, expected_version).await?;
        tracing::info!(notification_id = %id, status = %saved.status, "Notification updated");
        Ok(saved)
    }

    fn take_timer(&self, id: Uuid) -> Option<CancelToken> {
        self.lock_timers().remove(&id)
    }

    fn lock_timers(&self) -> MutexGuard<'_, HashMap<Uuid, CancelToken>> {
        self.timers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Marks a notification as being sent; released on drop
struct InFlightClaim<'a> {
    set: &'a Mutex<HashSet<Uuid>>,
    id: Uuid,
}

impl<'a> InFlightClaim<'a> {
    fn acquire(set: &'a Mutex<HashSet<Uuid>>, id: Uuid) -> Option<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id);
        inserted.then_some(Self { set, id })
    }
}

impl Drop for InFlightClaim<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryNotificationRepository;
    use crate::adapters::scheduler::ManualScheduler;
    use async_trait::async_trait;
    use casehub::{Clock, NotificationKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `failures` calls, then succeeds
    struct ScriptedChannel {
        failures: usize,
        calls: AtomicUsize,
    }

    impl ScriptedChannel {
        fn new(failures: usize) -> Arc<Self> {
            Arc::new(Self {
                failures,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChannelAdapter for ScriptedChannel {
        fn channel(&self) -> Channel {
            Channel::Sms
        }

        async fn send(&self, notification: &Notification) -> Result<ChannelReceipt, DomainError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(DomainError::ChannelUnavailable("gateway 503".into()));
            }
            Ok(ChannelReceipt {
                external_id: format!("sms-{}", notification.id),
                provider_response: serde_json::json!({"status": "queued"}),
            })
        }
    }

    /// Never answers
    struct HangingChannel;

    #[async_trait]
    impl ChannelAdapter for HangingChannel {
        fn channel(&self) -> Channel {
            Channel::Sms
        }

        async fn send(&self, _notification: &Notification) -> Result<ChannelReceipt, DomainError> {
            std::future::pending().await
        }
    }

    fn dispatcher(
        adapter: Arc<dyn ChannelAdapter>,
        scheduler: Arc<ManualScheduler>,
    ) -> Arc<NotificationDispatcher> {
        let config = DispatcherConfig {
            send_timeout: Duration::from_millis(50),
            retry_unit: Duration::from_secs(60),
            default_max_retries: 3,
        };
        Arc::new(
            NotificationDispatcher::new(
                Arc::new(InMemoryNotificationRepository::new()),
                scheduler,
                config,
            )
            .with_adapter(adapter),
        )
    }

    fn sms_request() -> NotificationRequest {
        NotificationRequest::new(
            NotificationKind::CaseAssigned,
            Channel::Sms,
            "+81-90-0000-0000",
            "Case C-000001 assigned",
        )
    }

    #[tokio::test]
    async fn test_immediate_send_succeeds() {
        let scheduler = Arc::new(ManualScheduler::new());
        let channel = ScriptedChannel::new(0);
        let dispatcher = dispatcher(channel.clone(), scheduler.clone());

        let n = dispatcher.create(sms_request()).await.unwrap();

        assert_eq!(n.status, NotificationStatus::Sent);
        assert_eq!(n.external_id, Some(format!("sms-{}", n.id)));
        assert_eq!(n.delivery_attempts.len(), 1);
        assert_eq!(channel.calls(), 1);
        assert_eq!(dispatcher.pending_timers(), 0);
    }

    #[tokio::test]
    async fn test_retry_with_exponential_backoff_then_success() {
        let scheduler = Arc::new(ManualScheduler::new());
        let channel = ScriptedChannel::new(2);
        let dispatcher = dispatcher(channel.clone(), scheduler.clone());

        let n = dispatcher.create(sms_request()).await.unwrap();
        assert_eq!(n.status, NotificationStatus::Pending);
        assert_eq!(n.metadata.retry_count, 1);

        // first retry waits 2 minutes
        scheduler.advance(Duration::from_secs(119)).await;
        assert_eq!(channel.calls(), 1);
        scheduler.advance(Duration::from_secs(1)).await;
        assert_eq!(channel.calls(), 2);

        // second retry waits 4 minutes
        scheduler.advance(Duration::from_secs(240)).await;
        assert_eq!(channel.calls(), 3);

        let n = dispatcher.get(n.id).await.unwrap();
        assert_eq!(n.status, NotificationStatus::Sent);
        assert_eq!(n.metadata.retry_count, 2);
        assert_eq!(n.delivery_attempts.len(), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let scheduler = Arc::new(ManualScheduler::new());
        let channel = ScriptedChannel::new(usize::MAX);
        let dispatcher = dispatcher(channel.clone(), scheduler.clone());

        let n = dispatcher.create(sms_request()).await.unwrap();
        let mut last_retry_count = n.metadata.retry_count;

        for _ in 0..10 {
            scheduler.advance(Duration::from_secs(3600)).await;
            let current = dispatcher.get(n.id).await.unwrap();
            assert!(current.metadata.retry_count >= last_retry_count);
            assert!(current.metadata.retry_count <= current.metadata.max_retries);
            last_retry_count = current.metadata.retry_count;
        }

        let n = dispatcher.get(n.id).await.unwrap();
        assert_eq!(n.status, NotificationStatus::Failed);
        assert!(n.retries_exhausted());
        // initial attempt + 3 retries
        assert_eq!(channel.calls(), 4);
        assert_eq!(dispatcher.pending_timers(), 0);

        // nothing left to do, even when asked
        let again = dispatcher.send(n.id).await.unwrap();
        assert_eq!(again.status, NotificationStatus::Failed);
        assert_eq!(channel.calls(), 4);
        assert!(matches!(
            dispatcher.resend(n.id).await,
            Err(DomainError::RetryExhausted { attempts: 4, .. })
        ));
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let scheduler = Arc::new(ManualScheduler::new());
        let dispatcher = dispatcher(Arc::new(HangingChannel), scheduler.clone());

        let n = dispatcher.create(sms_request()).await.unwrap();

        assert_eq!(n.status, NotificationStatus::Pending);
        assert_eq!(n.metadata.retry_count, 1);
        assert!(n.last_error.unwrap().contains("timed out"));
        assert_eq!(dispatcher.pending_timers(), 1);
    }

    #[tokio::test]
    async fn test_missing_adapter_is_recorded_not_raised() {
        let scheduler = Arc::new(ManualScheduler::new());
        let dispatcher = dispatcher(ScriptedChannel::new(0), scheduler);

        let request = NotificationRequest::new(
            NotificationKind::StatusChanged,
            Channel::Email,
            "ops@example.com",
            "status changed",
        )
        .with_max_retries(0);
        let n = dispatcher.create(request).await.unwrap();

        assert_eq!(n.status, NotificationStatus::Failed);
        assert!(n.last_error.unwrap().contains("no adapter registered"));
    }

    #[tokio::test]
    async fn test_scheduled_notification_waits_for_its_time() {
        let scheduler = Arc::new(ManualScheduler::new());
        let channel = ScriptedChannel::new(0);
        let dispatcher = dispatcher(channel.clone(), scheduler.clone());

        let at = scheduler.now() + chrono::Duration::hours(2);
        let n = dispatcher
            .create(sms_request().scheduled_for(at))
            .await
            .unwrap();

        assert_eq!(n.status, NotificationStatus::Pending);
        assert_eq!(channel.calls(), 0);

        scheduler.advance(Duration::from_secs(3600)).await;
        assert_eq!(channel.calls(), 0);
        scheduler.advance(Duration::from_secs(3600)).await;
        assert_eq!(channel.calls(), 1);
        assert_eq!(
            dispatcher.get(n.id).await.unwrap().status,
            NotificationStatus::Sent
        );
    }

    #[tokio::test]
    async fn test_resend_supersedes_pending_timer() {
        let scheduler = Arc::new(ManualScheduler::new());
        let channel = ScriptedChannel::new(1);
        let dispatcher = dispatcher(channel.clone(), scheduler.clone());

        let n = dispatcher.create(sms_request()).await.unwrap();
        assert_eq!(dispatcher.pending_timers(), 1);

        let n = dispatcher.resend(n.id).await.unwrap();
        assert_eq!(n.status, NotificationStatus::Sent);
        assert_eq!(dispatcher.pending_timers(), 0);

        // the superseded retry timer must not fire another send
        scheduler.advance(Duration::from_secs(3600)).await;
        assert_eq!(channel.calls(), 2);
    }

    #[tokio::test]
    async fn test_cancel_stops_scheduled_send() {
        let scheduler = Arc::new(ManualScheduler::new());
        let channel = ScriptedChannel::new(0);
        let dispatcher = dispatcher(channel.clone(), scheduler.clone());

        let at = scheduler.now() + chrono::Duration::minutes(30);
        let n = dispatcher
            .create(sms_request().scheduled_for(at))
            .await
            .unwrap();
        let n = dispatcher.cancel(n.id).await.unwrap();
        assert_eq!(n.status, NotificationStatus::Cancelled);

        scheduler.advance(Duration::from_secs(3600)).await;
        assert_eq!(channel.calls(), 0);
    }

    #[tokio::test]
    async fn test_receipts() {
        let scheduler = Arc::new(ManualScheduler::new());
        let dispatcher = dispatcher(ScriptedChannel::new(0), scheduler);

        let n = dispatcher.create(sms_request()).await.unwrap();
        let n = dispatcher.mark_delivered(n.id).await.unwrap();
        assert_eq!(n.status, NotificationStatus::Delivered);
        let n = dispatcher.mark_read(n.id).await.unwrap();
        assert_eq!(n.status, NotificationStatus::Read);
        assert!(dispatcher.mark_bounced(n.id, "late bounce").await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_zero_delay_retries_run_to_completion() {
        use crate::adapters::scheduler::TokioScheduler;

        let channel = ScriptedChannel::new(2);
        let config = DispatcherConfig {
            send_timeout: Duration::from_secs(1),
            retry_unit: Duration::ZERO,
            default_max_retries: 3,
        };
        let dispatcher = Arc::new(
            NotificationDispatcher::new(
                Arc::new(InMemoryNotificationRepository::new()),
                Arc::new(TokioScheduler::current()),
                config,
            )
            .with_adapter(channel.clone()),
        );

        let n = dispatcher.create(sms_request()).await.unwrap();

        let sent = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let current = dispatcher.get(n.id).await.unwrap();
                if current.status != NotificationStatus::Pending {
                    return current;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("retries stalled with the notification still pending");

        assert_eq!(sent.status, NotificationStatus::Sent);
        assert_eq!(channel.calls(), 3);
        assert_eq!(dispatcher.pending_timers(), 0);
    }

    #[test]
    fn test_retry_delay_doubles() {
        let scheduler = Arc::new(ManualScheduler::new());
        let d = dispatcher(ScriptedChannel::new(0), scheduler);
        assert_eq!(d.retry_delay(1), Duration::from_secs(120));
        assert_eq!(d.retry_delay(2), Duration::from_secs(240));
        assert_eq!(d.retry_delay(3), Duration::from_secs(480));
    }
}
