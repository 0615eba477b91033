//! Offline-first sync of new records to the collection service.
//!
//! DESIGN
//! ======
//! The store hands each new record to `OfflineFirstSync::dispatch`, which
//! spawns a delivery task and returns at once. The task posts through a
//! `FeedbackSink` and retries according to a `RetryPolicy`. The default
//! policy makes a single attempt with no retry.
//!
//! ERROR HANDLING
//! ==============
//! Delivery failures never reach the caller of `dispatch`. They end up as a
//! `SyncOutcome::Abandoned` collected by `settle`, plus a warning in the log.
//! Any HTTP response, whatever its status, counts as delivered: the service's
//! answer is not reconciled into client state.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rand::Rng;
use records::FeedbackRecord;
use tokio::task::JoinSet;
use tracing::{debug, warn};

const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("sync transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("sync failed: {0}")]
    Sink(String),
}

/// Destination for new records.
#[async_trait::async_trait]
pub trait FeedbackSink: Send + Sync {
    /// Deliver one record.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError`] if the record could not be handed over.
    async fn send(&self, record: &FeedbackRecord) -> Result<(), SyncError>;
}

// =============================================================================
// HTTP SINK
// =============================================================================

/// Posts records as JSON to `{base_url}/api/feedback`.
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSink {
    /// Build a sink for the service at `base_url`. No timeout is applied
    /// unless one is given.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, SyncError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self { client: builder.build()?, endpoint: format!("{}/api/feedback", base_url.trim_end_matches('/')) })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl FeedbackSink for HttpSink {
    async fn send(&self, record: &FeedbackRecord) -> Result<(), SyncError> {
        let resp = self.client.post(&self.endpoint).json(record).send().await?;
        debug!(id = %record.id, status = %resp.status(), "feedback posted");
        Ok(())
    }
}

// =============================================================================
// RETRY POLICY
// =============================================================================

/// Exponential backoff between delivery attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay after the first failure.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Add up to 50% random jitter to each delay.
    pub jitter: bool,
}

impl RetryPolicy {
    /// One attempt, no retry.
    #[must_use]
    pub fn none() -> Self {
        Self { max_attempts: 1, base_delay: Duration::ZERO, max_delay: Duration::ZERO, jitter: false }
    }

    #[must_use]
    pub fn exponential(max_attempts: u32, base_delay: Duration) -> Self {
        Self { max_attempts, base_delay, max_delay: DEFAULT_MAX_DELAY, jitter: false }
    }

    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay to wait after failed attempt number `attempt` (1-based), before
    /// jitter: `base_delay * 2^(attempt - 1)`, capped at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1_u32 << shift).min(self.max_delay)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let delay = self.delay_for(attempt);
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let max_extra = u64::try_from(delay.as_millis() / 2).unwrap_or(u64::MAX);
        delay.saturating_add(Duration::from_millis(rand::rng().random_range(0..=max_extra)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

// =============================================================================
// DELIVERY
// =============================================================================

/// Final state of one background delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Delivered { id: uuid::Uuid, attempts: u32 },
    Abandoned { id: uuid::Uuid, attempts: u32, error: String },
}

impl SyncOutcome {
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Deliver `record` through `sink`, retrying per `policy`.
pub async fn deliver(sink: &dyn FeedbackSink, record: &FeedbackRecord, policy: RetryPolicy) -> SyncOutcome {
    let total = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match sink.send(record).await {
            Ok(()) => return SyncOutcome::Delivered { id: record.id, attempts: attempt },
            Err(e) if attempt < total => {
                let delay = policy.backoff(attempt);
                warn!(error = %e, id = %record.id, attempt, total, ?delay, "feedback sync failed; retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                warn!(error = %e, id = %record.id, attempts = attempt, "feedback sync abandoned; keeping local copy");
                return SyncOutcome::Abandoned { id: record.id, attempts: attempt, error: e.to_string() };
            }
        }
    }
}

/// Decrements the in-flight counter when a delivery task ends, including
/// when it is aborted.
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Fire-and-forget delivery of new records, with local state authoritative.
///
/// Outstanding tasks are aborted when this value is dropped; call
/// [`OfflineFirstSync::settle`] first to let them finish.
pub struct OfflineFirstSync {
    sink: Arc<dyn FeedbackSink>,
    policy: RetryPolicy,
    in_flight: Arc<AtomicUsize>,
    tasks: JoinSet<SyncOutcome>,
    finished: Vec<SyncOutcome>,
}

impl OfflineFirstSync {
    #[must_use]
    pub fn new(sink: Arc<dyn FeedbackSink>) -> Self {
        Self {
            sink,
            policy: RetryPolicy::none(),
            in_flight: Arc::new(AtomicUsize::new(0)),
            tasks: JoinSet::new(),
            finished: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Start delivering `record` in the background. Returns `false` without
    /// spawning anything when no tokio runtime is current.
    pub fn dispatch(&mut self, record: FeedbackRecord) -> bool {
        if tokio::runtime::Handle::try_current().is_err() {
            warn!(id = %record.id, "no async runtime; feedback kept local only");
            return false;
        }
        self.reap();

        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        let sink = Arc::clone(&self.sink);
        let policy = self.policy;
        self.tasks.spawn(async move {
            let _guard = guard;
            deliver(sink.as_ref(), &record, policy).await
        });
        true
    }

    /// Whether any delivery is still running.
    #[must_use]
    pub fn is_sending(&self) -> bool {
        self.in_flight() > 0
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Wait for every outstanding delivery and return all outcomes not yet
    /// collected, in completion order.
    pub async fn settle(&mut self) -> Vec<SyncOutcome> {
        while let Some(joined) = self.tasks.join_next().await {
            self.collect(joined);
        }
        std::mem::take(&mut self.finished)
    }

    fn reap(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            self.collect(joined);
        }
    }

    fn collect(&mut self, joined: Result<SyncOutcome, tokio::task::JoinError>) {
        match joined {
            Ok(outcome) => self.finished.push(outcome),
            Err(e) => warn!(error = %e, "feedback sync task ended abnormally"),
        }
    }
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;
