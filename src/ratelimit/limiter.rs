//! Core admission control.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::identity::CallerIdentity;
use super::store::{CounterStore, StoreError};

/// Quota metadata attached to admitted responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    /// Configured ceiling for the window
    pub limit: u32,
    /// Remaining budget after this request
    pub remaining: u32,
    /// Epoch seconds at which the window resets
    pub reset_at: u64,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Forward the request and annotate the response with quota headers.
    Admitted(Quota),
    /// Short-circuit with a rate-limit-exceeded response.
    Rejected {
        /// Configured ceiling, for the rejection body
        limit: u32,
        /// Seconds the caller should wait before retrying
        retry_after: u64,
    },
}

/// Sliding-window rate limiter over a shared counter store.
///
/// The store handle is injected at construction. When it is absent the
/// limiter runs disabled and admits every request, so limiter availability
/// never blocks legitimate traffic.
pub struct RateLimiter {
    store: Option<Arc<dyn CounterStore>>,
    max_requests_per_window: u32,
    window: Duration,
}

impl RateLimiter {
    /// Create a rate limiter backed by `store`.
    pub fn new(store: Arc<dyn CounterStore>, max_requests_per_window: u32, window: Duration) -> Self {
        Self {
            store: Some(store),
            max_requests_per_window,
            window,
        }
    }

    /// Create a disabled (pass-through) rate limiter.
    pub fn disabled(max_requests_per_window: u32, window: Duration) -> Self {
        Self {
            store: None,
            max_requests_per_window,
            window,
        }
    }

    /// Whether a counter store is attached.
    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Decide whether to admit a request from `identity` at `now`
    /// (epoch seconds).
    ///
    /// Store faults map to an admit decision: availability of the protected
    /// service wins over strict enforcement. A failed store call is treated
    /// as "no data" and never retried within the evaluation.
    pub async fn evaluate(&self, identity: &CallerIdentity, now: u64) -> Decision {
        let Some(store) = &self.store else {
            return Decision::Admitted(self.full_quota(now));
        };

        match self.check(store.as_ref(), identity, now).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(
                    identity = %identity,
                    error = %e,
                    "Counter store fault, admitting request"
                );
                Decision::Admitted(self.full_quota(now))
            }
        }
    }

    /// Run the purge / count / insert / expire sequence against the store.
    ///
    /// The store calls are independent round trips, so two concurrent
    /// evaluations for the same identity can both observe a sub-ceiling
    /// count and both be admitted. The overshoot is bounded by the number of
    /// in-flight requests for that identity.
    async fn check(
        &self,
        store: &dyn CounterStore,
        identity: &CallerIdentity,
        now: u64,
    ) -> Result<Decision, StoreError> {
        let key = identity.store_key();
        let window_secs = self.window.as_secs();

        // Purge before counting so the window is evaluated relative to the
        // current instant, not to when entries were inserted.
        store.prune(&key, now.saturating_sub(window_secs)).await?;
        let current = store.count(&key).await?;

        if current >= u64::from(self.max_requests_per_window) {
            debug!(identity = %identity, count = current, "Rate limit exceeded");
            return Ok(Decision::Rejected {
                limit: self.max_requests_per_window,
                retry_after: window_secs,
            });
        }

        // Rejected attempts never reach this point, so they neither consume
        // nor extend the window.
        store.insert(&key, now).await?;
        store.expire(&key, self.window).await?;

        let count = current + 1;
        trace!(identity = %identity, count = count, "Request admitted");

        Ok(Decision::Admitted(Quota {
            limit: self.max_requests_per_window,
            remaining: u64::from(self.max_requests_per_window).saturating_sub(count) as u32,
            reset_at: now + window_secs,
        }))
    }

    /// Quota reported when no count was recorded (disabled mode or a store
    /// fault): the full ceiling, never a falsely low remaining value.
    fn full_quota(&self, now: u64) -> Quota {
        Quota {
            limit: self.max_requests_per_window,
            remaining: self.max_requests_per_window,
            reset_at: now + self.window.as_secs(),
        }
    }
}
