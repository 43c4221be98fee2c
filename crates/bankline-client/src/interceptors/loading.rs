//! In-flight request tracking and per-request timeouts.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::config::PipelineConfig;
use crate::error::{Error, HttpFailure, Result};
use crate::pipeline::{Interceptor, Next};
use crate::request::{ApiRequest, ApiResponse, REQUEST_TIMEOUT_HEADER};

/// Told when the pipeline goes from idle to busy and back.
pub trait LoadingObserver: Send + Sync + std::fmt::Debug {
    fn loading_started(&self);
    fn loading_stopped(&self);
}

/// Shared pending-request counter and timeout registry.
#[derive(Debug)]
pub struct LoadingTracker {
    pending: AtomicUsize,
    base_timeout: Duration,
    /// URL substring overrides, checked in registration order.
    overrides: RwLock<Vec<(String, Duration)>>,
    observers: RwLock<Vec<Arc<dyn LoadingObserver>>>,
}

impl Default for LoadingTracker {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl LoadingTracker {
    pub fn new(base_timeout: Duration) -> Self {
        Self {
            pending: AtomicUsize::new(0),
            base_timeout,
            overrides: RwLock::new(Vec::new()),
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        let tracker = Self::new(config.base_timeout());
        for o in &config.timeout_overrides {
            tracker.set_timeout_for_url(&o.pattern, Duration::from_millis(o.timeout_ms));
        }
        tracker
    }

    /// Requests currently in flight.
    pub fn pending_requests(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_loading(&self) -> bool {
        self.pending_requests() > 0
    }

    pub fn base_timeout(&self) -> Duration {
        self.base_timeout
    }

    /// Use `timeout` for every URL containing `pattern`.
    ///
    /// Empty patterns and zero durations are ignored. Re-registering a
    /// pattern replaces its timeout but keeps its position.
    pub fn set_timeout_for_url(&self, pattern: impl Into<String>, timeout: Duration) {
        let pattern = pattern.into();
        if pattern.is_empty() || timeout.is_zero() {
            tracing::warn!(pattern = %pattern, ?timeout, "Ignoring invalid timeout override");
            return;
        }
        let mut overrides = self.overrides.write();
        match overrides.iter_mut().find(|(p, _)| *p == pattern) {
            Some(entry) => entry.1 = timeout,
            None => overrides.push((pattern, timeout)),
        }
    }

    pub fn add_observer(&self, observer: Arc<dyn LoadingObserver>) {
        self.observers.write().push(observer);
    }

    /// Force the counter to zero and signal "stopped".
    ///
    /// Requests still in flight will not push the counter below zero when
    /// they finish.
    pub fn reset(&self) {
        let previous = self.pending.swap(0, Ordering::SeqCst);
        tracing::debug!(previous, "Loading state reset");
        self.notify(|o| o.loading_stopped());
    }

    /// The timeout for `request`.
    ///
    /// The request's own `x-request-timeout` header wins, then the first
    /// registered URL pattern, then twice the base for POST and PUT, then
    /// the base.
    pub fn resolve_timeout(&self, request: &ApiRequest) -> Duration {
        if let Some(ms) = request
            .headers
            .get(REQUEST_TIMEOUT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
        {
            return Duration::from_millis(ms);
        }

        if let Some((_, timeout)) = self
            .overrides
            .read()
            .iter()
            .find(|(pattern, _)| request.url.contains(pattern.as_str()))
        {
            return *timeout;
        }

        if request.is_mutating() {
            self.base_timeout.saturating_mul(2)
        } else {
            self.base_timeout
        }
    }

    fn begin(&self) -> PendingGuard<'_> {
        if self.pending.fetch_add(1, Ordering::SeqCst) == 0 {
            self.notify(|o| o.loading_started());
        }
        PendingGuard { tracker: self }
    }

    fn finish(&self) {
        let decremented = self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if decremented == Ok(1) {
            self.notify(|o| o.loading_stopped());
        }
    }

    fn notify(&self, f: impl Fn(&dyn LoadingObserver)) {
        let observers = self.observers.read().clone();
        for observer in &observers {
            f(observer.as_ref());
        }
    }
}

/// Releases one pending slot when dropped, whatever happened to the request.
struct PendingGuard<'a> {
    tracker: &'a LoadingTracker,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.tracker.finish();
    }
}

/// Counts in-flight requests and enforces timeouts.
#[derive(Debug, Clone)]
pub struct LoadingInterceptor {
    tracker: Arc<LoadingTracker>,
}

impl LoadingInterceptor {
    pub fn new(tracker: Arc<LoadingTracker>) -> Self {
        Self { tracker }
    }

    pub fn tracker(&self) -> &Arc<LoadingTracker> {
        &self.tracker
    }
}

#[async_trait]
impl Interceptor for LoadingInterceptor {
    fn name(&self) -> &'static str {
        "loading"
    }

    async fn intercept(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse> {
        let timeout = self.tracker.resolve_timeout(&request);
        let url = request.url.clone();
        let _pending = self.tracker.begin();

        match tokio::time::timeout(timeout, next.run(request)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(url = %url, timeout_ms = timeout.as_millis() as u64, "Request timed out");
                Err(Error::Http(HttpFailure::timeout(url)))
            }
        }
    }
}
