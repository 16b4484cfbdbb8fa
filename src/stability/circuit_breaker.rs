use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::errors::{CircuitBreakerError, OptionsError};
use super::listener::{CircuitBreakerListener, FnListener};
use crate::config::defaults::{
    DEFAULT_FAILURE_THRESHOLD, DEFAULT_MAX_HALF_OPEN_REQUESTS, DEFAULT_RESET_TIMEOUT_MS,
    DEFAULT_SUCCESS_THRESHOLD,
};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,   // Normal operation
    Open,     // Failing, reject requests
    HalfOpen, // Probing recovery
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        };
        f.write_str(label)
    }
}

/// Circuit breaker configuration, fixed for the lifetime of a breaker.
#[derive(Clone)]
pub struct CircuitBreakerOptions {
    /// Failures counted in `Closed` before the breaker trips
    pub failure_threshold: u32,
    /// Successful probes in `HalfOpen` before the breaker closes
    pub success_threshold: u32,
    /// Time spent in `Open` before a probe is let through
    pub reset_timeout: Duration,
    /// Concurrent probes allowed while `HalfOpen`
    pub max_half_open_requests: u32,
    listeners: Vec<Arc<dyn CircuitBreakerListener>>,
}

impl CircuitBreakerOptions {
    pub fn new(failure_threshold: u32, success_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            success_threshold,
            reset_timeout,
            max_half_open_requests: DEFAULT_MAX_HALF_OPEN_REQUESTS,
            listeners: Vec::new(),
        }
    }

    pub fn with_max_half_open_requests(mut self, max_half_open_requests: u32) -> Self {
        self.max_half_open_requests = max_half_open_requests;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn CircuitBreakerListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn on_state_change<F>(self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.with_listener(Arc::new(FnListener::new().on_state_change(f)))
    }

    pub fn on_failure<F>(self, f: F) -> Self
    where
        F: Fn(&dyn fmt::Display, u64) + Send + Sync + 'static,
    {
        self.with_listener(Arc::new(FnListener::new().on_failure(f)))
    }

    pub fn on_success<F>(self, f: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.with_listener(Arc::new(FnListener::new().on_success(f)))
    }

    pub fn listeners(&self) -> &[Arc<dyn CircuitBreakerListener>] {
        &self.listeners
    }

    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.failure_threshold == 0 {
            return Err(OptionsError::ZeroFailureThreshold);
        }
        if self.success_threshold == 0 {
            return Err(OptionsError::ZeroSuccessThreshold);
        }
        if self.max_half_open_requests == 0 {
            return Err(OptionsError::ZeroHalfOpenRequests);
        }
        Ok(())
    }
}

impl Default for CircuitBreakerOptions {
    fn default() -> Self {
        Self::new(
            DEFAULT_FAILURE_THRESHOLD,
            DEFAULT_SUCCESS_THRESHOLD,
            Duration::from_millis(DEFAULT_RESET_TIMEOUT_MS),
        )
    }
}

impl fmt::Debug for CircuitBreakerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreakerOptions")
            .field("failure_threshold", &self.failure_threshold)
            .field("success_threshold", &self.success_threshold)
            .field("reset_timeout", &self.reset_timeout)
            .field("max_half_open_requests", &self.max_half_open_requests)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Point-in-time snapshot of a breaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerStats {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u64,
    pub success_count: u64,
    pub total_count: u64,
    pub half_open_in_flight: u32,
    pub error_percentage: f64,
    pub last_failure_time: Option<DateTime<Utc>>,
    pub last_success_time: Option<DateTime<Utc>>,
    pub last_state_change_time: Option<DateTime<Utc>>,
}

/// Circuit breaker for fault isolation around an asynchronous operation.
///
/// All mutable state sits behind a single mutex and every admission or
/// outcome decision is taken inside one lock acquisition. The lock is never
/// held while the wrapped operation runs.
pub struct CircuitBreaker {
    core: Arc<BreakerCore>,
}

struct BreakerCore {
    name: String,
    options: CircuitBreakerOptions,
    inner: Mutex<BreakerInner>,
    this: Weak<BreakerCore>,
}

struct BreakerInner {
    state: CircuitState,
    failure_count: u64,
    success_count: u64,
    total_count: u64,
    half_open_in_flight: u32,
    // Bumped on every transition; probe slots are only returned to the epoch
    // they were taken from.
    epoch: u64,
    opened_at: Option<Instant>,
    last_failure_time: Option<DateTime<Utc>>,
    last_success_time: Option<DateTime<Utc>>,
    last_state_change_time: Option<DateTime<Utc>>,
    reset_timer: Option<JoinHandle<()>>,
    timer_generation: u64,
    // Notices waiting for delivery, in production order. Only the caller that
    // set `dispatching` drains it, so listeners see one ordered stream.
    pending: VecDeque<Notice>,
    dispatching: bool,
}

enum Notice {
    StateChange(CircuitState, CircuitState),
    Failure(u64, String),
    Success(u64),
}

/// Clears the dispatching flag if a listener panics mid-delivery.
struct DispatchGuard<'a> {
    core: &'a BreakerCore,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut inner = self.core.lock();
            inner.dispatching = false;
            inner.pending.clear();
        }
    }
}

/// Admission ticket for one call. Releases its probe slot on drop, so a
/// cancelled `execute` future cannot leak half-open capacity.
struct Admission<'a> {
    core: &'a BreakerCore,
    probe_epoch: Option<u64>,
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        if let Some(epoch) = self.probe_epoch.take() {
            let mut inner = self.core.lock();
            inner.release_probe(epoch);
            debug!("Circuit breaker '{}' released abandoned probe slot", self.core.name);
        }
    }
}

impl BreakerInner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            total_count: 0,
            half_open_in_flight: 0,
            epoch: 0,
            opened_at: None,
            last_failure_time: None,
            last_success_time: None,
            last_state_change_time: None,
            reset_timer: None,
            timer_generation: 0,
            pending: VecDeque::new(),
            dispatching: false,
        }
    }

    fn release_probe(&mut self, epoch: u64) {
        if self.epoch == epoch {
            self.half_open_in_flight = self.half_open_in_flight.saturating_sub(1);
        }
    }

    fn cancel_reset_timer(&mut self) {
        self.timer_generation += 1;
        if let Some(timer) = self.reset_timer.take() {
            timer.abort();
        }
    }
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, options: CircuitBreakerOptions) -> Result<Self, OptionsError> {
        options.validate()?;
        let name = name.into();
        let core = Arc::new_cyclic(|this| BreakerCore {
            name,
            options,
            inner: Mutex::new(BreakerInner::new()),
            this: this.clone(),
        });
        Ok(Self { core })
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn options(&self) -> &CircuitBreakerOptions {
        &self.core.options
    }

    /// Execute an operation with circuit breaker protection.
    ///
    /// Rejected calls return [`CircuitBreakerError::Open`] or
    /// [`CircuitBreakerError::HalfOpenCapacity`] without invoking `operation`.
    /// An operation error is counted as a failure and handed back unchanged in
    /// [`CircuitBreakerError::Operation`].
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let admission = self.core.admit::<E>()?;

        match operation().await {
            Ok(value) => {
                self.core.record_success(admission);
                Ok(value)
            }
            Err(e) => {
                self.core.record_failure(admission, &e);
                Err(CircuitBreakerError::Operation(e))
            }
        }
    }

    pub fn get_state(&self) -> CircuitState {
        self.core.lock().state
    }

    pub fn get_stats(&self) -> CircuitBreakerStats {
        let inner = self.core.lock();
        let error_percentage = if inner.total_count > 0 {
            inner.failure_count as f64 / inner.total_count as f64 * 100.0
        } else {
            0.0
        };

        CircuitBreakerStats {
            name: self.core.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            total_count: inner.total_count,
            half_open_in_flight: inner.half_open_in_flight,
            error_percentage,
            last_failure_time: inner.last_failure_time,
            last_success_time: inner.last_success_time,
            last_state_change_time: inner.last_state_change_time,
        }
    }

    /// Reset circuit breaker to closed state.
    ///
    /// Unlike [`force_closed`](Self::force_closed) this also clears the
    /// failure and success counters when the breaker is already closed.
    pub fn reset(&self) {
        let mut notices = Vec::new();
        let mut inner = self.core.lock();
        if inner.state == CircuitState::Closed {
            inner.failure_count = 0;
            inner.success_count = 0;
        } else {
            self.core.transition_to(&mut inner, CircuitState::Closed, &mut notices);
        }
        debug!("Circuit breaker '{}' has been reset", self.core.name);
        self.core.publish(inner, notices);
    }

    pub fn force_open(&self) {
        self.core.force(CircuitState::Open);
    }

    pub fn force_closed(&self) {
        self.core.force(CircuitState::Closed);
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.core.name)
            .field("state", &self.get_state())
            .field("options", &self.core.options)
            .finish()
    }
}

impl BreakerCore {
    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The single authority on whether an open breaker may probe again.
    fn reset_window_elapsed(&self, inner: &BreakerInner, now: Instant) -> bool {
        inner
            .opened_at
            .map_or(true, |at| now.saturating_duration_since(at) >= self.options.reset_timeout)
    }

    fn admit<E>(&self) -> Result<Admission<'_>, CircuitBreakerError<E>> {
        let mut notices = Vec::new();
        let mut inner = self.lock();
        let outcome = self.admit_locked(&mut inner, &mut notices);
        self.publish(inner, notices);

        outcome.map(|probe_epoch| Admission {
            core: self,
            probe_epoch,
        })
    }

    fn admit_locked<E>(
        &self,
        inner: &mut BreakerInner,
        notices: &mut Vec<Notice>,
    ) -> Result<Option<u64>, CircuitBreakerError<E>> {
        if inner.state == CircuitState::Open {
            let now = Instant::now();
            if self.reset_window_elapsed(inner, now) {
                self.transition_to(inner, CircuitState::HalfOpen, notices);
            } else {
                let retry_after = inner
                    .opened_at
                    .map(|at| (at + self.options.reset_timeout).saturating_duration_since(now))
                    .unwrap_or_default();
                debug!("Circuit breaker '{}' rejected call, retry after {:?}", self.name, retry_after);
                return Err(CircuitBreakerError::Open {
                    name: self.name.clone(),
                    retry_after,
                });
            }
        }

        let probe_epoch = if inner.state == CircuitState::HalfOpen {
            if inner.half_open_in_flight >= self.options.max_half_open_requests {
                debug!(
                    "Circuit breaker '{}' rejected call, {} probe(s) already in flight",
                    self.name, inner.half_open_in_flight
                );
                return Err(CircuitBreakerError::HalfOpenCapacity {
                    name: self.name.clone(),
                    max_half_open_requests: self.options.max_half_open_requests,
                });
            }
            inner.half_open_in_flight += 1;
            Some(inner.epoch)
        } else {
            None
        };

        inner.total_count += 1;
        Ok(probe_epoch)
    }

    fn record_success(&self, mut admission: Admission<'_>) {
        let mut notices = Vec::new();
        let mut inner = self.lock();
        if let Some(epoch) = admission.probe_epoch.take() {
            inner.release_probe(epoch);
        }

        inner.success_count += 1;
        inner.last_success_time = Some(Utc::now());
        notices.push(Notice::Success(inner.success_count));

        if inner.state == CircuitState::HalfOpen
            && inner.success_count >= u64::from(self.options.success_threshold)
        {
            self.transition_to(&mut inner, CircuitState::Closed, &mut notices);
        }
        self.publish(inner, notices);
    }

    fn record_failure(&self, mut admission: Admission<'_>, error: &dyn fmt::Display) {
        let mut notices = Vec::new();
        let mut inner = self.lock();
        if let Some(epoch) = admission.probe_epoch.take() {
            inner.release_probe(epoch);
        }

        inner.failure_count += 1;
        inner.last_failure_time = Some(Utc::now());
        if !self.options.listeners().is_empty() {
            notices.push(Notice::Failure(inner.failure_count, error.to_string()));
        }

        match inner.state {
            CircuitState::Closed if inner.failure_count >= u64::from(self.options.failure_threshold) => {
                warn!(
                    "Circuit breaker '{}' tripped after {} failures: {}",
                    self.name, inner.failure_count, error
                );
                self.transition_to(&mut inner, CircuitState::Open, &mut notices);
            }
            CircuitState::HalfOpen => {
                warn!("Circuit breaker '{}' probe failed: {}", self.name, error);
                self.transition_to(&mut inner, CircuitState::Open, &mut notices);
            }
            _ => {}
        }
        self.publish(inner, notices);
    }

    fn force(&self, target: CircuitState) {
        let mut notices = Vec::new();
        let mut inner = self.lock();
        self.transition_to(&mut inner, target, &mut notices);
        self.publish(inner, notices);
    }

    fn transition_to(&self, inner: &mut BreakerInner, new_state: CircuitState, notices: &mut Vec<Notice>) {
        if inner.state == new_state {
            return;
        }

        let old_state = inner.state;
        inner.state = new_state;
        inner.last_state_change_time = Some(Utc::now());
        inner.epoch += 1;
        inner.half_open_in_flight = 0;

        match new_state {
            CircuitState::Closed => {
                inner.failure_count = 0;
                inner.success_count = 0;
                inner.opened_at = None;
            }
            CircuitState::HalfOpen => {
                inner.success_count = 0;
            }
            CircuitState::Open => {
                inner.opened_at = Some(Instant::now());
            }
        }

        inner.cancel_reset_timer();
        if new_state == CircuitState::Open {
            self.arm_reset_timer(inner);
        }

        match new_state {
            CircuitState::Open => warn!("Circuit breaker '{}' transitioned {} -> OPEN", self.name, old_state),
            _ => info!("Circuit breaker '{}' transitioned {} -> {}", self.name, old_state, new_state),
        }

        notices.push(Notice::StateChange(old_state, new_state));
    }

    fn arm_reset_timer(&self, inner: &mut BreakerInner) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                debug!(
                    "Circuit breaker '{}' has no tokio runtime, HALF_OPEN will be entered lazily",
                    self.name
                );
                return;
            }
        };

        let generation = inner.timer_generation;
        let core = self.this.clone();
        let delay = self.options.reset_timeout;

        inner.reset_timer = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(core) = core.upgrade() {
                core.on_reset_timer(generation);
            }
        }));
        debug!("Circuit breaker '{}' armed reset timer for {:?}", self.name, delay);
    }

    fn on_reset_timer(&self, generation: u64) {
        let mut notices = Vec::new();
        let mut inner = self.lock();
        if inner.timer_generation != generation {
            return;
        }
        // This task is the timer; detach it so the transition does not abort it.
        inner.reset_timer = None;

        if inner.state == CircuitState::Open && self.reset_window_elapsed(&inner, Instant::now()) {
            self.transition_to(&mut inner, CircuitState::HalfOpen, &mut notices);
        }
        self.publish(inner, notices);
    }

    /// Queue `notices` behind any undelivered ones and release the lock.
    ///
    /// If no other caller is delivering, this one drains the queue, calling
    /// listeners with the lock released. A caller that finds delivery already
    /// in progress returns at once and its notices go out after the earlier
    /// ones, from the delivering thread.
    fn publish<'a>(&'a self, mut inner: MutexGuard<'a, BreakerInner>, notices: Vec<Notice>) {
        if self.options.listeners().is_empty() || notices.is_empty() {
            return;
        }

        inner.pending.extend(notices);
        if inner.dispatching {
            return;
        }
        inner.dispatching = true;

        let _guard = DispatchGuard { core: self };
        loop {
            let Some(notice) = inner.pending.pop_front() else {
                inner.dispatching = false;
                return;
            };
            drop(inner);
            self.deliver(&notice);
            inner = self.lock();
        }
    }

    fn deliver(&self, notice: &Notice) {
        for listener in self.options.listeners() {
            match notice {
                Notice::StateChange(from, to) => listener.on_state_change(&self.name, *from, *to),
                Notice::Failure(count, error) => listener.on_failure(&self.name, error, *count),
                Notice::Success(count) => listener.on_success(&self.name, *count),
            }
        }
    }
}

impl Drop for BreakerCore {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        inner.cancel_reset_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn options(failure_threshold: u32, success_threshold: u32, reset_ms: u64) -> CircuitBreakerOptions {
        CircuitBreakerOptions::new(failure_threshold, success_threshold, Duration::from_millis(reset_ms))
    }

    async fn fail(breaker: &CircuitBreaker) -> Result<(), CircuitBreakerError<String>> {
        breaker.execute(|| async { Err::<(), _>("failure".to_string()) }).await
    }

    async fn succeed(breaker: &CircuitBreaker) -> Result<(), CircuitBreakerError<String>> {
        breaker.execute(|| async { Ok::<_, String>(()) }).await
    }

    #[test]
    fn test_default_options() {
        let options = CircuitBreakerOptions::default();
        assert_eq!(options.failure_threshold, DEFAULT_FAILURE_THRESHOLD);
        assert_eq!(options.success_threshold, DEFAULT_SUCCESS_THRESHOLD);
        assert_eq!(options.max_half_open_requests, 1);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_invalid_options_rejected() {
        assert_eq!(
            CircuitBreaker::new("db", options(0, 1, 10)).unwrap_err(),
            OptionsError::ZeroFailureThreshold
        );
        assert_eq!(
            CircuitBreaker::new("db", options(1, 0, 10)).unwrap_err(),
            OptionsError::ZeroSuccessThreshold
        );
        assert_eq!(
            CircuitBreaker::new("db", options(1, 1, 10).with_max_half_open_requests(0)).unwrap_err(),
            OptionsError::ZeroHalfOpenRequests
        );
    }

    #[test]
    fn test_initial_state() {
        let breaker = CircuitBreaker::new("db", CircuitBreakerOptions::default()).unwrap();
        let stats = breaker.get_stats();

        assert_eq!(breaker.name(), "db");
        assert_eq!(breaker.get_state(), CircuitState::Closed);
        assert_eq!(stats.total_count, 0);
        assert_eq!(stats.error_percentage, 0.0);
        assert!(stats.last_state_change_time.is_none());
    }

    #[test]
    fn test_state_display_and_serde() {
        assert_eq!(CircuitState::HalfOpen.to_string(), "HALF_OPEN");
        assert_eq!(serde_json::to_string(&CircuitState::HalfOpen).unwrap(), "\"HALF_OPEN\"");
        assert_eq!(
            serde_json::from_str::<CircuitState>("\"OPEN\"").unwrap(),
            CircuitState::Open
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_trips_after_threshold() {
        let breaker = CircuitBreaker::new("db", options(3, 1, 1000)).unwrap();

        for _ in 0..2 {
            let _ = fail(&breaker).await;
        }
        assert_eq!(breaker.get_state(), CircuitState::Closed);

        let _ = fail(&breaker).await;
        assert_eq!(breaker.get_state(), CircuitState::Open);
        assert!(breaker.get_stats().last_failure_time.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_rejects_without_invoking() {
        let breaker = CircuitBreaker::new("db", options(1, 1, 1000)).unwrap();
        let _ = fail(&breaker).await;

        let calls = AtomicU32::new(0);
        let result = breaker
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(())
            })
            .await;

        match result {
            Err(CircuitBreakerError::Open { name, retry_after }) => {
                assert_eq!(name, "db");
                assert_eq!(retry_after, Duration::from_millis(1000));
            }
            other => panic!("expected Open rejection, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(breaker.get_stats().total_count, 1);
        assert_eq!(breaker.get_stats().failure_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_failure_reopens_and_rearms() {
        let breaker = CircuitBreaker::new("db", options(1, 2, 1000)).unwrap();
        let _ = fail(&breaker).await;

        tokio::time::advance(Duration::from_millis(1000)).await;
        let _ = fail(&breaker).await;
        assert_eq!(breaker.get_state(), CircuitState::Open);

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(matches!(succeed(&breaker).await, Err(CircuitBreakerError::Open { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_operation_error_returned_unchanged() {
        let breaker = CircuitBreaker::new("db", options(5, 1, 1000)).unwrap();
        let result = breaker
            .execute(|| async { Err::<(), _>(std::io::Error::new(std::io::ErrorKind::TimedOut, "slow")) })
            .await;

        let err = result.unwrap_err().into_operation_error().unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::TimedOut);
        assert_eq!(err.to_string(), "slow");
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_percentage() {
        let breaker = CircuitBreaker::new("db", options(10, 1, 1000)).unwrap();
        for _ in 0..3 {
            let _ = succeed(&breaker).await;
        }
        let _ = fail(&breaker).await;

        let stats = breaker.get_stats();
        assert_eq!(stats.total_count, 4);
        assert_eq!(stats.failure_count, 1);
        assert_eq!(stats.success_count, 3);
        assert!((stats.error_percentage - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_force_open_without_runtime_relies_on_lazy_check() {
        let breaker = CircuitBreaker::new("db", options(1, 2, 0)).unwrap();
        breaker.force_open();
        assert_eq!(breaker.get_state(), CircuitState::Open);

        // No timer was armed outside a runtime and this one has no time driver,
        // so only the admission check can move the breaker to HALF_OPEN.
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(async {
            succeed(&breaker).await.unwrap();
        });

        let stats = breaker.get_stats();
        assert_eq!(stats.state, CircuitState::HalfOpen);
        assert_eq!(stats.success_count, 1);
        assert_eq!(stats.half_open_in_flight, 0);

        breaker.force_closed();
        assert_eq!(breaker.get_state(), CircuitState::Closed);
    }

    #[test]
    fn test_reset_clears_counters_when_closed() {
        let breaker = CircuitBreaker::new("db", options(5, 1, 1000)).unwrap();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        runtime.block_on(async {
            let _ = fail(&breaker).await;
            let _ = succeed(&breaker).await;
        });

        breaker.reset();
        let stats = breaker.get_stats();
        assert_eq!(stats.state, CircuitState::Closed);
        assert_eq!(stats.failure_count, 0);
        assert_eq!(stats.success_count, 0);
        assert_eq!(stats.total_count, 2);
    }
}
