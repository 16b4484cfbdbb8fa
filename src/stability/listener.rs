use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use tracing::debug;

use super::circuit_breaker::CircuitState;

/// Observer for circuit breaker activity.
///
/// Every method has a no-op default so implementors only override what they
/// care about. Notifications are delivered after the breaker has released its
/// internal lock, in the order they were produced, so a listener may call back
/// into the breaker (e.g. `stats()`).
pub trait CircuitBreakerListener: Send + Sync {
    fn on_state_change(&self, _name: &str, _from: CircuitState, _to: CircuitState) {}

    fn on_failure(&self, _name: &str, _error: &dyn fmt::Display, _failure_count: u64) {}

    fn on_success(&self, _name: &str, _success_count: u64) {}
}

type StateChangeFn = dyn Fn(CircuitState, CircuitState) + Send + Sync;
type FailureFn = dyn Fn(&dyn fmt::Display, u64) + Send + Sync;
type SuccessFn = dyn Fn(u64) + Send + Sync;

/// Listener built from plain closures
#[derive(Default)]
pub struct FnListener {
    state_change: Option<Box<StateChangeFn>>,
    failure: Option<Box<FailureFn>>,
    success: Option<Box<SuccessFn>>,
}

impl FnListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_state_change<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.state_change = Some(Box::new(f));
        self
    }

    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(&dyn fmt::Display, u64) + Send + Sync + 'static,
    {
        self.failure = Some(Box::new(f));
        self
    }

    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.success = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for FnListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnListener")
            .field("state_change", &self.state_change.is_some())
            .field("failure", &self.failure.is_some())
            .field("success", &self.success.is_some())
            .finish()
    }
}

impl CircuitBreakerListener for FnListener {
    fn on_state_change(&self, _name: &str, from: CircuitState, to: CircuitState) {
        if let Some(f) = &self.state_change {
            f(from, to);
        }
    }

    fn on_failure(&self, _name: &str, error: &dyn fmt::Display, failure_count: u64) {
        if let Some(f) = &self.failure {
            f(error, failure_count);
        }
    }

    fn on_success(&self, _name: &str, success_count: u64) {
        if let Some(f) = &self.success {
            f(success_count);
        }
    }
}

/// Notification published on an [`EventBus`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CircuitEvent {
    StateChanged {
        name: String,
        from: CircuitState,
        to: CircuitState,
        at: DateTime<Utc>,
    },
    Failure {
        name: String,
        error: String,
        failure_count: u64,
        at: DateTime<Utc>,
    },
    Success {
        name: String,
        success_count: u64,
        at: DateTime<Utc>,
    },
}

impl CircuitEvent {
    pub fn breaker_name(&self) -> &str {
        match self {
            CircuitEvent::StateChanged { name, .. }
            | CircuitEvent::Failure { name, .. }
            | CircuitEvent::Success { name, .. } => name,
        }
    }
}

/// Broadcast channel of [`CircuitEvent`]s.
///
/// Register it as a listener on one or many breakers; every subscriber gets
/// its own copy of each event. Slow subscribers lag (see
/// `tokio::sync::broadcast`) instead of blocking the breaker.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CircuitEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CircuitEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    fn publish(&self, event: CircuitEvent) {
        // Err only means nobody is subscribed right now
        if self.sender.send(event).is_err() {
            debug!("Circuit event dropped, no subscribers");
        }
    }
}

impl CircuitBreakerListener for EventBus {
    fn on_state_change(&self, name: &str, from: CircuitState, to: CircuitState) {
        self.publish(CircuitEvent::StateChanged {
            name: name.to_string(),
            from,
            to,
            at: Utc::now(),
        });
    }

    fn on_failure(&self, name: &str, error: &dyn fmt::Display, failure_count: u64) {
        self.publish(CircuitEvent::Failure {
            name: name.to_string(),
            error: error.to_string(),
            failure_count,
            at: Utc::now(),
        });
    }

    fn on_success(&self, name: &str, success_count: u64) {
        self.publish(CircuitEvent::Success {
            name: name.to_string(),
            success_count,
            at: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_fn_listener_only_calls_registered_closures() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener = FnListener::new().on_success(move |count| {
            sink.lock().unwrap().push(count);
        });

        CircuitBreakerListener::on_success(&listener, "svc", 3);
        CircuitBreakerListener::on_failure(&listener, "svc", &"boom", 1);
        CircuitBreakerListener::on_state_change(
            &listener,
            "svc",
            CircuitState::Closed,
            CircuitState::Open,
        );

        assert_eq!(*seen.lock().unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn test_event_bus_delivers_to_every_subscriber() {
        let bus = EventBus::new(16);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.on_state_change("db", CircuitState::Closed, CircuitState::Open);

        for rx in [&mut first, &mut second] {
            match rx.recv().await.unwrap() {
                CircuitEvent::StateChanged { name, from, to, .. } => {
                    assert_eq!(name, "db");
                    assert_eq!(from, CircuitState::Closed);
                    assert_eq!(to, CircuitState::Open);
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[test]
    fn test_event_bus_without_subscribers_does_not_fail() {
        let bus = EventBus::new(4);
        bus.on_failure("db", &"timeout", 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = CircuitEvent::Failure {
            name: "db".to_string(),
            error: "timeout".to_string(),
            failure_count: 2,
            at: Utc::now(),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "failure");
        assert_eq!(value["failure_count"], 2);
        assert_eq!(event.breaker_name(), "db");

        let parsed: CircuitEvent = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, event);
    }
}
