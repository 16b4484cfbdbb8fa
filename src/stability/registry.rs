use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerOptions, CircuitBreakerStats, CircuitState};
use super::errors::OptionsError;
use crate::config::RegistryConfig;

/// Circuit breaker registry for managing multiple breakers by name.
///
/// Registries are plain values: create one at startup and hand it (usually as
/// an `Arc`) to whatever needs to share breakers.
#[derive(Default)]
pub struct CircuitBreakerRegistry {
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
    config: RegistryConfig,
}

impl CircuitBreakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            breakers: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<CircuitBreaker>>> {
        self.breakers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the breaker registered under `name`, creating it with `options`
    /// if absent. Options passed for an existing name are ignored.
    pub fn get_or_create(
        &self,
        name: &str,
        options: CircuitBreakerOptions,
    ) -> Result<Arc<CircuitBreaker>, OptionsError> {
        let mut breakers = self.lock();

        if let Some(breaker) = breakers.get(name) {
            return Ok(Arc::clone(breaker));
        }

        let breaker = Arc::new(CircuitBreaker::new(name, options)?);
        breakers.insert(name.to_string(), Arc::clone(&breaker));
        debug!("Registered circuit breaker '{}'", name);
        Ok(breaker)
    }

    /// Like [`get_or_create`](Self::get_or_create), with options taken from
    /// the registry's configuration.
    pub fn get_or_create_configured(&self, name: &str) -> Result<Arc<CircuitBreaker>, OptionsError> {
        self.get_or_create(name, self.config.options_for(name))
    }

    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.lock().get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    pub fn remove(&self, name: &str) -> bool {
        let removed = self.lock().remove(name).is_some();
        if removed {
            debug!("Removed circuit breaker '{}'", name);
        }
        removed
    }

    pub fn get_all(&self) -> Vec<Arc<CircuitBreaker>> {
        let breakers = self.lock();
        let mut all: Vec<_> = breakers.values().cloned().collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        all
    }

    pub fn get_all_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn get_all_stats(&self) -> Vec<CircuitBreakerStats> {
        self.get_all().iter().map(|b| b.get_stats()).collect()
    }

    /// JSON summary for monitoring endpoints
    pub fn stats_report(&self) -> Value {
        let stats = self.get_all_stats();
        let open = stats.iter().filter(|s| s.state == CircuitState::Open).count();
        let half_open = stats.iter().filter(|s| s.state == CircuitState::HalfOpen).count();

        json!({
            "total": stats.len(),
            "open": open,
            "half_open": half_open,
            "closed": stats.len() - open - half_open,
            "breakers": stats,
        })
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn reset_all(&self) {
        // Reset outside the map lock so listeners may use the registry
        for breaker in self.get_all() {
            breaker.reset();
        }
        info!("Reset all circuit breakers");
    }
}
