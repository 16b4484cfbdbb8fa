pub mod config;
pub mod stability;

// Re-export commonly used types
pub use config::{BreakerSettings, RegistryConfig};
pub use stability::{
    CircuitBreaker, CircuitBreakerError, CircuitBreakerListener, CircuitBreakerOptions,
    CircuitBreakerRegistry, CircuitBreakerStats, CircuitEvent, CircuitState, EventBus,
    FnListener, OptionsError,
};
