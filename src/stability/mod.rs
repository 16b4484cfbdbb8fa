pub mod circuit_breaker;
pub mod errors;
pub mod listener;
pub mod registry;

pub use circuit_breaker::{
    CircuitBreaker, 
    CircuitBreakerOptions, 
    CircuitBreakerStats, 
    CircuitState
};
pub use errors::{CircuitBreakerError, OptionsError};
pub use listener::{CircuitBreakerListener, CircuitEvent, EventBus, FnListener};
pub use registry::CircuitBreakerRegistry;
