/// Default configuration constants for circuit breakers

// Threshold defaults
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_SUCCESS_THRESHOLD: u32 = 2;
pub const DEFAULT_MAX_HALF_OPEN_REQUESTS: u32 = 1;

// Timing defaults
pub const DEFAULT_RESET_TIMEOUT_MS: u64 = 60_000; // 1 minute

// Config file lookup
pub const CONFIG_DIR_NAME: &str = "fault-guard";
pub const CONFIG_FILENAME: &str = "circuit_breakers.toml";
