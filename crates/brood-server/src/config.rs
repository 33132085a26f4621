//! Supervisor configuration
//!
//! Centralized configuration with environment variable overrides. All
//! tunables the supervisor consults live here with documented defaults.

use std::path::PathBuf;
use std::time::Duration;

/// Supervisor configuration with sensible defaults.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Bind address of the status HTTP API (env: BROOD_STATUS_ADDR).
    pub status_addr: String,

    /// Interval between metric collection rounds
    /// (env: BROOD_METRICS_INTERVAL_MS).
    pub metrics_interval: Duration,

    /// Upper bound on a single long poll before the supervisor answers
    /// `unchanged` (env: BROOD_POLL_TIMEOUT_MS).
    pub poll_timeout: Duration,

    /// Capacity of the completion channel carrying worker failures.
    /// Clamped to at least 1 so reporters never block
    /// (env: BROOD_COMPLETION_CAPACITY).
    pub completion_capacity: usize,

    /// Append-only file for worker trace spans; spans are dropped when
    /// unset (env: BROOD_TRACE_FILE).
    pub trace_path: Option<PathBuf>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        SupervisorConfig {
            status_addr: "127.0.0.1:9944".to_string(),
            metrics_interval: Duration::from_millis(1_000),
            poll_timeout: Duration::from_millis(30_000),
            completion_capacity: 16,
            trace_path: None,
        }
    }
}

impl SupervisorConfig {
    /// Build the configuration from the environment, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = SupervisorConfig::default();
        SupervisorConfig {
            status_addr: env_string("BROOD_STATUS_ADDR", defaults.status_addr),
            metrics_interval: env_duration_ms("BROOD_METRICS_INTERVAL_MS", defaults.metrics_interval),
            poll_timeout: env_duration_ms("BROOD_POLL_TIMEOUT_MS", defaults.poll_timeout),
            completion_capacity: env_usize("BROOD_COMPLETION_CAPACITY", defaults.completion_capacity),
            trace_path: std::env::var("BROOD_TRACE_FILE").ok().map(PathBuf::from),
        }
    }
}

fn env_string(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_duration_ms(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SupervisorConfig::default();
        assert_eq!(config.status_addr, "127.0.0.1:9944");
        assert_eq!(config.metrics_interval, Duration::from_secs(1));
        assert_eq!(config.poll_timeout, Duration::from_secs(30));
        assert_eq!(config.completion_capacity, 16);
        assert_eq!(config.trace_path, None);
    }
}
