//! Scheduler configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the admission scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Ceiling on jobs running at once.
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// How often to try admitting a queued job (milliseconds).
    /// At most one job is started per tick.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_max_concurrent_jobs() -> usize {
    2
}

fn default_poll_interval() -> u64 {
    5000 // 5 seconds
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent_jobs(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl SchedulerConfig {
    pub fn new(max_concurrent_jobs: usize, poll_interval_ms: u64) -> Self {
        Self {
            max_concurrent_jobs,
            poll_interval_ms,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.max_concurrent_jobs, 2);
        assert_eq!(config.poll_interval_ms, 5000);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_deserialize_minimal() {
        let config: SchedulerConfig = toml::from_str("max_concurrent_jobs = 4").unwrap();
        assert_eq!(config.max_concurrent_jobs, 4);
        assert_eq!(config.poll_interval_ms, 5000);
    }
}
