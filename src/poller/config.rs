//! Poller timing configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::duration::deserialize_duration;

/// Default interval between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default overall wait before giving up.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1000);

/// Default number of consecutive fetch failures absorbed before erroring.
pub const DEFAULT_FAILURE_TOLERANCE: u32 = 3;

/// Default pause after a failed fetch.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Default interval between progress log lines.
pub const DEFAULT_LOG_EVERY: Duration = Duration::from_secs(300);

/// Timing knobs for [`ReadinessPoller`](super::ReadinessPoller).
///
/// Durations deserialize from strings such as `"5s"` or `"20m"`, or from
/// whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Pause between successful polls.
    #[serde(deserialize_with = "deserialize_duration")]
    pub poll_interval: Duration,

    /// Wall-clock limit measured from the start of the wait.
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,

    /// Consecutive fetch failures tolerated; one more is an error.
    pub failure_tolerance: u32,

    /// Pause after a failed fetch before trying again.
    #[serde(deserialize_with = "deserialize_duration")]
    pub retry_delay: Duration,

    /// How often to log that a wait is still in progress.
    #[serde(deserialize_with = "deserialize_duration")]
    pub log_every: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            failure_tolerance: DEFAULT_FAILURE_TOLERANCE,
            retry_delay: DEFAULT_RETRY_DELAY,
            log_every: DEFAULT_LOG_EVERY,
        }
    }
}

impl PollerConfig {
    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the overall timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the consecutive fetch failure tolerance.
    pub fn with_failure_tolerance(mut self, tolerance: u32) -> Self {
        self.failure_tolerance = tolerance;
        self
    }

    /// Set the delay after a failed fetch.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the progress log interval.
    pub fn with_log_every(mut self, every: Duration) -> Self {
        self.log_every = every;
        self
    }
}
