//! Polling policy for long-running video jobs.

use std::time::Duration;

/// Fixed delay between status checks (5 seconds).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Ceiling on status checks before a job is declared lost.
///
/// 120 rounds at the default interval gives the remote job ten minutes to
/// finish.
pub const DEFAULT_MAX_POLLS: u32 = 120;

/// How a video job is polled: a fixed delay between status checks and a
/// hard ceiling on the number of checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between consecutive status checks.
    pub interval: Duration,
    /// Maximum number of status checks before giving up.
    pub max_polls: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_polls: u32) -> Self {
        Self {
            interval,
            max_polls,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_poll_interval_is_5s() {
        assert_eq!(DEFAULT_POLL_INTERVAL, Duration::from_secs(5));
    }

    #[test]
    fn test_default_policy_uses_constants() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(policy.max_polls, DEFAULT_MAX_POLLS);
    }

    #[test]
    fn test_custom_policy() {
        let policy = PollPolicy::new(Duration::from_millis(50), 7);
        assert_eq!(policy.interval, Duration::from_millis(50));
        assert_eq!(policy.max_polls, 7);
    }
}
