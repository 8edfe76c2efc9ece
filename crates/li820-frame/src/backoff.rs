use std::time::Duration;

use crate::config::RetryPolicy;

/// Doubling delay between consecutive read failures.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: RetryPolicy,
    current: Duration,
    failures: u32,
}

impl Backoff {
    pub fn new(policy: RetryPolicy) -> Self {
        let current = policy.initial_delay;
        Self {
            policy,
            current,
            failures: 0,
        }
    }

    /// Record a failure. Returns the delay to wait before retrying, or `None`
    /// once the consecutive failure budget is spent.
    pub fn mark_failure(&mut self) -> Option<Duration> {
        self.failures = self.failures.saturating_add(1);
        if self.failures >= self.policy.max_consecutive_errors {
            return None;
        }
        let delay = self.current;
        self.current = (self.current * 2).min(self.policy.max_delay);
        Some(delay)
    }

    /// Reset after a successful read.
    pub fn mark_success(&mut self) {
        self.failures = 0;
        self.current = self.policy.initial_delay;
    }

    /// Consecutive failures since the last success.
    pub fn failures(&self) -> u32 {
        self.failures
    }
}
