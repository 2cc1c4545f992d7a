use std::fmt::Display;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Bounded retry with exponential backoff.
///
/// Attempt `n` (1-based) sleeps `base_delay * 2^(n-1)` before retrying,
/// capped at `max_delay`. With the defaults this is 50ms, 100ms for a total
/// of three attempts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    /// Backoff before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any single backoff.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Backoff to sleep after a failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }

    /// Run `op` until it succeeds, the error stops being retryable, or the
    /// attempt budget runs out. Returns the last error on exhaustion.
    pub fn run_if<T, E, F, R>(&self, mut op: F, retryable: R) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Result<T, E>,
        R: Fn(&E) -> bool,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts && retryable(&e) => {
                    let delay = self.delay_for(attempt);
                    warn!(attempt, error = %e, delay_ms = delay.as_millis() as u64, "retrying");
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Run `op` treating every error as retryable.
    pub fn run<T, E, F>(&self, op: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Result<T, E>,
    {
        self.run_if(op, |_| true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Zero-delay policy so tests do not sleep.
    fn instant(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(150),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(50));
        assert_eq!(policy.delay_for(2), Duration::from_millis(100));
        assert_eq!(policy.delay_for(3), Duration::from_millis(150));
        assert_eq!(policy.delay_for(10), Duration::from_millis(150));
    }

    #[test]
    fn succeeds_on_later_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = instant(3).run(|| {
            if calls.fetch_add(1, Ordering::SeqCst) < 1 {
                Err("not yet".to_string())
            } else {
                Ok(7)
            }
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn exhausts_attempt_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = instant(3).run(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("down".to_string())
        });
        assert_eq!(result.unwrap_err(), "down");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn non_retryable_errors_fail_fast() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = instant(5).run_if(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("fatal".to_string())
            },
            |e| e != "fatal",
        );
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_max_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = instant(0).run(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        });
        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
