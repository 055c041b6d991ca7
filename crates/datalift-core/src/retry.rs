//! Retry with backoff for fallible network operations
//!
//! Kept separate from the pipelines: a client decides whether to wrap a call,
//! pipelines never retry on their own.

use std::fmt::Display;
use std::time::Duration;

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `base * 2^(attempt - 1)`: base, 2·base, 4·base, ...
    Exponential(Duration),
    /// `step * attempt`
    Linear(Duration),
    Fixed(Duration),
}

impl Backoff {
    /// Delay to wait after the `attempt`-th failure (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Self::Exponential(base) => base * 2u32.saturating_pow(attempt.saturating_sub(1)),
            Self::Linear(step) => step * attempt,
            Self::Fixed(d) => d,
        }
    }
}

/// How many times to try, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero behaves like one.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Single attempt, no retry.
    pub const fn none() -> Self {
        Self::new(1, Backoff::Fixed(Duration::ZERO))
    }
}

impl Default for RetryPolicy {
    /// 3 attempts, 1s then 2s (linear).
    fn default() -> Self {
        Self::new(3, Backoff::Linear(Duration::from_secs(1)))
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy is exhausted. Returns the first success or the last error.
pub fn retry_with_backoff<T, E: Display>(
    label: &str,
    policy: &RetryPolicy,
    is_retryable: impl Fn(&E) -> bool,
    mut op: impl FnMut() -> Result<T, E>,
) -> Result<T, E> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1u32;
    loop {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if attempt < max_attempts && is_retryable(&e) => {
                let delay = policy.backoff.delay(attempt);
                log::warn!("{label}: attempt {attempt}/{max_attempts} failed: {e}, retrying in {delay:?}");
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => {
                if attempt > 1 {
                    log::error!("{label}: failed after {attempt} attempt(s): {e}");
                }
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const INSTANT: RetryPolicy = RetryPolicy::new(3, Backoff::Fixed(Duration::ZERO));

    #[test]
    fn backoff_exponential() {
        let b = Backoff::Exponential(Duration::from_secs(2));
        assert_eq!(b.delay(1), Duration::from_secs(2));
        assert_eq!(b.delay(2), Duration::from_secs(4));
        assert_eq!(b.delay(3), Duration::from_secs(8));
    }

    #[test]
    fn backoff_linear() {
        let b = Backoff::Linear(Duration::from_secs(1));
        assert_eq!(b.delay(1), Duration::from_secs(1));
        assert_eq!(b.delay(3), Duration::from_secs(3));
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let calls = Cell::new(0);
        let result: Result<u32, String> = retry_with_backoff(
            "test",
            &INSTANT,
            |_| true,
            || {
                calls.set(calls.get() + 1);
                if calls.get() < 3 {
                    Err("flaky".to_string())
                } else {
                    Ok(7)
                }
            },
        );
        assert_eq!(result, Ok(7));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn returns_last_error_when_exhausted() {
        let calls = Cell::new(0);
        let result: Result<(), String> = retry_with_backoff(
            "test",
            &INSTANT,
            |_| true,
            || {
                calls.set(calls.get() + 1);
                Err(format!("failure {}", calls.get()))
            },
        );
        assert_eq!(result, Err("failure 3".to_string()));
    }

    #[test]
    fn non_retryable_stops_immediately() {
        let calls = Cell::new(0);
        let result: Result<(), String> = retry_with_backoff(
            "test",
            &INSTANT,
            |e: &String| e != "fatal",
            || {
                calls.set(calls.get() + 1);
                Err("fatal".to_string())
            },
        );
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn none_policy_tries_once() {
        let calls = Cell::new(0);
        let _: Result<(), String> = retry_with_backoff(
            "test",
            &RetryPolicy::none(),
            |_| true,
            || {
                calls.set(calls.get() + 1);
                Err("x".to_string())
            },
        );
        assert_eq!(calls.get(), 1);
    }
}
