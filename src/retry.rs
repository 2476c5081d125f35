//! Bounded retry with a fixed delay between attempts.

use std::thread;
use std::time::Duration;

use tracing::debug;

pub trait Clock {
    fn sleep(&self, duration: Duration);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Duration,
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts: max_attempts.max(1),
        }
    }
}

#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error.
    Exhausted { attempts: u32, last: E },
    /// An attempt failed with an error the predicate declined to retry.
    Aborted(E),
}

/// Runs `op` until it succeeds, fails with an error `should_retry` rejects, or
/// the policy's attempt ceiling is reached. Sleeps only between attempts.
/// `op` receives the 1-based attempt number.
pub fn retry<T, E>(
    policy: &RetryPolicy,
    clock: &dyn Clock,
    mut should_retry: impl FnMut(&E) -> bool,
    mut op: impl FnMut(u32) -> Result<T, E>,
) -> Result<T, RetryError<E>> {
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) if !should_retry(&err) => return Err(RetryError::Aborted(err)),
            Err(err) if attempt >= policy.max_attempts => {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: err,
                });
            }
            Err(_) => {
                debug!(attempt, delay = ?policy.delay, "retrying");
                clock.sleep(policy.delay);
                attempt += 1;
            }
        }
    }
}
