//! Polling with a time or attempt budget
//!
//! Shared by the check wait, the deferred-merge wait and the retries while
//! GitHub is still computing mergeability.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Result of a single check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll<T> {
    /// Condition met
    Ready(T),
    /// Not yet; carries the latest observation
    Pending(T),
}

/// Result of a whole polling run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Polled<T> {
    /// Condition met
    Ready(T),
    /// Budget spent; carries the last observation
    Exhausted(T),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Budget {
    Time(Duration),
    Attempts(u32),
}

/// Repeats a check until it is ready or the budget runs out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    interval: Duration,
    budget: Budget,
}

impl Poller {
    /// Poll every `interval` until `timeout` has elapsed
    pub const fn timed(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            budget: Budget::Time(timeout),
        }
    }

    /// Check once, then retry up to `retries` times with `delay` in between
    pub const fn attempts(retries: u32, delay: Duration) -> Self {
        Self {
            interval: delay,
            budget: Budget::Attempts(retries),
        }
    }

    /// Total time the budget allows
    pub fn budget(&self) -> Duration {
        match self.budget {
            Budget::Time(timeout) => timeout,
            Budget::Attempts(n) => self.interval * n,
        }
    }

    /// Run `check` until it reports ready or the budget is spent
    ///
    /// Errors from `check` stop polling immediately.
    pub async fn run<T, F, Fut>(&self, mut check: F) -> Result<Polled<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Poll<T>>>,
    {
        let start = Instant::now();
        let mut retries = 0u32;
        loop {
            let observed = match check().await? {
                Poll::Ready(value) => return Ok(Polled::Ready(value)),
                Poll::Pending(value) => value,
            };

            let exhausted = match self.budget {
                Budget::Time(timeout) => start.elapsed() >= timeout,
                Budget::Attempts(max) => retries >= max,
            };
            if exhausted {
                return Ok(Polled::Exhausted(observed));
            }

            retries += 1;
            sleep(self.interval).await;
        }
    }

    /// Like [`run`](Self::run), but an exhausted budget is a timeout error
    pub async fn until<T, F, Fut>(&self, what: impl Into<String>, check: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Poll<T>>>,
    {
        match self.run(check).await? {
            Polled::Ready(value) => Ok(value),
            Polled::Exhausted(_) => Err(Error::Timeout {
                what: what.into(),
                after: self.budget(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_attempts_checks_once_plus_retries() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = Poller::attempts(3, Duration::ZERO)
            .run(move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(Poll::Pending(n))
            })
            .await
            .unwrap();
        assert_eq!(result, Polled::Exhausted(4));
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_ready_stops_polling() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let value = Poller::timed(Duration::ZERO, Duration::from_secs(60))
            .until("ready", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(if n == 2 { Poll::Ready(n) } else { Poll::Pending(n) })
            })
            .await
            .unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn test_zero_timeout_checks_once_then_times_out() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let err = Poller::timed(Duration::ZERO, Duration::ZERO)
            .until("checks on PR #1", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Poll::Pending(()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_check_error_stops_polling() {
        let err = Poller::attempts(5, Duration::ZERO)
            .run(|| async { Err::<Poll<()>, _>(Error::Internal("boom".to_string())) })
            .await
            .unwrap_err();
        assert!(err.mentions("boom"));
    }
}
