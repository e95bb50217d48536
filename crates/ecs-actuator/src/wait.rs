//! Polling until a condition converges.
//!
//! Provides a domain-agnostic primitive for waiting on provider state (or any
//! async condition) with a fixed or exponential delay and a wall-clock
//! timeout.

use crate::error::ActuatorError;
use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use ecs_actuator_common::defaults::{DEFAULT_WAIT_INTERVAL_SECS, DEFAULT_WAIT_TIMEOUT_SECS};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Outcome of a single poll
#[derive(Debug)]
pub enum Poll<T> {
    /// Not there yet. The error, if any, is kept only to be returned should
    /// the timeout fire before the next poll.
    Pending(Option<ActuatorError>),
    /// Converged
    Done(T),
    /// Will never converge, stop immediately
    Failed(ActuatorError),
}

/// Delay between polls
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed(Duration),
    Exponential {
        min: Duration,
        max: Duration,
        jitter: bool,
    },
}

/// Configuration for polling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitConfig {
    pub backoff: Backoff,
    /// Maximum total time measured from the first poll
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            backoff: Backoff::Fixed(Duration::from_secs(DEFAULT_WAIT_INTERVAL_SECS)),
            timeout: Duration::from_secs(DEFAULT_WAIT_TIMEOUT_SECS),
        }
    }
}

impl WaitConfig {
    pub fn fixed(interval: Duration, timeout: Duration) -> Self {
        Self {
            backoff: Backoff::Fixed(interval),
            timeout,
        }
    }

    /// Replace zero durations with the defaults
    fn normalized(self) -> Self {
        let defaults = Self::default();
        let timeout = if self.timeout.is_zero() {
            defaults.timeout
        } else {
            self.timeout
        };
        let backoff = match self.backoff {
            Backoff::Fixed(interval) if interval.is_zero() => defaults.backoff,
            Backoff::Exponential { min, max, jitter } if min.is_zero() || max < min => {
                let min = if min.is_zero() {
                    Duration::from_secs(DEFAULT_WAIT_INTERVAL_SECS)
                } else {
                    min
                };
                Backoff::Exponential {
                    min,
                    max: max.max(min),
                    jitter,
                }
            }
            other => other,
        };
        Self { backoff, timeout }
    }
}

enum Delays {
    Fixed(Duration),
    Exponential {
        inner: ExponentialBackoff,
        max: Duration,
    },
}

impl Delays {
    fn new(backoff: Backoff) -> Self {
        match backoff {
            Backoff::Fixed(interval) => Self::Fixed(interval),
            Backoff::Exponential { min, max, jitter } => {
                let mut builder = ExponentialBuilder::default()
                    .with_min_delay(min)
                    .with_max_delay(max)
                    .with_factor(2.0)
                    .with_max_times(usize::MAX);
                if jitter {
                    builder = builder.with_jitter();
                }
                Self::Exponential {
                    inner: builder.build(),
                    max,
                }
            }
        }
    }

    fn next_delay(&mut self) -> Duration {
        match self {
            Self::Fixed(interval) => *interval,
            Self::Exponential { inner, max } => inner.next().unwrap_or(*max),
        }
    }
}

/// Poll `check` until it reports [`Poll::Done`] or [`Poll::Failed`], or the
/// timeout elapses.
///
/// The timeout is measured from the first poll. No sleep is started that
/// would end at or past the deadline; instead the error from the last poll is
/// returned, or [`ActuatorError::Timeout`] when the last poll carried none.
///
/// # Example
/// ```ignore
/// let id = wait_for(WaitConfig::default(), "instance i-1 running", || async {
///     match describe().await {
///         Ok(Some(id)) => Poll::Done(id),
///         Ok(None) => Poll::Pending(None),
///         Err(e) => Poll::Pending(Some(e)),
///     }
/// })
/// .await?;
/// ```
pub async fn wait_for<T, F, Fut>(
    config: WaitConfig,
    description: &str,
    mut check: F,
) -> Result<T, ActuatorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Poll<T>>,
{
    let config = config.normalized();
    let start = Instant::now();
    let mut delays = Delays::new(config.backoff);
    let mut attempts = 0u32;

    loop {
        attempts += 1;

        let last_error = match check().await {
            Poll::Done(value) => {
                debug!(resource = %description, attempts, "Condition met");
                return Ok(value);
            }
            Poll::Failed(e) => {
                warn!(resource = %description, attempts, error = %e, "Condition failed");
                return Err(e);
            }
            Poll::Pending(e) => e,
        };

        let delay = delays.next_delay();
        let elapsed = start.elapsed();
        if elapsed + delay >= config.timeout {
            warn!(
                resource = %description,
                attempts,
                timeout_secs = config.timeout.as_secs(),
                last_error = ?last_error.as_ref().map(ToString::to_string),
                "Timed out waiting"
            );
            return Err(last_error.unwrap_or_else(|| ActuatorError::Timeout {
                description: description.to_string(),
                waited: elapsed,
            }));
        }

        debug!(
            resource = %description,
            attempt = attempts,
            delay_ms = delay.as_millis() as u64,
            "Condition not met, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_on_third_call() {
        let calls = Cell::new(0u32);
        let start = Instant::now();

        let result = wait_for(WaitConfig::fixed(secs(1), secs(10)), "third call", || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n == 3 {
                    Poll::Done(n)
                } else {
                    Poll::Pending(None)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.get(), 3);
        assert_eq!(start.elapsed(), secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_returns_last_error() {
        let calls = Cell::new(0u32);
        let start = Instant::now();

        let result: Result<(), _> = wait_for(WaitConfig::fixed(secs(1), secs(2)), "never", || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move { Poll::Pending(Some(ActuatorError::NotFound(format!("attempt {n}")))) }
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(calls.get(), 2);
        assert_eq!(err.to_string(), "not found: attempt 2");
        assert!(start.elapsed() < secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_without_error() {
        let result: Result<(), _> =
            wait_for(WaitConfig::fixed(secs(1), secs(3)), "quiet", || async {
                Poll::Pending(None)
            })
            .await;

        match result {
            Err(ActuatorError::Timeout { description, .. }) => assert_eq!(description, "quiet"),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_stops_immediately() {
        let calls = Cell::new(0u32);

        let result: Result<(), _> = wait_for(WaitConfig::fixed(secs(1), secs(10)), "gone", || {
            calls.set(calls.get() + 1);
            async { Poll::Failed(ActuatorError::NotFound("i-1".to_string())) }
        })
        .await;

        assert!(result.unwrap_err().is_not_found());
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_falls_back_to_default() {
        let calls = Cell::new(0u32);
        let start = Instant::now();

        let result: Result<(), _> =
            wait_for(WaitConfig::fixed(Duration::ZERO, Duration::ZERO), "default", || {
                calls.set(calls.get() + 1);
                async { Poll::Pending(None) }
            })
            .await;

        assert!(result.is_err());
        // 900s timeout at 5s interval: polls at 0, 5, ..., 895
        assert_eq!(calls.get(), 180);
        assert!(start.elapsed() < secs(DEFAULT_WAIT_TIMEOUT_SECS));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exponential_backoff_caps_delay() {
        let polled_at = std::cell::RefCell::new(Vec::new());
        let start = Instant::now();
        let config = WaitConfig {
            backoff: Backoff::Exponential {
                min: secs(1),
                max: secs(4),
                jitter: false,
            },
            timeout: secs(60),
        };

        let result = wait_for(config, "exp", || {
            polled_at.borrow_mut().push(start.elapsed());
            let n = polled_at.borrow().len();
            async move {
                if n == 5 {
                    Poll::Done(())
                } else {
                    Poll::Pending(None)
                }
            }
        })
        .await;

        assert!(result.is_ok());
        // delays 1, 2, 4, 4
        assert_eq!(
            *polled_at.borrow(),
            vec![secs(0), secs(1), secs(3), secs(7), secs(11)]
        );
    }
}
