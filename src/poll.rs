// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Fixed-interval polling until a check succeeds or a deadline passes.
//!
//! A check returns an [`Attempt`]: `Ready` ends the poll with a value,
//! `Retry` counts as a failed attempt and `Fatal` aborts immediately. The
//! poller blocks the calling thread while it waits.

use crate::constants::poll::{DEFAULT_INTERVAL_SECS, DEFAULT_TIMEOUT_SECS};
use crate::error::{HarnessError, Result};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Source of time for the poller
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Wall clock, sleeping the current thread
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration)
    }
}

/// Outcome of one evaluation of a poll check
#[derive(Debug)]
pub enum Attempt<T> {
    /// Condition met, stop polling
    Ready(T),
    /// Not there yet; the reason is reported if the poll times out
    Retry(String),
    /// Give up immediately
    Fatal(HarnessError),
}

impl<T> Attempt<T> {
    /// Classify a produced value: errors are retried when
    /// [`HarnessError::is_retryable`], values when `success` rejects them.
    pub fn from_result(result: Result<T>, success: impl FnOnce(&T) -> bool) -> Self
    where
        T: fmt::Debug,
    {
        match result {
            Ok(value) if success(&value) => Attempt::Ready(value),
            Ok(value) => Attempt::Retry(format!("condition not met, got {:?}", value)),
            Err(e) if e.is_retryable() => Attempt::Retry(e.to_string()),
            Err(e) => Attempt::Fatal(e),
        }
    }
}

impl<T> Attempt<T> {
    /// Continue a ready value with another check
    pub fn and_then<U>(self, next: impl FnOnce(T) -> Attempt<U>) -> Attempt<U> {
        match self {
            Attempt::Ready(value) => next(value),
            Attempt::Retry(reason) => Attempt::Retry(reason),
            Attempt::Fatal(e) => Attempt::Fatal(e),
        }
    }
}

impl<T> From<Option<T>> for Attempt<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Attempt::Ready(v),
            None => Attempt::Retry("no value yet".to_string()),
        }
    }
}

/// Repeats a check every `interval` until it succeeds or `timeout` elapses
#[derive(Debug, Clone)]
pub struct Poller<C = SystemClock> {
    what: String,
    interval: Duration,
    timeout: Duration,
    clock: C,
}

impl Poller<SystemClock> {
    /// `what` names the awaited condition in timeout errors
    pub fn new(what: impl Into<String>) -> Self {
        Poller {
            what: what.into(),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            clock: SystemClock,
        }
    }
}

impl<C: Clock> Poller<C> {
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn interval_secs(self, secs: u64) -> Self {
        self.interval(Duration::from_secs(secs))
    }

    pub fn timeout_secs(self, secs: u64) -> Self {
        self.timeout(Duration::from_secs(secs))
    }

    pub fn with_clock<D: Clock>(self, clock: D) -> Poller<D> {
        Poller {
            what: self.what,
            interval: self.interval,
            timeout: self.timeout,
            clock,
        }
    }

    pub fn what(&self) -> &str {
        &self.what
    }

    /// Evaluate `check` until it is ready, fails fatally, or the deadline passes.
    ///
    /// At least one attempt is always made. Once the timeout has elapsed after a
    /// failed attempt the poll ends without sleeping again; the last sleep is
    /// shortened so it never overshoots the deadline.
    pub fn until<T>(&self, mut check: impl FnMut() -> Attempt<T>) -> Result<T> {
        if self.interval.is_zero() {
            return Err(HarnessError::InvalidPoll(format!(
                "interval must be greater than zero while waiting for {}",
                self.what
            )));
        }

        let start = self.clock.now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let reason = match check() {
                Attempt::Ready(value) => {
                    debug!(what = %self.what, attempt, "Condition met");
                    return Ok(value);
                }
                Attempt::Retry(reason) => reason,
                Attempt::Fatal(e) => return Err(e),
            };

            let elapsed = self.clock.now().saturating_duration_since(start);
            if elapsed >= self.timeout {
                warn!(what = %self.what, attempt, ?elapsed, "Timed out");
                return Err(HarnessError::Timeout {
                    what: self.what.clone(),
                    elapsed,
                    last: Some(reason),
                });
            }

            debug!(what = %self.what, attempt, reason = %reason, "Not ready yet, retrying");
            self.clock.sleep(self.interval.min(self.timeout - elapsed));
        }
    }

    /// Poll a value-producing function until `success` accepts its value.
    /// Retryable errors count as failed attempts; any other error aborts.
    pub fn until_ok<T: fmt::Debug>(
        &self,
        mut produce: impl FnMut() -> Result<T>,
        success: impl Fn(&T) -> bool,
    ) -> Result<T> {
        self.until(|| Attempt::from_result(produce(), &success))
    }

    /// Poll until the function yields `Some`
    pub fn until_some<T>(&self, mut produce: impl FnMut() -> Result<Option<T>>) -> Result<T> {
        self.until(|| match produce() {
            Ok(value) => value.into(),
            Err(e) if e.is_retryable() => Attempt::Retry(e.to_string()),
            Err(e) => Attempt::Fatal(e),
        })
    }

    /// Poll until the predicate holds
    pub fn until_true(&self, mut check: impl FnMut() -> Result<bool>) -> Result<()> {
        self.until_ok(&mut check, |ok| *ok).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeClock;
    use std::cell::Cell;

    fn make_poller(clock: &FakeClock, interval: u64, timeout: u64) -> Poller<&FakeClock> {
        Poller::new("test condition")
            .interval_secs(interval)
            .timeout_secs(timeout)
            .with_clock(clock)
    }

    #[test]
    fn test_zero_timeout_makes_exactly_one_attempt() {
        let clock = FakeClock::new();
        let calls = Cell::new(0);

        let result: Result<()> = make_poller(&clock, 5, 0).until(|| {
            calls.set(calls.get() + 1);
            Attempt::Retry("false".to_string())
        });

        assert!(matches!(result, Err(HarnessError::Timeout { .. })));
        assert_eq!(calls.get(), 1);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_returns_value_of_first_successful_attempt() {
        let clock = FakeClock::new();
        let calls = Cell::new(0);

        let value = make_poller(&clock, 1, 10)
            .until(|| {
                calls.set(calls.get() + 1);
                if calls.get() == 3 {
                    Attempt::Ready(calls.get() * 10)
                } else {
                    Attempt::Retry("not yet".to_string())
                }
            })
            .unwrap();

        assert_eq!(value, 30);
        assert_eq!(calls.get(), 3);
        assert_eq!(clock.elapsed(), Duration::from_secs(2));
    }

    #[test]
    fn test_attempts_are_bounded_by_timeout() {
        for (interval, timeout) in [(1, 10), (3, 10), (4, 4), (7, 3), (2, 0)] {
            let clock = FakeClock::new();
            let calls = Cell::new(0u64);

            let result: Result<()> = make_poller(&clock, interval, timeout).until(|| {
                calls.set(calls.get() + 1);
                Attempt::Retry("never".to_string())
            });

            let max_attempts = timeout.div_ceil(interval) + 1;
            assert!(result.is_err());
            assert!(calls.get() >= 1);
            assert!(
                calls.get() <= max_attempts,
                "interval={} timeout={} attempts={}",
                interval,
                timeout,
                calls.get()
            );

            let elapsed = clock.elapsed();
            assert!(elapsed >= Duration::from_secs(timeout));
            assert!(elapsed < Duration::from_secs(timeout + interval));
        }
    }

    #[test]
    fn test_never_sleeps_past_deadline() {
        let clock = FakeClock::new();

        let _: Result<()> =
            make_poller(&clock, 4, 10).until(|| Attempt::Retry("never".to_string()));

        assert_eq!(
            clock.sleeps(),
            vec![
                Duration::from_secs(4),
                Duration::from_secs(4),
                Duration::from_secs(2)
            ]
        );
        assert_eq!(clock.elapsed(), Duration::from_secs(10));
    }

    #[test]
    fn test_retryable_errors_are_swallowed() {
        let clock = FakeClock::new();
        let calls = Cell::new(0);

        let value = make_poller(&clock, 1, 10)
            .until_ok(
                || {
                    calls.set(calls.get() + 1);
                    if calls.get() < 3 {
                        serde_json::from_str::<String>("not json").map_err(HarnessError::from)
                    } else {
                        Ok("True".to_string())
                    }
                },
                |status| status == "True",
            )
            .unwrap();

        assert_eq!(value, "True");
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_fatal_errors_abort_immediately() {
        let clock = FakeClock::new();
        let calls = Cell::new(0);

        let result: Result<String> = make_poller(&clock, 1, 10).until_ok(
            || {
                calls.set(calls.get() + 1);
                Err(HarnessError::CommandFailed {
                    command: "oc get sbr".to_string(),
                    exit_code: 1,
                    output: "forbidden".to_string(),
                })
            },
            |_| true,
        );

        assert!(matches!(result, Err(HarnessError::CommandFailed { .. })));
        assert_eq!(calls.get(), 1);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let clock = FakeClock::new();
        let calls = Cell::new(0);

        let result: Result<()> = make_poller(&clock, 0, 10).until(|| {
            calls.set(calls.get() + 1);
            Attempt::Ready(())
        });

        assert!(matches!(result, Err(HarnessError::InvalidPoll(_))));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_timeout_reports_last_reason() {
        let clock = FakeClock::new();

        let err = make_poller(&clock, 1, 2)
            .until_ok(|| Ok("Pending".to_string()), |phase| phase == "Running")
            .unwrap_err();

        match err {
            HarnessError::Timeout { what, last, .. } => {
                assert_eq!(what, "test condition");
                assert!(last.unwrap().contains("Pending"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_until_some_waits_for_value() {
        let clock = FakeClock::new();
        let calls = Cell::new(0);

        let pod = make_poller(&clock, 5, 60)
            .until_some(|| {
                calls.set(calls.get() + 1);
                Ok((calls.get() == 2).then(|| "app-7d9f".to_string()))
            })
            .unwrap();

        assert_eq!(pod, "app-7d9f");
        assert_eq!(clock.elapsed(), Duration::from_secs(5));
    }

    #[test]
    fn test_and_then_chains_ready_values() {
        let ready: Attempt<u32> = Attempt::Ready(2);
        assert!(matches!(ready.and_then(|v| Attempt::Ready(v * 2)), Attempt::Ready(4)));

        let retry: Attempt<u32> = Attempt::Retry("status 503".to_string());
        match retry.and_then(|v| Attempt::Ready(v * 2)) {
            Attempt::Retry(reason) => assert_eq!(reason, "status 503"),
            other => panic!("unexpected {:?}", other),
        }

        let fatal: Attempt<u32> = Attempt::Fatal(HarnessError::Config("bad".to_string()));
        assert!(matches!(
            fatal.and_then(|v| Attempt::Ready(v)),
            Attempt::Fatal(HarnessError::Config(_))
        ));
    }
}
