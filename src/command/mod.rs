// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Running cluster CLI commands and waiting on their output.

pub mod runner;

pub use runner::{CommandOutput, Runner, ShellRunner, LAUNCH_FAILURE_EXIT_CODE};

use crate::error::Result;
use crate::poll::{Attempt, Clock, Poller};

/// Re-run `command` until its output contains `status`.
///
/// Returns the last output once the status text shows up. Exit codes are not
/// inspected: a failing command simply doesn't match yet.
pub fn run_wait_for_status<R: Runner, C: Clock>(
    runner: &R,
    poller: &Poller<C>,
    command: &str,
    status: &str,
) -> Result<CommandOutput> {
    poller.until(|| {
        let result = runner.run(command, None);
        if result.output.contains(status) {
            Attempt::Ready(result)
        } else {
            Attempt::Retry(format!(
                "`{}` exited with {}: {}",
                command,
                result.exit_code,
                result.output.trim()
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarnessError;
    use crate::test_utils::{FakeClock, MockRunner};

    #[test]
    fn test_wait_for_status_returns_matching_output() {
        let runner = MockRunner::new()
            .on_sequence(
                "oc get csv",
                vec![("Installing", 0), ("", 1), ("Succeeded", 0)],
            );
        let clock = FakeClock::new();
        let poller = Poller::new("csv to succeed")
            .interval_secs(20)
            .timeout_secs(180)
            .with_clock(&clock);

        let output = run_wait_for_status(&runner, &poller, "oc get csv", "Succeeded").unwrap();

        assert_eq!(output.output, "Succeeded");
        assert_eq!(runner.calls().len(), 3);
    }

    #[test]
    fn test_wait_for_status_times_out() {
        let runner = MockRunner::new().on("oc get csv", "Installing", 0);
        let clock = FakeClock::new();
        let poller = Poller::new("csv to succeed")
            .interval_secs(20)
            .timeout_secs(40)
            .with_clock(&clock);

        let err = run_wait_for_status(&runner, &poller, "oc get csv", "Succeeded").unwrap_err();

        assert!(matches!(err, HarnessError::Timeout { .. }));
        assert_eq!(runner.calls().len(), 3);
    }
}
