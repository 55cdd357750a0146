// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Shell command execution with a controlled environment

use crate::config::Config;
use crate::error::{HarnessError, Result};
use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, warn};

/// Exit code reported when the shell itself could not be launched
pub const LAUNCH_FAILURE_EXIT_CODE: i32 = 127;

/// Combined stdout/stderr of a finished command and its exit code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub output: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn new(output: impl Into<String>, exit_code: i32) -> Self {
        Self {
            output: output.into(),
            exit_code,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Turn a non-zero exit into an error naming the command
    pub fn expect_success(self, command: &str) -> Result<String> {
        if self.success() {
            Ok(self.output)
        } else {
            Err(HarnessError::CommandFailed {
                command: command.to_string(),
                exit_code: self.exit_code,
                output: self.output,
            })
        }
    }

    /// Turn a zero exit into an error, for commands the cluster should reject
    pub fn expect_failure(self, command: &str) -> Result<String> {
        if self.success() {
            Err(HarnessError::UnexpectedSuccess {
                command: command.to_string(),
                output: self.output,
            })
        } else {
            Ok(self.output)
        }
    }
}

/// Something that can run a shell command line
pub trait Runner {
    /// Run `command`, optionally feeding `stdin`. Never fails: launch errors
    /// and non-zero exits are both reported through the exit code.
    fn run(&self, command: &str, stdin: Option<&str>) -> CommandOutput;
}

impl<R: Runner + ?Sized> Runner for &R {
    fn run(&self, command: &str, stdin: Option<&str>) -> CommandOutput {
        (**self).run(command, stdin)
    }
}

/// Runs command lines through `sh -c` with an explicit environment
#[derive(Debug, Clone)]
pub struct ShellRunner {
    workdir: PathBuf,
    env: BTreeMap<String, String>,
}

impl ShellRunner {
    pub fn new(workdir: impl Into<PathBuf>, env: BTreeMap<String, String>) -> Self {
        Self {
            workdir: workdir.into(),
            env,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.workdir.clone(), config.command_env())
    }

    pub fn setenv(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env.insert(key.into(), value.into());
    }

    fn spawn(&self, command: &str, stdin: Option<&str>) -> std::io::Result<CommandOutput> {
        // 2>&1 keeps stdout and stderr interleaved in one buffer
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(format!("{{ {}\n}} 2>&1", command))
            .current_dir(&self.workdir)
            .env_clear()
            .envs(&self.env)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Feed stdin from a separate thread so a chatty command can't fill its
        // output pipe while we are still writing
        let feeder = match (stdin, child.stdin.take()) {
            (Some(input), Some(mut pipe)) => {
                let input = input.to_owned();
                Some(thread::spawn(move || match pipe.write_all(input.as_bytes()) {
                    Err(e) if e.kind() != ErrorKind::BrokenPipe => Err(e),
                    _ => Ok(()),
                }))
            }
            _ => None,
        };

        let output = child.wait_with_output()?;
        if let Some(Ok(Err(e))) = feeder.map(|handle| handle.join()) {
            return Err(e);
        }
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutput {
            output: text,
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

impl Runner for ShellRunner {
    fn run(&self, command: &str, stdin: Option<&str>) -> CommandOutput {
        debug!(command = %command, "Running command");

        let result = self.spawn(command, stdin).unwrap_or_else(|e| {
            CommandOutput::new(format!("failed to launch shell: {}", e), LAUNCH_FAILURE_EXIT_CODE)
        });

        if !result.success() {
            warn!(
                command = %command,
                exit_code = result.exit_code,
                output = %result.output.trim(),
                "Command exited with non-zero code"
            );
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_runner() -> ShellRunner {
        let path = std::env::var("PATH").unwrap_or_else(|_| "/usr/bin:/bin".to_string());
        ShellRunner::new(
            std::env::temp_dir(),
            BTreeMap::from([("PATH".to_string(), path)]),
        )
    }

    #[test]
    fn test_exit_code_is_returned_not_raised() {
        let result = make_runner().run("echo boom; exit 1", None);

        assert_eq!(result.exit_code, 1);
        assert_eq!(result.output.trim(), "boom");
    }

    #[test]
    fn test_invalid_syntax_reports_shell_error() {
        let result = make_runner().run("if then fi (", None);

        assert_ne!(result.exit_code, 0);
        assert!(!result.output.trim().is_empty());
    }

    #[test]
    fn test_stderr_is_captured() {
        let result = make_runner().run("echo oops >&2", None);

        assert!(result.success());
        assert_eq!(result.output.trim(), "oops");
    }

    #[test]
    fn test_stdin_is_fed_to_command() {
        let result = make_runner().run("cat", Some("kind: Namespace\n"));

        assert!(result.success());
        assert_eq!(result.output, "kind: Namespace\n");
    }

    #[test]
    fn test_environment_is_not_inherited() {
        std::env::set_var("SBO_HARNESS_LEAK_CHECK", "leaked");
        let mut runner = make_runner();
        runner.setenv("KUBECONFIG", "/tmp/kubeconfig");

        let result = runner.run("echo \"${SBO_HARNESS_LEAK_CHECK:-unset} $KUBECONFIG\"", None);

        assert_eq!(result.output.trim(), "unset /tmp/kubeconfig");
    }

    #[test]
    fn test_runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = make_runner();
        runner.workdir = dir.path().to_path_buf();

        let result = runner.run("pwd -P", None);

        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(result.output.trim(), expected.to_string_lossy());
    }

    #[test]
    fn test_expect_success_wraps_failure() {
        let err = CommandOutput::new("not found", 1)
            .expect_success("oc get ns missing")
            .unwrap_err();

        assert!(matches!(err, HarnessError::CommandFailed { exit_code: 1, .. }));
    }

    #[test]
    fn test_expect_failure_rejects_success() {
        let err = CommandOutput::new("created", 0)
            .expect_failure("oc apply -f -")
            .unwrap_err();

        assert!(matches!(err, HarnessError::UnexpectedSuccess { .. }));
    }
}
