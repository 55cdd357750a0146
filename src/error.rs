// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Command `{command}` failed with exit code {exit_code}: {output}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        output: String,
    },

    #[error("Command `{command}` was expected to fail but succeeded: {output}")]
    UnexpectedSuccess { command: String, output: String },

    #[error("Unexpected output from `{command}`: {output}")]
    UnexpectedOutput { command: String, output: String },

    #[error("Timed out after {elapsed:?} waiting for {what}{}", fmt_last(.last))]
    Timeout {
        what: String,
        elapsed: Duration,
        last: Option<String>,
    },

    #[error("Invalid poll settings: {0}")]
    InvalidPoll(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Failed to decode value: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("{0}")]
    Assertion(String),
}

impl HarnessError {
    /// Errors that only mean "the cluster is not there yet" while polling
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HarnessError::Json(_)
                | HarnessError::Decode(_)
                | HarnessError::NotFound(_)
                | HarnessError::UnexpectedOutput { .. }
        )
    }
}

fn fmt_last(last: &Option<String>) -> String {
    last.as_ref()
        .map(|l| format!(" (last: {})", l.trim()))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, HarnessError>;
