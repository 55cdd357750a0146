// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Typed accessors over the cluster CLI.
//!
//! Every method builds one deterministic command line, runs it and parses the
//! result. Lookups return `None` when the command fails; mutations turn a
//! failure into [`HarnessError::CommandFailed`]. Nothing is cached: each call
//! goes back to the cluster.

mod mutate;
mod query;
mod workload;

pub(crate) use query::full_match;

use crate::command::{CommandOutput, Runner, ShellRunner};
use crate::config::{Cli, Config};
use crate::constants::poll::DEFAULT_INTERVAL_SECS;
use crate::error::{HarnessError, Result};
use crate::poll::{Clock, Poller, SystemClock};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use regex::Regex;
use serde::Deserialize;
use std::fmt;

/// Addressing key of a cluster object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
}

impl ResourceRef {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            namespace: None,
        }
    }

    pub fn namespaced(
        kind: impl Into<String>,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Self::new(kind, name)
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{} in {}", self.kind, self.name, ns),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

/// `items` of a `get -o json` list, keeping only what we parse
#[derive(Deserialize)]
pub(crate) struct ItemList<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Deserialize)]
pub(crate) struct Named {
    #[serde(default)]
    pub metadata: ObjectMeta,
}

/// Handle on the cluster, bound to one CLI flavor
#[derive(Debug, Clone)]
pub struct Cluster<R = ShellRunner, C = SystemClock> {
    runner: R,
    cli: Cli,
    clock: C,
}

impl Cluster {
    /// Cluster driven through a shell runner built from `config`
    pub fn from_config(config: &Config) -> Self {
        Cluster::new(ShellRunner::from_config(config), config.cli)
    }
}

impl<R: Runner> Cluster<R> {
    pub fn new(runner: R, cli: Cli) -> Self {
        Cluster {
            runner,
            cli,
            clock: SystemClock,
        }
    }
}

impl<R: Runner, C: Clock> Cluster<R, C> {
    pub fn with_clock<D: Clock>(self, clock: D) -> Cluster<R, D> {
        Cluster {
            runner: self.runner,
            cli: self.cli,
            clock,
        }
    }

    pub fn cli(&self) -> Cli {
        self.cli
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// A poller on this cluster's clock, with the default interval
    pub fn poller(&self, what: impl Into<String>) -> Poller<&C> {
        Poller::new(what)
            .interval_secs(DEFAULT_INTERVAL_SECS)
            .with_clock(&self.clock)
    }

    /// `{cli} {args}`
    pub(crate) fn command(&self, args: impl fmt::Display) -> String {
        format!("{} {}", self.cli.binary(), args)
    }

    pub(crate) fn run(&self, command: &str, stdin: Option<&str>) -> CommandOutput {
        self.runner.run(command, stdin)
    }

    /// Run and fail on a non-zero exit
    pub(crate) fn run_checked(&self, command: &str, stdin: Option<&str>) -> Result<String> {
        self.run(command, stdin).expect_success(command)
    }

    /// Run and map a non-zero exit to `None`
    pub(crate) fn run_lookup(&self, command: &str) -> Option<String> {
        let result = self.run(command, None);
        result.success().then_some(result.output)
    }
}

/// Fail with [`HarnessError::UnexpectedOutput`] unless `output` matches `pattern`
pub(crate) fn expect_output(action: &str, output: &str, pattern: &str) -> Result<()> {
    let matched = Regex::new(pattern)
        .map(|re| re.is_match(output))
        .unwrap_or(false);
    if matched {
        return Ok(());
    }
    Err(HarnessError::UnexpectedOutput {
        command: action.to_string(),
        output: output.to_string(),
    })
}

pub(crate) fn ns_arg(namespace: Option<&str>) -> String {
    namespace.map(|ns| format!(" -n {}", ns)).unwrap_or_default()
}

pub(crate) fn user_arg(user: Option<&str>) -> String {
    user.map(|u| format!(" --user={}", u)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_ref_display() {
        assert_eq!(
            ResourceRef::namespaced("deployment", "app", "test-ns").to_string(),
            "deployment/app in test-ns"
        );
        assert_eq!(ResourceRef::new("crd", "servicebindings").to_string(), "crd/servicebindings");
    }

    #[test]
    fn test_expect_output() {
        assert!(expect_output("apply db", "database.postgresql.baiju.dev/db1 created", r"db1\s(created|unchanged)").is_ok());
        assert!(matches!(
            expect_output("apply db", "error: no matches for kind", r"db1\s(created|unchanged)"),
            Err(HarnessError::UnexpectedOutput { .. })
        ));
    }

    #[test]
    fn test_optional_args() {
        assert_eq!(ns_arg(Some("ns1")), " -n ns1");
        assert_eq!(ns_arg(None), "");
        assert_eq!(user_arg(Some("dev")), " --user=dev");
        assert_eq!(user_arg(None), "");
    }
}
