// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Commands that change cluster state

use super::{ns_arg, user_arg, Cluster};
use crate::command::Runner;
use crate::error::Result;
use crate::poll::Clock;
use tracing::{info, instrument};

impl<R: Runner, C: Clock> Cluster<R, C> {
    /// Apply YAML from stdin with client-side validation disabled
    #[instrument(skip(self, yaml))]
    pub fn apply(&self, yaml: &str, namespace: Option<&str>, user: Option<&str>) -> Result<String> {
        let command = self.command(format_args!(
            "apply{}{} --validate=false -f -",
            ns_arg(namespace),
            user_arg(user)
        ));
        let output = self.run_checked(&command, Some(yaml))?;
        info!(output = %output.trim(), "Applied resources");
        Ok(output)
    }

    /// Apply YAML that the cluster is expected to reject; returns the rejection
    pub fn apply_invalid(&self, yaml: &str, namespace: Option<&str>) -> Result<String> {
        let command = self.command(format_args!("apply{} -f -", ns_arg(namespace)));
        self.run(&command, Some(yaml)).expect_failure(&command)
    }

    /// Apply a local file or a remote URL
    pub fn apply_file(&self, source: &str, namespace: Option<&str>, validate: bool) -> Result<String> {
        let command = self.command(format_args!(
            "apply{} --validate={} -f {}",
            ns_arg(namespace),
            validate,
            source
        ));
        self.run_checked(&command, None)
    }

    #[instrument(skip(self, yaml))]
    pub fn delete(&self, yaml: &str, namespace: Option<&str>) -> Result<String> {
        let command = self.command(format_args!("delete{} -f -", ns_arg(namespace)));
        self.run_checked(&command, Some(yaml))
    }

    /// Add a label to a deployment
    pub fn label(&self, name: &str, label: &str, namespace: &str) -> Result<()> {
        let command = self.command(format_args!(
            "label deployments {} '{}' -n {}",
            name, label, namespace
        ));
        self.run_checked(&command, None).map(|_| ())
    }

    /// Merge-patch one object with a JSON document
    pub fn patch_merge(
        &self,
        kind: &str,
        name: &str,
        namespace: &str,
        patch: &serde_json::Value,
    ) -> Result<String> {
        let command = self.command(format_args!(
            "-n {} patch {} {} --type merge --patch '{}'",
            namespace, kind, name, patch
        ));
        self.run_checked(&command, None)
    }

    /// Block on `wait --for=condition=...` until the condition holds or the CLI gives up
    pub fn wait_for_condition(
        &self,
        kind: &str,
        name: &str,
        namespace: &str,
        condition: &str,
        value: &str,
        timeout_secs: u64,
    ) -> Result<()> {
        let command = self.command(format_args!(
            "wait --for=condition={}={} {}/{} --timeout={}s -n {}",
            condition, value, kind, name, timeout_secs, namespace
        ));
        self.run_checked(&command, None).map(|_| ())
    }

    /// Run arbitrary CLI arguments scoped to `namespace`
    pub fn cli_command(&self, args: &str, namespace: &str) -> Result<String> {
        let command = self.command(format_args!("{} -n {}", args, namespace));
        self.run_checked(&command, None)
    }
}
