// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use super::context::{scenario_id, ScenarioContext};
use crate::cluster::Cluster;
use crate::command::Runner;
use crate::error::{HarnessError, Result};
use crate::poll::Clock;
use crate::wrappers::sbo;
use regex::Regex;
use std::path::Path;
use tracing::{info, instrument};

/// Oldest `oc` client the scenarios work with
const MIN_OC_VERSION: (u32, u32) = (4, 5);

/// Once per run: check the client, switch to the test namespace and
/// remember where the operator under test is deployed.
#[instrument(skip(cluster, context))]
pub fn before_all<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    test_namespace: Option<&str>,
) -> Result<()> {
    if cluster.cli().is_openshift() {
        let output = cluster.run_checked(&cluster.command("version"), None)?;
        let version = client_version(&output)?;
        if version < MIN_OC_VERSION {
            return Err(HarnessError::Assertion(format!(
                "oc version is required {}.{}+, but is {}.{}",
                MIN_OC_VERSION.0, MIN_OC_VERSION.1, version.0, version.1
            )));
        }

        let namespace = test_namespace.ok_or_else(|| {
            HarnessError::Config("TEST_NAMESPACE environment variable needs to be set".to_string())
        })?;
        cluster.run_checked(&cluster.command(format_args!("project {}", namespace)), None)?;
    }

    let sbo_namespace = sbo::find_namespace(cluster)?.ok_or_else(|| {
        HarnessError::Assertion("Unable to find SBO's deployment in any namespace.".to_string())
    })?;
    info!(%sbo_namespace, "Located Service Binding Operator");
    context.sbo_namespace = Some(sbo_namespace);
    Ok(())
}

/// Before each scenario: fresh per-scenario state and a reachable cluster
pub fn before_scenario<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    feature_file: &Path,
    line: u32,
) -> Result<()> {
    context.reset();
    context.scenario_id = scenario_id(feature_file, line);

    let command = cluster.command("get ns default -o jsonpath=\"{.metadata.name}\"");
    cluster.run_checked(&command, None)?;
    Ok(())
}

/// `(major, minor)` from the `Client Version:` line of `oc version`
fn client_version(output: &str) -> Result<(u32, u32)> {
    let line = output
        .lines()
        .find(|line| line.trim_start().starts_with("Client Version"))
        .ok_or_else(|| HarnessError::UnexpectedOutput {
            command: "oc version".to_string(),
            output: output.to_string(),
        })?;

    let pattern = Regex::new(r"(\d+)\.(\d+)").map_err(|e| HarnessError::Config(e.to_string()))?;
    pattern
        .captures(line)
        .and_then(|c| Some((c[1].parse().ok()?, c[2].parse().ok()?)))
        .ok_or_else(|| HarnessError::UnexpectedOutput {
            command: "oc version".to_string(),
            output: line.to_string(),
        })
}
