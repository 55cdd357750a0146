// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Cluster command line client driving the tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cli {
    Oc,
    Kubectl,
}

impl Cli {
    pub fn binary(&self) -> &'static str {
        match self {
            Cli::Oc => "oc",
            Cli::Kubectl => "kubectl",
        }
    }

    pub fn is_openshift(&self) -> bool {
        matches!(self, Cli::Oc)
    }

    /// Namespace holding the OLM catalog sources
    pub fn olm_namespace(&self) -> &'static str {
        match self {
            Cli::Oc => "openshift-marketplace",
            Cli::Kubectl => "olm",
        }
    }

    /// Namespace where cluster-wide operators are subscribed
    pub fn operators_namespace(&self) -> &'static str {
        match self {
            Cli::Oc => "openshift-operators",
            Cli::Kubectl => "operators",
        }
    }
}

impl FromStr for Cli {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "oc" => Ok(Cli::Oc),
            "kubectl" => Ok(Cli::Kubectl),
            other => bail!("unsupported cluster CLI '{}', expected 'oc' or 'kubectl'", other),
        }
    }
}

impl fmt::Display for Cli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

/// How the Service Binding Operator under test was started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    Local,
    Remote,
    OperatorHub,
    Scenarios,
}

impl FromStr for StartMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "local" => Ok(StartMode::Local),
            "remote" => Ok(StartMode::Remote),
            "operator-hub" => Ok(StartMode::OperatorHub),
            "scenarios" => Ok(StartMode::Scenarios),
            other => bail!(
                "unsupported start mode '{}', expected one of local, remote, operator-hub, scenarios",
                other
            ),
        }
    }
}

/// Harness configuration, built once and passed to everything that runs commands
#[derive(Debug, Clone)]
pub struct Config {
    pub cli: Cli,
    /// Credentials file handed to every command
    pub kubeconfig: String,
    /// Binary search path handed to every command
    pub path: String,
    /// Working directory for commands
    pub workdir: PathBuf,
    /// Default test namespace, when set
    pub test_namespace: Option<String>,
    pub start_mode: StartMode,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let kubeconfig = env::var("KUBECONFIG")
            .context("KUBECONFIG needs to be set in the environment")?;
        let path = env::var("PATH").context("PATH needs to be set in the environment")?;
        let cli = env::var("TEST_ACCEPTANCE_CLI")
            .unwrap_or_else(|_| "oc".to_string())
            .parse()?;
        let start_mode = env::var("TEST_ACCEPTANCE_START_SBO")
            .unwrap_or_else(|_| "local".to_string())
            .parse()?;
        let test_namespace = env::var("TEST_NAMESPACE").ok().filter(|ns| !ns.is_empty());
        let workdir = env::current_dir().context("unable to determine working directory")?;

        Ok(Config {
            cli,
            kubeconfig,
            path,
            workdir,
            test_namespace,
            start_mode,
        })
    }

    /// Environment handed to spawned commands; nothing else is inherited
    pub fn command_env(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("KUBECONFIG".to_string(), self.kubeconfig.clone()),
            ("PATH".to_string(), self.path.clone()),
        ])
    }

    pub fn olm_namespace(&self) -> &'static str {
        self.cli.olm_namespace()
    }

    pub fn operators_namespace(&self) -> &'static str {
        self.cli.operators_namespace()
    }
}

/// Alert thresholds used when uploading performance results
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub memory_average: f64,
    pub memory_maximum: f64,
    pub cpu_average: f64,
    pub cpu_maximum: f64,
}

impl Thresholds {
    pub fn from_env() -> Result<Self> {
        Ok(Thresholds {
            memory_average: threshold("TEST_PERFORMANCE_AVG_MEMORY")?,
            memory_maximum: threshold("TEST_PERFORMANCE_MAX_MEMORY")?,
            cpu_average: threshold("TEST_PERFORMANCE_AVG_CPU")?,
            cpu_maximum: threshold("TEST_PERFORMANCE_MAX_CPU")?,
        })
    }
}

fn threshold(name: &str) -> Result<f64> {
    let value = env::var(name).with_context(|| format!("{} environment variable not set", name))?;
    value
        .trim()
        .parse()
        .with_context(|| format!("{} is not a number: {}", name, value))
}
