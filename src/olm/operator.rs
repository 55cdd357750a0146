// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::config::Cli;
use crate::types::InstallPlanApproval;

/// How to tell that an installed operator is up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// A pod matching the name pattern is Running
    OperatorPod,
    /// Every deployment listed by the current CSV has a pod
    CsvDeployments,
}

/// What gets applied to install the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallSource {
    /// An OLM subscription, with its install plan approved afterwards
    Subscription,
    /// An OperatorGroup watching `target_namespace` plus an automatic subscription
    OperatorGroup { target_namespace: String },
    /// Plain manifests applied from paths or URLs
    Manifests(Vec<String>),
}

/// Everything needed to install and recognize one operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorSpec {
    pub name: String,
    pub package: String,
    pub catalog_source: String,
    pub catalog_image: Option<String>,
    pub channel: String,
    /// Namespace the operator runs in and is subscribed from
    pub namespace: String,
    pub catalog_namespace: String,
    /// Pinned starting CSV; the channel's current CSV when unset
    pub csv_version: Option<String>,
    /// Regex for the operator pod, `{name}` replaced by the operator name
    pub pod_name_pattern: String,
    pub install_mode: InstallPlanApproval,
    pub readiness: Readiness,
    pub source: InstallSource,
}

impl OperatorSpec {
    /// Subscription-installed operator in the CLI's default namespaces
    pub fn new(cli: Cli, name: &str, package: &str, catalog_source: &str, channel: &str) -> Self {
        OperatorSpec {
            name: name.to_string(),
            package: package.to_string(),
            catalog_source: catalog_source.to_string(),
            catalog_image: None,
            channel: channel.to_string(),
            namespace: cli.operators_namespace().to_string(),
            catalog_namespace: cli.olm_namespace().to_string(),
            csv_version: None,
            pod_name_pattern: "{name}.*".to_string(),
            install_mode: InstallPlanApproval::Automatic,
            readiness: Readiness::OperatorPod,
            source: InstallSource::Subscription,
        }
    }

    pub fn with_catalog_image(mut self, image: &str) -> Self {
        self.catalog_image = Some(image.to_string());
        self
    }

    pub fn in_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    pub fn with_csv_version(mut self, csv: &str) -> Self {
        self.csv_version = Some(csv.to_string());
        self
    }

    pub fn with_install_mode(mut self, mode: InstallPlanApproval) -> Self {
        self.install_mode = mode;
        self
    }

    pub fn with_readiness(mut self, readiness: Readiness) -> Self {
        self.readiness = readiness;
        self
    }

    pub fn with_source(mut self, source: InstallSource) -> Self {
        self.source = source;
        self
    }

    /// Pod name regex for a deployment or operator called `name`
    pub fn pod_pattern_for(&self, name: &str) -> String {
        self.pod_name_pattern.replace("{name}", name)
    }

    pub fn pod_pattern(&self) -> String {
        self.pod_pattern_for(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_cli_flavor() {
        let spec = OperatorSpec::new(Cli::Kubectl, "etcd", "etcd", "operatorhubio-catalog", "clusterwide-alpha");

        assert_eq!(spec.namespace, "operators");
        assert_eq!(spec.catalog_namespace, "olm");
        assert_eq!(spec.install_mode, InstallPlanApproval::Automatic);
        assert_eq!(spec.source, InstallSource::Subscription);
    }

    #[test]
    fn test_pod_pattern_substitutes_name() {
        let spec = OperatorSpec::new(Cli::Oc, "redis-operator", "redis-operator", "community-operators", "stable");

        assert_eq!(spec.pod_pattern(), "redis-operator.*");
        assert_eq!(spec.pod_pattern_for("controller"), "controller.*");
    }
}
