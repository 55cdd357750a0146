// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Generic OLM installation flow driven by an [`OperatorSpec`]

use super::operator::{InstallSource, OperatorSpec, Readiness};
use crate::cluster::{expect_output, Cluster};
use crate::command::Runner;
use crate::constants::poll::{
    INSTALL_PLAN_TIMEOUT_SECS, PACKAGE_MANIFEST_TIMEOUT_SECS, POD_TIMEOUT_SECS,
};
use crate::error::{HarnessError, Result};
use crate::poll::Clock;
use crate::types::olm::{OperatorGroupSpec, SubscriptionSpec};
use crate::types::{CatalogSource, InstallPlanApproval, OperatorGroup, Subscription};
use tracing::{debug, info, instrument, warn};

/// Installs and checks one operator on a cluster
pub struct Installer<'a, R: Runner, C: Clock> {
    cluster: &'a Cluster<R, C>,
    spec: OperatorSpec,
}

impl<'a, R: Runner, C: Clock> Installer<'a, R, C> {
    pub fn new(cluster: &'a Cluster<R, C>, spec: OperatorSpec) -> Self {
        Installer { cluster, spec }
    }

    pub fn spec(&self) -> &OperatorSpec {
        &self.spec
    }

    /// Whether the operator is up; with `wait`, give it time to come up first
    #[instrument(skip(self), fields(operator = %self.spec.name))]
    pub fn is_running(&self, wait: bool) -> Result<bool> {
        match self.spec.readiness {
            Readiness::OperatorPod => self.pod_is_running(&self.spec.pod_pattern(), wait),
            Readiness::CsvDeployments => self.csv_deployments_running(wait),
        }
    }

    fn pod_is_running(&self, pattern: &str, wait: bool) -> Result<bool> {
        let timeout = wait.then_some(POD_TIMEOUT_SECS);
        let Some(pod) = self.cluster.find_pod(pattern, &self.spec.namespace, timeout)? else {
            return Ok(false);
        };
        let running = self
            .cluster
            .wait_for_pod_phase(&pod, &self.spec.namespace, "Running");
        info!(pod = %pod, running, "Operator pod status");
        Ok(running)
    }

    fn csv_deployments_running(&self, wait: bool) -> Result<bool> {
        let namespace = &self.spec.namespace;
        let Some(csv) = self.cluster.current_csv(
            &self.spec.package,
            &self.spec.catalog_source,
            &self.spec.channel,
        )?
        else {
            return Ok(false);
        };
        let csv_pattern = regex::escape(&csv);

        let installed = if wait {
            self.cluster
                .poller(format!("CSV {} in {}", csv, namespace))
                .interval_secs(1)
                .timeout_secs(100)
                .until_some(|| self.cluster.search_resource("csvs", &csv_pattern, namespace))
                .is_ok()
        } else {
            self.cluster
                .search_resource("csvs", &csv_pattern, namespace)?
                .is_some()
        };
        if !installed {
            return Ok(false);
        }

        let deployments = self
            .cluster
            .jsonpath(
                "csv",
                &csv,
                Some(namespace),
                "{.spec.install.spec.deployments[*].name}",
                None,
            )
            .unwrap_or_default();
        let expected: Vec<&str> = deployments.split_whitespace().collect();

        let mut running = 0;
        for deployment in &expected {
            if self.pod_is_running(&self.spec.pod_pattern_for(deployment), wait)? {
                running += 1;
            }
        }

        if running < expected.len() {
            warn!(?expected, running, "Not all CSV deployments have running pods");
        }
        Ok(!expected.is_empty() && running == expected.len())
    }

    /// Apply the catalog source when the operator ships its own, then wait for
    /// the package to show up
    #[instrument(skip(self), fields(operator = %self.spec.name))]
    pub fn install_catalog_source(&self) -> Result<()> {
        if let Some(image) = &self.spec.catalog_image {
            let source = CatalogSource::grpc(
                &self.spec.catalog_source,
                &self.spec.catalog_namespace,
                image,
            );
            let output = self.cluster.apply(&serde_yaml::to_string(&source)?, None, None)?;
            expect_applied("catalogsource", &self.spec.catalog_source, &output)?;
        }

        self.cluster
            .poller(format!("package manifest {}", self.spec.package))
            .timeout_secs(PACKAGE_MANIFEST_TIMEOUT_SECS)
            .until_some(|| {
                self.cluster.current_csv(
                    &self.spec.package,
                    &self.spec.catalog_source,
                    &self.spec.channel,
                )
            })?;
        Ok(())
    }

    /// CSV to start the subscription from: explicit, pinned, or the channel head
    pub fn resolve_csv_version(&self, csv_version: Option<&str>) -> Result<Option<String>> {
        if let Some(csv) = csv_version.or(self.spec.csv_version.as_deref()) {
            return Ok(Some(csv.to_string()));
        }
        self.cluster
            .current_csv(&self.spec.package, &self.spec.catalog_source, &self.spec.channel)
    }

    fn subscription(&self, starting_csv: Option<String>, approval: InstallPlanApproval) -> Subscription {
        let mut subscription = Subscription::new(
            &self.spec.package,
            SubscriptionSpec {
                channel: self.spec.channel.clone(),
                install_plan_approval: approval,
                name: self.spec.package.clone(),
                source: self.spec.catalog_source.clone(),
                source_namespace: self.spec.catalog_namespace.clone(),
                starting_csv,
            },
        );
        subscription.metadata.namespace = Some(self.spec.namespace.clone());
        subscription
    }

    /// Subscribe to the operator and get it installed
    #[instrument(skip(self), fields(operator = %self.spec.name))]
    pub fn install_subscription(&self, csv_version: Option<&str>) -> Result<()> {
        match &self.spec.source {
            InstallSource::Subscription => {
                let csv = self.resolve_csv_version(csv_version)?;
                let subscription = self.subscription(csv, self.spec.install_mode);
                let output = self
                    .cluster
                    .apply(&serde_yaml::to_string(&subscription)?, None, None)?;
                expect_applied("subscription", &self.spec.package, &output)?;
                self.approve_install_plan()
            }
            InstallSource::OperatorGroup { target_namespace } => {
                let mut group = OperatorGroup::new(
                    "operatorgroup",
                    OperatorGroupSpec {
                        target_namespaces: vec![target_namespace.clone()],
                    },
                );
                group.metadata.namespace = Some(self.spec.namespace.clone());
                let subscription = self.subscription(None, InstallPlanApproval::Automatic);

                let yaml = format!(
                    "---\n{}---\n{}",
                    serde_yaml::to_string(&group)?,
                    serde_yaml::to_string(&subscription)?
                );
                self.cluster.apply(&yaml, None, None)?;
                Ok(())
            }
            InstallSource::Manifests(sources) => {
                for source in sources {
                    self.cluster
                        .apply_file(source, Some(&self.spec.namespace), false)?;
                }
                Ok(())
            }
        }
    }

    /// Wait for OLM to create an install plan for the subscription
    pub fn install_plan_for_subscription(&self) -> Result<String> {
        self.cluster
            .poller(format!("install plan of subscription {}", self.spec.package))
            .timeout_secs(INSTALL_PLAN_TIMEOUT_SECS)
            .until_some(|| {
                let subscription: Option<Subscription> = self.cluster.try_get_json(
                    "subscription",
                    &self.spec.package,
                    &self.spec.namespace,
                )?;
                Ok(subscription.and_then(|s| s.install_plan_name().map(str::to_string)))
            })
    }

    pub fn approve_install_plan(&self) -> Result<()> {
        let plan = self.install_plan_for_subscription()?;
        debug!(plan = %plan, "Approving install plan");
        self.cluster.patch_merge(
            "installplan",
            &plan,
            &self.spec.namespace,
            &serde_json::json!({"spec": {"approved": true}}),
        )?;
        Ok(())
    }

    /// Leave the operator running, installing it first when needed
    #[instrument(skip(self), fields(operator = %self.spec.name))]
    pub fn ensure(&self) -> Result<()> {
        if self.is_running(false)? {
            info!("Operator already running");
            return Ok(());
        }

        info!("Operator not running, installing");
        if self.spec.catalog_image.is_some() {
            self.install_catalog_source()?;
        }
        self.install_subscription(None)?;

        if !self.is_running(true)? {
            return Err(HarnessError::Assertion(format!(
                "operator {} is not running after installation",
                self.spec.name
            )));
        }
        info!("Operator is running");
        Ok(())
    }
}

/// `apply` prints `<kind>.operators.coreos.com/<name> created|unchanged`
fn expect_applied(kind: &str, name: &str, output: &str) -> Result<()> {
    let pattern = format!(
        r"{}\.operators\.coreos\.com/{}\s(unchanged|created|configured)",
        kind,
        regex::escape(name)
    );
    expect_output(&format!("apply {} {}", kind, name), output, &pattern)
}
