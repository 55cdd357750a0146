// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! ServiceBinding resources created by scenarios

use crate::cluster::{Cluster, ResourceRef};
use crate::command::Runner;
use crate::constants::conditions::{COLLECTION_READY, INJECTION_READY, READY};
use crate::constants::poll::BINDING_TIMEOUT_SECS;
use crate::error::{HarnessError, Result};
use crate::poll::{Attempt, Clock};
use crate::types::binding::{ServiceBindingState, SPEC_API_GROUP};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, instrument};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    api_version: String,
    metadata: ManifestMetadata,
}

#[derive(Deserialize)]
struct ManifestMetadata {
    name: String,
}

/// A ServiceBinding manifest plus where it lives on the cluster
#[derive(Debug, Clone)]
pub struct ServiceBinding {
    yaml: String,
    api_group: String,
    resource: ResourceRef,
}

impl ServiceBinding {
    pub fn from_yaml(yaml: &str, namespace: Option<&str>) -> Result<Self> {
        let manifest: Manifest = serde_yaml::from_str(yaml)?;
        let api_group = manifest
            .api_version
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string();

        Ok(ServiceBinding {
            yaml: yaml.to_string(),
            resource: ResourceRef {
                kind: format!("servicebindings.{}", api_group),
                name: manifest.metadata.name,
                namespace: namespace.map(str::to_string),
            },
            api_group,
        })
    }

    /// A binding already on the cluster, known only by name and API group
    pub fn existing(name: &str, api_group: &str, namespace: Option<&str>) -> Self {
        ServiceBinding {
            yaml: String::new(),
            resource: ResourceRef {
                kind: format!("servicebindings.{}", api_group),
                name: name.to_string(),
                namespace: namespace.map(str::to_string),
            },
            api_group: api_group.to_string(),
        }
    }

    pub fn from_file(path: &Path, namespace: Option<&str>) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml, namespace)
    }

    pub fn name(&self) -> &str {
        &self.resource.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.resource.namespace.as_deref()
    }

    /// `servicebindings.<group>`
    pub fn crd_name(&self) -> &str {
        &self.resource.kind
    }

    pub fn api_group(&self) -> &str {
        &self.api_group
    }

    pub fn resource(&self) -> &ResourceRef {
        &self.resource
    }

    pub fn yaml(&self) -> &str {
        &self.yaml
    }

    fn is_spec_api(&self) -> bool {
        self.api_group == SPEC_API_GROUP
    }

    fn secret_path(&self) -> &'static str {
        if self.is_spec_api() {
            "{.status.binding.name}"
        } else {
            "{.status.secret}"
        }
    }

    #[instrument(skip(self, cluster), fields(binding = %self.resource))]
    pub fn create<R: Runner, C: Clock>(
        &self,
        cluster: &Cluster<R, C>,
        user: Option<&str>,
    ) -> Result<String> {
        cluster.apply(&self.yaml, self.namespace(), user)
    }

    /// Apply a manifest the admission webhook should refuse; returns the refusal
    pub fn attempt_to_create_invalid<R: Runner, C: Clock>(
        &self,
        cluster: &Cluster<R, C>,
    ) -> Result<String> {
        cluster.apply_invalid(&self.yaml, self.namespace())
    }

    pub fn delete<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>) -> Result<String> {
        let output = cluster.delete(&self.yaml, self.namespace())?;
        info!(binding = %self.resource, "Service Binding deleted");
        Ok(output)
    }

    pub fn jsonpath<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>, path: &str) -> Option<String> {
        cluster.jsonpath(self.crd_name(), self.name(), self.namespace(), path, None)
    }

    /// Live object, `None` when it does not exist
    pub fn state<R: Runner, C: Clock>(
        &self,
        cluster: &Cluster<R, C>,
    ) -> Result<Option<ServiceBindingState>> {
        cluster.object_json(self.crd_name(), self.name(), self.namespace())
    }

    pub fn resource_version<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>) -> Option<String> {
        self.jsonpath(cluster, "{.metadata.resourceVersion}")
    }

    /// Name of the secret the binding reports in its status
    pub fn secret_name<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>) -> Result<String> {
        let output = self.jsonpath(cluster, self.secret_path()).ok_or_else(|| {
            HarnessError::Assertion(format!(
                "failed to fetch secret name from Service Binding {}",
                self.resource
            ))
        })?;
        Ok(output.trim().trim_matches('"').to_string())
    }

    /// Wait until the binding reports a non-empty secret name
    pub fn wait_secret_name<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>) -> Result<String> {
        cluster
            .poller(format!("secret name of {}", self.resource))
            .timeout_secs(BINDING_TIMEOUT_SECS)
            .until(|| match self.secret_name(cluster) {
                Ok(name) if !name.is_empty() => Attempt::Ready(name),
                Ok(_) => Attempt::Retry("secret name is empty".to_string()),
                Err(e) => Attempt::Retry(e.to_string()),
            })
    }

    /// Wait until `field` of the `condition` status condition equals `expected`
    pub fn wait_for_condition<R: Runner, C: Clock>(
        &self,
        cluster: &Cluster<R, C>,
        condition: &str,
        field: &str,
        expected: &str,
    ) -> Result<()> {
        cluster
            .poller(format!("{}.{} of {} to be {}", condition, field, self.resource, expected))
            .timeout_secs(BINDING_TIMEOUT_SECS)
            .until(|| match self.state(cluster) {
                Ok(Some(state)) => match state.condition(condition).and_then(|c| c.field(field)) {
                    Some(value) if value == expected => Attempt::Ready(()),
                    Some(value) => Attempt::Retry(format!("{}.{} is {}", condition, field, value)),
                    None => Attempt::Retry(format!("{}.{} not reported", condition, field)),
                },
                Ok(None) => Attempt::Retry(format!("{} not found", self.resource)),
                Err(e) if e.is_retryable() => Attempt::Retry(e.to_string()),
                Err(e) => Attempt::Fatal(e),
            })
    }

    /// Wait for the status of `condition` to become `expected`
    pub fn condition_status<R: Runner, C: Clock>(
        &self,
        cluster: &Cluster<R, C>,
        condition: &str,
        expected: &str,
    ) -> Result<()> {
        self.wait_for_condition(cluster, condition, "status", expected)
    }

    /// Wait for all readiness conditions, then return the binding secret name.
    ///
    /// `servicebinding.io` bindings must also have observed their latest generation.
    #[instrument(skip(self, cluster), fields(binding = %self.resource))]
    pub fn wait_ready<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>) -> Result<String> {
        for condition in [COLLECTION_READY, INJECTION_READY, READY] {
            self.condition_status(cluster, condition, "True")?;
        }

        if self.is_spec_api() {
            let state = self.state(cluster)?.ok_or_else(|| {
                HarnessError::NotFound(self.resource.to_string())
            })?;
            if !state.is_observed() {
                return Err(HarnessError::Assertion(format!(
                    "Service Binding {} observed generation ({:?}) not equal to generation ({:?})",
                    self.name(),
                    state.observed_generation(),
                    state.generation()
                )));
            }
        }

        let secret = self.secret_name(cluster)?;
        info!(%secret, "Service Binding is ready");
        Ok(secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Cli;
    use crate::test_utils::{FakeClock, MockRunner};

    const SPEC_BINDING: &str = r#"
apiVersion: servicebinding.io/v1alpha3
kind: ServiceBinding
metadata:
  name: sb-spec
spec:
  service:
    apiVersion: v1
    kind: Secret
    name: db-secret
  workload:
    apiVersion: apps/v1
    kind: Deployment
    name: app1
"#;

    const COREOS_BINDING: &str = r#"
apiVersion: binding.operators.coreos.com/v1alpha1
kind: ServiceBinding
metadata:
  name: sb-coreos
spec:
  services: []
"#;

    fn make_state(conditions: &[(&str, &str)], generation: i64, observed: i64) -> String {
        let conditions: Vec<serde_json::Value> = conditions
            .iter()
            .map(|(t, s)| serde_json::json!({"type": t, "status": s}))
            .collect();
        serde_json::json!({
            "metadata": { "name": "sb-spec", "generation": generation },
            "status": {
                "conditions": conditions,
                "observedGeneration": observed,
                "binding": { "name": "sb-spec-secret" }
            }
        })
        .to_string()
    }

    #[test]
    fn test_from_yaml_reads_name_and_group() {
        let spec = ServiceBinding::from_yaml(SPEC_BINDING, Some("ns1")).unwrap();
        assert_eq!(spec.name(), "sb-spec");
        assert_eq!(spec.crd_name(), "servicebindings.servicebinding.io");
        assert_eq!(spec.secret_path(), "{.status.binding.name}");

        let coreos = ServiceBinding::from_yaml(COREOS_BINDING, None).unwrap();
        assert_eq!(coreos.crd_name(), "servicebindings.binding.operators.coreos.com");
        assert_eq!(coreos.secret_path(), "{.status.secret}");
        assert_eq!(coreos.namespace(), None);
    }

    #[test]
    fn test_existing_binding() {
        let binding = ServiceBinding::existing("sb-1", SPEC_API_GROUP, Some("ns1"));
        assert_eq!(binding.crd_name(), "servicebindings.servicebinding.io");
        assert_eq!(binding.namespace(), Some("ns1"));
        assert!(binding.is_spec_api());
    }

    #[test]
    fn test_from_yaml_rejects_manifest_without_name() {
        assert!(matches!(
            ServiceBinding::from_yaml("apiVersion: servicebinding.io/v1alpha3\nkind: ServiceBinding\n", None),
            Err(HarnessError::Yaml(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binding.yaml");
        std::fs::write(&path, COREOS_BINDING).unwrap();

        let binding = ServiceBinding::from_file(&path, Some("ns1")).unwrap();
        assert_eq!(binding.name(), "sb-coreos");
        assert_eq!(binding.yaml(), COREOS_BINDING);
    }

    #[test]
    fn test_create_as_user() {
        let runner = MockRunner::new().on("oc apply", "servicebinding.servicebinding.io/sb-spec created", 0);
        let cluster = Cluster::new(runner.clone(), Cli::Oc);
        let binding = ServiceBinding::from_yaml(SPEC_BINDING, Some("ns1")).unwrap();

        binding.create(&cluster, Some("developer")).unwrap();

        assert_eq!(
            runner.calls(),
            vec!["oc apply -n ns1 --user=developer --validate=false -f -"]
        );
    }

    #[test]
    fn test_wait_ready_polls_conditions_then_reads_secret() {
        let clock = FakeClock::new();
        let pending = make_state(&[("CollectionReady", "False")], 1, 1);
        let ready = make_state(
            &[("CollectionReady", "True"), ("InjectionReady", "True"), ("Ready", "True")],
            1,
            1,
        );
        let runner = MockRunner::new()
            .on_sequence(
                "oc get servicebindings.servicebinding.io sb-spec -n ns1 -o json",
                vec![(pending.as_str(), 0), (ready.as_str(), 0)],
            )
            .on(
                "oc get servicebindings.servicebinding.io sb-spec -o \"jsonpath={.status.binding.name}\" -n ns1",
                "sb-spec-secret",
                0,
            );
        let cluster = Cluster::new(runner, Cli::Oc).with_clock(&clock);
        let binding = ServiceBinding::from_yaml(SPEC_BINDING, Some("ns1")).unwrap();

        assert_eq!(binding.wait_ready(&cluster).unwrap(), "sb-spec-secret");
        assert_eq!(clock.elapsed().as_secs(), 5);
    }

    #[test]
    fn test_wait_ready_requires_observed_generation() {
        let clock = FakeClock::new();
        let stale = make_state(
            &[("CollectionReady", "True"), ("InjectionReady", "True"), ("Ready", "True")],
            2,
            1,
        );
        let runner = MockRunner::new().on("oc get servicebindings.servicebinding.io sb-spec -n ns1 -o json", &stale, 0);
        let cluster = Cluster::new(runner, Cli::Oc).with_clock(&clock);
        let binding = ServiceBinding::from_yaml(SPEC_BINDING, Some("ns1")).unwrap();

        let err = binding.wait_ready(&cluster).unwrap_err();
        assert!(err.to_string().contains("observed generation"));
    }

    #[test]
    fn test_condition_field_times_out_with_last_value() {
        let clock = FakeClock::new();
        let state = make_state(&[("Ready", "False")], 1, 1);
        let runner = MockRunner::new().on("oc get servicebindings", &state, 0);
        let cluster = Cluster::new(runner, Cli::Oc).with_clock(&clock);
        let binding = ServiceBinding::from_yaml(SPEC_BINDING, Some("ns1")).unwrap();

        match binding.condition_status(&cluster, "Ready", "True") {
            Err(HarnessError::Timeout { last, .. }) => {
                assert_eq!(last.as_deref(), Some("Ready.status is False"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(clock.elapsed().as_secs(), BINDING_TIMEOUT_SECS);
    }

    #[test]
    fn test_wait_secret_name_retries_until_set() {
        let clock = FakeClock::new();
        let runner = MockRunner::new().on_sequence(
            "oc get servicebindings.binding.operators.coreos.com sb-coreos -o \"jsonpath={.status.secret}\"",
            vec![("", 1), ("", 0), ("\"sb-coreos-x8k2\"", 0)],
        );
        let cluster = Cluster::new(runner, Cli::Oc).with_clock(&clock);
        let binding = ServiceBinding::from_yaml(COREOS_BINDING, None).unwrap();

        assert_eq!(binding.wait_secret_name(&cluster).unwrap(), "sb-coreos-x8k2");
        assert_eq!(clock.elapsed().as_secs(), 10);
    }
}
