// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Pods, deployments and how to reach them

use super::{Cluster, ItemList};
use crate::command::Runner;
use crate::constants::poll::{STATUS_INTERVAL_SECS, STATUS_TIMEOUT_SECS};
use crate::error::{HarnessError, Result};
use crate::poll::Clock;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, EnvFromSource, EnvVar, Node, PodSpec, PodTemplateSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

impl<R: Runner, C: Clock> Cluster<R, C> {
    /// `.status.phase` of a pod
    pub fn pod_phase(&self, pod: &str, namespace: &str) -> Option<String> {
        self.jsonpath("pod", pod, Some(namespace), "{.status.phase}", None)
    }

    /// Wait for a pod to reach `phase`; false when it never does
    #[instrument(skip(self))]
    pub fn wait_for_pod_phase(&self, pod: &str, namespace: &str, phase: &str) -> bool {
        let result = self
            .poller(format!("pod {} to be {}", pod, phase))
            .interval_secs(STATUS_INTERVAL_SECS)
            .timeout_secs(STATUS_TIMEOUT_SECS)
            .until_ok(
                || Ok(self.pod_phase(pod, namespace).unwrap_or_default()),
                |current| current.contains(phase),
            );
        result.is_ok()
    }

    /// First pod fully matching `pattern`; with a timeout, keep looking until it passes
    pub fn find_pod(
        &self,
        pattern: &str,
        namespace: &str,
        timeout_secs: Option<u64>,
    ) -> Result<Option<String>> {
        let Some(timeout) = timeout_secs else {
            return self.search_resource("pods", pattern, namespace);
        };

        let found = self
            .poller(format!("pod matching {} in {}", pattern, namespace))
            .timeout_secs(timeout)
            .until_some(|| self.search_resource("pods", pattern, namespace));
        match found {
            Ok(pod) => Ok(Some(pod)),
            Err(HarnessError::Timeout { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn deployment(&self, name: &str, namespace: &str) -> Result<Deployment> {
        self.get_json("deployment", name, namespace)
    }

    /// Status of a deployment condition, `None` when not reported yet
    pub fn deployment_condition(
        &self,
        name: &str,
        namespace: &str,
        condition_type: &str,
    ) -> Result<Option<String>> {
        let deployment = self.deployment(name, namespace)?;
        Ok(deployment
            .status
            .and_then(|s| s.conditions)
            .unwrap_or_default()
            .into_iter()
            .find(|c| c.type_ == condition_type)
            .map(|c| c.status))
    }

    /// `env` of the first container
    pub fn deployment_env(&self, name: &str, namespace: &str) -> Result<Vec<EnvVar>> {
        Ok(first_container(self.deployment(name, namespace)?)
            .and_then(|c| c.env)
            .unwrap_or_default())
    }

    /// `envFrom` of the first container
    pub fn deployment_env_from(&self, name: &str, namespace: &str) -> Result<Vec<EnvFromSource>> {
        Ok(first_container(self.deployment(name, namespace)?)
            .and_then(|c| c.env_from)
            .unwrap_or_default())
    }

    /// Deploy `image` as a new application
    #[instrument(skip(self))]
    pub fn new_app(
        &self,
        name: &str,
        image: &str,
        namespace: &str,
        binding_root: Option<&str>,
        as_deployment_config: bool,
    ) -> Result<()> {
        if self.cli().is_openshift() {
            let mut args = format!("new-app --docker-image={} --name={} -n {}", image, name, namespace);
            if let Some(root) = binding_root {
                args.push_str(&format!(" -e SERVICE_BINDING_ROOT={}", root));
            }
            if as_deployment_config {
                args.push_str(" --as-deployment-config=true");
            }
            self.run_checked(&self.command(args), None)?;
        } else if let Some(root) = binding_root {
            let yaml = serde_yaml::to_string(&app_deployment(name, image, namespace, root))?;
            self.run_checked(&self.command("apply -f -"), Some(&yaml))?;
        } else {
            let command = self.command(format_args!(
                "create deployment {} -n {} --image={}",
                name, namespace, image
            ));
            self.run_checked(&command, None)?;
        }

        info!(name, namespace, "Application created");
        Ok(())
    }

    /// Make an application reachable from outside the cluster
    pub fn expose(&self, name: &str, namespace: &str, port: u16) -> Result<()> {
        let command = if self.cli().is_openshift() {
            self.command(format_args!("expose svc/{} -n {} --name={}", name, namespace, name))
        } else {
            self.command(format_args!(
                "expose deployment {} -n {} --port={} --type=NodePort",
                name, namespace, port
            ))
        };
        self.run_checked(&command, None).map(|_| ())
    }

    /// Externally reachable `host[:port]` of an exposed application
    pub fn route_host(&self, name: &str, namespace: &str) -> Result<String> {
        if self.cli().is_openshift() {
            let command = self.command(format_args!(
                "get route {} -n {} -o \"jsonpath={{.status.ingress[0].host}}\"",
                name, namespace
            ));
            return Ok(self.run_checked(&command, None)?.trim().to_string());
        }

        let address = self.node_address()?;
        let command = self.command(format_args!(
            "get service {} -n {} -o \"jsonpath={{.spec.ports[0].nodePort}}\"",
            name, namespace
        ));
        let port = self.run_checked(&command, None)?;
        Ok(format!("{}:{}", address, port.trim()))
    }

    /// URL of a Knative route
    pub fn knative_route_url(&self, name: &str, namespace: &str) -> Result<String> {
        let command = self.command(format_args!(
            "get rt {} -n {} -o \"jsonpath={{.status.url}}\"",
            name, namespace
        ));
        Ok(self.run_checked(&command, None)?.trim().to_string())
    }

    /// First internal or external IP of the first node
    pub fn node_address(&self) -> Result<String> {
        let command = self.command("get nodes -o json");
        let output = self.run_checked(&command, None)?;
        let nodes: ItemList<Node> = serde_json::from_str(&output)?;

        let address = nodes
            .items
            .into_iter()
            .next()
            .and_then(|node| node.status)
            .and_then(|status| status.addresses)
            .unwrap_or_default()
            .into_iter()
            .find(|a| a.type_ == "InternalIP" || a.type_ == "ExternalIP")
            .map(|a| a.address);

        debug!(?address, "Resolved node address");
        address.ok_or_else(|| HarnessError::NotFound("no IP address reported by any node".to_string()))
    }
}

fn first_container(deployment: Deployment) -> Option<Container> {
    deployment
        .spec?
        .template
        .spec?
        .containers
        .into_iter()
        .next()
}

/// Deployment for `image` with `SERVICE_BINDING_ROOT` preset
fn app_deployment(name: &str, image: &str, namespace: &str, binding_root: &str) -> Deployment {
    let labels = BTreeMap::from([("app".to_string(), name.to_string())]);

    Deployment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: name.to_string(),
                        image: Some(image.to_string()),
                        env: Some(vec![EnvVar {
                            name: "SERVICE_BINDING_ROOT".to_string(),
                            value: Some(binding_root.to_string()),
                            ..Default::default()
                        }]),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Cli;
    use crate::test_utils::{deployment_json, list_json, FakeClock, MockRunner};

    #[test]
    fn test_wait_for_pod_phase_polls_until_running() {
        let clock = FakeClock::new();
        let cluster = Cluster::new(
            MockRunner::new().on_sequence("oc get pod app-1", vec![("Pending", 0), ("Running", 0)]),
            Cli::Oc,
        )
        .with_clock(&clock);

        assert!(cluster.wait_for_pod_phase("app-1", "ns1", "Running"));
        assert_eq!(clock.elapsed().as_secs(), STATUS_INTERVAL_SECS);
    }

    #[test]
    fn test_wait_for_pod_phase_gives_up() {
        let clock = FakeClock::new();
        let cluster =
            Cluster::new(MockRunner::new().on("oc get pod app-1", "Pending", 0), Cli::Oc).with_clock(&clock);

        assert!(!cluster.wait_for_pod_phase("app-1", "ns1", "Running"));
        assert_eq!(clock.elapsed().as_secs(), STATUS_TIMEOUT_SECS);
    }

    #[test]
    fn test_find_pod_waits_for_matching_pod() {
        let clock = FakeClock::new();
        let empty = list_json("Pod", &["other-1"]);
        let ready = list_json("Pod", &["other-1", "db-7f9c"]);
        let cluster = Cluster::new(
            MockRunner::new().on_sequence(
                "oc get pods -n ns1 -o json",
                vec![(empty.as_str(), 0), (ready.as_str(), 0)],
            ),
            Cli::Oc,
        )
        .with_clock(&clock);

        assert_eq!(
            cluster.find_pod("db.*", "ns1", Some(120)).unwrap().as_deref(),
            Some("db-7f9c")
        );
        assert_eq!(clock.elapsed().as_secs(), 5);
    }

    #[test]
    fn test_find_pod_timeout_is_not_found() {
        let clock = FakeClock::new();
        let cluster = Cluster::new(
            MockRunner::new().on("oc get pods -n ns1 -o json", &list_json("Pod", &[]), 0),
            Cli::Oc,
        )
        .with_clock(&clock);

        assert_eq!(cluster.find_pod("db.*", "ns1", Some(20)).unwrap(), None);
        assert_eq!(cluster.find_pod("db.*", "ns1", None).unwrap(), None);
    }

    #[test]
    fn test_deployment_condition_and_env() {
        let cluster = Cluster::new(
            MockRunner::new().on(
                "oc get deployment app -n ns1 -o json",
                &deployment_json("app", &[("Available", "True")], &[("SERVICE_BINDING_ROOT", "/bindings")]),
                0,
            ),
            Cli::Oc,
        );

        assert_eq!(
            cluster.deployment_condition("app", "ns1", "Available").unwrap().as_deref(),
            Some("True")
        );
        assert_eq!(cluster.deployment_condition("app", "ns1", "Progressing").unwrap(), None);

        let env = cluster.deployment_env("app", "ns1").unwrap();
        assert_eq!(env.len(), 1);
        assert_eq!(env[0].value.as_deref(), Some("/bindings"));
        assert!(cluster.deployment_env_from("app", "ns1").unwrap().is_empty());
    }

    #[test]
    fn test_new_app_on_openshift() {
        let runner = MockRunner::new().on("oc new-app", "created", 0);
        let cluster = Cluster::new(runner.clone(), Cli::Oc);

        cluster
            .new_app("app", "quay.io/app:latest", "ns1", Some("/bindings"), true)
            .unwrap();

        assert_eq!(
            runner.calls(),
            vec!["oc new-app --docker-image=quay.io/app:latest --name=app -n ns1 -e SERVICE_BINDING_ROOT=/bindings --as-deployment-config=true"]
        );
    }

    #[test]
    fn test_new_app_on_kubernetes_with_binding_root_applies_deployment() {
        let runner = MockRunner::new().on("kubectl apply -f -", "created", 0);
        let cluster = Cluster::new(runner.clone(), Cli::Kubectl);

        cluster
            .new_app("app", "quay.io/app:latest", "ns1", Some("/bindings"), false)
            .unwrap();

        let yaml = runner.stdin_of("kubectl apply").unwrap();
        let deployment: Deployment = serde_yaml::from_str(&yaml).unwrap();
        let env = first_container(deployment).unwrap().env.unwrap();
        assert_eq!(env[0].name, "SERVICE_BINDING_ROOT");
        assert_eq!(env[0].value.as_deref(), Some("/bindings"));
    }

    #[test]
    fn test_route_host_on_kubernetes_uses_node_port() {
        let nodes = serde_json::json!({
            "items": [{
                "metadata": { "name": "node-1" },
                "status": { "addresses": [
                    { "type": "Hostname", "address": "node-1" },
                    { "type": "InternalIP", "address": "172.18.0.2" }
                ]}
            }]
        })
        .to_string();
        let cluster = Cluster::new(
            MockRunner::new()
                .on("kubectl get nodes -o json", &nodes, 0)
                .on("kubectl get service app", "31234", 0),
            Cli::Kubectl,
        );

        assert_eq!(cluster.route_host("app", "ns1").unwrap(), "172.18.0.2:31234");
    }

    #[test]
    fn test_node_address_missing() {
        let cluster = Cluster::new(
            MockRunner::new().on("kubectl get nodes -o json", r#"{"items": []}"#, 0),
            Cli::Kubectl,
        );

        assert!(matches!(cluster.node_address(), Err(HarnessError::NotFound(_))));
    }
}
