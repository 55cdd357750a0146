// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::cluster::Cluster;
use crate::command::Runner;
use crate::constants::sbo;
use crate::error::{HarnessError, Result};
use crate::poll::Clock;
use tracing::{debug, instrument};

/// Namespace the Service Binding Operator deployment runs in, if any
pub fn find_namespace<R: Runner, C: Clock>(cluster: &Cluster<R, C>) -> Result<Option<String>> {
    cluster.lookup_namespace("deployments", sbo::NAME)
}

/// The CRD is served and the operator deployment exists somewhere.
///
/// A missing CRD is an assertion failure rather than `false`.
#[instrument(skip(cluster))]
pub fn is_running<R: Runner, C: Clock>(cluster: &Cluster<R, C>) -> Result<bool> {
    if !cluster.exists(sbo::CRD, None) {
        return Err(HarnessError::Assertion(format!(
            "CRD '{}' does not exist",
            sbo::CRD
        )));
    }
    let namespace = find_namespace(cluster)?;
    debug!(?namespace, "Located Service Binding Operator");
    Ok(namespace.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Cli;
    use crate::test_utils::{list_json, MockRunner};

    fn make_deployments(names_and_namespaces: &[(&str, &str)]) -> String {
        let items: Vec<serde_json::Value> = names_and_namespaces
            .iter()
            .map(|(name, ns)| serde_json::json!({"metadata": {"name": name, "namespace": ns}}))
            .collect();
        serde_json::json!({ "items": items }).to_string()
    }

    #[test]
    fn test_running_when_crd_and_deployment_exist() {
        let deployments = make_deployments(&[
            ("console", "openshift-console"),
            ("service-binding-operator", "openshift-operators"),
        ]);
        let runner = MockRunner::new()
            .on("oc get servicebinding", "No resources found", 0)
            .on("oc get deployments --all-namespaces -o json", &deployments, 0);
        let cluster = Cluster::new(runner, Cli::Oc);

        assert!(is_running(&cluster).unwrap());
        assert_eq!(
            find_namespace(&cluster).unwrap().as_deref(),
            Some("openshift-operators")
        );
    }

    #[test]
    fn test_not_running_without_deployment() {
        let runner = MockRunner::new()
            .on("kubectl get servicebinding", "", 0)
            .on(
                "kubectl get deployments --all-namespaces -o json",
                &list_json("Deployment", &["coredns"]),
                0,
            );
        let cluster = Cluster::new(runner, Cli::Kubectl);

        assert!(!is_running(&cluster).unwrap());
    }

    #[test]
    fn test_missing_crd_is_an_assertion() {
        let cluster = Cluster::new(MockRunner::new(), Cli::Oc);

        let err = is_running(&cluster).unwrap_err();
        assert!(err.to_string().contains("servicebinding"));
    }
}
