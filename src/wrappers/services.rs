// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Backing services the bindings point at

use crate::cluster::{expect_output, Cluster};
use crate::command::Runner;
use crate::error::Result;
use crate::poll::Clock;
use regex::Regex;
use tracing::{info, instrument, warn};

const DB_POD_TIMEOUT_SECS: u64 = 120;

/// Database managed by the sample PostgreSQL operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresDb {
    pub name: String,
    pub namespace: String,
}

impl PostgresDb {
    pub fn new(name: &str, namespace: &str) -> Self {
        PostgresDb {
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }

    fn manifest(&self) -> serde_json::Value {
        serde_json::json!({
            "apiVersion": "postgresql.baiju.dev/v1alpha1",
            "kind": "Database",
            "metadata": { "name": self.name, "namespace": self.namespace },
            "spec": {
                "image": "docker.io/postgres",
                "imageName": "postgres",
                "dbName": self.name
            }
        })
    }

    pub fn create<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>) -> Result<()> {
        let output = cluster.apply(&serde_yaml::to_string(&self.manifest())?, None, None)?;
        let pattern = format!(
            r"database\.postgresql\.baiju\.dev/{}\s(created|unchanged)",
            regex::escape(&self.name)
        );
        expect_output(&format!("apply db {}", self.name), &output, &pattern)
    }

    /// Address the database listens on, once the operator reports one
    pub fn connection_ip<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>) -> Option<String> {
        cluster
            .jsonpath("db", &self.name, Some(&self.namespace), "{.status.dbConnectionIP}", None)
            .filter(|ip| is_ipv4(ip))
    }

    /// Pod up and connection address published
    #[instrument(skip(self, cluster), fields(db = %self.name))]
    pub fn is_running<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>, wait: bool) -> Result<bool> {
        let pattern = format!("{}.*", regex::escape(&self.name));
        let timeout = wait.then_some(DB_POD_TIMEOUT_SECS);
        let Some(pod) = cluster.find_pod(&pattern, &self.namespace, timeout)? else {
            return Ok(false);
        };

        let pod_running = cluster.wait_for_pod_phase(&pod, &self.namespace, "Running");
        info!(%pod, pod_running, "Database pod status");

        match self.connection_ip(cluster) {
            Some(ip) => {
                info!(%ip, "Database is listening");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn is_ipv4(value: &str) -> bool {
    Regex::new(r"\d+\.\d+\.\d+\.\d+")
        .map(|re| re.is_match(value))
        .unwrap_or(false)
}

/// Knative Serving installation managed by the serverless operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnativeServing {
    pub name: String,
    pub namespace: String,
}

impl Default for KnativeServing {
    fn default() -> Self {
        KnativeServing {
            name: "knative-serving".to_string(),
            namespace: "knative-serving".to_string(),
        }
    }
}

impl KnativeServing {
    pub fn is_present<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>) -> bool {
        let command = cluster.command(format_args!(
            "get knativeserving.operator.knative.dev {} -n {}",
            self.name, self.namespace
        ));
        let result = cluster.run(&command, None);
        if !result.success() {
            warn!(output = %result.output.trim(), "Knative Serving not available");
        }
        result.success()
    }

    pub fn create<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>) -> Result<()> {
        let manifest = serde_json::json!({
            "apiVersion": "operator.knative.dev/v1alpha1",
            "kind": "KnativeServing",
            "metadata": { "name": self.name, "namespace": self.namespace }
        });
        let output = cluster.apply(&serde_yaml::to_string(&manifest)?, None, None)?;
        let pattern = format!(
            r"knativeserving\.(serving|operator)\.knative\.dev/{}\screated",
            regex::escape(&self.name)
        );
        expect_output(&format!("apply knativeserving {}", self.name), &output, &pattern)
    }
}

/// Cluster-wide etcd cluster served by the etcd operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtcdCluster {
    pub name: String,
    pub namespace: String,
}

impl EtcdCluster {
    pub fn new(name: &str, namespace: &str) -> Self {
        EtcdCluster {
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }

    pub fn is_present<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>) -> bool {
        let command = cluster.command(format_args!("get etcdcluster -n {}", self.namespace));
        let result = cluster.run(&command, None);
        result.success() && result.output.contains(&self.name)
    }

    pub fn create<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>) -> Result<()> {
        let manifest = serde_json::json!({
            "apiVersion": "etcd.database.coreos.com/v1beta2",
            "kind": "EtcdCluster",
            "metadata": {
                "name": self.name,
                "namespace": self.namespace,
                "annotations": { "etcd.database.coreos.com/scope": "clusterwide" }
            },
            "spec": {
                "repository": "quay.io/coreos/etcd",
                "size": 3,
                "version": "3.2.13"
            }
        });
        let output = cluster.apply(&serde_yaml::to_string(&manifest)?, None, None)?;
        let pattern = format!(
            r"etcdcluster\.etcd\.database\.coreos\.com/{}\screated",
            regex::escape(&self.name)
        );
        expect_output(&format!("apply etcdcluster {}", self.name), &output, &pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Cli;
    use crate::error::HarnessError;
    use crate::test_utils::{list_json, FakeClock, MockRunner};

    #[test]
    fn test_postgres_create_checks_output() {
        let runner = MockRunner::new().on("oc apply", "database.postgresql.baiju.dev/db-demo created", 0);
        let cluster = Cluster::new(runner.clone(), Cli::Oc);

        PostgresDb::new("db-demo", "ns1").create(&cluster).unwrap();

        let yaml = runner.stdin_of("oc apply").unwrap();
        let manifest: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(manifest["spec"]["dbName"], "db-demo");
        assert_eq!(manifest["metadata"]["namespace"], "ns1");
    }

    #[test]
    fn test_postgres_running_needs_connection_ip() {
        let clock = FakeClock::new();
        let runner = MockRunner::new()
            .on("oc get pods -n ns1 -o json", &list_json("Pod", &["db-demo-5c8d9"]), 0)
            .on("oc get pod db-demo-5c8d9", "Running", 0)
            .on_sequence(
                "oc get db db-demo",
                vec![("", 0), ("172.30.78.5", 0)],
            );
        let cluster = Cluster::new(runner, Cli::Oc).with_clock(&clock);
        let db = PostgresDb::new("db-demo", "ns1");

        assert!(!db.is_running(&cluster, false).unwrap());
        assert!(db.is_running(&cluster, false).unwrap());
    }

    #[test]
    fn test_postgres_not_running_without_pod() {
        let cluster = Cluster::new(
            MockRunner::new().on("oc get pods -n ns1 -o json", &list_json("Pod", &[]), 0),
            Cli::Oc,
        );

        assert!(!PostgresDb::new("db-demo", "ns1").is_running(&cluster, false).unwrap());
    }

    #[test]
    fn test_knative_serving_presence_and_creation() {
        let runner = MockRunner::new()
            .on("kubectl get knativeserving.operator.knative.dev knative-serving -n knative-serving", "", 1)
            .on("kubectl apply", "knativeserving.operator.knative.dev/knative-serving created", 0);
        let cluster = Cluster::new(runner, Cli::Kubectl);
        let serving = KnativeServing::default();

        assert!(!serving.is_present(&cluster));
        serving.create(&cluster).unwrap();
    }

    #[test]
    fn test_etcd_cluster_create_rejects_unexpected_output() {
        let runner = MockRunner::new()
            .on("oc get etcdcluster -n ns1", "NAME        AGE\netcd-demo   2m", 0)
            .on("oc apply", "etcdcluster.etcd.database.coreos.com/etcd-demo unchanged", 0);
        let cluster = Cluster::new(runner.clone(), Cli::Oc);
        let etcd = EtcdCluster::new("etcd-demo", "ns1");

        assert!(etcd.is_present(&cluster));
        assert!(!EtcdCluster::new("etcd-other", "ns1").is_present(&cluster));
        assert!(matches!(
            etcd.create(&cluster),
            Err(HarnessError::UnexpectedOutput { .. })
        ));
        assert!(runner
            .stdin_of("oc apply")
            .unwrap()
            .contains("etcd.database.coreos.com/scope: clusterwide"));
    }
}
