// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Operators the scenarios depend on

use super::operator::{InstallSource, OperatorSpec, Readiness};
use crate::config::Cli;

const RABBITMQ_MANIFEST: &str =
    "https://github.com/rabbitmq/cluster-operator/releases/download/v1.9.0/cluster-operator.yml";

const MONGODB_COMMUNITY_BASE: &str =
    "https://raw.githubusercontent.com/mongodb/mongodb-kubernetes-operator/master/config";

const MONGODB_COMMUNITY_MANIFESTS: [&str; 8] = [
    "crd/bases/mongodbcommunity.mongodb.com_mongodbcommunity.yaml",
    "rbac/role_binding_database.yaml",
    "rbac/role_binding.yaml",
    "rbac/role_database.yaml",
    "rbac/role.yaml",
    "rbac/service_account_database.yaml",
    "rbac/service_account.yaml",
    "manager/manager.yaml",
];

/// Catalog shipping community operators on this cluster flavor
fn community_catalog(cli: Cli) -> &'static str {
    match cli {
        Cli::Oc => "community-operators",
        Cli::Kubectl => "operatorhubio-catalog",
    }
}

pub fn etcd(cli: Cli) -> OperatorSpec {
    OperatorSpec::new(cli, "etcd", "etcd", "operatorhubio-catalog", "clusterwide-alpha")
}

pub fn redis(cli: Cli) -> OperatorSpec {
    OperatorSpec::new(cli, "redis-operator", "redis-operator", community_catalog(cli), "stable")
}

/// OpenShift Serverless, or upstream Knative on plain Kubernetes
pub fn serverless(cli: Cli) -> OperatorSpec {
    let (name, catalog, channel) = match cli {
        Cli::Oc => ("serverless-operator", "redhat-operators", "4.5"),
        Cli::Kubectl => ("knative-operator", "operatorhubio-catalog", "alpha"),
    };
    OperatorSpec::new(cli, name, name, catalog, channel).with_readiness(Readiness::CsvDeployments)
}

pub fn percona_mongodb(cli: Cli, namespace: &str) -> OperatorSpec {
    let name = "percona-server-mongodb-operator";
    OperatorSpec::new(cli, name, name, community_catalog(cli), "stable")
        .in_namespace(namespace)
        .with_source(InstallSource::OperatorGroup {
            target_namespace: namespace.to_string(),
        })
}

pub fn percona_mysql(cli: Cli, namespace: &str) -> OperatorSpec {
    let name = "percona-xtradb-cluster-operator";
    OperatorSpec::new(cli, name, name, community_catalog(cli), "stable")
        .in_namespace(namespace)
        .with_source(InstallSource::OperatorGroup {
            target_namespace: namespace.to_string(),
        })
}

pub fn crunchy_postgres(cli: Cli) -> OperatorSpec {
    OperatorSpec::new(cli, "pgo", "postgresql", community_catalog(cli), "v5")
}

pub fn cloud_native_postgres(cli: Cli) -> OperatorSpec {
    let catalog = match cli {
        Cli::Oc => "certified-operators",
        Cli::Kubectl => "operatorhubio-catalog",
    };
    OperatorSpec::new(cli, "cloud-native-postgresql", "cloud-native-postgresql", catalog, "stable")
}

pub fn rabbitmq(cli: Cli) -> OperatorSpec {
    let name = "rabbitmq-cluster-operator";
    OperatorSpec::new(cli, name, name, "", "")
        .in_namespace("rabbitmq-system")
        .with_source(InstallSource::Manifests(vec![RABBITMQ_MANIFEST.to_string()]))
}

pub fn community_mongodb(cli: Cli) -> OperatorSpec {
    let name = "mongodb-kubernetes-operator";
    let manifests = MONGODB_COMMUNITY_MANIFESTS
        .iter()
        .map(|path| format!("{}/{}", MONGODB_COMMUNITY_BASE, path))
        .collect();
    OperatorSpec::new(cli, name, name, "", "").with_source(InstallSource::Manifests(manifests))
}

/// Sample PostgreSQL operator served from its own catalog image
pub fn db_operator(cli: Cli) -> OperatorSpec {
    OperatorSpec::new(cli, "postgresql-operator", "db-operators", "sample-db-operators", "beta")
        .with_catalog_image("quay.io/redhat-developer/sample-db-operators-olm:v1")
}

/// Names accepted by [`by_name`]
pub const NAMES: [&str; 10] = [
    "etcd",
    "redis",
    "serverless",
    "percona-mongodb",
    "percona-mysql",
    "crunchy-postgres",
    "cloud-native-postgres",
    "rabbitmq",
    "community-mongodb",
    "db-operator",
];

/// Look up a known operator; `namespace` is used by namespace-scoped installs
pub fn by_name(name: &str, cli: Cli, namespace: &str) -> Option<OperatorSpec> {
    let spec = match name {
        "etcd" => etcd(cli),
        "redis" => redis(cli),
        "serverless" => serverless(cli),
        "percona-mongodb" => percona_mongodb(cli, namespace),
        "percona-mysql" => percona_mysql(cli, namespace),
        "crunchy-postgres" => crunchy_postgres(cli),
        "cloud-native-postgres" => cloud_native_postgres(cli),
        "rabbitmq" => rabbitmq(cli),
        "community-mongodb" => community_mongodb(cli),
        "db-operator" => db_operator(cli),
        _ => return None,
    };
    Some(spec)
}
