// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[kube(group = "operators.coreos.com", version = "v1alpha1", kind = "CatalogSource")]
#[kube(namespaced)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSourceSpec {
    pub source_type: String,
    pub image: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_strategy: Option<UpdateStrategy>,
}

#[derive(Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStrategy {
    pub registry_poll: RegistryPoll,
}

#[derive(Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
pub struct RegistryPoll {
    pub interval: String,
}

impl CatalogSource {
    /// A gRPC catalog served from `image`, refreshed every 30 minutes
    pub fn grpc(name: &str, namespace: &str, image: &str) -> Self {
        let mut source = CatalogSource::new(
            name,
            CatalogSourceSpec {
                source_type: "grpc".to_string(),
                image: image.to_string(),
                display_name: format!("{} OLM registry", name),
                update_strategy: Some(UpdateStrategy {
                    registry_poll: RegistryPoll {
                        interval: "30m".to_string(),
                    },
                }),
            },
        );
        source.metadata.namespace = Some(namespace.to_string());
        source
    }
}

/// How OLM approves install plans for a subscription
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, schemars::JsonSchema)]
pub enum InstallPlanApproval {
    Automatic,
    Manual,
}

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[kube(group = "operators.coreos.com", version = "v1alpha1", kind = "Subscription")]
#[kube(namespaced)]
#[kube(status = "SubscriptionStatus")]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSpec {
    pub channel: String,
    pub install_plan_approval: InstallPlanApproval,
    pub name: String,
    pub source: String,
    pub source_namespace: String,
    #[serde(rename = "startingCSV", skip_serializing_if = "Option::is_none")]
    pub starting_csv: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    #[serde(rename = "installplan", skip_serializing_if = "Option::is_none")]
    pub install_plan: Option<InstallPlanReference>,
    #[serde(rename = "currentCSV", skip_serializing_if = "Option::is_none")]
    pub current_csv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
pub struct InstallPlanReference {
    pub name: String,
}

impl Subscription {
    /// Name of the install plan OLM generated for this subscription, once there is one
    pub fn install_plan_name(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.install_plan.as_ref())
            .map(|plan| plan.name.as_str())
            .filter(|name| name.starts_with("install"))
    }
}

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[kube(group = "operators.coreos.com", version = "v1", kind = "OperatorGroup")]
#[kube(namespaced)]
#[serde(rename_all = "camelCase")]
pub struct OperatorGroupSpec {
    pub target_namespaces: Vec<String>,
}

/// A package as advertised by the OLM package server
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PackageManifest {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: Option<PackageManifestStatus>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifestStatus {
    #[serde(default)]
    pub catalog_source: String,
    #[serde(default)]
    pub channels: Vec<PackageChannel>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PackageChannel {
    pub name: String,
    #[serde(rename = "currentCSV")]
    pub current_csv: String,
}

impl PackageManifest {
    /// Current CSV of `channel` when this manifest is `package` served by `catalog`
    pub fn current_csv(&self, package: &str, catalog: &str, channel: &str) -> Option<&str> {
        if self.metadata.name.as_deref() != Some(package) {
            return None;
        }
        let status = self.status.as_ref().filter(|s| s.catalog_source == catalog)?;
        status
            .channels
            .iter()
            .find(|c| c.name == channel)
            .map(|c| c.current_csv.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::Resource;

    fn make_subscription(install_plan: Option<&str>) -> Subscription {
        let mut subscription = Subscription::new(
            "redis-operator",
            SubscriptionSpec {
                channel: "stable".to_string(),
                install_plan_approval: InstallPlanApproval::Manual,
                name: "redis-operator".to_string(),
                source: "community-operators".to_string(),
                source_namespace: "openshift-marketplace".to_string(),
                starting_csv: Some("redis-operator.v0.8.0".to_string()),
            },
        );
        subscription.status = Some(SubscriptionStatus {
            install_plan: install_plan.map(|name| InstallPlanReference {
                name: name.to_string(),
            }),
            ..Default::default()
        });
        subscription
    }

    fn make_manifest(name: &str, catalog: &str) -> PackageManifest {
        serde_json::from_value(serde_json::json!({
            "metadata": { "name": name },
            "status": {
                "catalogSource": catalog,
                "channels": [
                    { "name": "alpha", "currentCSV": format!("{}.v0.1.0", name) },
                    { "name": "stable", "currentCSV": format!("{}.v1.2.0", name) }
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_subscription_serializes_olm_field_names() {
        let value = serde_json::to_value(make_subscription(None)).unwrap();

        assert_eq!(value["apiVersion"], "operators.coreos.com/v1alpha1");
        assert_eq!(value["kind"], "Subscription");
        assert_eq!(value["spec"]["installPlanApproval"], "Manual");
        assert_eq!(value["spec"]["startingCSV"], "redis-operator.v0.8.0");
        assert_eq!(value["spec"]["sourceNamespace"], "openshift-marketplace");
    }

    #[test]
    fn test_install_plan_name_requires_install_prefix() {
        assert_eq!(
            make_subscription(Some("install-x7k2p")).install_plan_name(),
            Some("install-x7k2p")
        );
        assert_eq!(make_subscription(Some("null")).install_plan_name(), None);
        assert_eq!(make_subscription(None).install_plan_name(), None);
    }

    #[test]
    fn test_catalog_source_grpc_defaults() {
        let source = CatalogSource::grpc("sample-db-operators", "olm", "quay.io/db:v1");

        assert_eq!(source.meta().namespace.as_deref(), Some("olm"));
        assert_eq!(source.spec.display_name, "sample-db-operators OLM registry");
        let value = serde_json::to_value(&source).unwrap();
        assert_eq!(value["spec"]["sourceType"], "grpc");
        assert_eq!(value["spec"]["updateStrategy"]["registryPoll"]["interval"], "30m");
    }

    #[test]
    fn test_current_csv_matches_package_catalog_and_channel() {
        let manifest = make_manifest("etcd", "operatorhubio-catalog");

        assert_eq!(
            manifest.current_csv("etcd", "operatorhubio-catalog", "stable"),
            Some("etcd.v1.2.0")
        );
        assert_eq!(manifest.current_csv("etcd", "community-operators", "stable"), None);
        assert_eq!(manifest.current_csv("etcd", "operatorhubio-catalog", "beta"), None);
        assert_eq!(manifest.current_csv("redis", "operatorhubio-catalog", "stable"), None);
    }
}
