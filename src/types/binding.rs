// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

/// API group of the servicebinding.io ServiceBinding resource
pub const SPEC_API_GROUP: &str = "servicebinding.io";
pub const COREOS_API_GROUP: &str = "binding.operators.coreos.com";

/// Live state of a ServiceBinding as returned by `get -o json`.
///
/// Only the fields the readiness checks look at are modelled; both the
/// `binding.operators.coreos.com` and `servicebinding.io` flavors parse.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ServiceBindingState {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: Option<ServiceBindingStatus>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBindingStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding: Option<BindingSecretReference>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BindingSecretReference {
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Condition {
    /// `status`, `reason` or `message` by name
    pub fn field(&self, field: &str) -> Option<&str> {
        match field {
            "status" => Some(self.status.as_str()),
            "reason" => self.reason.as_deref(),
            "message" => self.message.as_deref(),
            "type" => Some(self.condition_type.as_str()),
            _ => None,
        }
    }
}

impl ServiceBindingState {
    pub fn condition(&self, condition_type: &str) -> Option<&Condition> {
        self.status
            .as_ref()?
            .conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }

    /// Status of the given condition type, when reported
    pub fn condition_status(&self, condition_type: &str) -> Option<&str> {
        self.condition(condition_type).map(|c| c.status.as_str())
    }

    pub fn generation(&self) -> Option<i64> {
        self.metadata.generation
    }

    pub fn observed_generation(&self) -> Option<i64> {
        self.status.as_ref().and_then(|s| s.observed_generation)
    }

    /// True once the controller has seen the latest spec
    pub fn is_observed(&self) -> bool {
        matches!(
            (self.generation(), self.observed_generation()),
            (Some(generation), Some(observed)) if generation == observed
        )
    }

    /// Name of the secret holding the binding data, under either API flavor
    pub fn secret_name(&self) -> Option<&str> {
        let status = self.status.as_ref()?;
        status
            .binding
            .as_ref()
            .map(|b| b.name.as_str())
            .or(status.secret.as_deref())
            .filter(|name| !name.is_empty())
    }
}
