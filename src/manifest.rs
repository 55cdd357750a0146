// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Release manifest assembly.
//!
//! Turns the operator bundle manifests into a plain multi-document YAML that
//! installs the operator without OLM.

use crate::constants::sbo::{NAME, NAMESPACE};
use crate::error::{HarnessError, Result};
use serde::Deserialize;
use serde_json::json;
use serde_yaml::{Mapping, Value};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

pub const DEFAULT_OUTPUT: &str = "out/release.yaml";

fn to_yaml(value: serde_json::Value) -> Result<Value> {
    Ok(serde_yaml::to_value(value)?)
}

fn namespace() -> Result<Value> {
    to_yaml(json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {"name": NAMESPACE},
    }))
}

fn cluster_role_binding() -> Result<Value> {
    to_yaml(json!({
        "apiVersion": "rbac.authorization.k8s.io/v1",
        "kind": "ClusterRoleBinding",
        "metadata": {"name": NAME},
        "roleRef": {
            "apiGroup": "rbac.authorization.k8s.io",
            "kind": "ClusterRole",
            "name": NAME,
        },
        "subjects": [{"kind": "ServiceAccount", "name": NAME, "namespace": NAMESPACE}],
    }))
}

fn service_account() -> Result<Value> {
    to_yaml(json!({
        "apiVersion": "v1",
        "kind": "ServiceAccount",
        "metadata": {"name": NAME, "namespace": NAMESPACE},
    }))
}

/// Top-level keys of `source` override those of `target`
fn merge(target: &mut Value, source: Mapping) -> Result<()> {
    let target = target
        .as_mapping_mut()
        .ok_or_else(|| HarnessError::Config("manifest template is not a map".to_string()))?;
    for (key, value) in source {
        target.insert(key, value);
    }
    Ok(())
}

/// First entry of `spec.install.spec.<field>` in a CSV, without `key`
fn install_entry(csv: &Value, field: &str, key: &str, file: &Path) -> Result<Mapping> {
    let mut entry = csv
        .get("spec")
        .and_then(|s| s.get("install"))
        .and_then(|i| i.get("spec"))
        .and_then(|s| s.get(field))
        .and_then(|f| f.get(0))
        .and_then(Value::as_mapping)
        .cloned()
        .ok_or_else(|| {
            HarnessError::Config(format!("{}: no install.spec.{} entry", file.display(), field))
        })?;
    entry.remove(key);
    Ok(entry)
}

fn cluster_role(csv: &Value, file: &Path) -> Result<Value> {
    let mut role = to_yaml(json!({
        "apiVersion": "rbac.authorization.k8s.io/v1",
        "kind": "ClusterRole",
        "metadata": {"name": NAME},
    }))?;
    merge(&mut role, install_entry(csv, "clusterPermissions", "serviceAccountName", file)?)?;
    Ok(role)
}

fn deployment(csv: &Value, file: &Path) -> Result<Value> {
    let mut deployment = to_yaml(json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {
            "name": NAME,
            "annotations": {"olm.targetNamespaces": ""},
            "namespace": NAMESPACE,
        },
    }))?;
    merge(&mut deployment, install_entry(csv, "deployments", "name", file)?)?;
    Ok(deployment)
}

fn documents(content: &str) -> Result<Vec<Value>> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = Value::deserialize(document)?;
        if !value.is_null() {
            documents.push(value);
        }
    }
    Ok(documents)
}

fn force_namespace(mut document: Value) -> Result<Value> {
    let metadata = document
        .get_mut("metadata")
        .and_then(Value::as_mapping_mut)
        .ok_or_else(|| HarnessError::Config("resource has no metadata".to_string()))?;
    metadata.insert(Value::from("namespace"), Value::from(NAMESPACE));
    Ok(document)
}

/// Documents contributed by one bundle file
fn convert(file: &Path) -> Result<Vec<Value>> {
    let content = fs::read_to_string(file)?;
    let mut documents = documents(&content)?;
    let kind = documents
        .first()
        .and_then(|d| d.get("kind"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    debug!(file = %file.display(), %kind, "Converting bundle manifest");

    match kind.as_str() {
        "ClusterServiceVersion" => {
            let csv = &documents[0];
            Ok(vec![cluster_role(csv, file)?, deployment(csv, file)?])
        }
        "ConfigMap" | "Service" => Ok(vec![force_namespace(documents.remove(0))?]),
        _ => Ok(documents),
    }
}

/// All release documents for the bundle in `dir`, files taken in name order
pub fn assemble(dir: &Path) -> Result<Vec<Value>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    files.retain(|path| path.is_file());
    files.sort();

    let mut release = vec![namespace()?];
    for file in &files {
        release.extend(convert(file)?);
    }
    release.push(cluster_role_binding()?);
    release.push(service_account()?);
    Ok(release)
}

/// Multi-document YAML
pub fn render(documents: &[Value]) -> Result<String> {
    let mut output = String::new();
    for document in documents {
        output.push_str("---\n");
        output.push_str(&serde_yaml::to_string(document)?);
    }
    Ok(output)
}

/// Append the release manifest for `dir` to `output`, creating it if needed
#[instrument]
pub fn write_release(dir: &Path, output: &Path) -> Result<usize> {
    let documents = assemble(dir)?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(output)?;
    file.write_all(render(&documents)?.as_bytes())?;
    info!(documents = documents.len(), output = %output.display(), "Release manifest written");
    Ok(documents.len())
}
