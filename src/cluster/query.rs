// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Read-only lookups

use super::{ns_arg, user_arg, Cluster, ItemList, Named};
use crate::command::Runner;
use crate::error::{HarnessError, Result};
use crate::poll::Clock;
use crate::types::PackageManifest;
use base64::prelude::*;
use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::debug;

impl<R: Runner, C: Clock> Cluster<R, C> {
    /// Names of all `kind` objects in `namespace`
    pub fn resource_names(&self, kind: &str, namespace: &str) -> Result<Vec<String>> {
        let command = self.command(format_args!("get {} -n {} -o json", kind, namespace));
        let output = self.run_checked(&command, None)?;
        let list: ItemList<Named> = serde_json::from_str(&output)?;

        Ok(list
            .items
            .into_iter()
            .filter_map(|item| item.metadata.name)
            .collect())
    }

    /// First `kind` name in `namespace` fully matching `pattern`
    pub fn search_resource(
        &self,
        kind: &str,
        pattern: &str,
        namespace: &str,
    ) -> Result<Option<String>> {
        Ok(self
            .search_resources(kind, pattern, namespace)?
            .into_iter()
            .next())
    }

    /// All `kind` names in `namespace` fully matching `pattern`
    pub fn search_resources(
        &self,
        kind: &str,
        pattern: &str,
        namespace: &str,
    ) -> Result<Vec<String>> {
        let matcher = full_match(pattern)?;
        let names = self.resource_names(kind, namespace)?;
        let matched: Vec<String> = names.into_iter().filter(|n| matcher.is_match(n)).collect();

        debug!(kind, pattern, namespace, ?matched, "Searched resources");
        Ok(matched)
    }

    /// True when `get {kind} [{name}]` succeeds
    pub fn exists(&self, kind: &str, name: Option<&str>) -> bool {
        let target = match name {
            Some(name) => format!("{} {}", kind, name),
            None => kind.to_string(),
        };
        self.run(&self.command(format_args!("get {}", target)), None)
            .success()
    }

    /// Evaluate a jsonpath expression against one object
    pub fn jsonpath(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
        path: &str,
        user: Option<&str>,
    ) -> Option<String> {
        let command = self.command(format_args!(
            "get {} {} -o \"jsonpath={}\"{}{}",
            kind,
            name,
            path,
            ns_arg(namespace),
            user_arg(user)
        ));
        self.run_lookup(&command)
    }

    /// Decoded value stored under `key` in a secret
    pub fn secret_value(&self, name: &str, namespace: &str, key: &str) -> Result<Option<String>> {
        let path = format!("{{.data.{}}}", key);
        let Some(encoded) = self.jsonpath("secrets", name, Some(namespace), &path, None) else {
            return Ok(None);
        };
        let bytes = BASE64_STANDARD.decode(encoded.trim())?;
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// One object parsed into `T`; a missing object is an error
    pub fn get_json<T: DeserializeOwned>(&self, kind: &str, name: &str, namespace: &str) -> Result<T> {
        let command = self.command(format_args!("get {} {} -n {} -o json", kind, name, namespace));
        let output = self.run_checked(&command, None)?;
        Ok(serde_json::from_str(&output)?)
    }

    /// One object parsed into `T`, `None` when it can't be fetched
    pub fn try_get_json<T: DeserializeOwned>(
        &self,
        kind: &str,
        name: &str,
        namespace: &str,
    ) -> Result<Option<T>> {
        self.object_json(kind, name, Some(namespace))
    }

    /// Like [`Cluster::try_get_json`], in the CLI's current namespace when none is given
    pub fn object_json<T: DeserializeOwned>(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<Option<T>> {
        let command = self.command(format_args!("get {} {}{} -o json", kind, name, ns_arg(namespace)));
        match self.run_lookup(&command) {
            Some(output) => Ok(Some(serde_json::from_str(&output)?)),
            None => Ok(None),
        }
    }

    /// Namespace of the first `kind` named `name` across all namespaces
    pub fn lookup_namespace(&self, kind: &str, name: &str) -> Result<Option<String>> {
        let command = self.command(format_args!("get {} --all-namespaces -o json", kind));
        let output = self.run_checked(&command, None)?;
        let list: ItemList<Named> = serde_json::from_str(&output)?;

        Ok(list
            .items
            .into_iter()
            .find(|item| item.metadata.name.as_deref() == Some(name))
            .and_then(|item| item.metadata.namespace))
    }

    /// Current CSV of a package channel in a catalog, once the package server knows it
    pub fn current_csv(&self, package: &str, catalog: &str, channel: &str) -> Result<Option<String>> {
        let command = self.command("get packagemanifests -o json");
        let Some(output) = self.run_lookup(&command) else {
            return Ok(None);
        };
        let list: ItemList<PackageManifest> = serde_json::from_str(&output)?;

        Ok(list
            .items
            .iter()
            .find_map(|m| m.current_csv(package, catalog, channel))
            .map(str::to_string))
    }

    /// Knative revisions in `namespace`
    pub fn revisions(&self, namespace: &str) -> Result<Vec<String>> {
        self.resource_names("rev", namespace)
    }

    /// Status of the last condition reported by a Knative revision
    pub fn last_revision_status(&self, revision: &str, namespace: &str) -> Result<String> {
        let command = self.command(format_args!(
            "get rev {} -n {} -o \"jsonpath={{.status.conditions[*].status}}\"",
            revision, namespace
        ));
        let output = self.run_checked(&command, None)?;
        Ok(output
            .split_whitespace()
            .last()
            .unwrap_or_default()
            .to_string())
    }
}

/// Regex anchored at both ends
pub(crate) fn full_match(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{})$", pattern))
        .map_err(|e| HarnessError::Config(format!("invalid name pattern '{}': {}", pattern, e)))
}
