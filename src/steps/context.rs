// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::error::{HarnessError, Result};
use crate::wrappers::{Application, Namespace, ServiceBinding};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Placeholder replaced by the scenario id in step arguments and doc-strings
pub const SCENARIO_ID_PLACEHOLDER: &str = "{scenario_id}";

/// State shared by the steps of one scenario
#[derive(Debug, Clone, Default)]
pub struct ScenarioContext {
    pub scenario_id: String,
    /// Directory relative file paths in steps are resolved against
    pub workdir: PathBuf,
    pub namespace: Option<Namespace>,
    pub sbo_namespace: Option<String>,
    /// Bindings in creation order; steps without a name use the first one
    pub bindings: Vec<ServiceBinding>,
    pub application: Option<Application>,
    pub application_original_generation: Option<i64>,
    pub application_original_pod_name: Option<String>,
    pub resource_version: Option<String>,
    pub expected_error: Option<String>,
    pub sb_secret: Option<String>,
    vars: BTreeMap<String, String>,
}

impl ScenarioContext {
    /// Context for the scenario starting at `line` of `feature_file`,
    /// seeing the current process environment
    pub fn new(feature_file: &Path, line: u32, workdir: impl Into<PathBuf>) -> Self {
        ScenarioContext {
            scenario_id: scenario_id(feature_file, line),
            workdir: workdir.into(),
            vars: std::env::vars().collect(),
            ..Default::default()
        }
    }

    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }

    pub fn var(&self, key: &str) -> Result<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| HarnessError::Config(format!("{} environment variable needs to be set", key)))
    }

    pub fn substitute(&self, text: &str) -> String {
        text.replace(SCENARIO_ID_PLACEHOLDER, &self.scenario_id)
    }

    /// Forget everything a previous scenario left behind
    pub fn reset(&mut self) {
        self.bindings.clear();
        self.application = None;
        self.application_original_generation = None;
        self.application_original_pod_name = None;
        self.resource_version = None;
        self.expected_error = None;
        self.sb_secret = None;
    }

    pub fn namespace_name(&self) -> Result<&str> {
        self.namespace
            .as_ref()
            .map(|ns| ns.name.as_str())
            .ok_or_else(|| HarnessError::Assertion("Namespace is not set in context".to_string()))
    }

    /// The binding called `name`, or the first one applied
    pub fn binding(&self, name: Option<&str>) -> Result<&ServiceBinding> {
        let found = match name {
            Some(name) => self.bindings.iter().find(|b| b.name() == name),
            None => self.bindings.first(),
        };
        found.ok_or_else(|| {
            HarnessError::Assertion(format!(
                "no Service Binding {} in context",
                name.unwrap_or("at all")
            ))
        })
    }

    /// Record a binding, replacing an earlier one with the same name
    pub fn add_binding(&mut self, binding: ServiceBinding) {
        match self.bindings.iter_mut().find(|b| b.name() == binding.name()) {
            Some(existing) => *existing = binding,
            None => self.bindings.push(binding),
        }
    }

    pub fn application(&self) -> Result<&Application> {
        self.application
            .as_ref()
            .ok_or_else(|| HarnessError::Assertion("no application in context".to_string()))
    }
}

/// `<lowercased feature file stem>-<line>`
pub fn scenario_id(feature_file: &Path, line: u32) -> String {
    let stem = feature_file
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    format!("{}-{}", stem, line)
}
