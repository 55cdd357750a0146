// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Runs gherkin feature files through the step registry.
//!
//! `before_all` runs once, then every selected scenario gets `before_scenario`
//! followed by its background steps and its own steps. The first failing step
//! fails the scenario and skips the rest of it; other scenarios still run.

use super::context::ScenarioContext;
use super::hooks::{before_all, before_scenario};
use super::registry::Steps;
use crate::cluster::Cluster;
use crate::command::Runner;
use crate::error::{HarnessError, Result};
use crate::poll::Clock;
use gherkin::{Feature, GherkinEnv, Scenario, Step};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};

pub const FEATURE_EXTENSION: &str = "feature";

/// Result of one scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioOutcome {
    pub feature: PathBuf,
    pub name: String,
    pub line: usize,
    /// Why the scenario failed, `None` when it passed
    pub failure: Option<String>,
}

impl ScenarioOutcome {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Report {
    pub scenarios: Vec<ScenarioOutcome>,
}

impl Report {
    pub fn failed(&self) -> impl Iterator<Item = &ScenarioOutcome> {
        self.scenarios.iter().filter(|s| !s.passed())
    }

    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }
}

/// Tag selection in the `@wip` / `~@disabled` form; a scenario runs when it
/// has none of the excluded tags and, if any are given, one of the included.
#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

fn bare_tag(tag: &str) -> String {
    tag.trim().trim_start_matches('@').to_string()
}

impl TagFilter {
    pub fn parse<S: AsRef<str>>(expressions: &[S]) -> Self {
        let mut filter = TagFilter::default();
        for expression in expressions {
            let expression = expression.as_ref().trim();
            match expression.strip_prefix('~') {
                Some(excluded) => filter.exclude.push(bare_tag(excluded)),
                None => filter.include.push(bare_tag(expression)),
            }
        }
        filter
    }

    pub fn matches(&self, tags: &[String]) -> bool {
        let tags: Vec<String> = tags.iter().map(|t| bare_tag(t)).collect();
        if tags.iter().any(|t| self.exclude.contains(t)) {
            return false;
        }
        self.include.is_empty() || tags.iter().any(|t| self.include.contains(t))
    }
}

/// `.feature` files under `paths`, directories searched recursively, in path order
pub fn feature_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        collect(path, &mut files)?;
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn collect(path: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    if path.is_dir() {
        for entry in fs::read_dir(path)? {
            collect(&entry?.path(), files)?;
        }
    } else if path.extension().is_some_and(|e| e == FEATURE_EXTENSION) {
        files.push(path.to_path_buf());
    } else if !path.exists() {
        return Err(HarnessError::Config(format!("{} does not exist", path.display())));
    }
    Ok(())
}

pub fn parse_feature(path: &Path) -> Result<Feature> {
    Feature::parse_path(path, GherkinEnv::default())
        .map_err(|e| HarnessError::Config(format!("{}: {}", path.display(), e)))
}

pub struct FeatureRunner<'a, R: Runner, C: Clock> {
    steps: &'a Steps<R, C>,
    cluster: &'a Cluster<R, C>,
    tags: TagFilter,
}

impl<'a, R: Runner, C: Clock> FeatureRunner<'a, R, C> {
    pub fn new(steps: &'a Steps<R, C>, cluster: &'a Cluster<R, C>) -> Self {
        FeatureRunner {
            steps,
            cluster,
            tags: TagFilter::default(),
        }
    }

    pub fn with_tags(mut self, tags: TagFilter) -> Self {
        self.tags = tags;
        self
    }

    /// Run every feature file under `paths`. Only setup failures are errors;
    /// failing scenarios end up in the report.
    #[instrument(skip(self, context))]
    pub fn run(
        &self,
        context: &mut ScenarioContext,
        paths: &[PathBuf],
        test_namespace: Option<&str>,
    ) -> Result<Report> {
        let files = feature_files(paths)?;
        if files.is_empty() {
            return Err(HarnessError::Config(format!("no feature files in {:?}", paths)));
        }
        before_all(self.cluster, context, test_namespace)?;

        let mut report = Report::default();
        for file in &files {
            let feature = parse_feature(file)?;
            self.run_feature(context, &feature, file, &mut report);
        }

        let failed = report.failed().count();
        info!(
            scenarios = report.scenarios.len(),
            passed = report.scenarios.len() - failed,
            failed,
            "Acceptance run finished"
        );
        Ok(report)
    }

    pub fn run_feature(
        &self,
        context: &mut ScenarioContext,
        feature: &Feature,
        file: &Path,
        report: &mut Report,
    ) {
        info!(feature = %feature.name, file = %file.display(), "Running feature");
        let mut background: Vec<&Step> = feature
            .background
            .iter()
            .flat_map(|b| b.steps.iter())
            .collect();

        for scenario in &feature.scenarios {
            self.record(context, file, &background, &feature.tags, scenario, report);
        }
        for rule in &feature.rules {
            let base = background.len();
            background.extend(rule.background.iter().flat_map(|b| b.steps.iter()));
            let mut tags = feature.tags.clone();
            tags.extend(rule.tags.iter().cloned());
            for scenario in &rule.scenarios {
                self.record(context, file, &background, &tags, scenario, report);
            }
            background.truncate(base);
        }
    }

    /// Run `scenario` unless its own or `inherited` tags exclude it
    fn record(
        &self,
        context: &mut ScenarioContext,
        file: &Path,
        background: &[&Step],
        inherited: &[String],
        scenario: &Scenario,
        report: &mut Report,
    ) {
        let mut tags = inherited.to_vec();
        tags.extend(scenario.tags.iter().cloned());
        if !self.tags.matches(&tags) {
            info!(scenario = %scenario.name, "Skipping scenario excluded by tags");
            return;
        }

        let failure = self.run_scenario(context, file, background, scenario).err();
        match &failure {
            None => info!(scenario = %scenario.name, "Scenario passed"),
            Some(reason) => error!(scenario = %scenario.name, %reason, "Scenario failed"),
        }
        report.scenarios.push(ScenarioOutcome {
            feature: file.to_path_buf(),
            name: scenario.name.clone(),
            line: scenario.position.line,
            failure: failure.map(|e| e.to_string()),
        });
    }

    fn run_scenario(
        &self,
        context: &mut ScenarioContext,
        file: &Path,
        background: &[&Step],
        scenario: &Scenario,
    ) -> Result<()> {
        if !scenario.examples.is_empty() {
            return Err(HarnessError::Config(format!(
                "Scenario Outline '{}' is not supported",
                scenario.name
            )));
        }
        let line = u32::try_from(scenario.position.line).unwrap_or(u32::MAX);
        before_scenario(self.cluster, context, file, line)?;
        info!(scenario = %scenario.name, id = %context.scenario_id, "Running scenario");

        let steps: Vec<&Step> = background
            .iter()
            .copied()
            .chain(scenario.steps.iter())
            .collect();
        for (index, step) in steps.iter().enumerate() {
            let text = format!("{} {}", step.keyword.trim(), step.value);
            if let Err(e) = self
                .steps
                .run(self.cluster, context, &text, step.docstring.as_deref())
            {
                let skipped = steps.len() - index - 1;
                if skipped > 0 {
                    warn!(skipped, "Skipping the remaining steps");
                }
                return Err(HarnessError::Assertion(format!(
                    "step '{}' at line {} failed: {}",
                    text, step.position.line, e
                )));
            }
        }
        Ok(())
    }
}
