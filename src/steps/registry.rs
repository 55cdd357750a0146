// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Matching of natural-language steps to handlers.
//!
//! Each step definition is a regex anchored at both ends. Matching strips a
//! leading Gherkin keyword, then requires exactly one definition to match.
//! Captured arguments and the doc-string have `{scenario_id}` substituted
//! before the handler sees them.

use super::context::ScenarioContext;
use crate::cluster::{full_match, Cluster};
use crate::command::Runner;
use crate::error::{HarnessError, Result};
use crate::poll::Clock;
use regex::Regex;
use tracing::{debug, info};

const KEYWORDS: [&str; 6] = ["Given ", "When ", "Then ", "And ", "But ", "* "];

/// Arguments a handler receives
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepArgs {
    /// Capture groups in order; unmatched optional groups are `None`
    pub captures: Vec<Option<String>>,
    /// Doc-string attached to the step
    pub text: Option<String>,
}

impl StepArgs {
    pub fn arg(&self, index: usize) -> Result<&str> {
        self.opt(index).ok_or_else(|| {
            HarnessError::Config(format!("step argument {} is missing", index + 1))
        })
    }

    pub fn opt(&self, index: usize) -> Option<&str> {
        self.captures.get(index).and_then(|c| c.as_deref())
    }

    pub fn text(&self) -> Result<&str> {
        self.text
            .as_deref()
            .ok_or_else(|| HarnessError::Config("step requires a doc-string".to_string()))
    }
}

pub type Handler<R, C> = fn(&Cluster<R, C>, &mut ScenarioContext, &StepArgs) -> Result<()>;

struct Definition<R, C> {
    pattern: Regex,
    handler: Handler<R, C>,
}

/// Registered step definitions
pub struct Steps<R: Runner, C: Clock> {
    definitions: Vec<Definition<R, C>>,
}

impl<R: Runner, C: Clock> Default for Steps<R, C> {
    fn default() -> Self {
        Steps {
            definitions: Vec::new(),
        }
    }
}

impl<R: Runner, C: Clock> Steps<R, C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every step definition the harness ships
    pub fn with_defaults() -> Result<Self> {
        let mut steps = Self::new();
        super::definitions::register(&mut steps)?;
        Ok(steps)
    }

    pub fn register(&mut self, pattern: &str, handler: Handler<R, C>) -> Result<()> {
        self.definitions.push(Definition {
            pattern: full_match(pattern)?,
            handler,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    fn find(&self, step: &str) -> Result<(&Definition<R, C>, Vec<Option<String>>)> {
        let mut matched = self.definitions.iter().filter_map(|definition| {
            definition.pattern.captures(step).map(|captures| {
                let args = captures
                    .iter()
                    .skip(1)
                    .map(|c| c.map(|m| m.as_str().to_string()))
                    .collect();
                (definition, args)
            })
        });

        let first = matched
            .next()
            .ok_or_else(|| HarnessError::Config(format!("undefined step: {}", step)))?;
        if matched.next().is_some() {
            return Err(HarnessError::Config(format!("ambiguous step: {}", step)));
        }
        Ok(first)
    }

    /// Fails when `step` matches no definition or more than one
    pub fn resolve(&self, step: &str) -> Result<()> {
        self.find(strip_keyword(step.trim())).map(|_| ())
    }

    /// Run one step against the cluster
    pub fn run(
        &self,
        cluster: &Cluster<R, C>,
        context: &mut ScenarioContext,
        step: &str,
        text: Option<&str>,
    ) -> Result<()> {
        let step = strip_keyword(step.trim());
        let (definition, captures) = self.find(step)?;
        let args = StepArgs {
            captures: captures
                .into_iter()
                .map(|c| c.map(|value| context.substitute(&value)))
                .collect(),
            text: text.map(|t| context.substitute(t)),
        };

        info!(scenario = %context.scenario_id, step, "Running step");
        debug!(?args, "Step arguments");
        (definition.handler)(cluster, context, &args)
    }
}

fn strip_keyword(step: &str) -> &str {
    KEYWORDS
        .iter()
        .find_map(|keyword| step.strip_prefix(keyword))
        .unwrap_or(step)
}
