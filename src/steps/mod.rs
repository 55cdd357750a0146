// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Natural-language acceptance steps and the hooks around them.

pub mod context;
pub mod definitions;
pub mod feature;
pub mod hooks;
pub mod jq;
pub mod registry;

pub use context::{scenario_id, ScenarioContext};
pub use feature::{FeatureRunner, Report, TagFilter};
pub use hooks::{before_all, before_scenario};
pub use registry::{Handler, StepArgs, Steps};
