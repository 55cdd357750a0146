// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The two jq expression shapes the feature files use against bindings:
//! a plain field path (`.status.secret`) and a condition field selection
//! (`.status.conditions[] | select(.type=="Ready").status`).

use crate::error::{HarnessError, Result};
use regex::Regex;
use serde_json::Value;
use std::str::FromStr;

const CONDITION_PATTERN: &str =
    r#"^\.status\.conditions\[\]\s*\|\s*select\(\s*\.type\s*==\s*"([^"]+)"\s*\)\.(\w+)$"#;
const PATH_PATTERN: &str = r"^(\.[A-Za-z_][\w-]*)+$";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JqQuery {
    /// Field of the status condition with the given type
    Condition { condition_type: String, field: String },
    /// Object keys walked from the root
    Path(Vec<String>),
}

impl FromStr for JqQuery {
    type Err = HarnessError;

    fn from_str(expression: &str) -> Result<Self> {
        let expression = expression.trim();
        let condition = Regex::new(CONDITION_PATTERN).map_err(|e| HarnessError::Config(e.to_string()))?;
        if let Some(captures) = condition.captures(expression) {
            return Ok(JqQuery::Condition {
                condition_type: captures[1].to_string(),
                field: captures[2].to_string(),
            });
        }

        let path = Regex::new(PATH_PATTERN).map_err(|e| HarnessError::Config(e.to_string()))?;
        if path.is_match(expression) {
            return Ok(JqQuery::Path(
                expression.split('.').skip(1).map(str::to_string).collect(),
            ));
        }

        Err(HarnessError::Config(format!(
            "unsupported jq expression: {}",
            expression
        )))
    }
}

impl JqQuery {
    /// Selected value rendered the way `jq -r` would; `None` when absent or null
    pub fn evaluate(&self, object: &Value) -> Option<String> {
        let selected = match self {
            JqQuery::Condition { condition_type, field } => object
                .pointer("/status/conditions")?
                .as_array()?
                .iter()
                .find(|c| c.get("type").and_then(Value::as_str) == Some(condition_type.as_str()))?
                .get(field)?,
            JqQuery::Path(keys) => keys.iter().try_fold(object, |value, key| value.get(key))?,
        };
        match selected {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}
