// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Relative change between two KPI documents.
//!
//! Both documents hold `kpi: [{name, metrics: [{name, <stat>: value}]}]`.
//! Entries are paired by position; every statistic of the compared document
//! is replaced by its change relative to the base.

use crate::error::{HarnessError, Result};
use serde_yaml::{Mapping, Value};

const NOT_AVAILABLE: &str = "n/a";

/// Change of `compared` relative to `base`
fn relative_change(base: f64, compared: f64) -> f64 {
    if base == 0.0 {
        if compared != 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    } else {
        compared / base - 1.0
    }
}

/// `+12.5%`, `-50.0%`, `0.0%`, `+inf%`
pub fn percentage(change: f64) -> String {
    let sign = if change > 0.0 { "+" } else { "" };
    let scaled = change * 100.0;
    let rounded = if scaled.is_finite() {
        (scaled * 100.0).round() / 100.0
    } else {
        scaled
    };
    if rounded.is_finite() && rounded.fract() == 0.0 {
        format!("{}{:.1}%", sign, rounded)
    } else {
        format!("{}{}%", sign, rounded)
    }
}

fn number(value: &Value, location: &str) -> Result<Option<f64>> {
    match value {
        Value::String(text) if text == NOT_AVAILABLE => Ok(None),
        Value::String(text) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| HarnessError::Config(format!("{}: '{}' is not a number", location, text))),
        Value::Number(number) => number
            .as_f64()
            .map(Some)
            .ok_or_else(|| HarnessError::Config(format!("{}: {:?} is not a number", location, number))),
        other => Err(HarnessError::Config(format!(
            "{}: unexpected value {:?}",
            location, other
        ))),
    }
}

fn kpi_list<'a>(document: &'a Value, label: &str) -> Result<&'a Vec<Value>> {
    document
        .get("kpi")
        .and_then(Value::as_sequence)
        .ok_or_else(|| HarnessError::Config(format!("{} has no kpi list", label)))
}

fn entry<'a>(list: &'a [Value], index: usize, location: &str) -> Result<&'a Value> {
    list.get(index)
        .ok_or_else(|| HarnessError::Config(format!("base has no entry for {}", location)))
}

fn metrics<'a>(kpi: &'a Value, location: &str) -> Result<&'a Vec<Value>> {
    kpi.get("metrics")
        .and_then(Value::as_sequence)
        .ok_or_else(|| HarnessError::Config(format!("{} has no metrics list", location)))
}

/// Compute the `kpi-diff` document for `compared` against `base`
pub fn diff(base: &Value, compared: &Value, raw: bool) -> Result<Value> {
    let base_kpis = kpi_list(base, "base")?;
    let mut result = kpi_list(compared, "compared")?.clone();

    for (kpi_index, kpi) in result.iter_mut().enumerate() {
        let kpi_location = format!("kpi[{}]", kpi_index);
        let base_metrics = metrics(entry(base_kpis, kpi_index, &kpi_location)?, &kpi_location)?;
        let compared_metrics = kpi
            .get_mut("metrics")
            .and_then(Value::as_sequence_mut)
            .ok_or_else(|| HarnessError::Config(format!("{} has no metrics list", kpi_location)))?;

        for (metric_index, metric) in compared_metrics.iter_mut().enumerate() {
            let location = format!("{}.metrics[{}]", kpi_location, metric_index);
            let base_metric = entry(base_metrics, metric_index, &location)?;
            let stats = metric
                .as_mapping_mut()
                .ok_or_else(|| HarnessError::Config(format!("{} is not a map", location)))?;

            for (stat, value) in stats.iter_mut() {
                if stat.as_str() == Some("name") {
                    continue;
                }
                let stat_location = format!("{}.{}", location, stat.as_str().unwrap_or("?"));
                let base_value = base_metric
                    .get(stat)
                    .ok_or_else(|| HarnessError::Config(format!("base has no {}", stat_location)))?;

                *value = match (number(base_value, &stat_location)?, number(value, &stat_location)?) {
                    (Some(a), Some(b)) => {
                        let change = relative_change(a, b);
                        if raw {
                            Value::from(change)
                        } else {
                            Value::String(percentage(change))
                        }
                    }
                    _ => Value::String(NOT_AVAILABLE.to_string()),
                };
            }
        }
    }

    let mut output = Mapping::new();
    output.insert(Value::from("kpi-diff"), Value::Sequence(result));
    Ok(Value::Mapping(output))
}
