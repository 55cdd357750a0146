// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Summary statistics over one column of a performance CSV.
//!
//! Input is `;`-delimited with a header row. The x column holds timestamps,
//! which are only validated; the y column holds the measured values.

use crate::constants::perf::TIMESTAMP_WIDTH;
use crate::error::{HarnessError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::io::Read;
use tracing::warn;

const NOT_AVAILABLE: &str = "n/a";

/// A statistic, or `n/a` when there is nothing meaningful to report
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stat {
    Value(f64),
    NotAvailable,
}

impl Stat {
    /// Negative values are reported as `n/a`
    fn normalized(value: f64) -> Self {
        if value < 0.0 {
            Stat::NotAvailable
        } else {
            Stat::Value(value)
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Stat::Value(v) => Some(*v),
            Stat::NotAvailable => None,
        }
    }
}

impl Serialize for Stat {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Stat::Value(value) => serializer.serialize_f64(*value),
            Stat::NotAvailable => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}

impl<'de> Deserialize<'de> for Stat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(value) => Ok(Stat::Value(value)),
            Raw::Text(text) if text == NOT_AVAILABLE => Ok(Stat::NotAvailable),
            Raw::Text(text) => text
                .trim()
                .parse()
                .map(Stat::Value)
                .map_err(|_| de::Error::custom(format!("'{}' is neither a number nor {}", text, NOT_AVAILABLE))),
        }
    }
}

/// Statistics of one measured column. Fields are declared in key order so
/// the YAML output is sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub average: Stat,
    pub first: Stat,
    pub last: Stat,
    pub maximum: Stat,
    pub median: Stat,
    pub minimum: Stat,
    pub name: String,
}

impl Metrics {
    fn not_available(name: String) -> Self {
        Metrics {
            name,
            first: Stat::NotAvailable,
            minimum: Stat::NotAvailable,
            average: Stat::NotAvailable,
            median: Stat::NotAvailable,
            maximum: Stat::NotAvailable,
            last: Stat::NotAvailable,
        }
    }

    fn from_values(name: String, values: &[f64]) -> Self {
        let (Some(first), Some(last)) = (values.first(), values.last()) else {
            return Self::not_available(name);
        };
        let minimum = values.iter().copied().fold(f64::INFINITY, f64::min);
        let maximum = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let average = values.iter().sum::<f64>() / values.len() as f64;

        Metrics {
            name,
            first: Stat::normalized(*first),
            minimum: Stat::normalized(minimum),
            average: Stat::normalized(average),
            median: Stat::normalized(median(values)),
            maximum: Stat::normalized(maximum),
            last: Stat::normalized(*last),
        }
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let middle = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[middle - 1] + sorted[middle]) / 2.0
    } else {
        sorted[middle]
    }
}

/// strftime-style format as accepted on the command line, in chrono's dialect.
///
/// `.%f` (fraction after a dot) becomes `%.f`, which parses any number of digits.
pub fn chrono_format(format: &str) -> String {
    format.replace(".%f", "%.f")
}

fn parse_timestamp(value: &str, format: &str) -> Result<()> {
    let value: String = value.chars().take(TIMESTAMP_WIDTH).collect();
    let parsed = NaiveDateTime::parse_from_str(&value, format)
        .map(|_| ())
        .or_else(|_| NaiveDate::parse_from_str(&value, format).map(|_| ()));
    parsed.map_err(|e| {
        HarnessError::Config(format!("timestamp '{}' does not match '{}': {}", value, format, e))
    })
}

fn column<'a>(record: &'a csv::StringRecord, index: usize) -> Option<&'a str> {
    record.get(index).filter(|value| !value.is_empty())
}

/// Compute the statistics of column `y` from CSV data
pub fn compute<R: Read>(input: R, x: usize, y: usize, date_format: &str) -> Result<Metrics> {
    let format = chrono_format(date_format);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(input);

    let headers = reader.headers()?.clone();
    let header = |index: usize| {
        headers
            .get(index)
            .map(str::to_string)
            .ok_or_else(|| HarnessError::Config(format!("CSV has no column {}", index)))
    };
    header(x)?;
    let name = header(y)?;

    let mut values = Vec::new();
    for record in reader.records() {
        let record = record?;
        let (Some(timestamp), Some(value)) = (column(&record, x), column(&record, y)) else {
            warn!(row = ?record, "Incomplete row data, skipping");
            continue;
        };
        parse_timestamp(timestamp, &format)?;
        let value: f64 = value.trim().parse().map_err(|_| {
            HarnessError::Config(format!("'{}' in column {} is not a number", value, name))
        })?;
        values.push(value);
    }

    Ok(Metrics::from_values(name, &values))
}

/// YAML list holding the one metrics map
pub fn to_yaml(metrics: &Metrics) -> Result<String> {
    Ok(serde_yaml::to_string(&[metrics])?)
}
