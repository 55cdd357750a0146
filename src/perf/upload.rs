// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::config::Thresholds;
use crate::constants::perf::DOC_ID_LEN;
use crate::error::{HarnessError, Result};
use crate::http;
use chrono::Local;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

const USAGE_KPI: &str = "usage";
const MEMORY_METRIC: &str = "Memory_MiB";
const CPU_METRIC: &str = "CPU_millicores";
const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Debug, Deserialize)]
struct KpiFile {
    kpi: Vec<Kpi>,
}

#[derive(Debug, Deserialize)]
struct Kpi {
    name: String,
    #[serde(default)]
    metrics: Vec<serde_yaml::Value>,
}

/// Document stored in the search index for one performance run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageDocument {
    pub upload_date: String,
    pub memory_average: f64,
    pub memory_maximum: f64,
    pub cpu_average: f64,
    pub cpu_maximum: f64,
    pub memory_average_threshold: f64,
    pub memory_maximum_threshold: f64,
    pub cpu_average_threshold: f64,
    pub cpu_maximum_threshold: f64,
}

fn stat(metric: &serde_yaml::Value, name: &str, stat: &str) -> Result<f64> {
    let value = metric
        .get(stat)
        .ok_or_else(|| HarnessError::Config(format!("metric {} has no {}", name, stat)))?;
    let number = match value {
        serde_yaml::Value::Number(n) => n.as_f64(),
        serde_yaml::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    number.ok_or_else(|| HarnessError::Config(format!("{}.{} is not a number: {:?}", name, stat, value)))
}

/// `(average, maximum)` of the named metric under the `usage` KPI
fn usage_metric(kpis: &[Kpi], name: &str) -> Result<(f64, f64)> {
    let metric = kpis
        .iter()
        .filter(|kpi| kpi.name == USAGE_KPI)
        .flat_map(|kpi| kpi.metrics.iter())
        .find(|metric| metric.get("name").and_then(|n| n.as_str()) == Some(name))
        .ok_or_else(|| HarnessError::Config(format!("no {} metric in {} KPI", name, USAGE_KPI)))?;
    Ok((stat(metric, name, "average")?, stat(metric, name, "maximum")?))
}

impl UsageDocument {
    /// Build the document from KPI YAML, stamped with the local time
    pub fn from_kpi_yaml(yaml: &str, thresholds: &Thresholds) -> Result<Self> {
        let file: KpiFile = serde_yaml::from_str(yaml)?;
        let (memory_average, memory_maximum) = usage_metric(&file.kpi, MEMORY_METRIC)?;
        let (cpu_average, cpu_maximum) = usage_metric(&file.kpi, CPU_METRIC)?;

        Ok(UsageDocument {
            upload_date: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            memory_average,
            memory_maximum,
            cpu_average,
            cpu_maximum,
            memory_average_threshold: thresholds.memory_average,
            memory_maximum_threshold: thresholds.memory_maximum,
            cpu_average_threshold: thresholds.cpu_average,
            cpu_maximum_threshold: thresholds.cpu_maximum,
        })
    }
}

/// Random document id of lowercase letters and digits
pub fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    (0..DOC_ID_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// A host without a scheme is reached over https
fn document_url(host: &str, index: &str, id: &str) -> String {
    let host = host.trim_end_matches('/');
    let base = if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    };
    format!("{}/{}/_doc/{}?refresh=true", base, index, id)
}

/// Index the document under a fresh id, returning that id
#[instrument(skip(document))]
pub fn upload(host: &str, index: &str, document: &UsageDocument) -> Result<String> {
    let id = generate_id();
    info!(%id, "Uploading performance document");

    let response = http::put_json(&document_url(host, index, &id), &serde_json::to_value(document)?)?;
    if !response.status.is_success() {
        return Err(HarnessError::Http(format!(
            "indexing document {} failed with {}: {}",
            id, response.status, response.body
        )));
    }
    info!(%id, status = %response.status, "Document indexed");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::http_server;
    use std::io::Read;
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    const KPI: &str = r#"
kpi:
  - name: usage
    metrics:
      - name: Memory_MiB
        first: 40
        average: 68.2
        maximum: 98
      - name: CPU_millicores
        average: "10.5"
        maximum: 90.2
"#;

    fn make_thresholds() -> Thresholds {
        Thresholds {
            memory_average: 150.0,
            memory_maximum: 200.0,
            cpu_average: 20.0,
            cpu_maximum: 100.0,
        }
    }

    #[test]
    fn test_document_from_kpi() {
        let document = UsageDocument::from_kpi_yaml(KPI, &make_thresholds()).unwrap();

        assert_eq!(document.memory_average, 68.2);
        assert_eq!(document.memory_maximum, 98.0);
        assert_eq!(document.cpu_average, 10.5);
        assert_eq!(document.cpu_maximum, 90.2);
        assert_eq!(document.cpu_maximum_threshold, 100.0);
        assert_eq!(document.upload_date.len(), "2026-01-01 00:00:00".len());
    }

    #[test]
    fn test_missing_metric() {
        let yaml = "kpi:\n  - name: usage\n    metrics:\n      - name: Memory_MiB\n        average: 1\n        maximum: 2\n";
        let err = UsageDocument::from_kpi_yaml(yaml, &make_thresholds()).unwrap_err();
        assert!(err.to_string().contains("CPU_millicores"));
    }

    #[test]
    fn test_generate_id() {
        let id = generate_id();
        assert_eq!(id.len(), DOC_ID_LEN);
        assert!(id.bytes().all(|b| ID_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_document_url() {
        assert_eq!(
            document_url("search.local:9200/", "sbo-perf-data", "abc123"),
            "https://search.local:9200/sbo-perf-data/_doc/abc123?refresh=true"
        );
        assert_eq!(
            document_url("search-sbo.us-east-1.es.amazonaws.com", "idx", "x"),
            "https://search-sbo.us-east-1.es.amazonaws.com/idx/_doc/x?refresh=true"
        );
        assert_eq!(
            document_url("http://proxy:8080", "idx", "x"),
            "http://proxy:8080/idx/_doc/x?refresh=true"
        );
    }

    #[test]
    fn test_upload_puts_document() {
        let (host, requests) = http_server(vec![("201 Created", r#"{"result":"created"}"#)]);
        let document = UsageDocument::from_kpi_yaml(KPI, &make_thresholds()).unwrap();

        let id = upload(&format!("http://{}", host), "sbo-perf-data", &document).unwrap();

        let request = requests.recv().unwrap();
        assert!(request.starts_with(&format!("PUT /sbo-perf-data/_doc/{}?refresh=true", id)));
        assert!(request.contains(r#""memory_average":68.2"#));
    }

    #[test]
    fn test_upload_rejected() {
        let (host, _requests) = http_server(vec![("403 Forbidden", "denied")]);
        let document = UsageDocument::from_kpi_yaml(KPI, &make_thresholds()).unwrap();

        assert!(matches!(
            upload(&format!("http://{}", host), "sbo-perf-data", &document),
            Err(HarnessError::Http(_))
        ));
    }

    #[test]
    fn test_upload_to_bare_host_uses_tls() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let host = listener.local_addr().unwrap().to_string();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut first = [0u8; 1];
            socket.read_exact(&mut first).unwrap();
            tx.send(first[0]).unwrap();
        });
        let document = UsageDocument::from_kpi_yaml(KPI, &make_thresholds()).unwrap();

        assert!(matches!(
            upload(&host, "sbo-perf-data", &document),
            Err(HarnessError::Http(_))
        ));
        // 0x16 opens a TLS handshake record
        assert_eq!(rx.recv().unwrap(), 0x16);
    }
}
