// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sbo_harness::cluster::Cluster;
use sbo_harness::config::{Config, Thresholds};
use sbo_harness::constants::perf::{DATE_FORMAT, INDEX};
use sbo_harness::manifest::{self, DEFAULT_OUTPUT};
use sbo_harness::olm::{known, Installer};
use sbo_harness::perf::{kpi, kpidiff, upload};
use sbo_harness::steps::{before_all, FeatureRunner, ScenarioContext, Steps, TagFilter};
use sbo_harness::types::binding::COREOS_API_GROUP;
use sbo_harness::wrappers::ServiceBinding;

const FEATURES_DIR: &str = "test/acceptance/features";

#[derive(Parser)]
#[command(name = "sbo-harness", version, about = "Service Binding Operator test harness")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize one column of a performance CSV as KPI YAML
    Kpi {
        #[arg(short = 'c', long)]
        csv_file: PathBuf,
        #[arg(short = 'x', long)]
        x_column: usize,
        #[arg(short = 'y', long)]
        y_column: usize,
        #[arg(short = 'd', long, default_value = DATE_FORMAT)]
        date_format: String,
    },
    /// Relative change of KPI file B against base A
    KpiDiff {
        #[arg(short)]
        a: PathBuf,
        #[arg(short)]
        b: PathBuf,
        /// Emit raw ratios instead of percentages
        #[arg(short, long)]
        raw: bool,
    },
    /// Build a plain release manifest from an operator bundle
    ReleaseManifest {
        manifest_dir: PathBuf,
        #[arg(long, default_value = DEFAULT_OUTPUT)]
        output: PathBuf,
    },
    /// Upload performance KPIs to the search index
    UploadKpi {
        #[arg(long, env = "KPI_YAML_FILE")]
        file: PathBuf,
        #[arg(long, env = "OS_HOST")]
        host: String,
        #[arg(long, env = "OS_INDEX", default_value = INDEX)]
        index: String,
    },
    /// Run acceptance feature files against the cluster
    Acceptance {
        /// Feature files or directories holding them
        #[arg(default_value = FEATURES_DIR)]
        paths: Vec<PathBuf>,
        /// `@tag` to select, `~@tag` to exclude; repeatable
        #[arg(short, long)]
        tags: Vec<String>,
    },
    /// Check the client and locate the operator under test
    Preflight,
    /// Make sure a known operator is installed and running
    OperatorInstall { name: String },
    /// Wait until a ServiceBinding reports Ready
    WaitBindingReady {
        name: String,
        #[arg(short, long)]
        namespace: String,
        #[arg(long, default_value = COREOS_API_GROUP)]
        api_group: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Args::parse().command {
        Command::Kpi {
            csv_file,
            x_column,
            y_column,
            date_format,
        } => {
            let input = File::open(&csv_file)
                .with_context(|| format!("unable to open {}", csv_file.display()))?;
            let metrics = kpi::compute(input, x_column, y_column, &date_format)?;
            print!("{}", kpi::to_yaml(&metrics)?);
        }
        Command::KpiDiff { a, b, raw } => {
            let read = |path: &PathBuf| -> Result<serde_yaml::Value> {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("unable to read {}", path.display()))?;
                serde_yaml::from_str(&content)
                    .with_context(|| format!("{} is not valid YAML", path.display()))
            };
            let diff = kpidiff::diff(&read(&a)?, &read(&b)?, raw)?;
            print!("{}", serde_yaml::to_string(&diff)?);
        }
        Command::ReleaseManifest {
            manifest_dir,
            output,
        } => {
            manifest::write_release(&manifest_dir, &output)
                .with_context(|| format!("unable to assemble {}", manifest_dir.display()))?;
        }
        Command::UploadKpi { file, host, index } => {
            let thresholds = Thresholds::from_env()?;
            let yaml = fs::read_to_string(&file)
                .with_context(|| format!("unable to read {}", file.display()))?;
            let document = upload::UsageDocument::from_kpi_yaml(&yaml, &thresholds)?;
            let id = upload::upload(&host, &index, &document)?;
            info!(%id, %index, "Performance data uploaded");
        }
        Command::Acceptance { paths, tags } => {
            let config = Config::from_env()?;
            let cluster = Cluster::from_config(&config);
            let steps = Steps::with_defaults()?;
            let mut context = ScenarioContext::new(Path::new(""), 0, config.workdir.clone());
            let report = FeatureRunner::new(&steps, &cluster)
                .with_tags(TagFilter::parse(&tags))
                .run(&mut context, &paths, config.test_namespace.as_deref())?;
            for scenario in report.failed() {
                error!(
                    feature = %scenario.feature.display(),
                    line = scenario.line,
                    scenario = %scenario.name,
                    reason = scenario.failure.as_deref().unwrap_or_default(),
                    "Failed scenario"
                );
            }
            if !report.is_success() {
                anyhow::bail!(
                    "{} of {} scenarios failed",
                    report.failed().count(),
                    report.scenarios.len()
                );
            }
        }
        Command::Preflight => {
            let config = Config::from_env()?;
            let cluster = Cluster::from_config(&config);
            let mut context = ScenarioContext::default();
            before_all(&cluster, &mut context, config.test_namespace.as_deref())?;
        }
        Command::OperatorInstall { name } => {
            let config = Config::from_env()?;
            let cluster = Cluster::from_config(&config);
            let namespace = config
                .test_namespace
                .clone()
                .unwrap_or_else(|| config.operators_namespace().to_string());
            let spec = known::by_name(&name, config.cli, &namespace).with_context(|| {
                format!("unknown operator {}, expected one of {:?}", name, known::NAMES)
            })?;
            Installer::new(&cluster, spec).ensure()?;
        }
        Command::WaitBindingReady {
            name,
            namespace,
            api_group,
        } => {
            let config = Config::from_env()?;
            let cluster = Cluster::from_config(&config);
            let binding = ServiceBinding::existing(&name, &api_group, Some(&namespace));
            let secret = binding.wait_ready(&cluster)?;
            info!(binding = %name, %secret, "Service Binding is ready");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args(args: &[&str]) -> Command {
        Args::try_parse_from(std::iter::once("sbo-harness").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn test_kpi_short_flags() {
        match make_args(&["kpi", "-c", "run.csv", "-x", "0", "-y", "2", "-d", "%Y"]) {
            Command::Kpi {
                csv_file,
                x_column,
                y_column,
                date_format,
            } => {
                assert_eq!(csv_file, PathBuf::from("run.csv"));
                assert_eq!((x_column, y_column), (0, 2));
                assert_eq!(date_format, "%Y");
            }
            _ => panic!("expected the kpi command"),
        }
    }

    #[test]
    fn test_acceptance_defaults() {
        match make_args(&["acceptance"]) {
            Command::Acceptance { paths, tags } => {
                assert_eq!(paths, vec![PathBuf::from(FEATURES_DIR)]);
                assert!(tags.is_empty());
            }
            _ => panic!("expected the acceptance command"),
        }

        match make_args(&["acceptance", "a.feature", "b", "-t", "~@disabled"]) {
            Command::Acceptance { paths, tags } => {
                assert_eq!(paths.len(), 2);
                assert_eq!(tags, vec!["~@disabled".to_string()]);
            }
            _ => panic!("expected the acceptance command"),
        }
    }
}
