// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::cluster::Cluster;
use crate::command::Runner;
use crate::error::Result;
use crate::poll::Clock;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub name: String,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Namespace { name: name.into() }
    }

    pub fn is_present<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>) -> bool {
        cluster.exists("ns", Some(&self.name))
    }

    pub fn create<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>) -> Result<()> {
        let command = cluster.command(format_args!("create namespace {}", self.name));
        cluster.run_checked(&command, None)?;
        info!(namespace = %self.name, "Namespace created");
        Ok(())
    }

    /// Create the namespace unless it is already there
    pub fn ensure<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>) -> Result<()> {
        if self.is_present(cluster) {
            return Ok(());
        }
        info!(namespace = %self.name, "Namespace is not present, creating it");
        self.create(cluster)
    }
}
