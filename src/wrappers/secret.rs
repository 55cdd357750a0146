// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::cluster::Cluster;
use crate::command::Runner;
use crate::constants::poll::SECRET_TIMEOUT_SECS;
use crate::error::{HarnessError, Result};
use crate::poll::{Attempt, Clock};
use k8s_openapi::api::core::v1::Secret as SecretObject;
use std::net::IpAddr;
use tracing::warn;

/// How long an empty secret is waited for before giving up quietly
const EMPTY_TIMEOUT_SECS: u64 = 20;

/// Checks on the data of a secret produced by a binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secret {
    pub name: String,
    pub namespace: String,
}

impl Secret {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Secret {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Decoded value under `key`; empty when the key is absent
    fn value<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>, key: &str) -> Result<String> {
        Ok(cluster
            .secret_value(&self.name, &self.namespace, key)?
            .unwrap_or_default())
    }

    /// Wait until `key` holds `expected`
    pub fn wait_for_value<R: Runner, C: Clock>(
        &self,
        cluster: &Cluster<R, C>,
        key: &str,
        expected: &str,
    ) -> Result<()> {
        cluster
            .poller(format!("secret {} key {} to be {:?}", self.name, key, expected))
            .timeout_secs(SECRET_TIMEOUT_SECS)
            .until_ok(|| self.value(cluster, key), |value| value == expected)
            .map(|_| ())
    }

    /// Wait until `key` is gone
    pub fn wait_without_key<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>, key: &str) -> Result<()> {
        cluster
            .poller(format!("secret {} to drop key {}", self.name, key))
            .timeout_secs(SECRET_TIMEOUT_SECS)
            .until_ok(|| self.value(cluster, key), |value| value.is_empty())
            .map(|_| ())
    }

    /// Wait until `key` holds anything at all
    pub fn wait_for_key<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>, key: &str) -> Result<String> {
        cluster
            .poller(format!("secret {} to contain key {}", self.name, key))
            .timeout_secs(SECRET_TIMEOUT_SECS)
            .until_ok(|| self.value(cluster, key), |value| !value.is_empty())
    }

    /// Wait until `key` holds an IPv4 or IPv6 address
    pub fn wait_for_ip<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>, key: &str) -> Result<IpAddr> {
        cluster
            .poller(format!("secret {} key {} to hold an IP address", self.name, key))
            .timeout_secs(SECRET_TIMEOUT_SECS)
            .until(|| match self.value(cluster, key) {
                Ok(value) => match value.trim().parse::<IpAddr>() {
                    Ok(ip) => Attempt::Ready(ip),
                    Err(_) => Attempt::Retry(format!("{:?} is not an IP address", value)),
                },
                Err(e) if e.is_retryable() => Attempt::Retry(e.to_string()),
                Err(e) => Attempt::Fatal(e),
            })
    }

    /// Whether the secret has no data, allowing a short while for it to be emptied
    pub fn is_empty<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>) -> Result<bool> {
        let emptied = cluster
            .poller(format!("secret {} to be empty", self.name))
            .timeout_secs(EMPTY_TIMEOUT_SECS)
            .until_true(|| {
                let secret: Option<SecretObject> =
                    cluster.try_get_json("secrets", &self.name, &self.namespace)?;
                Ok(secret
                    .and_then(|s| s.data)
                    .map_or(true, |data| data.is_empty()))
            });

        match emptied {
            Ok(()) => Ok(true),
            Err(HarnessError::Timeout { .. }) => {
                warn!(secret = %self.name, "Secret still holds data");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
