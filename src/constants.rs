// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Names of the Service Binding Operator deployment
pub mod sbo {
    /// Deployment, cluster role and service account name
    pub const NAME: &str = "service-binding-operator";
    /// Namespace used by the release manifest
    pub const NAMESPACE: &str = "service-binding-operator";
    /// CRD looked up to verify the operator is installed
    pub const CRD: &str = "servicebinding";
}

/// ServiceBinding status condition types
pub mod conditions {
    pub const COLLECTION_READY: &str = "CollectionReady";
    pub const INJECTION_READY: &str = "InjectionReady";
    pub const READY: &str = "Ready";
    pub const AVAILABLE: &str = "Available";
}

/// Poll interval/timeout pairs, in seconds
pub mod poll {
    pub const DEFAULT_INTERVAL_SECS: u64 = 5;
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    pub const STATUS_INTERVAL_SECS: u64 = 20;
    pub const STATUS_TIMEOUT_SECS: u64 = 180;

    pub const POD_TIMEOUT_SECS: u64 = 600;
    pub const PACKAGE_MANIFEST_TIMEOUT_SECS: u64 = 120;
    pub const INSTALL_PLAN_TIMEOUT_SECS: u64 = 400;
    pub const DEPLOYMENT_TIMEOUT_SECS: u64 = 400;
    pub const APP_AVAILABLE_TIMEOUT_SECS: u64 = 300;
    pub const ROUTE_TIMEOUT_SECS: u64 = 100;
    pub const BINDING_TIMEOUT_SECS: u64 = 800;
    pub const SECRET_TIMEOUT_SECS: u64 = 120;
    pub const REDEPLOY_TIMEOUT_SECS: u64 = 300;
    pub const HTTP_TIMEOUT_SECS: u64 = 400;
    /// Single HTTP request, connect included
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
}

/// Defaults for the performance upload
pub mod perf {
    pub const INDEX: &str = "sbo-perf-data";
    pub const DOC_ID_LEN: usize = 6;
    pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S.%f";
    /// Timestamps longer than this are truncated before parsing
    pub const TIMESTAMP_WIDTH: usize = 26;
}
