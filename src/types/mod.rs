// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Typed views of the cluster objects the harness reads and writes.

pub mod binding;
pub mod olm;

pub use binding::{Condition, ServiceBindingState};
pub use olm::{CatalogSource, InstallPlanApproval, OperatorGroup, PackageManifest, Subscription};
