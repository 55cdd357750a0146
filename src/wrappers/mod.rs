// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Domain objects composed from cluster accessors.
//!
//! Wrappers hold only their identity; each operation takes the [`Cluster`]
//! it runs against, so the same wrapper can live in a scenario context.
//!
//! [`Cluster`]: crate::cluster::Cluster

pub mod application;
pub mod binding;
pub mod namespace;
pub mod sbo;
pub mod secret;
pub mod services;

pub use application::{AppKind, Application};
pub use binding::ServiceBinding;
pub use namespace::Namespace;
pub use secret::Secret;
pub use services::{EtcdCluster, KnativeServing, PostgresDb};
