// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Operator installation through the Operator Lifecycle Manager.

pub mod installer;
pub mod known;
pub mod operator;

pub use installer::Installer;
pub use operator::{InstallSource, OperatorSpec, Readiness};
