// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Post-processing of performance runs.

pub mod kpi;
pub mod kpidiff;
pub mod upload;
