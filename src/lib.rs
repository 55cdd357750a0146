// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod cluster;
pub mod command;
pub mod config;
pub mod constants;
pub mod error;
pub mod http;
pub mod manifest;
pub mod olm;
pub mod perf;
pub mod poll;
pub mod steps;
pub mod types;
pub mod wrappers;

#[cfg(test)]
pub(crate) mod test_utils;
