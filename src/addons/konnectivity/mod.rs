// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Konnectivity add-on: the per-node proxy agent in the tenant cluster.

pub mod agent;

pub use agent::Agent;
