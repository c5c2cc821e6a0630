// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Stateless helpers for labels and command-line arguments.

pub mod args;
pub mod labels;

pub use args::{args_from_map_to_slice, args_from_slice_to_map};
pub use labels::{merge_maps, tenant_labels};
