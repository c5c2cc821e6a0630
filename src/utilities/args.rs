// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Conversion between flat `--flag=value` argument lists and flag maps

use std::collections::BTreeMap;

/// Parse `--flag=value` entries into a map keyed by flag. Entries without a
/// value map to an empty string; later duplicates win.
pub fn args_from_slice_to_map(args: &[String]) -> BTreeMap<String, String> {
    args.iter()
        .map(|arg| match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), value.to_string()),
            None => (arg.clone(), String::new()),
        })
        .collect()
}

/// Flatten a flag map back into `--flag=value` entries.
///
/// Entries are ordered by flag name, not by the formatted entry, so `--foo=1`
/// comes before `--foo.x=2`.
pub fn args_from_map_to_slice(args: &BTreeMap<String, String>) -> Vec<String> {
    args.iter()
        .map(|(flag, value)| {
            if value.is_empty() {
                flag.clone()
            } else {
                format!("{}={}", flag, value)
            }
        })
        .collect()
}
