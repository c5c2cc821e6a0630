// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Label helpers

use crate::constants::{labels, OPERATOR_NAME};
use std::collections::BTreeMap;

/// Ownership labels for an object managed on behalf of a tenant control plane
pub fn tenant_labels(tenant: &str, component: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (labels::PROJECT.to_string(), OPERATOR_NAME.to_string()),
        (labels::TENANT.to_string(), tenant.to_string()),
        (labels::COMPONENT.to_string(), component.to_string()),
    ])
}

/// Merge `overrides` into `base`. Keys in `overrides` win.
pub fn merge_maps(
    base: Option<BTreeMap<String, String>>,
    overrides: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = base.unwrap_or_default();
    merged.extend(overrides);
    merged
}
