// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for CRD discovery, tenant client resolution, and convergent apply.

pub mod apply;
pub mod client;
pub mod crd;

pub use apply::{create_or_update, OperationResult};
pub use client::{KubeconfigResolver, TenantClientResolver};
pub use crd::wait_for_tenant_control_plane_crd;
