// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AddonError {
    #[error("Unable to resolve tenant client: {0}")]
    ResolutionError(String),

    #[error("Control plane address not assigned: {0}")]
    AddressResolutionError(String),

    #[error("Kubernetes API error: {0}")]
    StoreError(#[from] kube::Error),

    #[error("Mutation changed object identity: {0}")]
    IdentityChangedError(String),

    #[error("Serialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AddonError>;
