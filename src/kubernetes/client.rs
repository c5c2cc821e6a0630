// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Tenant cluster client resolution and kubeconfig utilities

use crate::config::Config;
use crate::constants::kubeconfig::ADMIN_KEY;
use crate::error::{AddonError, Result};
use crate::types::tenant_control_plane::TenantControlPlane;
use k8s_openapi::api::core::v1::Secret;
use kube::{config::KubeConfigOptions, Api, Client, Config as KConfig, ResourceExt};
use std::future::Future;
use tracing::{debug, info, instrument};

/// Resolves a client bound to the tenant's own cluster.
pub trait TenantClientResolver: Send + Sync {
    fn resolve(&self, tcp: &TenantControlPlane) -> impl Future<Output = Result<Client>> + Send;
}

/// Builds tenant clients from the admin kubeconfig secret stored next to the control plane
#[derive(Clone)]
pub struct KubeconfigResolver {
    manager_client: Client,
    config: Config,
}

impl KubeconfigResolver {
    pub fn new(manager_client: Client, config: Config) -> Self {
        Self {
            manager_client,
            config,
        }
    }
}

impl TenantClientResolver for KubeconfigResolver {
    #[instrument(skip(self, tcp), fields(tcp = %tcp.name_any()))]
    async fn resolve(&self, tcp: &TenantControlPlane) -> Result<Client> {
        if self.config.testing_mode {
            debug!("Testing mode: reusing local kubeconfig as tenant client");
            create_testing_client().await
        } else {
            let kubeconfig = get_admin_kubeconfig(&self.manager_client, tcp).await?;
            create_client_from_kubeconfig(&kubeconfig).await
        }
    }
}

/// Create a client for testing mode (uses the inferred local config)
async fn create_testing_client() -> Result<Client> {
    let c = KConfig::infer()
        .await
        .map_err(|e| AddonError::ResolutionError(format!("Failed to infer config: {}", e)))?;

    Client::try_from(c)
        .map_err(|e| AddonError::ResolutionError(format!("Failed to create client: {}", e)))
}

/// Get the admin kubeconfig of a tenant control plane
#[instrument(skip(client, tcp), fields(tcp = %tcp.name_any()))]
async fn get_admin_kubeconfig(client: &Client, tcp: &TenantControlPlane) -> Result<String> {
    let tcp_name = tcp.name_any();
    let secret_name = tcp.admin_kubeconfig_secret_name();
    let namespace = tcp.namespace().unwrap_or_else(|| "default".to_string());
    let secrets: Api<Secret> = Api::namespaced(client.clone(), &namespace);

    info!(
        "Getting admin kubeconfig secret '{}/{}' for control plane '{}'...",
        namespace, secret_name, tcp_name
    );

    let secret = secrets.get(&secret_name).await.map_err(|e| {
        AddonError::ResolutionError(format!(
            "Failed to get kubeconfig secret for control plane {}: {}",
            tcp_name, e
        ))
    })?;

    kubeconfig_from_secret(&secret, &tcp_name)
}

fn kubeconfig_from_secret(secret: &Secret, tcp_name: &str) -> Result<String> {
    let Some(data) = secret.data.as_ref() else {
        return Err(AddonError::ResolutionError(format!(
            "Kubeconfig secret for control plane {} has no data",
            tcp_name
        )));
    };

    let Some(kubeconfig_data) = data.get(ADMIN_KEY) else {
        return Err(AddonError::ResolutionError(format!(
            "Kubeconfig secret for control plane {} does not contain '{}' key",
            tcp_name, ADMIN_KEY
        )));
    };

    String::from_utf8(kubeconfig_data.0.clone()).map_err(|e| {
        AddonError::ResolutionError(format!(
            "Failed to decode kubeconfig for control plane {}: {}",
            tcp_name, e
        ))
    })
}

/// Create a Kubernetes client from a kubeconfig string
async fn create_client_from_kubeconfig(kubeconfig: &str) -> Result<Client> {
    use kube::config::Kubeconfig;

    let kubeconfig_parsed: Kubeconfig = serde_yaml::from_str(kubeconfig)
        .map_err(|e| AddonError::ResolutionError(format!("Failed to parse kubeconfig: {}", e)))?;

    let client_config =
        kube::Config::from_custom_kubeconfig(kubeconfig_parsed, &KubeConfigOptions::default())
            .await
            .map_err(|e| {
                AddonError::ResolutionError(format!("Failed to create config: {}", e))
            })?;

    Client::try_from(client_config)
        .map_err(|e| AddonError::ResolutionError(format!("Failed to create client: {}", e)))
}
