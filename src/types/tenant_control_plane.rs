// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::kubeconfig::ADMIN_SECRET_SUFFIX;
use crate::error::{AddonError, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};

const DEFAULT_AGENT_IMAGE: &str = "registry.k8s.io/kas-network-proxy/proxy-agent";
const DEFAULT_AGENT_VERSION: &str = "v0.28.6";
const DEFAULT_SERVER_PORT: i32 = 8132;

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[kube(group = "kamaji.clastix.io", version = "v1alpha1", kind = "TenantControlPlane")]
#[kube(namespaced, shortname = "tcp")]
#[kube(status = "TenantControlPlaneStatus")]
#[serde(rename_all = "camelCase")]
pub struct TenantControlPlaneSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_profile: Option<NetworkProfileSpec>,
    #[serde(default)]
    pub addons: AddonsSpec,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProfileSpec {
    /// Address advertised for the control plane, used until an endpoint is assigned
    #[serde(default)]
    pub address: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddonsSpec {
    /// Presence enables the konnectivity add-on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub konnectivity: Option<KonnectivitySpec>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KonnectivitySpec {
    #[serde(default)]
    pub server: KonnectivityServerSpec,
    #[serde(default)]
    pub agent: KonnectivityAgentSpec,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KonnectivityServerSpec {
    /// Port the proxy server listens on, exposed through the control plane address
    #[serde(default = "default_server_port")]
    pub port: i32,
}

impl Default for KonnectivityServerSpec {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERVER_PORT,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KonnectivityAgentSpec {
    #[serde(default = "default_agent_image")]
    pub image: String,
    #[serde(default = "default_agent_version")]
    pub version: String,
    /// Additional `--flag=value` arguments; built-in flags cannot be overridden
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_args: Vec<String>,
}

impl Default for KonnectivityAgentSpec {
    fn default() -> Self {
        Self {
            image: default_agent_image(),
            version: default_agent_version(),
            extra_args: Vec::new(),
        }
    }
}

fn default_server_port() -> i32 {
    DEFAULT_SERVER_PORT
}

fn default_agent_image() -> String {
    DEFAULT_AGENT_IMAGE.to_string()
}

fn default_agent_version() -> String {
    DEFAULT_AGENT_VERSION.to_string()
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantControlPlaneStatus {
    /// Externally reachable `host:port` of the control plane, once assigned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_plane_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<KubeconfigsStatus>,
    #[serde(default)]
    pub addons: AddonsStatus,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubeconfigsStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<KubeconfigStatus>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubeconfigStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddonsStatus {
    #[serde(default)]
    pub konnectivity: KonnectivityStatus,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KonnectivityStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_role_binding: Option<NamedObjectStatus>,
    /// Absent while the add-on is disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<ExternalObjectStatus>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NamedObjectStatus {
    pub name: String,
}

/// An object the operator manages inside the tenant cluster
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalObjectStatus {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<Time>,
}

impl ExternalObjectStatus {
    /// An entry with no fields set, as left behind by a cleared status
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.namespace.is_empty() && self.last_update.is_none()
    }
}

/// Whether the konnectivity add-on is requested for a control plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AddonState<'a> {
    Enabled(&'a KonnectivitySpec),
    Disabled,
}

impl AddonState<'_> {
    pub fn is_enabled(&self) -> bool {
        matches!(self, AddonState::Enabled(_))
    }
}

impl TenantControlPlane {
    pub fn konnectivity(&self) -> AddonState<'_> {
        match &self.spec.addons.konnectivity {
            Some(addon) => AddonState::Enabled(addon),
            None => AddonState::Disabled,
        }
    }

    /// Host part of the assigned control plane endpoint.
    ///
    /// Falls back to `spec.networkProfile.address` while no endpoint has been assigned.
    pub fn assigned_control_plane_address(&self) -> Result<String> {
        let endpoint = self
            .status
            .as_ref()
            .and_then(|s| s.control_plane_endpoint.as_deref())
            .filter(|e| !e.is_empty());

        if let Some(endpoint) = endpoint {
            return split_host(endpoint).map(str::to_string).ok_or_else(|| {
                AddonError::AddressResolutionError(format!(
                    "invalid control plane endpoint '{}' for {}",
                    endpoint,
                    self.name_any()
                ))
            });
        }

        self.spec
            .network_profile
            .as_ref()
            .map(|np| np.address.as_str())
            .filter(|address| !address.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                AddonError::AddressResolutionError(format!(
                    "the Tenant Control Plane {} is not yet exposed",
                    self.name_any()
                ))
            })
    }

    /// The recorded agent entry, ignoring one that was cleared to an empty object
    pub fn agent_status(&self) -> Option<&ExternalObjectStatus> {
        self.status
            .as_ref()
            .and_then(|s| s.addons.konnectivity.agent.as_ref())
            .filter(|agent| !agent.is_empty())
    }

    /// Audience for the agent's projected token: the konnectivity role binding name
    pub fn agent_token_audience(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.addons.konnectivity.cluster_role_binding.as_ref())
            .map(|crb| crb.name.as_str())
            .filter(|name| !name.is_empty())
    }

    /// Name of the secret holding the tenant admin kubeconfig
    pub fn admin_kubeconfig_secret_name(&self) -> String {
        self.status
            .as_ref()
            .and_then(|s| s.kubeconfig.as_ref())
            .and_then(|k| k.admin.as_ref())
            .and_then(|a| a.secret_name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("{}{}", self.name_any(), ADMIN_SECRET_SUFFIX))
    }
}

/// Host part of `host:port` or `[host]:port`. The port must be numeric.
fn split_host(endpoint: &str) -> Option<&str> {
    let (host, port) = match endpoint.strip_prefix('[') {
        Some(rest) => {
            let (host, port) = rest.split_once(']')?;
            (host, port.strip_prefix(':')?)
        }
        None => {
            let (host, port) = endpoint.split_once(':')?;
            if host.contains(']') || port.contains(':') {
                return None;
            }
            (host, port)
        }
    };

    if host.is_empty() || port.parse::<u16>().is_err() {
        return None;
    }
    Some(host)
}
