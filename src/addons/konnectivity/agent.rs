// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Lifecycle of the konnectivity agent DaemonSet inside a tenant cluster.

use crate::constants::{agent, labels};
use crate::error::Result;
use crate::kubernetes::{create_or_update, OperationResult, TenantClientResolver};
use crate::types::tenant_control_plane::{
    AddonState, ExternalObjectStatus, KonnectivitySpec, TenantControlPlane,
};
use crate::utilities::{args_from_map_to_slice, args_from_slice_to_map, merge_maps, tenant_labels};
use k8s_openapi::api::apps::v1::DaemonSet;
use k8s_openapi::api::core::v1::{
    Container, HTTPGetAction, Probe, ProjectedVolumeSource, ServiceAccountTokenProjection,
    Toleration, Volume, VolumeMount, VolumeProjection,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use k8s_openapi::chrono::Utc;
use kube::{api::DeleteParams, api::ObjectMeta, Api, Client, ResourceExt};
use std::collections::BTreeMap;
use tracing::{debug, error, info, instrument};

/// One reconcile pass for the agent of a single control plane.
///
/// Built fresh by [`Agent::initialize`] at the start of every pass and dropped
/// at the end of it.
pub struct Agent {
    resource: DaemonSet,
    tenant_client: Client,
}

impl Agent {
    /// True iff the add-on is disabled
    pub fn should_cleanup(tcp: &TenantControlPlane) -> bool {
        !tcp.konnectivity().is_enabled()
    }

    /// True iff the add-on is disabled but status still reports an agent
    pub fn should_report_status(tcp: &TenantControlPlane) -> bool {
        Self::should_cleanup(tcp)
            && tcp
                .agent_status()
                .is_some_and(|status| !status.namespace.is_empty())
    }

    /// Resolve the tenant client and set up the agent's identity
    #[instrument(skip(resolver, tcp), fields(tcp = %tcp.name_any()))]
    pub async fn initialize<R: TenantClientResolver>(
        resolver: &R,
        tcp: &TenantControlPlane,
    ) -> Result<Self> {
        let tenant_client = resolver.resolve(tcp).await.inspect_err(|e| {
            error!("Unable to retrieve the tenant control plane client: {}", e);
        })?;

        Ok(Self {
            resource: DaemonSet {
                metadata: ObjectMeta {
                    name: Some(agent::NAME.to_string()),
                    namespace: Some(agent::NAMESPACE.to_string()),
                    ..Default::default()
                },
                ..Default::default()
            },
            tenant_client,
        })
    }

    fn api(&self) -> Api<DaemonSet> {
        Api::namespaced(self.tenant_client.clone(), agent::NAMESPACE)
    }

    /// Converge the agent DaemonSet when the add-on is enabled
    #[instrument(skip(self, tcp), fields(tcp = %tcp.name_any()))]
    pub async fn reconcile(&mut self, tcp: &TenantControlPlane) -> Result<OperationResult> {
        let AddonState::Enabled(addon) = tcp.konnectivity() else {
            return Ok(OperationResult::None);
        };

        let api = self.api();
        let result = create_or_update(&api, &mut self.resource, |ds| mutate(ds, tcp, addon)).await?;
        match result {
            OperationResult::None => debug!("Konnectivity agent {}", result),
            _ => info!("Konnectivity agent {}", result),
        }

        Ok(result)
    }

    /// Delete the agent DaemonSet. Returns false when it was already gone.
    #[instrument(skip(self), fields(resource = agent::NAME))]
    pub async fn clean_up(&self) -> Result<bool> {
        match self.api().delete(agent::NAME, &DeleteParams::default()).await {
            Ok(_) => {
                info!("Konnectivity agent deleted");
                Ok(true)
            }
            Err(kube::Error::Api(err)) if err.code == 404 => Ok(false),
            Err(e) => {
                error!("Cannot delete the konnectivity agent: {}", e);
                Err(e.into())
            }
        }
    }

    /// Project the pass outcome into the in-memory status of `tcp`
    pub fn update_status(&self, tcp: &mut TenantControlPlane) {
        let agent_status = match tcp.konnectivity() {
            AddonState::Enabled(_) => Some(ExternalObjectStatus {
                name: self.resource.name_any(),
                namespace: self.resource.namespace().unwrap_or_default(),
                last_update: Some(Time(Utc::now())),
            }),
            AddonState::Disabled => None,
        };

        tcp.status
            .get_or_insert_with(Default::default)
            .addons
            .konnectivity
            .agent = agent_status;
    }
}

fn app_labels() -> BTreeMap<String, String> {
    BTreeMap::from([(labels::APP.to_string(), agent::NAME.to_string())])
}

/// Fill in every field of the agent DaemonSet this operator owns.
///
/// Owned fields are overwritten, so applying it twice yields the same object.
/// Pod template labels are merged to keep labels set by others.
pub fn mutate(ds: &mut DaemonSet, tcp: &TenantControlPlane, addon: &KonnectivitySpec) -> Result<()> {
    let address = tcp.assigned_control_plane_address().inspect_err(|e| {
        error!("Unable to retrieve the tenant control plane address: {}", e);
    })?;

    ds.metadata.labels = Some(tenant_labels(&tcp.name_any(), agent::NAME));

    let spec = ds.spec.get_or_insert_with(Default::default);
    spec.selector.match_labels = Some(app_labels());

    let template_meta = spec.template.metadata.get_or_insert_with(Default::default);
    template_meta.labels = Some(merge_maps(template_meta.labels.take(), app_labels()));

    let pod = spec.template.spec.get_or_insert_with(Default::default);
    pod.priority_class_name = Some(agent::PRIORITY_CLASS.to_string());
    pod.tolerations = Some(vec![Toleration {
        key: Some(agent::CRITICAL_ADDONS_TOLERATION.to_string()),
        operator: Some("Exists".to_string()),
        ..Default::default()
    }]);
    pod.node_selector = Some(BTreeMap::from([(
        agent::OS_NODE_SELECTOR_KEY.to_string(),
        agent::OS_NODE_SELECTOR_VALUE.to_string(),
    )]));
    pod.service_account_name = Some(agent::NAME.to_string());
    pod.volumes = Some(vec![token_volume(tcp.agent_token_audience())]);

    if pod.containers.len() != 1 {
        pod.containers = vec![Container::default()];
    }
    let container = &mut pod.containers[0];
    container.name = agent::NAME.to_string();
    container.image = Some(format!("{}:{}", addon.agent.image, addon.agent.version));
    container.command = Some(vec![agent::COMMAND.to_string()]);
    container.args = Some(agent_args(&address, addon));
    container.volume_mounts = Some(vec![VolumeMount {
        mount_path: agent::TOKEN_MOUNT_PATH.to_string(),
        name: agent::TOKEN_NAME.to_string(),
        ..Default::default()
    }]);
    container.liveness_probe = Some(liveness_probe());

    Ok(())
}

fn token_volume(audience: Option<&str>) -> Volume {
    Volume {
        name: agent::TOKEN_NAME.to_string(),
        projected: Some(ProjectedVolumeSource {
            sources: Some(vec![VolumeProjection {
                service_account_token: Some(ServiceAccountTokenProjection {
                    path: agent::TOKEN_NAME.to_string(),
                    audience: audience.map(str::to_string),
                    expiration_seconds: Some(agent::TOKEN_EXPIRATION_SECS),
                }),
                ..Default::default()
            }]),
            default_mode: Some(agent::TOKEN_FILE_MODE),
        }),
        ..Default::default()
    }
}

fn liveness_probe() -> Probe {
    Probe {
        http_get: Some(HTTPGetAction {
            path: Some(agent::probe::PATH.to_string()),
            port: IntOrString::Int(agent::HEALTH_SERVER_PORT),
            scheme: Some(agent::probe::SCHEME.to_string()),
            ..Default::default()
        }),
        initial_delay_seconds: Some(agent::probe::INITIAL_DELAY_SECS),
        timeout_seconds: Some(agent::probe::TIMEOUT_SECS),
        period_seconds: Some(agent::probe::PERIOD_SECS),
        success_threshold: Some(agent::probe::SUCCESS_THRESHOLD),
        failure_threshold: Some(agent::probe::FAILURE_THRESHOLD),
        ..Default::default()
    }
}

/// User extra args overlaid with the built-in ones. Built-ins always win.
fn agent_args(address: &str, addon: &KonnectivitySpec) -> Vec<String> {
    let mut args = args_from_slice_to_map(&addon.agent.extra_args);

    args.insert("-v".to_string(), "8".to_string());
    args.insert("--logtostderr".to_string(), "true".to_string());
    args.insert("--ca-cert".to_string(), agent::CA_CERT_PATH.to_string());
    args.insert("--proxy-server-host".to_string(), address.to_string());
    args.insert("--proxy-server-port".to_string(), addon.server.port.to_string());
    args.insert("--admin-server-port".to_string(), agent::ADMIN_SERVER_PORT.to_string());
    args.insert("--health-server-port".to_string(), agent::HEALTH_SERVER_PORT.to_string());
    args.insert(
        "--service-account-token-path".to_string(),
        format!("{}/{}", agent::TOKEN_MOUNT_PATH, agent::TOKEN_NAME),
    );

    args_from_map_to_slice(&args)
}
