// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! TenantControlPlane reconciler - drives the konnectivity agent lifecycle and persists its status.

use crate::addons::konnectivity::Agent;
use crate::config::Config;
use crate::constants::OPERATOR_NAME;
use crate::error::{AddonError, Result};
use crate::kubernetes::{KubeconfigResolver, OperationResult, TenantClientResolver};
use crate::types::tenant_control_plane::{ExternalObjectStatus, TenantControlPlane};
use futures::StreamExt;
use kube::{
    api::{Patch, PatchParams},
    runtime::{controller::Action, Controller},
    Api, Client, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub struct TenantControlPlaneReconciler {
    client: Client,
    config: Config,
    resolver: KubeconfigResolver,
}

impl TenantControlPlaneReconciler {
    pub fn new(client: Client, config: Config) -> Self {
        let resolver = KubeconfigResolver::new(client.clone(), config.clone());
        Self {
            client,
            config,
            resolver,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let tcps: Api<TenantControlPlane> = match &self.config.watch_namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        };
        let context = Arc::new(self);

        Controller::new(tcps, WatcherConfig::default())
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled tenant control plane: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

/// Change to the agent status that a pass needs to persist
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    Unchanged,
    Set(ExternalObjectStatus),
    Clear,
}

/// Result of a pass that got as far as computing status
#[derive(Debug)]
pub struct PassOutcome {
    pub status: StatusUpdate,
    /// Failure that happened after status was decided. Status is persisted regardless.
    pub error: Option<AddonError>,
}

/// Run one pass for the konnectivity agent of `tcp`.
///
/// Errors returned here abort the pass before status is touched.
#[instrument(skip(resolver, tcp), fields(tcp = %format!("{}/{}", tcp.namespace().unwrap_or_default(), tcp.name_any())))]
pub async fn reconcile_agent<R: TenantClientResolver>(
    resolver: &R,
    tcp: &TenantControlPlane,
) -> Result<PassOutcome> {
    let mut agent = Agent::initialize(resolver, tcp).await?;
    let mut updated = tcp.clone();

    if Agent::should_cleanup(tcp) {
        // Status is cleared even when the delete fails, the next pass retries the delete.
        let error = match agent.clean_up().await {
            Ok(deleted) => {
                debug!("Konnectivity agent cleanup done, deleted={}", deleted);
                None
            }
            Err(e) => Some(e),
        };

        agent.update_status(&mut updated);
        let status = if updated.agent_status().is_none() && tcp.agent_status().is_some() {
            StatusUpdate::Clear
        } else {
            StatusUpdate::Unchanged
        };
        return Ok(PassOutcome { status, error });
    }

    let result = agent.reconcile(tcp).await?;
    agent.update_status(&mut updated);

    let status = match updated.agent_status() {
        Some(new) if needs_status_write(result, tcp.agent_status(), new) => {
            StatusUpdate::Set(new.clone())
        }
        _ => StatusUpdate::Unchanged,
    };

    Ok(PassOutcome {
        status,
        error: None,
    })
}

fn needs_status_write(
    result: OperationResult,
    previous: Option<&ExternalObjectStatus>,
    new: &ExternalObjectStatus,
) -> bool {
    result != OperationResult::None
        || !previous.is_some_and(|p| p.name == new.name && p.namespace == new.namespace)
}

/// Persist an agent status change on the TenantControlPlane status sub-resource
pub async fn persist_status(
    api: &Api<TenantControlPlane>,
    name: &str,
    update: &StatusUpdate,
) -> Result<()> {
    let agent = match update {
        StatusUpdate::Unchanged => return Ok(()),
        StatusUpdate::Set(status) => serde_json::to_value(status)?,
        // null removes the key in a merge patch
        StatusUpdate::Clear => Value::Null,
    };

    let patch = json!({
        "status": {
            "addons": {
                "konnectivity": {
                    "agent": agent
                }
            }
        }
    });
    let pp = PatchParams {
        field_manager: Some(OPERATOR_NAME.to_string()),
        ..Default::default()
    };
    api.patch_status(name, &pp, &Patch::Merge(&patch)).await?;

    info!("Updated konnectivity agent status of {}", name);
    Ok(())
}

/// Run a pass and persist its status, surfacing any deferred error afterwards
pub async fn reconcile_and_persist<R: TenantClientResolver>(
    resolver: &R,
    manager_client: &Client,
    tcp: &TenantControlPlane,
) -> Result<()> {
    let outcome = reconcile_agent(resolver, tcp).await?;

    let namespace = tcp.namespace().unwrap_or_default();
    let api: Api<TenantControlPlane> = Api::namespaced(manager_client.clone(), &namespace);
    persist_status(&api, &tcp.name_any(), &outcome.status).await?;

    match outcome.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

async fn reconcile(
    tcp: Arc<TenantControlPlane>,
    ctx: Arc<TenantControlPlaneReconciler>,
) -> Result<Action> {
    debug!("Reconciling tenant control plane: {}", tcp.name_any());

    reconcile_and_persist(&ctx.resolver, &ctx.client, &tcp).await?;

    // The tenant cluster is not watched, periodic resync corrects drift there
    Ok(Action::requeue(ctx.config.resync_interval))
}

fn error_policy(
    tcp: Arc<TenantControlPlane>,
    error: &AddonError,
    ctx: Arc<TenantControlPlaneReconciler>,
) -> Action {
    error!("Reconciliation error for {}: {}", tcp.name_any(), error);
    Action::requeue(ctx.config.error_requeue)
}
