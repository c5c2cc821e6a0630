// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use kube::Client;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use konnectivity_addon::config::Config;
use konnectivity_addon::kubernetes::wait_for_tenant_control_plane_crd;
use konnectivity_addon::reconcilers::TenantControlPlaneReconciler;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting konnectivity add-on operator");

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: watch_namespace={}, resync_interval={:?}, testing_mode={}",
        config.watch_namespace.as_deref().unwrap_or("<all>"),
        config.resync_interval,
        config.testing_mode
    );

    let client = Client::try_default()
        .await
        .context("Failed to create management cluster client")?;
    info!("Connected to Kubernetes cluster");

    info!("Waiting for TenantControlPlane CRD to become available...");
    wait_for_tenant_control_plane_crd(&client).await?;

    let reconciler = TenantControlPlaneReconciler::new(client, config);

    info!("Starting reconciler...");
    reconciler.run().await?;

    // This should never be reached as the reconciler runs forever
    warn!("Reconciler stopped unexpectedly");
    Ok(())
}
