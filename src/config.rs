// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 300;
const DEFAULT_ERROR_REQUEUE_SECS: u64 = 60;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Only watch TenantControlPlanes in this namespace, all namespaces when unset
    pub watch_namespace: Option<String>,
    /// Interval between passes for a healthy control plane
    pub resync_interval: Duration,
    /// Backoff applied after a failed pass
    pub error_requeue: Duration,
    pub testing_mode: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let watch_namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.is_empty());

        let resync_interval = parse_secs(&lookup, "RESYNC_INTERVAL_SECS", DEFAULT_RESYNC_INTERVAL_SECS)?;
        let error_requeue = parse_secs(&lookup, "ERROR_REQUEUE_SECS", DEFAULT_ERROR_REQUEUE_SECS)?;

        // For testing, reuse the local kubeconfig as the tenant client instead of reading admin secrets
        let testing_mode: bool = lookup("TESTING_MODE")
            .unwrap_or("false".to_string())
            .parse()
            .unwrap_or(false);

        Ok(Config {
            watch_namespace,
            resync_interval,
            error_requeue,
            testing_mode,
        })
    }
}

fn parse_secs<F>(lookup: &F, key: &str, default: u64) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = match lookup(key) {
        Some(value) => value
            .parse::<u64>()
            .with_context(|| format!("{} must be a number of seconds, got '{}'", key, value))?,
        None => default,
    };
    Ok(Duration::from_secs(secs))
}
