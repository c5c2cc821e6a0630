// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Read-modify-write convergence of a single object.

use crate::constants::OPERATOR_NAME;
use crate::error::{AddonError, Result};
use kube::{api::PostParams, Api, Resource, ResourceExt};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::{self, Debug};
use tracing::debug;

/// Outcome of [`create_or_update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    None,
    Created,
    Updated,
}

impl fmt::Display for OperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationResult::None => write!(f, "unchanged"),
            OperationResult::Created => write!(f, "created"),
            OperationResult::Updated => write!(f, "updated"),
        }
    }
}

/// Converge `obj` in the store.
///
/// The stored object is re-read by name and `mutate` is applied on top of it,
/// so fields the mutate function does not own are preserved. Nothing is written
/// when the mutated object equals the stored one. Updates carry the stored
/// `resourceVersion`, so a concurrent write surfaces as a conflict instead of
/// being overwritten. On success `obj` holds the object as returned by the store.
pub async fn create_or_update<K, F>(api: &Api<K>, obj: &mut K, mutate: F) -> Result<OperationResult>
where
    K: Resource + Clone + Serialize + DeserializeOwned + Debug + PartialEq,
    F: FnOnce(&mut K) -> Result<()>,
{
    let name = obj.name_any();
    let namespace = obj.namespace();

    match api.get_opt(&name).await? {
        None => {
            mutate(obj)?;
            ensure_identity(obj, &name, namespace.as_deref())?;

            debug!("Creating {}", name);
            *obj = api.create(&post_params(), obj).await?;
            Ok(OperationResult::Created)
        }
        Some(existing) => {
            let mut desired = existing.clone();
            mutate(&mut desired)?;
            ensure_identity(&desired, &name, namespace.as_deref())?;

            if desired == existing {
                *obj = existing;
                return Ok(OperationResult::None);
            }

            debug!("Updating {}", name);
            *obj = api.replace(&name, &post_params(), &desired).await?;
            Ok(OperationResult::Updated)
        }
    }
}

fn post_params() -> PostParams {
    PostParams {
        dry_run: false,
        field_manager: Some(OPERATOR_NAME.to_string()),
    }
}

fn ensure_identity<K: Resource>(obj: &K, name: &str, namespace: Option<&str>) -> Result<()> {
    let actual_namespace = obj.meta().namespace.as_deref();
    if obj.meta().name.as_deref() != Some(name) || actual_namespace != namespace {
        return Err(AddonError::IdentityChangedError(format!(
            "expected {}/{}, got {}/{}",
            namespace.unwrap_or_default(),
            name,
            actual_namespace.unwrap_or_default(),
            obj.meta().name.as_deref().unwrap_or_default()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{not_found_json, MockService};
    use k8s_openapi::api::core::v1::ConfigMap;
    use kube::api::ObjectMeta;
    use std::collections::BTreeMap;

    const PATH: &str = "/api/v1/namespaces/kube-system/configmaps";
    const ITEM_PATH: &str = "/api/v1/namespaces/kube-system/configmaps/settings";

    fn identity() -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some("settings".to_string()),
                namespace: Some("kube-system".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn stored(value: &str) -> ConfigMap {
        let mut cm = identity();
        cm.metadata.resource_version = Some("42".to_string());
        cm.data = Some(BTreeMap::from([("mode".to_string(), value.to_string())]));
        cm
    }

    fn set_mode(cm: &mut ConfigMap) -> Result<()> {
        cm.data
            .get_or_insert_with(BTreeMap::new)
            .insert("mode".to_string(), "on".to_string());
        Ok(())
    }

    #[tokio::test]
    async fn test_creates_missing_object() {
        let mock = MockService::new()
            .on_get(ITEM_PATH, 404, &not_found_json("configmaps", "settings"))
            .on_post(PATH, 201, &serde_json::to_string(&stored("on")).unwrap());
        let api: Api<ConfigMap> = Api::namespaced(mock.clone().into_client(), "kube-system");

        let mut obj = identity();
        let result = create_or_update(&api, &mut obj, set_mode).await.unwrap();

        assert_eq!(result, OperationResult::Created);
        assert_eq!(obj, stored("on"));
        let posted: ConfigMap = mock.last_body("POST", PATH).unwrap();
        assert_eq!(posted.data.unwrap().get("mode").unwrap(), "on");
    }

    #[tokio::test]
    async fn test_unchanged_object_is_not_written() {
        let mock = MockService::new().on_get(ITEM_PATH, 200, &serde_json::to_string(&stored("on")).unwrap());
        let api: Api<ConfigMap> = Api::namespaced(mock.clone().into_client(), "kube-system");

        let mut obj = identity();
        let result = create_or_update(&api, &mut obj, set_mode).await.unwrap();

        assert_eq!(result, OperationResult::None);
        assert_eq!(mock.requests(), vec![("GET".to_string(), ITEM_PATH.to_string())]);
    }

    #[tokio::test]
    async fn test_drifted_object_is_replaced_with_resource_version() {
        let mock = MockService::new()
            .on_get(ITEM_PATH, 200, &serde_json::to_string(&stored("off")).unwrap())
            .on_put(ITEM_PATH, 200, &serde_json::to_string(&stored("on")).unwrap());
        let api: Api<ConfigMap> = Api::namespaced(mock.clone().into_client(), "kube-system");

        let mut obj = identity();
        let result = create_or_update(&api, &mut obj, set_mode).await.unwrap();

        assert_eq!(result, OperationResult::Updated);
        let put: ConfigMap = mock.last_body("PUT", ITEM_PATH).unwrap();
        assert_eq!(put.metadata.resource_version.as_deref(), Some("42"));
        assert_eq!(put.data.unwrap().get("mode").unwrap(), "on");
    }

    #[tokio::test]
    async fn test_mutate_error_aborts_before_write() {
        let mock = MockService::new().on_get(ITEM_PATH, 404, &not_found_json("configmaps", "settings"));
        let api: Api<ConfigMap> = Api::namespaced(mock.clone().into_client(), "kube-system");

        let mut obj = identity();
        let result = create_or_update(&api, &mut obj, |_| {
            Err(AddonError::AddressResolutionError("not exposed".to_string()))
        })
        .await;

        assert!(matches!(result, Err(AddonError::AddressResolutionError(_))));
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_identity_change_is_rejected() {
        let mock = MockService::new().on_get(ITEM_PATH, 404, &not_found_json("configmaps", "settings"));
        let api: Api<ConfigMap> = Api::namespaced(mock.clone().into_client(), "kube-system");

        let mut obj = identity();
        let result = create_or_update(&api, &mut obj, |cm| {
            cm.metadata.name = Some("renamed".to_string());
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(AddonError::IdentityChangedError(_))));
    }

    #[tokio::test]
    async fn test_store_error_is_surfaced() {
        let conflict = serde_json::json!({
            "kind": "Status",
            "apiVersion": "v1",
            "status": "Failure",
            "message": "the object has been modified",
            "reason": "Conflict",
            "code": 409
        });
        let mock = MockService::new()
            .on_get(ITEM_PATH, 200, &serde_json::to_string(&stored("off")).unwrap())
            .on_put(ITEM_PATH, 409, &conflict.to_string());
        let api: Api<ConfigMap> = Api::namespaced(mock.into_client(), "kube-system");

        let mut obj = identity();
        let result = create_or_update(&api, &mut obj, set_mode).await;

        assert!(matches!(
            result,
            Err(AddonError::StoreError(kube::Error::Api(ref e))) if e.code == 409
        ));
    }
}
