//! [`ClusterApi`] backed by a Kubernetes API server.

use std::fmt::Debug;

use async_trait::async_trait;
use futures::stream::StreamExt;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::api::{ApiError, ClusterApi, WorkloadSubscription};
use super::{ClusterObject, ResourceKind};
use crate::k8s::{AvalancheCluster, AvalancheClusterStatus};

/// Field manager recorded on status patches.
pub const FIELD_MANAGER: &str = "avago-operator";

#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
}

impl KubeClusterApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn get_as<K>(&self, namespace: &str, name: &str) -> Result<Option<K>, ApiError>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + Debug,
    {
        Ok(self.api::<K>(namespace).get_opt(name).await?)
    }

    async fn write_as<K>(&self, kind: ResourceKind, object: &K, replace: bool) -> Result<K, ApiError>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + Serialize
            + Debug,
    {
        let meta = object.meta();
        let name = meta.name.clone().ok_or(ApiError::MissingName(kind))?;
        let namespace = meta
            .namespace
            .clone()
            .ok_or_else(|| ApiError::MissingNamespace { kind, name: name.clone() })?;

        let api = self.api::<K>(&namespace);
        let params = PostParams::default();
        let result = if replace {
            api.replace(&name, &params, object).await
        } else {
            api.create(&params, object).await
        };
        result.map_err(|e| classify(kind, &name, e))
    }
}

/// Map API server status responses onto typed errors.
fn classify(kind: ResourceKind, name: &str, error: kube::Error) -> ApiError {
    let name = name.to_string();
    match error {
        kube::Error::Api(response) => match (response.code, response.reason.as_str()) {
            (404, _) => ApiError::NotFound { kind, name },
            (409, "AlreadyExists") => ApiError::AlreadyExists { kind, name },
            (409, _) => ApiError::Conflict { kind, name },
            (400 | 422, _) => ApiError::Rejected { kind, name, message: response.message },
            _ => ApiError::Kube(kube::Error::Api(response)),
        },
        other => ApiError::Kube(other),
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn get(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ClusterObject>, ApiError> {
        let object = match kind {
            ResourceKind::ConfigMap => self.get_as(namespace, name).await?.map(ClusterObject::ConfigMap),
            ResourceKind::Secret => self.get_as(namespace, name).await?.map(ClusterObject::Secret),
            ResourceKind::Service => self.get_as(namespace, name).await?.map(ClusterObject::Service),
            ResourceKind::PersistentVolumeClaim => self
                .get_as(namespace, name)
                .await?
                .map(ClusterObject::PersistentVolumeClaim),
            ResourceKind::StatefulSet => {
                self.get_as(namespace, name).await?.map(ClusterObject::StatefulSet)
            }
        };
        Ok(object)
    }

    async fn create(&self, object: &ClusterObject) -> Result<ClusterObject, ApiError> {
        let kind = object.kind();
        Ok(match object {
            ClusterObject::ConfigMap(o) => self.write_as(kind, o, false).await?.into(),
            ClusterObject::Secret(o) => self.write_as(kind, o, false).await?.into(),
            ClusterObject::Service(o) => self.write_as(kind, o, false).await?.into(),
            ClusterObject::PersistentVolumeClaim(o) => self.write_as(kind, o, false).await?.into(),
            ClusterObject::StatefulSet(o) => self.write_as(kind, o, false).await?.into(),
        })
    }

    async fn replace(&self, object: &ClusterObject) -> Result<ClusterObject, ApiError> {
        let kind = object.kind();
        Ok(match object {
            ClusterObject::ConfigMap(o) => self.write_as(kind, o, true).await?.into(),
            ClusterObject::Secret(o) => self.write_as(kind, o, true).await?.into(),
            ClusterObject::Service(o) => self.write_as(kind, o, true).await?.into(),
            ClusterObject::PersistentVolumeClaim(o) => self.write_as(kind, o, true).await?.into(),
            ClusterObject::StatefulSet(o) => self.write_as(kind, o, true).await?.into(),
        })
    }

    async fn watch_stateful_set(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<WorkloadSubscription, ApiError> {
        let api: Api<StatefulSet> = self.api(namespace);
        let config = watcher::Config::default().fields(&format!("metadata.name={}", name));
        debug!(namespace, name, "opening StatefulSet watch");

        // Read the current state now so it predates the caller's deadline;
        // the watcher itself only connects when first polled.
        let initial = api.get_opt(name).await?;

        let owned = name.to_string();
        let updates = watcher(api, config)
            .default_backoff()
            .applied_objects()
            .map(move |item| {
                item.map_err(|e| ApiError::Watch { name: owned.clone(), message: e.to_string() })
            });
        let stream = futures::stream::iter(initial.map(Ok)).chain(updates).boxed();
        Ok(WorkloadSubscription::new(stream))
    }

    async fn patch_status(
        &self,
        namespace: &str,
        name: &str,
        status: &AvalancheClusterStatus,
    ) -> Result<(), ApiError> {
        let api: Api<AvalancheCluster> = self.api(namespace);
        let patch = serde_json::json!({ "status": status });
        api.patch_status(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}
