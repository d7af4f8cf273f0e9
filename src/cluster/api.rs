//! The cluster API seam used by the reconciler.

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use k8s_openapi::api::apps::v1::StatefulSet;
use thiserror::Error;

use super::{ClusterObject, ResourceKind};
use crate::k8s::AvalancheClusterStatus;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{kind} {name} not found")]
    NotFound { kind: ResourceKind, name: String },

    #[error("{kind} {name} already exists")]
    AlreadyExists { kind: ResourceKind, name: String },

    #[error("{kind} {name} was modified concurrently")]
    Conflict { kind: ResourceKind, name: String },

    #[error("{kind} {name} rejected: {message}")]
    Rejected { kind: ResourceKind, name: String, message: String },

    #[error("{0} has no name")]
    MissingName(ResourceKind),

    #[error("{kind} {name} has no namespace")]
    MissingNamespace { kind: ResourceKind, name: String },

    #[error("status update of {name} rejected: {message}")]
    StatusRejected { name: String, message: String },

    #[error("watch on StatefulSet {name} failed: {message}")]
    Watch { name: String, message: String },

    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
}

/// Live StatefulSet observations for one workload.
///
/// The first item is the state at subscription time. Dropping the
/// subscription closes the underlying watch.
pub struct WorkloadSubscription {
    stream: BoxStream<'static, Result<StatefulSet, ApiError>>,
}

impl WorkloadSubscription {
    pub fn new(stream: BoxStream<'static, Result<StatefulSet, ApiError>>) -> Self {
        Self { stream }
    }

    /// Next observation, or `None` once the watch has ended.
    pub async fn next(&mut self) -> Option<Result<StatefulSet, ApiError>> {
        self.stream.next().await
    }
}

impl std::fmt::Debug for WorkloadSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WorkloadSubscription(..)")
    }
}

/// Namespaced object store operations.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Fetch a live object, `None` when absent.
    async fn get(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ClusterObject>, ApiError>;

    async fn create(&self, object: &ClusterObject) -> Result<ClusterObject, ApiError>;

    /// Replace a live object. The target must carry the live resource version.
    async fn replace(&self, object: &ClusterObject) -> Result<ClusterObject, ApiError>;

    /// Open a watch on one StatefulSet.
    async fn watch_stateful_set(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<WorkloadSubscription, ApiError>;

    /// Merge-patch the status subresource of an AvalancheCluster.
    async fn patch_status(
        &self,
        namespace: &str,
        name: &str,
        status: &AvalancheClusterStatus,
    ) -> Result<(), ApiError>;
}
