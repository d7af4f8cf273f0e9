// Copyright 2024-2026 GG-CORE Contributors
// SPDX-License-Identifier: Apache-2.0

//! Cluster object store access.
//!
//! A closed set of resource kinds, the per-kind update policy table, and
//! the [`ClusterApi`] seam with kube-backed and in-memory implementations.

pub mod api;
pub mod kube_api;
pub mod memory;
pub mod upsert;

use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Secret, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

pub use api::{ApiError, ClusterApi, WorkloadSubscription};
pub use kube_api::KubeClusterApi;
pub use memory::MemoryCluster;
pub use upsert::{upsert, UpsertOutcome};

/// Kinds of object the operator manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    ConfigMap,
    Secret,
    Service,
    PersistentVolumeClaim,
    StatefulSet,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        Self::ConfigMap,
        Self::Secret,
        Self::Service,
        Self::PersistentVolumeClaim,
        Self::StatefulSet,
    ];

    /// Policy applied when a live object of this kind already exists.
    ///
    /// Secrets are preserved unless the caller knows the content is
    /// authoritative.
    pub fn default_policy(self) -> UpdatePolicy {
        match self {
            Self::Secret => UpdatePolicy::Preserve,
            Self::ConfigMap | Self::Service | Self::PersistentVolumeClaim | Self::StatefulSet => {
                UpdatePolicy::Replace
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConfigMap => "ConfigMap",
            Self::Secret => "Secret",
            Self::Service => "Service",
            Self::PersistentVolumeClaim => "PersistentVolumeClaim",
            Self::StatefulSet => "StatefulSet",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with an object that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Overwrite the live object with the target.
    Replace,
    /// Leave the live object untouched.
    Preserve,
}

/// A desired or live object of one of the managed kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterObject {
    ConfigMap(ConfigMap),
    Secret(Secret),
    Service(Service),
    PersistentVolumeClaim(PersistentVolumeClaim),
    StatefulSet(StatefulSet),
}

impl ClusterObject {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::ConfigMap(_) => ResourceKind::ConfigMap,
            Self::Secret(_) => ResourceKind::Secret,
            Self::Service(_) => ResourceKind::Service,
            Self::PersistentVolumeClaim(_) => ResourceKind::PersistentVolumeClaim,
            Self::StatefulSet(_) => ResourceKind::StatefulSet,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::ConfigMap(o) => &o.metadata,
            Self::Secret(o) => &o.metadata,
            Self::Service(o) => &o.metadata,
            Self::PersistentVolumeClaim(o) => &o.metadata,
            Self::StatefulSet(o) => &o.metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            Self::ConfigMap(o) => &mut o.metadata,
            Self::Secret(o) => &mut o.metadata,
            Self::Service(o) => &mut o.metadata,
            Self::PersistentVolumeClaim(o) => &mut o.metadata,
            Self::StatefulSet(o) => &mut o.metadata,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata().name.as_deref()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata().namespace.as_deref()
    }

    pub fn resource_version(&self) -> Option<&str> {
        self.metadata().resource_version.as_deref()
    }

    pub fn set_resource_version(&mut self, version: Option<String>) {
        self.metadata_mut().resource_version = version;
    }

    /// Copy the cluster-assigned binding fields of a live claim onto this one.
    ///
    /// No-op unless both objects are claims.
    pub fn merge_claim_binding(&mut self, live: &ClusterObject) {
        if let (Self::PersistentVolumeClaim(target), Self::PersistentVolumeClaim(live)) =
            (self, live)
        {
            let live_spec = live.spec.clone().unwrap_or_default();
            let spec = target.spec.get_or_insert_with(Default::default);
            spec.volume_name = live_spec.volume_name;
            spec.storage_class_name = live_spec.storage_class_name;
        }
    }

    pub fn into_stateful_set(self) -> Option<StatefulSet> {
        match self {
            Self::StatefulSet(sts) => Some(sts),
            _ => None,
        }
    }
}

impl From<ConfigMap> for ClusterObject {
    fn from(o: ConfigMap) -> Self {
        Self::ConfigMap(o)
    }
}

impl From<Secret> for ClusterObject {
    fn from(o: Secret) -> Self {
        Self::Secret(o)
    }
}

impl From<Service> for ClusterObject {
    fn from(o: Service) -> Self {
        Self::Service(o)
    }
}

impl From<PersistentVolumeClaim> for ClusterObject {
    fn from(o: PersistentVolumeClaim) -> Self {
        Self::PersistentVolumeClaim(o)
    }
}

impl From<StatefulSet> for ClusterObject {
    fn from(o: StatefulSet) -> Self {
        Self::StatefulSet(o)
    }
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod tests;
