//! In-memory [`ClusterApi`] for tests and dry runs.
//!
//! Assigns resource versions and UIDs, enforces optimistic concurrency on
//! replace, bumps StatefulSet generations on spec changes, and fans
//! StatefulSet changes out to open watches. Optionally marks every written
//! StatefulSet as rolled out.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetStatus};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::trace;

use super::api::{ApiError, ClusterApi, WorkloadSubscription};
use super::{ClusterObject, ResourceKind};
use crate::k8s::AvalancheClusterStatus;

const WATCH_CAPACITY: usize = 256;

type ObjectKey = (ResourceKind, String, String);

#[derive(Debug, Clone)]
enum WatchEvent {
    Applied(StatefulSet),
    Failed(String),
}

#[derive(Default)]
struct Store {
    objects: BTreeMap<ObjectKey, ClusterObject>,
    statuses: BTreeMap<(String, String), AvalancheClusterStatus>,
    status_patches: usize,
    next_version: u64,
    failing_kinds: HashSet<ResourceKind>,
    fail_status_patches: bool,
}

impl Store {
    fn bump_version(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }
}

/// Decrements the open-watch count when the subscription is dropped.
struct WatchGuard(Arc<AtomicUsize>);

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct MemoryCluster {
    store: Mutex<Store>,
    events: broadcast::Sender<WatchEvent>,
    active_watches: Arc<AtomicUsize>,
    auto_rollout: bool,
}

impl Default for MemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCluster {
    /// StatefulSets stay unready until [`Self::set_stateful_set_status`] is called.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(WATCH_CAPACITY);
        Self {
            store: Mutex::new(Store::default()),
            events,
            active_watches: Arc::new(AtomicUsize::new(0)),
            auto_rollout: false,
        }
    }

    /// Every created or replaced StatefulSet immediately reports all replicas ready.
    pub fn with_auto_rollout() -> Self {
        Self { auto_rollout: true, ..Self::new() }
    }

    pub fn get_object(&self, kind: ResourceKind, namespace: &str, name: &str) -> Option<ClusterObject> {
        let key = (kind, namespace.to_string(), name.to_string());
        self.store.lock().objects.get(&key).cloned()
    }

    pub fn objects_of(&self, kind: ResourceKind) -> Vec<ClusterObject> {
        self.store
            .lock()
            .objects
            .iter()
            .filter(|((k, _, _), _)| *k == kind)
            .map(|(_, o)| o.clone())
            .collect()
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        self.store.lock().objects.keys().filter(|(k, _, _)| *k == kind).count()
    }

    pub fn total_objects(&self) -> usize {
        self.store.lock().objects.len()
    }

    /// Store an object as if another actor had written it.
    pub fn insert(&self, mut object: ClusterObject) -> Result<ClusterObject, ApiError> {
        let key = key_of(&object)?;
        let mut store = self.store.lock();
        let version = store.bump_version();
        object.set_resource_version(Some(version));
        store.objects.insert(key, object.clone());
        Ok(object)
    }

    /// Last status written for a cluster resource.
    pub fn status(&self, namespace: &str, name: &str) -> Option<AvalancheClusterStatus> {
        self.store
            .lock()
            .statuses
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn status_patch_count(&self) -> usize {
        self.store.lock().status_patches
    }

    /// Reject every create and replace of `kind`.
    pub fn fail_writes_for(&self, kind: ResourceKind) {
        self.store.lock().failing_kinds.insert(kind);
    }

    pub fn fail_status_patches(&self, fail: bool) {
        self.store.lock().fail_status_patches = fail;
    }

    /// Number of StatefulSet watches still open.
    pub fn active_watches(&self) -> usize {
        self.active_watches.load(Ordering::SeqCst)
    }

    /// Overwrite a StatefulSet's status and notify watchers.
    pub fn set_stateful_set_status(
        &self,
        namespace: &str,
        name: &str,
        status: StatefulSetStatus,
    ) -> Result<StatefulSet, ApiError> {
        let key = (ResourceKind::StatefulSet, namespace.to_string(), name.to_string());
        let mut store = self.store.lock();
        let version = store.bump_version();
        let sts = match store.objects.get_mut(&key) {
            Some(ClusterObject::StatefulSet(sts)) => {
                sts.status = Some(status);
                sts.metadata.resource_version = Some(version);
                sts.clone()
            }
            _ => {
                return Err(ApiError::NotFound {
                    kind: ResourceKind::StatefulSet,
                    name: name.to_string(),
                })
            }
        };
        drop(store);
        let _ = self.events.send(WatchEvent::Applied(sts.clone()));
        Ok(sts)
    }

    /// Deliver a watch failure to every open subscription.
    pub fn break_watches(&self, message: &str) {
        let _ = self.events.send(WatchEvent::Failed(message.to_string()));
    }

    fn check_writable(store: &Store, object: &ClusterObject, name: &str) -> Result<(), ApiError> {
        if store.failing_kinds.contains(&object.kind()) {
            return Err(ApiError::Rejected {
                kind: object.kind(),
                name: name.to_string(),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn publish(&self, object: &ClusterObject) {
        if let ClusterObject::StatefulSet(sts) = object {
            let _ = self.events.send(WatchEvent::Applied(sts.clone()));
        }
    }

    fn roll_out(sts: &mut StatefulSet) {
        let replicas = sts.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
        let revision = format!(
            "{}-{}",
            sts.metadata.name.as_deref().unwrap_or("sts"),
            sts.metadata.generation.unwrap_or(1)
        );
        let collision_count = sts.status.as_ref().and_then(|s| s.collision_count);
        sts.status = Some(StatefulSetStatus {
            replicas,
            ready_replicas: Some(replicas),
            updated_replicas: Some(replicas),
            available_replicas: Some(replicas),
            current_replicas: Some(replicas),
            current_revision: Some(revision.clone()),
            update_revision: Some(revision),
            observed_generation: sts.metadata.generation,
            collision_count,
            ..Default::default()
        });
    }
}

fn key_of(object: &ClusterObject) -> Result<ObjectKey, ApiError> {
    let kind = object.kind();
    let name = object.name().ok_or(ApiError::MissingName(kind))?.to_string();
    let namespace = object
        .namespace()
        .ok_or_else(|| ApiError::MissingNamespace { kind, name: name.clone() })?
        .to_string();
    Ok((kind, namespace, name))
}

#[async_trait]
impl ClusterApi for MemoryCluster {
    async fn get(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ClusterObject>, ApiError> {
        Ok(self.get_object(kind, namespace, name))
    }

    async fn create(&self, object: &ClusterObject) -> Result<ClusterObject, ApiError> {
        let key = key_of(object)?;
        let mut store = self.store.lock();
        Self::check_writable(&store, object, &key.2)?;
        if store.objects.contains_key(&key) {
            return Err(ApiError::AlreadyExists { kind: key.0, name: key.2 });
        }

        let mut created = object.clone();
        let version = store.bump_version();
        let meta = created.metadata_mut();
        meta.resource_version = Some(version);
        meta.uid = Some(uuid::Uuid::new_v4().to_string());
        if let ClusterObject::StatefulSet(sts) = &mut created {
            sts.metadata.generation = Some(1);
            sts.status = None;
            if self.auto_rollout {
                Self::roll_out(sts);
            }
        }
        trace!(kind = %key.0, name = %key.2, "created");
        store.objects.insert(key, created.clone());
        drop(store);

        self.publish(&created);
        Ok(created)
    }

    async fn replace(&self, object: &ClusterObject) -> Result<ClusterObject, ApiError> {
        let key = key_of(object)?;
        let mut store = self.store.lock();
        Self::check_writable(&store, object, &key.2)?;
        let live = store
            .objects
            .get(&key)
            .cloned()
            .ok_or_else(|| ApiError::NotFound { kind: key.0, name: key.2.clone() })?;
        if object.resource_version() != live.resource_version() {
            return Err(ApiError::Conflict { kind: key.0, name: key.2 });
        }

        // Server-owned fields survive a replace.
        let mut replaced = object.clone();
        {
            let live_meta = live.metadata();
            let meta = replaced.metadata_mut();
            meta.uid = live_meta.uid.clone();
            meta.generation = live_meta.generation;
        }
        if let (ClusterObject::StatefulSet(sts), ClusterObject::StatefulSet(live_sts)) =
            (&mut replaced, &live)
        {
            sts.status = live_sts.status.clone();
        }
        if replaced == live {
            return Ok(live);
        }

        if let (ClusterObject::StatefulSet(sts), ClusterObject::StatefulSet(live_sts)) =
            (&mut replaced, &live)
        {
            if sts.spec != live_sts.spec {
                sts.metadata.generation = Some(live_sts.metadata.generation.unwrap_or(0) + 1);
                if self.auto_rollout {
                    Self::roll_out(sts);
                }
            }
        }
        let version = store.bump_version();
        replaced.set_resource_version(Some(version));
        trace!(kind = %key.0, name = %key.2, "replaced");
        store.objects.insert(key, replaced.clone());
        drop(store);

        self.publish(&replaced);
        Ok(replaced)
    }

    async fn watch_stateful_set(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<WorkloadSubscription, ApiError> {
        // Subscribe before the snapshot so no change between them is lost.
        let receiver = self.events.subscribe();
        self.active_watches.fetch_add(1, Ordering::SeqCst);
        let guard = WatchGuard(Arc::clone(&self.active_watches));

        let initial = self
            .get_object(ResourceKind::StatefulSet, namespace, name)
            .and_then(ClusterObject::into_stateful_set)
            .map(Ok);

        let namespace = namespace.to_string();
        let name = name.to_string();
        let updates = stream::unfold((receiver, guard), move |(mut receiver, guard)| {
            let namespace = namespace.clone();
            let name = name.clone();
            async move {
                loop {
                    match receiver.recv().await {
                        Ok(WatchEvent::Applied(sts)) => {
                            let matches = sts.metadata.name.as_deref() == Some(name.as_str())
                                && sts.metadata.namespace.as_deref() == Some(namespace.as_str());
                            if matches {
                                return Some((Ok(sts), (receiver, guard)));
                            }
                        }
                        Ok(WatchEvent::Failed(message)) => {
                            let error = ApiError::Watch { name: name.clone(), message };
                            return Some((Err(error), (receiver, guard)));
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }
        });

        Ok(WorkloadSubscription::new(stream::iter(initial).chain(updates).boxed()))
    }

    async fn patch_status(
        &self,
        namespace: &str,
        name: &str,
        status: &AvalancheClusterStatus,
    ) -> Result<(), ApiError> {
        let mut store = self.store.lock();
        if store.fail_status_patches {
            return Err(ApiError::StatusRejected {
                name: name.to_string(),
                message: "status subresource unavailable".to_string(),
            });
        }
        store.status_patches += 1;
        store
            .statuses
            .insert((namespace.to_string(), name.to_string()), status.clone());
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
