//! Create-if-absent, replace-if-eligible, else leave untouched.

use tracing::{debug, info};

use super::api::{ApiError, ClusterApi};
use super::{ClusterObject, ResourceKind, UpdatePolicy};

/// What [`upsert`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Replaced,
    /// A live object exists and the policy forbids touching it.
    Unchanged,
}

impl UpsertOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Replaced => "replaced",
            Self::Unchanged => "unchanged",
        }
    }
}

/// Ensure a live object matching `target` exists.
///
/// Claims inherit the live `volumeName` and `storageClassName` before the
/// write, since the cluster assigns them on binding.
pub async fn upsert(
    api: &dyn ClusterApi,
    mut target: ClusterObject,
    policy: UpdatePolicy,
) -> Result<UpsertOutcome, ApiError> {
    let kind = target.kind();
    let name = target.name().ok_or(ApiError::MissingName(kind))?.to_string();
    let namespace = target
        .namespace()
        .ok_or_else(|| ApiError::MissingNamespace { kind, name: name.clone() })?
        .to_string();

    let Some(live) = api.get(kind, &namespace, &name).await? else {
        api.create(&target).await?;
        info!(%kind, %namespace, %name, "created object");
        return Ok(UpsertOutcome::Created);
    };

    if kind == ResourceKind::PersistentVolumeClaim {
        target.merge_claim_binding(&live);
    }

    match policy {
        UpdatePolicy::Preserve => {
            debug!(%kind, %namespace, %name, "object exists and is not updatable");
            Ok(UpsertOutcome::Unchanged)
        }
        UpdatePolicy::Replace => {
            target.set_resource_version(live.resource_version().map(str::to_string));
            api.replace(&target).await?;
            debug!(%kind, %namespace, %name, "replaced object");
            Ok(UpsertOutcome::Replaced)
        }
    }
}

#[cfg(test)]
#[path = "upsert_tests.rs"]
mod tests;
