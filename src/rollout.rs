// Copyright 2024-2026 GG-CORE Contributors
// SPDX-License-Identifier: Apache-2.0

//! StatefulSet rollout synchronization.
//!
//! Waits for a just-applied StatefulSet to report readiness, racing a
//! watch subscription against a deadline.
//!
//! States: `Unwatched -> Watching -> {Ready, TimedOut, Error}`.

use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::apps::v1::StatefulSet;
use thiserror::Error;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::cluster::{ApiError, ClusterApi};

/// Default bound on a single rollout wait.
pub const DEFAULT_ROLLOUT_TIMEOUT: Duration = Duration::from_secs(30);

/// Watch errors in a row, with no observation between them, before the
/// wait is abandoned.
pub const MAX_CONSECUTIVE_WATCH_ERRORS: u32 = 5;

/// How the caller wants to wait for a rollout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RolloutMode {
    /// Block until the workload is ready or the timeout passes.
    #[default]
    WaitForReady,
    /// Return immediately without observing the workload.
    SkipWait,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloutState {
    Unwatched,
    Watching,
    Ready,
    TimedOut,
    Error,
}

#[derive(Error, Debug)]
pub enum RolloutError {
    #[error("timed out after {}s waiting for StatefulSet {name} to become ready", .timeout.as_secs())]
    TimedOut { name: String, timeout: Duration },

    #[error("watch on StatefulSet {name} failed: {source}")]
    Watch {
        name: String,
        #[source]
        source: ApiError,
    },

    #[error("watch on StatefulSet {name} ended before it became ready")]
    Closed { name: String },
}

impl RolloutError {
    /// Terminal state the synchronizer reached.
    pub fn state(&self) -> RolloutState {
        match self {
            Self::TimedOut { .. } => RolloutState::TimedOut,
            Self::Watch { .. } | Self::Closed { .. } => RolloutState::Error,
        }
    }
}

/// Decides whether an observed StatefulSet has finished rolling out.
pub trait ReadinessPredicate: Send + Sync {
    /// `previous` is the prior observation; the first observation is
    /// compared against itself.
    fn is_ready(&self, desired: &StatefulSet, previous: &StatefulSet, current: &StatefulSet) -> bool;
}

/// All desired replicas are updated and ready and no revision change is
/// in flight.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplicasReady;

impl ReadinessPredicate for ReplicasReady {
    fn is_ready(&self, desired: &StatefulSet, previous: &StatefulSet, current: &StatefulSet) -> bool {
        let want = desired.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
        let Some(status) = current.status.as_ref() else {
            return false;
        };
        let previous_collisions = previous.status.as_ref().and_then(|s| s.collision_count);

        // A status from before the latest spec change does not count.
        let observed_current = match (status.observed_generation, current.metadata.generation) {
            (Some(observed), Some(generation)) => observed >= generation,
            _ => true,
        };

        observed_current
            && status.collision_count == previous_collisions
            && status.update_revision == status.current_revision
            && status.ready_replicas.unwrap_or(0) == want
            && status.updated_replicas.unwrap_or(0) == want
    }
}

/// Waits for StatefulSet rollouts.
#[derive(Clone)]
pub struct RolloutSynchronizer {
    timeout: Duration,
    predicate: Arc<dyn ReadinessPredicate>,
}

impl std::fmt::Debug for RolloutSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RolloutSynchronizer")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Default for RolloutSynchronizer {
    fn default() -> Self {
        Self::new(DEFAULT_ROLLOUT_TIMEOUT)
    }
}

impl RolloutSynchronizer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout, predicate: Arc::new(ReplicasReady) }
    }

    pub fn with_predicate(mut self, predicate: Arc<dyn ReadinessPredicate>) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait for `workload` according to `mode`.
    ///
    /// The watch is opened before the deadline starts and is closed before
    /// returning, whichever way the wait ends.
    ///
    /// # Errors
    /// [`RolloutError::TimedOut`] when the deadline passes first. A watch
    /// error only ends the wait after [`MAX_CONSECUTIVE_WATCH_ERRORS`] in a
    /// row.
    pub async fn synchronize(
        &self,
        api: &dyn ClusterApi,
        workload: &StatefulSet,
        mode: RolloutMode,
    ) -> Result<RolloutState, RolloutError> {
        let name = workload.metadata.name.clone().unwrap_or_default();
        if mode == RolloutMode::SkipWait {
            debug!(%name, "not waiting for rollout");
            return Ok(RolloutState::Ready);
        }

        let namespace = workload.metadata.namespace.clone().ok_or_else(|| RolloutError::Watch {
            name: name.clone(),
            source: ApiError::MissingNamespace {
                kind: crate::cluster::ResourceKind::StatefulSet,
                name: name.clone(),
            },
        })?;

        let mut subscription = api
            .watch_stateful_set(&namespace, &name)
            .await
            .map_err(|source| RolloutError::Watch { name: name.clone(), source })?;

        let started = Instant::now();
        let deadline = sleep_until(started + self.timeout);
        tokio::pin!(deadline);

        let mut previous: Option<StatefulSet> = None;
        let mut watch_errors = 0u32;
        let outcome = loop {
            tokio::select! {
                _ = &mut deadline => {
                    break Err(RolloutError::TimedOut { name: name.clone(), timeout: self.timeout });
                }
                item = subscription.next() => match item {
                    None => break Err(RolloutError::Closed { name: name.clone() }),
                    Some(Err(source)) => {
                        watch_errors += 1;
                        if watch_errors >= MAX_CONSECUTIVE_WATCH_ERRORS {
                            break Err(RolloutError::Watch { name: name.clone(), source });
                        }
                        warn!(%name, error = %source, attempt = watch_errors, "StatefulSet watch interrupted");
                    }
                    Some(Ok(current)) => {
                        watch_errors = 0;
                        let status = current.status.as_ref();
                        debug!(
                            %name,
                            ready = status.and_then(|s| s.ready_replicas).unwrap_or(0),
                            updated = status.and_then(|s| s.updated_replicas).unwrap_or(0),
                            "waiting for StatefulSet to become ready"
                        );
                        let before = previous.as_ref().unwrap_or(&current);
                        if self.predicate.is_ready(workload, before, &current) {
                            break Ok(RolloutState::Ready);
                        }
                        previous = Some(current);
                    }
                }
            }
        };
        drop(subscription);

        match &outcome {
            Ok(_) => info!(%name, elapsed_ms = started.elapsed().as_millis() as u64, "StatefulSet ready"),
            Err(e) => warn!(%name, error = %e, "StatefulSet rollout did not complete"),
        }
        outcome
    }
}

#[cfg(test)]
#[path = "rollout_tests.rs"]
mod tests;
