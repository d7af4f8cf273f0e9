// Copyright 2024-2026 GG-CORE Contributors
// SPDX-License-Identifier: Apache-2.0

//! Reconciliation orchestrator.
//!
//! One pass drives the cluster toward an AvalancheCluster request:
//! validate, bootstrap a fresh network when needed, apply the shared
//! ConfigMap, then every node Secret, then each node's Service, claim and
//! StatefulSet in index order, waiting for each rollout before the next.
//!
//! The observed status is written back after each step that changes it.
//! Every failure is recorded in `status.error` before it is returned.

pub mod controller;

use std::sync::Arc;

use k8s_openapi::api::core::v1::Secret;
use kube::{Resource, ResourceExt};
use tracing::{debug, info, warn};

use crate::cluster::{upsert, ClusterApi, ClusterObject, ResourceKind, UpdatePolicy, UpsertOutcome};
use crate::compose::{secret_material, seed_endpoint, Composer, NodeNames, GENESIS_KEY};
use crate::error::{ReconcileError, Result};
use crate::k8s::{strip_reserved_env, validate_request, AvalancheCluster, AvalancheClusterSpec, AvalancheClusterStatus};
use crate::network::{generate_network_blocking, BootstrappedNetwork};
use crate::rollout::{RolloutMode, RolloutSynchronizer};

/// Result of a fully successful pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub status: AvalancheClusterStatus,
    /// A new network was generated during this pass.
    pub bootstrapped: bool,
}

/// Drives passes against an injected cluster API.
#[derive(Clone)]
pub struct Reconciler {
    api: Arc<dyn ClusterApi>,
    synchronizer: RolloutSynchronizer,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("synchronizer", &self.synchronizer)
            .finish_non_exhaustive()
    }
}

/// Where the current pass writes status.
struct StatusTarget<'a> {
    namespace: &'a str,
    name: &'a str,
}

impl Reconciler {
    pub fn new(api: Arc<dyn ClusterApi>, synchronizer: RolloutSynchronizer) -> Self {
        Self { api, synchronizer }
    }

    pub fn api(&self) -> &dyn ClusterApi {
        self.api.as_ref()
    }

    /// Run one pass for `cluster`.
    ///
    /// # Errors
    /// The first failure of the pass; it has already been recorded in the
    /// resource status.
    pub async fn reconcile(&self, cluster: &AvalancheCluster) -> Result<ReconcileOutcome> {
        let name = cluster.name_any();
        let namespace = cluster
            .namespace()
            .ok_or_else(|| ReconcileError::MissingNamespace(name.clone()))?;
        let target = StatusTarget { namespace: &namespace, name: &name };

        let mut status = cluster.status.clone().unwrap_or_default();
        let outcome = self.run_pass(cluster, &target, &mut status).await;

        match outcome {
            Ok(bootstrapped) => {
                if !status.error.is_empty() {
                    status.error.clear();
                    self.write_status(&target, &status).await;
                }
                info!(
                    %namespace,
                    %name,
                    members = status.network_members_uri.len(),
                    bootstrapped,
                    "reconcile pass complete"
                );
                Ok(ReconcileOutcome { status, bootstrapped })
            }
            Err(e) => {
                warn!(%namespace, %name, error = %e, "reconcile pass failed");
                status.error = e.to_string();
                self.write_status(&target, &status).await;
                Err(e)
            }
        }
    }

    async fn run_pass(
        &self,
        cluster: &AvalancheCluster,
        target: &StatusTarget<'_>,
        status: &mut AvalancheClusterStatus,
    ) -> Result<bool> {
        let mut spec = cluster.spec.clone();
        validate_request(&spec)?;

        let stripped = strip_reserved_env(&mut spec.env);
        if !stripped.is_empty() {
            warn!(name = target.name, vars = ?stripped, "ignoring reserved environment variables");
        }

        let (network, genesis) = if needs_bootstrap(&spec, status) {
            let seed_secret = NodeNames::new(&spec.deployment_name, 0).secret;
            match self.stored_genesis(target.namespace, &seed_secret).await? {
                Some(stored) => {
                    info!(name = target.name, secret = %seed_secret, "adopting network found in node secrets");
                    (None, stored)
                }
                None => {
                    info!(name = target.name, node_count = spec.node_count, "bootstrapping new network");
                    let network = generate_network_blocking(spec.node_count()).await?;
                    let genesis = network.genesis_json.clone();
                    (Some(network), genesis)
                }
            }
        } else {
            (None, resolve_genesis(&spec, status))
        };

        let endpoint = resolve_endpoint(&spec);

        let composer = Composer::new(&spec, target.namespace, &endpoint)
            .with_owner(cluster.controller_owner_ref(&()));

        self.apply(composer.config_map().into(), ResourceKind::ConfigMap.default_policy())
            .await?;
        self.apply_secret_phase(&composer, network.as_ref(), &genesis).await?;

        // The network only exists once its secrets do.
        if status.bootstrapper_url != endpoint || status.genesis != genesis {
            status.bootstrapper_url = endpoint.clone();
            status.genesis = genesis;
            self.write_status(target, status).await;
        }

        let mode = if network.is_some() {
            RolloutMode::SkipWait
        } else {
            RolloutMode::WaitForReady
        };
        self.apply_workload_phase(&composer, mode, target, status).await?;

        Ok(network.is_some())
    }

    /// Write every node Secret. Existing-secret requests compose none.
    async fn apply_secret_phase(
        &self,
        composer: &Composer<'_>,
        network: Option<&BootstrappedNetwork>,
        genesis: &str,
    ) -> Result<()> {
        let spec = composer.spec();
        for index in 0..spec.node_count() {
            let Some(material) = secret_material(spec, network, genesis, index)? else {
                continue;
            };
            let secret = composer.secret(index, &material);
            self.apply(secret.into(), material.source.update_policy()).await?;
        }
        Ok(())
    }

    /// Bring up nodes in index order, stopping at the first failure.
    async fn apply_workload_phase(
        &self,
        composer: &Composer<'_>,
        mode: RolloutMode,
        target: &StatusTarget<'_>,
        status: &mut AvalancheClusterStatus,
    ) -> Result<()> {
        for index in 0..composer.spec().node_count() {
            let names = composer.names(index);

            self.apply(composer.service(index).into(), ResourceKind::Service.default_policy())
                .await?;
            self.apply(composer.pvc(index).into(), ResourceKind::PersistentVolumeClaim.default_policy())
                .await?;

            let workload = composer.stateful_set(index);
            self.apply(workload.clone().into(), ResourceKind::StatefulSet.default_policy())
                .await?;
            self.synchronizer.synchronize(self.api(), &workload, mode).await?;

            if status.add_member(&names.service) {
                debug!(name = target.name, member = %names.service, "recorded network member");
                self.write_status(target, status).await;
            }
        }
        Ok(())
    }

    /// Genesis held by an already written node Secret, if any.
    async fn stored_genesis(&self, namespace: &str, name: &str) -> Result<Option<String>> {
        let Some(ClusterObject::Secret(secret)) =
            self.api.get(ResourceKind::Secret, namespace, name).await?
        else {
            return Ok(None);
        };
        Ok(secret_value(&secret, GENESIS_KEY).filter(|genesis| !genesis.is_empty()))
    }

    async fn apply(&self, object: ClusterObject, policy: UpdatePolicy) -> Result<UpsertOutcome> {
        let kind = object.kind();
        let outcome = upsert(self.api(), object, policy).await?;
        metrics::counter!(
            "avago_operator_object_writes_total",
            "kind" => kind.as_str(),
            "outcome" => outcome.as_str()
        )
        .increment(1);
        Ok(outcome)
    }

    /// Status write failures are logged and do not fail the pass.
    async fn write_status(&self, target: &StatusTarget<'_>, status: &AvalancheClusterStatus) {
        if let Err(e) = self.api.patch_status(target.namespace, target.name, status).await {
            warn!(
                namespace = target.namespace,
                name = target.name,
                error = %e,
                "failed to update status"
            );
        }
    }
}

/// A fresh network is generated only when nothing identifies an existing one.
pub fn needs_bootstrap(spec: &AvalancheClusterSpec, status: &AvalancheClusterStatus) -> bool {
    !spec.has_bootstrapper_url()
        && !spec.has_genesis()
        && !spec.has_existing_secrets()
        && status.bootstrapper_url.is_empty()
}

/// The request's URL, else node 0's Service.
pub fn resolve_endpoint(spec: &AvalancheClusterSpec) -> String {
    if spec.has_bootstrapper_url() {
        spec.bootstrapper_url.clone()
    } else {
        seed_endpoint(&spec.deployment_name)
    }
}

/// Genesis of a network that is not generated this pass.
///
/// A joined network always takes the request's genesis, even when empty.
/// Otherwise the request's genesis wins over what was already observed.
pub fn resolve_genesis(spec: &AvalancheClusterSpec, status: &AvalancheClusterStatus) -> String {
    if spec.has_bootstrapper_url() || spec.has_genesis() {
        spec.genesis.clone()
    } else {
        status.genesis.clone()
    }
}

/// A Secret entry, whether written as `stringData` or read back as `data`.
fn secret_value(secret: &Secret, key: &str) -> Option<String> {
    if let Some(value) = secret.string_data.as_ref().and_then(|d| d.get(key)) {
        return Some(value.clone());
    }
    let bytes = secret.data.as_ref()?.get(key)?;
    String::from_utf8(bytes.0.clone()).ok()
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
