// Copyright 2024-2026 GG-CORE Contributors
// SPDX-License-Identifier: Apache-2.0

//! avago-operator: reconciles AvalancheCluster resources into running
//! avalanchego validator nodes.
//!
//! A pass validates the request, generates staking identities and a
//! genesis for brand-new networks, then applies a ConfigMap, per-node
//! Secrets, Services, claims and StatefulSets, waiting for each node to
//! roll out before starting the next.

pub mod cluster;
pub mod compose;
pub mod config;
pub mod error;
pub mod genesis;
pub mod k8s;
pub mod network;
pub mod reconcile;
pub mod rollout;
pub mod telemetry;

pub use cluster::{ClusterApi, KubeClusterApi, MemoryCluster};
pub use config::{LogFormat, OperatorConfig};
pub use error::ReconcileError;
pub use k8s::{AvalancheCluster, AvalancheClusterSpec, AvalancheClusterStatus};
pub use reconcile::{ReconcileOutcome, Reconciler};
pub use rollout::{RolloutMode, RolloutSynchronizer};
