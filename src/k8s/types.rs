// Copyright 2024-2026 GG-CORE Contributors
// SPDX-License-Identifier: Apache-2.0

//! CRD type definitions for the validator cluster operator.
//!
//! `AvalancheClusterSpec` is the desired state a user submits;
//! `AvalancheClusterStatus` is the observed state the reconciler maintains.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{EnvVar, LocalObjectReference, ResourceRequirements};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use super::validation::{validate_request, ValidationError};

/// Default number of validator nodes.
pub const DEFAULT_NODE_COUNT: u32 = 5;
/// Default object name prefix.
pub const DEFAULT_DEPLOYMENT_NAME: &str = "test-validator";
/// Default node image.
pub const DEFAULT_IMAGE: &str = "avaplatform/avalanchego";
/// Default node image tag.
pub const DEFAULT_TAG: &str = "latest";

/// AvalancheCluster CRD spec.
#[derive(CustomResource, Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "chain.avax.network",
    version = "v1alpha1",
    kind = "AvalancheCluster",
    plural = "avalancheclusters",
    shortname = "avago",
    namespaced,
    status = "AvalancheClusterStatus",
    printcolumn = r#"{"name":"Bootstrapper","type":"string","jsonPath":".status.bootstrapperURL"}"#,
    printcolumn = r#"{"name":"Error","type":"string","jsonPath":".status.error"}"#
)]
#[serde(default, rename_all = "camelCase")]
pub struct AvalancheClusterSpec {
    /// Number of nodes to create. Every node is an initial validator.
    pub node_count: u32,
    /// Prefix for the names of created objects.
    pub deployment_name: String,
    /// Attach to an existing network through this bootstrap endpoint.
    #[serde(rename = "bootstrapperURL")]
    pub bootstrapper_url: String,
    /// Genesis for nodes attached to an existing network.
    pub genesis: String,
    /// Pre-created secrets holding `staker.crt`, `staker.key` and `genesis.json`, one per node.
    pub existing_secrets: Vec<String>,
    /// Base64 staking certificate/key pairs, one per node.
    pub certificates: Vec<Certificate>,
    /// Node image name.
    pub image: String,
    /// Node image tag.
    pub tag: String,
    /// Extra node environment. Reserved names are ignored.
    pub env: Vec<EnvVar>,
    /// Node CPU/memory requests and limits; replaces the defaults wholesale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
    pub image_pull_secrets: Vec<LocalObjectReference>,
    pub pod_labels: BTreeMap<String, String>,
    pub pod_annotations: BTreeMap<String, String>,
}

impl Default for AvalancheClusterSpec {
    fn default() -> Self {
        Self {
            node_count: DEFAULT_NODE_COUNT,
            deployment_name: DEFAULT_DEPLOYMENT_NAME.to_string(),
            bootstrapper_url: String::new(),
            genesis: String::new(),
            existing_secrets: Vec::new(),
            certificates: Vec::new(),
            image: DEFAULT_IMAGE.to_string(),
            tag: DEFAULT_TAG.to_string(),
            env: Vec::new(),
            resources: None,
            image_pull_secrets: Vec::new(),
            pod_labels: BTreeMap::new(),
            pod_annotations: BTreeMap::new(),
        }
    }
}

impl AvalancheClusterSpec {
    /// Validate the request before any object is written.
    ///
    /// # Errors
    /// Returns the first failing precondition.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_request(self)
    }

    pub fn node_count(&self) -> usize {
        self.node_count as usize
    }

    pub fn has_bootstrapper_url(&self) -> bool {
        !self.bootstrapper_url.is_empty()
    }

    pub fn has_genesis(&self) -> bool {
        !self.genesis.is_empty()
    }

    pub fn has_existing_secrets(&self) -> bool {
        !self.existing_secrets.is_empty()
    }

    pub fn has_certificates(&self) -> bool {
        !self.certificates.is_empty()
    }

    /// Full image reference.
    pub fn image_reference(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }
}

/// Staking certificate and key, each base64 encoded PEM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Certificate {
    pub cert: String,
    pub key: String,
}

/// Observed state of an AvalancheCluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AvalancheClusterStatus {
    /// Endpoint that non-seed nodes bootstrap from.
    #[serde(rename = "bootstrapperURL", default)]
    pub bootstrapper_url: String,
    /// Service names of nodes that rolled out, in order of first success.
    #[serde(rename = "networkMembersURI", default)]
    pub network_members_uri: Vec<String>,
    /// Genesis of the network; empty when it lives in existing secrets.
    #[serde(default)]
    pub genesis: String,
    /// Last reconcile error; empty after a fully successful pass.
    #[serde(default)]
    pub error: String,
}

impl AvalancheClusterStatus {
    /// Record a member endpoint unless it is already listed.
    ///
    /// Returns true when the list changed.
    pub fn add_member(&mut self, uri: &str) -> bool {
        if self.network_members_uri.iter().any(|m| m == uri) {
            return false;
        }
        self.network_members_uri.push(uri.to_string());
        true
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
