// Copyright 2024-2026 GG-CORE Contributors
// SPDX-License-Identifier: Apache-2.0

//! Resource composition.
//!
//! Pure functions from a cluster request, a node index and identity
//! material to the objects that should exist. Nothing here reads live
//! cluster state.

mod env;
mod objects;
pub mod script;
mod workload;

use std::collections::BTreeMap;

use base64::Engine;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::cluster::UpdatePolicy;
use crate::k8s::{AvalancheClusterSpec, Certificate};
use crate::network::BootstrappedNetwork;

pub use env::{compose_env, is_custom_network};
pub use script::BOOTSTRAP_FINDER_SCRIPT;

/// Prefix of every composed object name.
pub const OBJECT_PREFIX: &str = "avago-";

pub const HTTP_PORT: i32 = 9650;
pub const STAKING_PORT: i32 = 9651;

pub const DEFAULT_CPU: &str = "1";
pub const DEFAULT_MEMORY: &str = "2Gi";
pub const DEFAULT_STORAGE: &str = "50Gi";

/// Secret keys mounted into the node.
pub const STAKER_CERT_KEY: &str = "staker.crt";
pub const STAKER_KEY_KEY: &str = "staker.key";
pub const GENESIS_KEY: &str = "genesis.json";

#[derive(Error, Debug)]
pub enum CompositionError {
    #[error("certificate {index}: {field} is not valid base64: {source}")]
    InvalidBase64 {
        index: usize,
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("certificate {index}: {field} is not valid UTF-8 PEM")]
    InvalidUtf8 { index: usize, field: &'static str },
}

/// Name of the shared init-script ConfigMap.
pub fn init_script_name(deployment_name: &str) -> String {
    format!("{}{}init-script", OBJECT_PREFIX, deployment_name)
}

/// Endpoint that non-seed nodes bootstrap from when no URL is given.
pub fn seed_endpoint(deployment_name: &str) -> String {
    NodeNames::new(deployment_name, 0).service
}

/// Names of the objects owned by one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeNames {
    /// `app` label value and StatefulSet name.
    pub app: String,
    pub secret: String,
    pub service: String,
    pub pvc: String,
    pub stateful_set: String,
}

impl NodeNames {
    pub fn new(deployment_name: &str, index: usize) -> Self {
        let app = format!("{}{}-{}", OBJECT_PREFIX, deployment_name, index);
        Self {
            secret: format!("{}-key", app),
            service: format!("{}-service", app),
            pvc: format!("{}-pvc", app),
            stateful_set: app.clone(),
            app,
        }
    }
}

/// Where a node's staking certificate and key come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
    /// Generated for a new network this pass.
    Bootstrapped,
    /// Decoded from the request's inline certificates.
    Inline,
    /// Empty certificate and key; the node generates its own.
    Placeholder,
}

impl SecretSource {
    /// Only inline material may overwrite a stored identity. A generated
    /// identity never replaces one that a node already holds.
    pub fn update_policy(self) -> UpdatePolicy {
        match self {
            Self::Inline => UpdatePolicy::Replace,
            Self::Bootstrapped | Self::Placeholder => UpdatePolicy::Preserve,
        }
    }
}

/// Certificate, key and genesis stored in one node Secret.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretMaterial {
    pub certificate: String,
    pub key: String,
    pub genesis: String,
    #[zeroize(skip)]
    pub source: SecretSource,
}

impl std::fmt::Debug for SecretMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretMaterial")
            .field("certificate_len", &self.certificate.len())
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Pick the Secret content for node `index`.
///
/// Returns `None` in existing-secret mode, where no Secret is composed.
pub fn secret_material(
    spec: &AvalancheClusterSpec,
    network: Option<&BootstrappedNetwork>,
    genesis: &str,
    index: usize,
) -> Result<Option<SecretMaterial>, CompositionError> {
    if spec.has_existing_secrets() {
        return Ok(None);
    }

    if let Some(identity) = network.and_then(|n| n.identity(index)) {
        return Ok(Some(SecretMaterial {
            certificate: identity.certificate_pem.clone(),
            key: identity.private_key_pem.as_str().to_string(),
            genesis: genesis.to_string(),
            source: SecretSource::Bootstrapped,
        }));
    }

    if let Some(pair) = spec.certificates.get(index) {
        let (certificate, key) = decode_certificate(pair, index)?;
        return Ok(Some(SecretMaterial {
            certificate,
            key,
            genesis: genesis.to_string(),
            source: SecretSource::Inline,
        }));
    }

    Ok(Some(SecretMaterial {
        certificate: String::new(),
        key: String::new(),
        genesis: genesis.to_string(),
        source: SecretSource::Placeholder,
    }))
}

fn decode_certificate(
    pair: &Certificate,
    index: usize,
) -> Result<(String, String), CompositionError> {
    let decode = |value: &str, field: &'static str| {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(value.trim())
            .map_err(|source| CompositionError::InvalidBase64 { index, field, source })?;
        String::from_utf8(bytes).map_err(|_| CompositionError::InvalidUtf8 { index, field })
    };
    Ok((decode(&pair.cert, "cert")?, decode(&pair.key, "key")?))
}

/// Inputs shared by every object of one pass.
#[derive(Debug, Clone)]
pub struct Composer<'a> {
    spec: &'a AvalancheClusterSpec,
    namespace: &'a str,
    bootstrapper_url: &'a str,
    owner: Option<OwnerReference>,
}

impl<'a> Composer<'a> {
    /// `spec.env` must already have reserved names stripped.
    pub fn new(spec: &'a AvalancheClusterSpec, namespace: &'a str, bootstrapper_url: &'a str) -> Self {
        Self { spec, namespace, bootstrapper_url, owner: None }
    }

    /// Attach a controller owner reference to every composed object.
    pub fn with_owner(mut self, owner: Option<OwnerReference>) -> Self {
        self.owner = owner;
        self
    }

    pub fn spec(&self) -> &AvalancheClusterSpec {
        self.spec
    }

    pub fn names(&self, index: usize) -> NodeNames {
        NodeNames::new(&self.spec.deployment_name, index)
    }

    /// Node 0 of a self-hosted network has no peers to resolve.
    pub fn is_seed(&self, index: usize) -> bool {
        index == 0 && !self.spec.has_bootstrapper_url()
    }

    fn metadata(&self, name: &str, app: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(self.namespace.to_string()),
            labels: Some(app_labels(app)),
            owner_references: self.owner.clone().map(|o| vec![o]),
            ..Default::default()
        }
    }
}

fn app_labels(app: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), app.to_string())])
}

#[cfg(test)]
#[path = "compose_tests.rs"]
mod tests;
