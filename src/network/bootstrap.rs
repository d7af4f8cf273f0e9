//! Fresh network generation: staking identities plus a matching genesis.

use chrono::{TimeZone, Utc};
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::extension::{BasicConstraints, KeyUsage};
use openssl::x509::{X509Builder, X509NameBuilder, X509};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::node_id::NodeId;
use crate::genesis::{self, GenesisDocument, InitialStaker, INITIAL_STAKER_DELEGATION_FEE};

/// RSA modulus size for staking keys.
pub const STAKING_KEY_BITS: u32 = 4096;

/// Certificate validity, counted from generation time.
pub const CERTIFICATE_VALIDITY_YEARS: i32 = 100;

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("staking key generation failed: {0}")]
    KeyGeneration(#[source] ErrorStack),

    #[error("staking certificate generation failed: {0}")]
    Certificate(#[source] ErrorStack),

    #[error("certificate validity window is out of range")]
    Validity,

    #[error("genesis template is invalid: {0}")]
    Template(#[source] serde_json::Error),

    #[error("genesis template has no reward allocation")]
    MissingRewardAllocation,

    #[error("genesis serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("network generation task failed: {0}")]
    Interrupted(String),
}

/// PEM private key, wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKeyPem(String);

impl PrivateKeyPem {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for PrivateKeyPem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKeyPem(..)")
    }
}

/// Staking identity of one validator node.
#[derive(Debug, Clone)]
pub struct NodeIdentity {
    pub certificate_pem: String,
    pub private_key_pem: PrivateKeyPem,
    pub node_id: NodeId,
    certificate_der: Vec<u8>,
}

impl NodeIdentity {
    /// Generate a new RSA key and self-signed staking certificate.
    pub fn generate() -> Result<Self, BootstrapError> {
        let rsa = Rsa::generate(STAKING_KEY_BITS).map_err(BootstrapError::KeyGeneration)?;
        let key = PKey::from_rsa(rsa).map_err(BootstrapError::KeyGeneration)?;
        let certificate = self_signed_certificate(&key)?;

        let certificate_der = certificate.to_der().map_err(BootstrapError::Certificate)?;
        let certificate_pem = certificate.to_pem().map_err(BootstrapError::Certificate)?;
        let key_pem = key
            .private_key_to_pem_pkcs8()
            .map_err(BootstrapError::KeyGeneration)?;

        Ok(Self {
            certificate_pem: String::from_utf8_lossy(&certificate_pem).into_owned(),
            private_key_pem: PrivateKeyPem(String::from_utf8_lossy(&key_pem).into_owned()),
            node_id: NodeId::from_certificate_der(&certificate_der),
            certificate_der,
        })
    }

    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }

    /// Hex SHA-256 of the certificate, for logs.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(&self.certificate_der))
    }
}

fn self_signed_certificate(key: &PKey<Private>) -> Result<X509, BootstrapError> {
    let not_before = Utc
        .with_ymd_and_hms(2019, 12, 31, 0, 0, 0)
        .single()
        .ok_or(BootstrapError::Validity)?;
    let not_after = Utc::now()
        .checked_add_months(chrono::Months::new(12 * CERTIFICATE_VALIDITY_YEARS as u32))
        .ok_or(BootstrapError::Validity)?;

    let build = || -> Result<X509, ErrorStack> {
        // Staking certificates carry no subject; peers identify each other by NodeID.
        let name = X509NameBuilder::new()?.build();
        let serial = BigNum::from_u32(0)?.to_asn1_integer()?;

        let mut builder = X509Builder::new()?;
        builder.set_version(2)?;
        builder.set_serial_number(&serial)?;
        builder.set_subject_name(&name)?;
        builder.set_issuer_name(&name)?;
        builder.set_pubkey(key)?;
        let valid_from = Asn1Time::from_unix(not_before.timestamp())?;
        let valid_until = Asn1Time::from_unix(not_after.timestamp())?;
        builder.set_not_before(&valid_from)?;
        builder.set_not_after(&valid_until)?;
        builder.append_extension(
            KeyUsage::new()
                .digital_signature()
                .key_encipherment()
                .data_encipherment()
                .build()?,
        )?;
        builder.append_extension(BasicConstraints::new().build()?)?;
        builder.sign(key, MessageDigest::sha256())?;
        Ok(builder.build())
    };
    build().map_err(BootstrapError::Certificate)
}

/// Identities and genesis of a newly generated network.
#[derive(Debug, Clone)]
pub struct BootstrappedNetwork {
    pub identities: Vec<NodeIdentity>,
    pub genesis: GenesisDocument,
    /// Canonical JSON of `genesis`.
    pub genesis_json: String,
}

impl BootstrappedNetwork {
    pub fn identity(&self, index: usize) -> Option<&NodeIdentity> {
        self.identities.get(index)
    }
}

/// Generate `node_count` identities and a genesis naming them as initial stakers.
///
/// Either every identity is produced or an error is returned.
pub fn generate_network(node_count: usize) -> Result<BootstrappedNetwork, BootstrapError> {
    let mut genesis = genesis::default_genesis().map_err(BootstrapError::Template)?;
    let reward_address = genesis
        .staker_reward_address()
        .ok_or(BootstrapError::MissingRewardAllocation)?
        .to_string();

    let mut identities = Vec::with_capacity(node_count);
    for index in 0..node_count {
        let identity = NodeIdentity::generate()?;
        debug!(
            index,
            node_id = %identity.node_id,
            fingerprint = %identity.fingerprint(),
            "generated staking identity"
        );
        genesis.initial_stakers.push(InitialStaker {
            node_id: identity.node_id.to_string(),
            reward_address: reward_address.clone(),
            delegation_fee: INITIAL_STAKER_DELEGATION_FEE,
        });
        identities.push(identity);
    }

    let genesis_json = genesis.to_canonical_json().map_err(BootstrapError::Serialize)?;
    info!(node_count, network_id = genesis.network_id, "generated new network");

    Ok(BootstrappedNetwork { identities, genesis, genesis_json })
}

/// Run [`generate_network`] on the blocking pool; RSA-4096 keygen is CPU bound.
pub async fn generate_network_blocking(
    node_count: usize,
) -> Result<BootstrappedNetwork, BootstrapError> {
    tokio::task::spawn_blocking(move || generate_network(node_count))
        .await
        .map_err(|e| BootstrapError::Interrupted(e.to_string()))?
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;
