//! NodeID derivation from a staking certificate.
//!
//! `NodeID-` followed by the CB58 encoding of
//! `RIPEMD160(SHA256(certificate DER))`. CB58 is base58 over the payload
//! with the last four bytes of its SHA-256 appended as a checksum.

use std::fmt;

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Scheme tag prefixed to every node identifier.
pub const NODE_ID_PREFIX: &str = "NodeID-";

/// Length of the short id carried inside a NodeID.
pub const SHORT_ID_LEN: usize = 20;

const CHECKSUM_LEN: usize = 4;

/// Network identifier of a validator node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(String);

impl NodeId {
    /// Derive the identifier from a DER-encoded certificate.
    pub fn from_certificate_der(der: &[u8]) -> Self {
        let digest = Sha256::digest(der);
        let short_id = Ripemd160::digest(digest);
        Self(format!("{}{}", NODE_ID_PREFIX, cb58_encode(&short_id)))
    }

    /// Parse a prefixed identifier, verifying its checksum.
    pub fn parse(value: &str) -> Option<Self> {
        let encoded = value.strip_prefix(NODE_ID_PREFIX)?;
        let payload = cb58_decode(encoded)?;
        (payload.len() == SHORT_ID_LEN).then(|| Self(value.to_string()))
    }

    /// The 20-byte short id.
    pub fn short_id(&self) -> Vec<u8> {
        self.0
            .strip_prefix(NODE_ID_PREFIX)
            .and_then(cb58_decode)
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Base58 with a 4-byte SHA-256 checksum suffix.
pub fn cb58_encode(payload: &[u8]) -> String {
    let checksum = Sha256::digest(payload);
    let mut buf = Vec::with_capacity(payload.len() + CHECKSUM_LEN);
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&checksum[checksum.len() - CHECKSUM_LEN..]);
    bs58::encode(buf).into_string()
}

/// Inverse of [`cb58_encode`]. Returns `None` on bad alphabet or checksum.
pub fn cb58_decode(encoded: &str) -> Option<Vec<u8>> {
    let raw = bs58::decode(encoded).into_vec().ok()?;
    if raw.len() < CHECKSUM_LEN {
        return None;
    }
    let (payload, checksum) = raw.split_at(raw.len() - CHECKSUM_LEN);
    let expected = Sha256::digest(payload);
    if checksum != &expected[expected.len() - CHECKSUM_LEN..] {
        return None;
    }
    Some(payload.to_vec())
}

#[cfg(test)]
#[path = "node_id_tests.rs"]
mod tests;
