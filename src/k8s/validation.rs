// Copyright 2024-2026 GG-CORE Contributors
// SPDX-License-Identifier: Apache-2.0

//! Precondition checks for AvalancheCluster requests.
//!
//! Rejects inconsistent identity/genesis sources, shell metacharacters in
//! image references, and names that cannot form valid object names.

use std::sync::OnceLock;

use k8s_openapi::api::core::v1::EnvVar;
use regex::Regex;

use super::types::AvalancheClusterSpec;

/// Maximum allowed length for string fields.
pub const MAX_FIELD_LENGTH: usize = 256;

/// Longest deployment name that still leaves room for prefixes and suffixes
/// within the 63 character DNS label limit.
pub const MAX_DEPLOYMENT_NAME_LENGTH: usize = 40;

/// Environment variables owned by the operator. Caller values are dropped.
pub const RESERVED_ENV_VARS: [&str; 8] = [
    "AVAGO_PUBLIC_IP",
    "AVAGO_HTTP_HOST",
    "AVAGO_STAKING_TLS_CERT_FILE",
    "AVAGO_STAKING_TLS_KEY_FILE",
    "AVAGO_DB_DIR",
    "AVAGO_HTTP_PORT",
    "AVAGO_STAKING_PORT",
    "AVAGO_GENESIS",
];

/// Which per-node list disagrees with the node count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountedField {
    Certificates,
    Secrets,
}

impl std::fmt::Display for CountedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Certificates => f.write_str("certificates"),
            Self::Secrets => f.write_str("secrets"),
        }
    }
}

/// Validation error types.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A per-node list is non-empty but its length is not the node count.
    CountMismatch { field: CountedField, expected: usize, actual: usize },
    /// Inline genesis given together with existing secrets.
    ConflictingGenesisSource,
    /// Inline certificates given together with existing secrets.
    ConflictingCertificateSource,
    /// Image reference is invalid.
    InvalidImage(String),
    /// Deployment name cannot form object names.
    InvalidName(String),
    /// Field exceeds maximum length.
    MaxLengthExceeded { field: String, max: usize },
    /// Field is empty but required.
    EmptyField(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CountMismatch { field, expected, actual } => write!(
                f,
                "Number of provided {} ({}) does not match nodeCount ({})",
                field, actual, expected
            ),
            Self::ConflictingGenesisSource => write!(
                f,
                "Genesis cannot be specified when using pre-defined secrets; \
                 genesis.json must be provided inside each secret instead"
            ),
            Self::ConflictingCertificateSource => {
                write!(f, "Certificates cannot be specified when using pre-defined secrets")
            }
            Self::InvalidImage(img) => write!(f, "Invalid image reference: {}", img),
            Self::InvalidName(name) => write!(f, "Invalid deployment name: {}", name),
            Self::MaxLengthExceeded { field, max } => {
                write!(f, "Field '{}' exceeds maximum length of {}", field, max)
            }
            Self::EmptyField(field) => write!(f, "Field '{}' cannot be empty", field),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check a request. The first failing rule wins.
pub fn validate_request(spec: &AvalancheClusterSpec) -> Result<(), ValidationError> {
    let nodes = spec.node_count();

    if spec.has_certificates() && spec.certificates.len() != nodes {
        return Err(ValidationError::CountMismatch {
            field: CountedField::Certificates,
            expected: nodes,
            actual: spec.certificates.len(),
        });
    }

    if spec.has_existing_secrets() && spec.existing_secrets.len() != nodes {
        return Err(ValidationError::CountMismatch {
            field: CountedField::Secrets,
            expected: nodes,
            actual: spec.existing_secrets.len(),
        });
    }

    if spec.has_existing_secrets() && spec.has_genesis() {
        return Err(ValidationError::ConflictingGenesisSource);
    }

    if spec.has_existing_secrets() && spec.has_certificates() {
        return Err(ValidationError::ConflictingCertificateSource);
    }

    validate_image(&spec.image_reference())?;
    validate_deployment_name(&spec.deployment_name)?;
    Ok(())
}

/// Validate a container image reference.
///
/// Rejects shell metacharacters and invalid name formats.
pub fn validate_image(image: &str) -> Result<(), ValidationError> {
    if image.is_empty() || image.starts_with(':') || image.ends_with(':') {
        return Err(ValidationError::EmptyField("image".to_string()));
    }

    if image.len() > MAX_FIELD_LENGTH {
        return Err(ValidationError::MaxLengthExceeded {
            field: "image".to_string(),
            max: MAX_FIELD_LENGTH,
        });
    }

    let forbidden_chars = [
        ';', '&', '|', '`', '$', '(', ')', '{', '}', '<', '>', '\n', '\r', '\0', ' ',
    ];
    for ch in forbidden_chars {
        if image.contains(ch) {
            return Err(ValidationError::InvalidImage(format!(
                "contains forbidden character: {:?}",
                ch
            )));
        }
    }

    if image.starts_with('-') || image.starts_with('.') {
        return Err(ValidationError::InvalidImage(
            "name cannot start with dash or dot".to_string(),
        ));
    }

    Ok(())
}

fn deployment_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").unwrap_or_else(|e| {
            unreachable!("deployment name pattern is a literal: {e}")
        })
    })
}

/// Validate the deployment name used as the object name prefix.
///
/// Lowercase alphanumerics and dashes, starting and ending alphanumeric.
pub fn validate_deployment_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyField("deploymentName".to_string()));
    }

    if name.len() > MAX_DEPLOYMENT_NAME_LENGTH {
        return Err(ValidationError::MaxLengthExceeded {
            field: "deploymentName".to_string(),
            max: MAX_DEPLOYMENT_NAME_LENGTH,
        });
    }

    if !deployment_name_pattern().is_match(name) {
        return Err(ValidationError::InvalidName(format!(
            "{}: must consist of lowercase alphanumerics and '-'",
            name
        )));
    }

    Ok(())
}

/// Whether the operator owns this environment variable name.
pub fn is_reserved_env(name: &str) -> bool {
    RESERVED_ENV_VARS.contains(&name)
}

/// Drop caller-supplied values for reserved names, keeping the order of the rest.
///
/// Returns the names that were dropped.
pub fn strip_reserved_env(env: &mut Vec<EnvVar>) -> Vec<String> {
    let mut dropped = Vec::new();
    env.retain(|var| {
        if is_reserved_env(&var.name) {
            dropped.push(var.name.clone());
            false
        } else {
            true
        }
    });
    dropped
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;
