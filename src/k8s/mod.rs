// Copyright 2024-2026 GG-CORE Contributors
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes integration types.
//!
//! Defines the AvalancheCluster custom resource and its request checks.

pub mod types;
pub mod validation;

// K8s CRD types - names match the actual CRD kind for compatibility
pub use types::{AvalancheCluster, AvalancheClusterSpec, AvalancheClusterStatus, Certificate};
pub use validation::{strip_reserved_env, validate_request, CountedField, ValidationError};
