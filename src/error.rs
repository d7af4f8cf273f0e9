//! Reconcile pass errors.

use thiserror::Error;

use crate::cluster::ApiError;
use crate::compose::CompositionError;
use crate::k8s::ValidationError;
use crate::network::BootstrapError;
use crate::rollout::RolloutError;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("invalid cluster request: {0}")]
    Validation(#[from] ValidationError),

    #[error("inline certificate could not be decoded: {0}")]
    Encoding(#[from] CompositionError),

    #[error("network bootstrap failed: {0}")]
    Bootstrap(#[from] BootstrapError),

    #[error("cluster api request failed: {0}")]
    Upstream(#[from] ApiError),

    #[error("rollout failed: {0}")]
    Rollout(#[from] RolloutError),

    #[error("AvalancheCluster {0} has no namespace")]
    MissingNamespace(String),
}

impl ReconcileError {
    /// Errors that only go away when the user edits the resource.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Encoding(_))
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Encoding(_) => "encoding",
            Self::Bootstrap(_) => "bootstrap",
            Self::Upstream(_) => "upstream",
            Self::Rollout(_) => "rollout",
            Self::MissingNamespace(_) => "missing_namespace",
        }
    }
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
