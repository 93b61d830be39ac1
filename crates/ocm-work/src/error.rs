//! Distribution-layer error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkError {
    /// ManifestWork or remote object absent; expected on first encounter
    #[error("{kind} {name} not found in {namespace}")]
    NotFound {
        kind: &'static str,
        name: String,
        namespace: String,
    },

    /// A ManifestWork operation was attempted without a cluster namespace
    #[error("invalid cluster for ManifestWork {0}")]
    InvalidCluster(String),

    /// Optimistic-concurrency conflict; retried by the caller
    #[error("conflict updating {name} in {namespace}")]
    Conflict { name: String, namespace: String },

    /// The view for a remote object exists but has no processed snapshot yet
    #[error("view {name} for cluster {cluster} has no processed result")]
    ViewNotReady { name: String, cluster: String },

    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Manifest marshalling failure; fatal to the single call
    #[error("failed to serialize manifest: {0}")]
    Serialization(#[from] serde_json::Error),

    /// ManagedCluster carries no usable cluster-ID claim
    #[error("managed cluster {0} has no cluster ID claim")]
    MissingClusterClaim(String),
}

impl WorkError {
    pub fn not_found(kind: &'static str, name: impl Into<String>, namespace: impl Into<String>) -> Self {
        WorkError::NotFound {
            kind,
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// True for the error classes a caller waiting on remote state should
    /// requeue on rather than surface.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            WorkError::NotFound { .. } | WorkError::ViewNotReady { .. }
        )
    }
}
