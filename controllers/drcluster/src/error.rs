//! Controller-specific error types.

use thiserror::Error;

/// Errors that can occur in the DRCluster controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Distribution-layer error (ManifestWork or view)
    #[error("distribution error: {0}")]
    Work(#[from] ocm_work::WorkError),

    /// Object-store validation error
    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::ObjectStoreError),

    /// Invalid or missing operator configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Spec content failed validation (CIDRs, storage annotations, ...)
    #[error("validation failed: {0}")]
    Validation(String),

    /// No selectable peer for a fence operation
    #[error("no peer cluster found for cluster {0}")]
    PeerNotFound(String),

    /// Serialization failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operator config payload failed to parse
    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Remote state not yet where the reconcile needs it
    #[error("{0}")]
    NotReady(String),
}

impl ControllerError {
    /// True when the underlying cause is an expected not-found.
    pub fn is_not_found(&self) -> bool {
        match self {
            ControllerError::Work(e) => e.is_not_found(),
            ControllerError::Kube(kube::Error::Api(ae)) => ae.code == 404,
            _ => false,
        }
    }
}
