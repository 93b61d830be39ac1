//! ManagedCluster identity helper

use crds::{ManagedCluster, CLUSTER_ID_CLAIM};
use kube::ResourceExt;

use crate::error::WorkError;

/// Wraps a ManagedCluster registration record for claim lookups.
pub struct ManagedClusterInstance {
    object: ManagedCluster,
}

impl ManagedClusterInstance {
    pub fn new(object: ManagedCluster) -> Self {
        Self { object }
    }

    /// The cluster's identity from its `id.k8s.io` claim.
    pub fn cluster_id(&self) -> Result<String, WorkError> {
        let claims = self
            .object
            .status
            .as_ref()
            .map(|s| s.cluster_claims.as_slice())
            .unwrap_or_default();

        claims
            .iter()
            .find(|c| c.name == CLUSTER_ID_CLAIM && !c.value.is_empty())
            .map(|c| c.value.clone())
            .ok_or_else(|| WorkError::MissingClusterClaim(self.object.name_any()))
    }
}
