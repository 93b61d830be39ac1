//! ManifestWork CRD (work.open-cluster-management.io)
//!
//! Delivery unit for hub-to-managed-cluster object bundles. The hub creates
//! and updates the spec; the per-cluster work agent applies the wrapped
//! manifests and reports Applied/Available/Degraded conditions.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::condition::Condition;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[kube(
    group = "work.open-cluster-management.io",
    version = "v1",
    kind = "ManifestWork",
    namespaced,
    status = "ManifestWorkStatus",
    derive = "Default",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct ManifestWorkSpec {
    pub workload: ManifestsTemplate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_option: Option<DeleteOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestsTemplate {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manifests: Vec<Manifest>,
}

/// Raw extension carrying one arbitrary Kubernetes object. The embedded
/// value must carry its own apiVersion and kind.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(transparent)]
pub struct Manifest(pub serde_json::Value);

impl Manifest {
    pub fn api_version(&self) -> Option<&str> {
        self.0.get("apiVersion").and_then(|v| v.as_str())
    }

    pub fn kind(&self) -> Option<&str> {
        self.0.get("kind").and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub propagation_policy: Option<PropagationPolicy>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum PropagationPolicy {
    Foreground,
    /// Deleting the ManifestWork leaves the applied resources in place
    Orphan,
    SelectivelyOrphan,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestWorkStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

// Condition types reported by the managed-cluster work agent.
pub const WORK_APPLIED: &str = "Applied";
pub const WORK_AVAILABLE: &str = "Available";
pub const WORK_DEGRADED: &str = "Degraded";
