//! DRPolicy CRD
//!
//! Pairs two DRClusters and sets the replication cadence between them.
//! Read-only input to the DRCluster controller.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::condition::Condition;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "ramendr.openshift.io",
    version = "v1alpha1",
    kind = "DRPolicy",
    status = "DRPolicyStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct DRPolicySpec {
    /// Names of the member DRClusters
    pub dr_clusters: Vec<String>,

    /// Cron-style replication interval (e.g. "5m"); empty for sync policies
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scheduling_interval: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DRPolicyStatus {
    #[serde(default)]
    pub sync: SyncStatus,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// Storage classes known to be peered across the policy's clusters.
    /// Non-empty means the pair is storage-peered regardless of region.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub peer_classes: Vec<PeerClass>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PeerClass {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub storage_class_name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub storage_id: Vec<String>,
}

impl DRPolicy {
    /// True when the named cluster is a member of this policy.
    pub fn contains_dr_cluster(&self, name: &str) -> bool {
        self.spec.dr_clusters.iter().any(|c| c == name)
    }
}
