//! DRClusterConfig CRD
//!
//! Synthesized by the hub for each managed cluster: advertises the union of
//! replication schedules from every policy the cluster participates in.
//! The managed-cluster copy reports the detected storage and fence class
//! inventory back through its status.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::condition::Condition;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "ramendr.openshift.io",
    version = "v1alpha1",
    kind = "DRClusterConfig",
    status = "DRClusterConfigStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct DRClusterConfigSpec {
    /// Cluster identity from the managed-cluster `id.k8s.io` claim
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster_id: String,

    /// Distinct scheduling intervals across all policies containing this
    /// cluster; order is not significant
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replication_schedules: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DRClusterConfigStatus {
    /// StorageClass names discovered on the managed cluster
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub storage_classes: Vec<String>,

    /// NetworkFenceClass names discovered on the managed cluster
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub network_fence_classes: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}
