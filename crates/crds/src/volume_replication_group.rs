//! VolumeReplicationGroup CRD
//!
//! Per-workload replication group applied on managed clusters. The hub only
//! packages it into ManifestWorks; reconciling it belongs to the VRG
//! controller on the managed cluster.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::condition::Condition;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "ramendr.openshift.io",
    version = "v1alpha1",
    kind = "VolumeReplicationGroup",
    namespaced,
    status = "VolumeReplicationGroupStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct VolumeReplicationGroupSpec {
    /// Desired role of this cluster's copy of the data
    pub replication_state: ReplicationState,

    /// Labels selecting the PVCs the group protects
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pvc_selector: BTreeMap<String, String>,

    /// S3 profiles the group uploads cluster-state metadata to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub s3_profiles: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReplicationState {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeReplicationGroupStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}
