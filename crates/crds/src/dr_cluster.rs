//! DRCluster CRD
//!
//! Hub-side record of a managed cluster's DR identity: region, CIDRs,
//! S3 profile and the desired fence state.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::network_fence::FenceState;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "ramendr.openshift.io",
    version = "v1alpha1",
    kind = "DRCluster",
    status = "DRClusterStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct DRClusterSpec {
    /// Region the cluster belongs to; clusters sharing a region are
    /// candidate fencing peers
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region: String,

    /// Networks the cluster serves storage on; fenced as a unit
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cidrs: Vec<String>,

    /// S3 profile validated for this cluster, or `NoS3StoreAvailable`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub s3_profile_name: String,

    /// Desired fence state of this cluster
    #[serde(default)]
    pub cluster_fence: ClusterFenceState,
}

/// Desired fence state of a DRCluster
///
/// An absent field deserializes to `Unspecified`, which is treated as
/// "no fence requested".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub enum ClusterFenceState {
    #[default]
    #[serde(rename = "")]
    Unspecified,

    /// Ramen drives the fence through a peer cluster
    Fenced,

    /// Ramen undoes its own fence and cleans up
    Unfenced,

    /// Operator asserts the cluster is already fenced
    ManuallyFenced,

    /// Operator asserts the cluster was unfenced out of band
    ManuallyUnfenced,
}

impl ClusterFenceState {
    /// Maps the ramen-driven intents onto the NetworkFence fence state.
    /// Manual intents never reach a NetworkFence resource.
    pub fn fence_state(&self) -> Option<FenceState> {
        match self {
            ClusterFenceState::Fenced => Some(FenceState::Fenced),
            ClusterFenceState::Unfenced => Some(FenceState::Unfenced),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub enum DRClusterPhase {
    #[default]
    Starting,
    Available,
    Fencing,
    Fenced,
    Unfencing,
    Unfenced,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DRClusterStatus {
    #[serde(default)]
    pub phase: DRClusterPhase,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

// DRCluster condition types
pub const DRCLUSTER_VALIDATED: &str = "Validated";
pub const DRCLUSTER_CONDITION_TYPE_FENCED: &str = "Fenced";
pub const DRCLUSTER_CONDITION_TYPE_CLEAN: &str = "Clean";

pub const DRCLUSTER_FINALIZER: &str = "drclusters.ramendr.openshift.io/ramen";
