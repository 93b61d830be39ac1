//! DRPlacementControl CRD
//!
//! Placement intent for a protected workload. The DRCluster controller only
//! consumes its failover events; reconciling placement belongs to the DRPC
//! controller.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::condition::Condition;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "ramendr.openshift.io",
    version = "v1alpha1",
    kind = "DRPlacementControl",
    namespaced,
    status = "DRPlacementControlStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct DRPlacementControlSpec {
    /// Requested DR action
    #[serde(default)]
    pub action: DRAction,

    /// Cluster the workload fails over to when action is Failover
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub failover_cluster: String,

    /// Cluster the workload prefers in steady state
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub preferred_cluster: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub enum DRAction {
    #[default]
    #[serde(rename = "")]
    Unset,
    Failover,
    Relocate,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DRPlacementControlStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// Condition type asserted once the requested action has completed.
pub const DRPC_CONDITION_AVAILABLE: &str = "Available";
