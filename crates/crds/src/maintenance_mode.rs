//! MaintenanceMode CRD
//!
//! Asks a managed cluster's storage provider to pause background operations
//! for a storage backend while a workload fails over to it.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::condition::Condition;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "ramendr.openshift.io",
    version = "v1alpha1",
    kind = "MaintenanceMode",
    status = "MaintenanceModeStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceModeSpec {
    /// Provisioner whose backend enters maintenance
    pub storage_provisioner: String,

    /// Replication identity the maintenance applies to
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_id: String,

    /// Modes to activate
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modes: Vec<MMode>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum MMode {
    Failover,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceModeStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}
