//! NetworkFence and NetworkFenceClass CRDs (csiaddons.openshift.io)
//!
//! A NetworkFence placed on a peer cluster fences the target cluster's CIDRs
//! at the storage layer. NetworkFenceClasses are discovered on managed
//! clusters and select a provisioner plus storage IDs.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::condition::Condition;

/// Name prefix for every NetworkFence the hub produces.
pub const NETWORK_FENCE_PREFIX: &str = "network-fence";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "csiaddons.openshift.io",
    version = "v1alpha1",
    kind = "NetworkFence",
    status = "NetworkFenceStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct NetworkFenceSpec {
    pub fence_state: FenceState,

    /// Networks to fence
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cidrs: Vec<String>,

    /// Selects a discovered fence class; when set, driver/secret/parameters
    /// come from the class instead of this spec
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network_fence_class_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub driver: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretSpec>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum FenceState {
    Fenced,
    Unfenced,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecretSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkFenceStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<FencingOperationResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum FencingOperationResult {
    Succeeded,
    Failed,
}

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "csiaddons.openshift.io",
    version = "v1alpha1",
    kind = "NetworkFenceClass"
)]
#[serde(rename_all = "camelCase")]
pub struct NetworkFenceClassSpec {
    /// Provisioner the class fences storage for
    pub provisioner: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}
