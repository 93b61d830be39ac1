//! ManagedClusterView CRD (view.open-cluster-management.io)
//!
//! Read-only projection of a single remote object back to the hub. The hub
//! writes the scope; the view agent fills status.result once Processing is
//! True.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::condition::Condition;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "view.open-cluster-management.io",
    version = "v1beta1",
    kind = "ManagedClusterView",
    namespaced,
    status = "ManagedClusterViewStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterViewSpec {
    pub scope: ViewScope,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewScope {
    /// Kind of the remote object
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Namespace of the remote object; empty for cluster-scoped kinds
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterViewStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Resource-version-stamped snapshot of the remote object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

/// Condition type set by the view agent once the snapshot is current.
pub const VIEW_PROCESSING: &str = "Processing";
