//! Store profile types
//!
//! Deserialized from the hub operator config; the secret reference is
//! resolved by the controller before a store is constructed.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct S3StoreProfile {
    pub s3_profile_name: String,

    pub s3_bucket: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub s3_region: String,

    /// Endpoint of the S3-compatible store
    pub s3_compatible_endpoint: String,

    /// Secret holding AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY
    pub s3_secret_ref: SecretRef,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecretRef {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

/// Access keys resolved from the profile's secret.
#[derive(Debug, Clone, Default)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}
