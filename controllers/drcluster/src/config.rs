//! Hub operator configuration
//!
//! The operator ConfigMap carries the RamenConfig payload as YAML. It is
//! re-read on every reconcile tick rather than memoised, so edits propagate
//! on the next tick.

use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use object_store::{S3Credentials, S3StoreProfile};
use serde::{Deserialize, Serialize};
use std::env;

use crate::error::ControllerError;
use crate::hub::HubApi;

pub const HUB_OPERATOR_CONFIG_MAP_NAME: &str = "ramen-hub-operator-config";
pub const RAMEN_CONFIG_KEY: &str = "ramen_manager_config.yaml";

/// Profile name that opts a DRCluster out of S3 validation.
pub const NO_S3_STORE_AVAILABLE: &str = "NoS3StoreAvailable";

const S3_SECRET_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
const S3_SECRET_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";

pub fn ramen_operator_namespace() -> String {
    env::var("RAMEN_OPERATOR_NAMESPACE").unwrap_or_else(|_| "ramen-system".to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RamenConfig {
    pub dr_cluster_operator: DrClusterOperatorConfig,
    pub s3_store_profiles: Vec<S3StoreProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DrClusterOperatorConfig {
    pub deployment_automation_enabled: bool,
}

pub fn parse_ramen_config(config_map: &ConfigMap) -> Result<RamenConfig, ControllerError> {
    let payload = config_map
        .data
        .as_ref()
        .and_then(|d| d.get(RAMEN_CONFIG_KEY))
        .ok_or_else(|| {
            ControllerError::InvalidConfig(format!(
                "operator config map has no {RAMEN_CONFIG_KEY} key"
            ))
        })?;

    Ok(serde_yaml::from_str(payload)?)
}

/// Fetches and parses the hub operator config map.
pub async fn config_map_get(
    hub: &dyn HubApi,
) -> Result<(ConfigMap, RamenConfig), ControllerError> {
    let namespace = ramen_operator_namespace();
    let config_map = hub
        .get_config_map(HUB_OPERATOR_CONFIG_MAP_NAME, &namespace)
        .await?
        .ok_or_else(|| {
            ControllerError::InvalidConfig(format!(
                "operator config map {HUB_OPERATOR_CONFIG_MAP_NAME} not found in {namespace}"
            ))
        })?;

    let config = parse_ramen_config(&config_map)?;

    Ok((config_map, config))
}

pub fn get_s3_store_profile<'a>(
    config: &'a RamenConfig,
    profile_name: &str,
) -> Result<&'a S3StoreProfile, ControllerError> {
    config
        .s3_store_profiles
        .iter()
        .find(|p| p.s3_profile_name == profile_name)
        .ok_or_else(|| {
            ControllerError::InvalidConfig(format!("s3 profile {profile_name} not configured"))
        })
}

/// Access keys from a profile's secret.
pub fn s3_credentials_from_secret(secret: &Secret) -> Result<S3Credentials, ControllerError> {
    let data = secret
        .data
        .as_ref()
        .ok_or_else(|| ControllerError::InvalidConfig("s3 secret has no data".to_string()))?;

    let field = |key: &str| -> Result<String, ControllerError> {
        data.get(key)
            .map(|v| String::from_utf8_lossy(&v.0).into_owned())
            .ok_or_else(|| ControllerError::InvalidConfig(format!("s3 secret has no {key}")))
    };

    Ok(S3Credentials {
        access_key_id: field(S3_SECRET_ACCESS_KEY_ID)?,
        secret_access_key: field(S3_SECRET_SECRET_ACCESS_KEY)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn config_map_with(payload: &str) -> ConfigMap {
        ConfigMap {
            data: Some(BTreeMap::from([(
                RAMEN_CONFIG_KEY.to_string(),
                payload.to_string(),
            )])),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_ramen_config() {
        let payload = r#"
drClusterOperator:
  deploymentAutomationEnabled: true
s3StoreProfiles:
  - s3ProfileName: minio-east
    s3Bucket: ramen-metadata
    s3Region: east
    s3CompatibleEndpoint: http://minio.minio-east:9000
    s3SecretRef:
      name: ramen-s3-secret
"#;

        let config = parse_ramen_config(&config_map_with(payload)).unwrap();
        assert!(config.dr_cluster_operator.deployment_automation_enabled);
        assert_eq!(config.s3_store_profiles.len(), 1);

        let profile = get_s3_store_profile(&config, "minio-east").unwrap();
        assert_eq!(profile.s3_bucket, "ramen-metadata");
        assert_eq!(profile.s3_secret_ref.name, "ramen-s3-secret");

        assert!(get_s3_store_profile(&config, "unknown").is_err());
    }

    #[test]
    fn test_parse_missing_key() {
        let cm = ConfigMap::default();
        assert!(parse_ramen_config(&cm).is_err());
    }
}
