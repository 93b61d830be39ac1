//! AWS-SDK-backed object store

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use tracing::debug;

use crate::error::ObjectStoreError;
use crate::profile::{S3Credentials, S3StoreProfile};
use crate::{ObjectStore, ObjectStoreGetter};

#[derive(Debug)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_keys(&self, key_prefix: &str) -> Result<Vec<String>, ObjectStoreError> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(key_prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| ObjectStoreError::List {
                    bucket: self.bucket.clone(),
                    source_message: e.to_string(),
                })?;

            keys.extend(
                response
                    .contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );

            match response.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }

        debug!(bucket = %self.bucket, prefix = %key_prefix, count = keys.len(), "Listed keys");

        Ok(keys)
    }
}

/// Builds S3 clients from store profiles.
#[derive(Default, Clone)]
pub struct S3ObjectStoreGetter;

impl S3ObjectStoreGetter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ObjectStoreGetter for S3ObjectStoreGetter {
    async fn object_store(
        &self,
        profile: &S3StoreProfile,
        credentials: S3Credentials,
        purpose: &str,
    ) -> Result<Box<dyn ObjectStore>, ObjectStoreError> {
        if profile.s3_compatible_endpoint.is_empty() {
            return Err(ObjectStoreError::InvalidProfile {
                profile: profile.s3_profile_name.clone(),
                reason: "no endpoint configured".to_string(),
            });
        }

        if profile.s3_bucket.is_empty() {
            return Err(ObjectStoreError::InvalidProfile {
                profile: profile.s3_profile_name.clone(),
                reason: "no bucket configured".to_string(),
            });
        }

        debug!(
            profile = %profile.s3_profile_name,
            endpoint = %profile.s3_compatible_endpoint,
            purpose = %purpose,
            "Connecting object store"
        );

        let creds = Credentials::new(
            credentials.access_key_id,
            credentials.secret_access_key,
            None,
            None,
            "ramen-s3-profile",
        );

        let region = if profile.s3_region.is_empty() {
            "us-east-1".to_string()
        } else {
            profile.s3_region.clone()
        };

        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region))
            .endpoint_url(&profile.s3_compatible_endpoint)
            .credentials_provider(creds)
            .force_path_style(true)
            .build();

        Ok(Box::new(S3ObjectStore::new(
            Client::from_conf(config),
            &profile.s3_bucket,
        )))
    }
}
