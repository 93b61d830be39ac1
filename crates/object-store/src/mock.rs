//! In-memory object store for unit tests

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::error::ObjectStoreError;
use crate::profile::{S3Credentials, S3StoreProfile};
use crate::{ObjectStore, ObjectStoreGetter};

#[derive(Clone, Default, Debug)]
pub struct MockObjectStore {
    keys: Arc<Mutex<Vec<String>>>,
    fail_list: Arc<Mutex<bool>>,
    bucket: String,
}

impl MockObjectStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    pub fn add_key(&self, key: impl Into<String>) {
        self.keys.lock().unwrap().push(key.into());
    }

    pub fn set_fail_list(&self, fail: bool) {
        *self.fail_list.lock().unwrap() = fail;
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn list_keys(&self, key_prefix: &str) -> Result<Vec<String>, ObjectStoreError> {
        if *self.fail_list.lock().unwrap() {
            return Err(ObjectStoreError::List {
                bucket: self.bucket.clone(),
                source_message: "injected list failure".to_string(),
            });
        }

        Ok(self
            .keys
            .lock()
            .unwrap()
            .iter()
            .filter(|k| k.starts_with(key_prefix))
            .cloned()
            .collect())
    }
}

#[derive(Clone, Default)]
pub struct MockObjectStoreGetter {
    store: MockObjectStore,
    fail_connect: Arc<Mutex<bool>>,
}

impl MockObjectStoreGetter {
    pub fn new() -> Self {
        Self {
            store: MockObjectStore::new("mock-bucket"),
            ..Default::default()
        }
    }

    pub fn store(&self) -> &MockObjectStore {
        &self.store
    }

    pub fn set_fail_connect(&self, fail: bool) {
        *self.fail_connect.lock().unwrap() = fail;
    }
}

#[async_trait]
impl ObjectStoreGetter for MockObjectStoreGetter {
    async fn object_store(
        &self,
        profile: &S3StoreProfile,
        _credentials: S3Credentials,
        _purpose: &str,
    ) -> Result<Box<dyn ObjectStore>, ObjectStoreError> {
        if *self.fail_connect.lock().unwrap() {
            return Err(ObjectStoreError::Connect {
                profile: profile.s3_profile_name.clone(),
                source_message: "injected connect failure".to_string(),
            });
        }

        Ok(Box::new(self.store.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_store_prefix_filtering() {
        let store = MockObjectStore::new("bucket");
        store.add_key("east/kube-objects/1");
        store.add_key("west/kube-objects/1");

        let keys = store.list_keys("east").await.unwrap();
        assert_eq!(keys, vec!["east/kube-objects/1".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_getter_injected_failures() {
        let getter = MockObjectStoreGetter::new();
        let profile = S3StoreProfile {
            s3_profile_name: "minio-east".to_string(),
            s3_bucket: "bucket".to_string(),
            s3_compatible_endpoint: "http://minio.example:9000".to_string(),
            ..Default::default()
        };

        getter.set_fail_connect(true);
        let err = getter
            .object_store(&profile, S3Credentials::default(), "validation")
            .await
            .unwrap_err();
        assert!(matches!(err, ObjectStoreError::Connect { .. }));

        getter.set_fail_connect(false);
        let store = getter
            .object_store(&profile, S3Credentials::default(), "validation")
            .await
            .unwrap();

        getter.store().set_fail_list(true);
        assert!(store.list_keys("east").await.is_err());
    }
}
