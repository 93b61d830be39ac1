//! Integration tests for the object-store crate
//!
//! Exercises the public getter/store surface the way the hub controller
//! consumes it: resolve a profile into a store, then prove list access.
//! The S3 getter is driven up to client construction; network-facing
//! listing goes through the mock.

use object_store::{
    MockObjectStoreGetter, ObjectStore, ObjectStoreError, ObjectStoreGetter, S3Credentials,
    S3ObjectStoreGetter, S3StoreProfile, SecretRef,
};

fn minio_profile(name: &str) -> S3StoreProfile {
    S3StoreProfile {
        s3_profile_name: name.to_string(),
        s3_bucket: "ramen-metadata".to_string(),
        s3_region: "east".to_string(),
        s3_compatible_endpoint: "http://minio.minio-east:9000".to_string(),
        s3_secret_ref: SecretRef {
            name: "ramen-s3-secret".to_string(),
            namespace: String::new(),
        },
    }
}

fn credentials() -> S3Credentials {
    S3Credentials {
        access_key_id: "access".to_string(),
        secret_access_key: "secret".to_string(),
    }
}

#[tokio::test]
async fn test_s3_getter_builds_store_from_profile() {
    let getter = S3ObjectStoreGetter::new();

    // A complete profile resolves into a connected client without touching
    // the network.
    let store = getter
        .object_store(&minio_profile("minio-east"), credentials(), "validation")
        .await;
    assert!(store.is_ok());
}

#[tokio::test]
async fn test_s3_getter_rejects_incomplete_profiles() {
    let getter = S3ObjectStoreGetter::new();

    let mut no_endpoint = minio_profile("minio-east");
    no_endpoint.s3_compatible_endpoint = String::new();
    let err = getter
        .object_store(&no_endpoint, credentials(), "validation")
        .await
        .unwrap_err();
    assert!(matches!(err, ObjectStoreError::InvalidProfile { .. }));

    let mut no_bucket = minio_profile("minio-east");
    no_bucket.s3_bucket = String::new();
    let err = getter
        .object_store(&no_bucket, credentials(), "validation")
        .await
        .unwrap_err();
    assert!(matches!(err, ObjectStoreError::InvalidProfile { .. }));
}

#[tokio::test]
async fn test_profile_resolution_and_listing_flow() {
    let getter = MockObjectStoreGetter::new();
    getter.store().add_key("east/kube-objects/v1/pv-1");
    getter.store().add_key("east/kube-objects/v1/pv-2");
    getter.store().add_key("west/kube-objects/v1/pv-1");

    let store = getter
        .object_store(&minio_profile("minio-east"), credentials(), "validation")
        .await
        .unwrap();

    // Listing under a cluster's prefix proves reachability end to end.
    let keys = store.list_keys("east").await.unwrap();
    assert_eq!(keys.len(), 2);
    assert!(keys.iter().all(|k| k.starts_with("east/")));

    let keys = store.list_keys("no-such-cluster").await.unwrap();
    assert!(keys.is_empty());
}

#[tokio::test]
async fn test_transient_failures_surface_as_typed_errors() {
    let getter = MockObjectStoreGetter::new();
    let profile = minio_profile("minio-east");

    getter.set_fail_connect(true);
    let err = getter
        .object_store(&profile, credentials(), "validation")
        .await
        .unwrap_err();
    assert!(matches!(err, ObjectStoreError::Connect { .. }));

    getter.set_fail_connect(false);
    let store = getter
        .object_store(&profile, credentials(), "validation")
        .await
        .unwrap();

    getter.store().set_fail_list(true);
    let err = store.list_keys("east").await.unwrap_err();
    assert!(matches!(err, ObjectStoreError::List { .. }));
}
