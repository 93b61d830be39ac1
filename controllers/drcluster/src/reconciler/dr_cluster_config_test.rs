//! Unit tests for DRClusterConfig synthesis

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

use crds::{DRClusterStatus, CREATED_BY_RAMEN_LABEL};
use object_store::MockObjectStoreGetter;
use ocm_work::{MockViewGetter, MockWorkStore, MwUtil};
use std::sync::Arc;

use crate::reconciler::DrClusterInstance;
use crate::test_utils::*;

async fn generate_for(hub: &MockHubApi, name: &str) -> crds::DRClusterConfig {
    let store = MockWorkStore::new();
    let views = MockViewGetter::new();
    let object_stores = MockObjectStoreGetter::new();
    let reconciler = test_reconciler(hub, &store, &views, &object_stores);

    let instance = DrClusterInstance {
        reconciler: &reconciler,
        object: hub.get_dr_cluster_cloned(name).unwrap(),
        saved_status: DRClusterStatus::default(),
        mwu: MwUtil::new(Arc::new(store.clone()), name, ""),
        requeue: false,
    };

    instance.generate_dr_cluster_config().await.unwrap()
}

#[tokio::test]
async fn test_schedules_are_distinct_and_member_scoped() {
    let hub = MockHubApi::new();
    hub.add_managed_cluster(test_managed_cluster("east", "uuid-east"));
    hub.add_dr_cluster(test_dr_cluster("east", "r1", &[]));

    // Two policies share an interval, one brings a new one, one has no
    // interval, and one does not contain the cluster at all.
    hub.add_dr_policy(test_dr_policy("policy-a", &["east", "west"], "5m"));
    hub.add_dr_policy(test_dr_policy("policy-b", &["east", "south"], "5m"));
    hub.add_dr_policy(test_dr_policy("policy-c", &["east", "north"], "1h"));
    hub.add_dr_policy(test_dr_policy("policy-d", &["east", "west"], ""));
    hub.add_dr_policy(test_dr_policy("other", &["west", "south"], "2h"));

    let config = generate_for(&hub, "east").await;

    let mut schedules = config.spec.replication_schedules;
    schedules.sort();
    assert_eq!(schedules, vec!["1h".to_string(), "5m".to_string()]);
}

#[tokio::test]
async fn test_deleted_policies_are_skipped() {
    let hub = MockHubApi::new();
    hub.add_managed_cluster(test_managed_cluster("east", "uuid-east"));
    hub.add_dr_cluster(test_dr_cluster("east", "r1", &[]));

    let mut deleted = test_dr_policy("going-away", &["east", "west"], "10m");
    deleted.metadata.deletion_timestamp = Some(Time(chrono::Utc::now()));
    hub.add_dr_policy(deleted);

    let config = generate_for(&hub, "east").await;
    assert!(config.spec.replication_schedules.is_empty());
}

#[tokio::test]
async fn test_config_carries_identity_and_label() {
    let hub = MockHubApi::new();
    hub.add_managed_cluster(test_managed_cluster("east", "uuid-east"));
    hub.add_dr_cluster(test_dr_cluster("east", "r1", &[]));

    let config = generate_for(&hub, "east").await;

    assert_eq!(config.metadata.name.as_deref(), Some("east"));
    assert_eq!(config.spec.cluster_id, "uuid-east");
    assert_eq!(
        config
            .metadata
            .labels
            .as_ref()
            .and_then(|l| l.get(CREATED_BY_RAMEN_LABEL))
            .map(String::as_str),
        Some("true")
    );
}

#[tokio::test]
async fn test_unregistered_managed_cluster_is_an_error() {
    let hub = MockHubApi::new();
    hub.add_dr_cluster(test_dr_cluster("east", "r1", &[]));

    let store = MockWorkStore::new();
    let views = MockViewGetter::new();
    let object_stores = MockObjectStoreGetter::new();
    let reconciler = test_reconciler(&hub, &store, &views, &object_stores);

    let instance = DrClusterInstance {
        reconciler: &reconciler,
        object: hub.get_dr_cluster_cloned("east").unwrap(),
        saved_status: DRClusterStatus::default(),
        mwu: MwUtil::new(Arc::new(store.clone()), "east", ""),
        requeue: false,
    };

    assert!(instance.generate_dr_cluster_config().await.is_err());
}
