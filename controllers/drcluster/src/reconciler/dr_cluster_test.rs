//! End-to-end reconcile tests against the in-memory collaborators

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::ResourceExt;

use crds::{
    ClusterFenceState, ConditionStatus, DRClusterConfig, DRClusterPhase,
    DRCLUSTER_CONDITION_TYPE_CLEAN, DRCLUSTER_CONDITION_TYPE_FENCED, DRCLUSTER_FINALIZER,
    DRCLUSTER_VALIDATED, OCM_BACKUP_LABEL_KEY,
};
use object_store::MockObjectStoreGetter;
use ocm_work::{MockViewGetter, MockWorkStore, DR_CLUSTER_MANIFEST_WORK_NAME};

use crate::conditions::{REASON_FENCE_STATE_UNSPECIFIED, REASON_VALIDATION_FAILED};
use crate::reconciler::dr_cluster::validate_cidrs_format;
use crate::test_utils::*;

fn fixture() -> (MockHubApi, MockWorkStore, MockViewGetter, MockObjectStoreGetter) {
    let hub = MockHubApi::new();
    hub.add_config_map(test_empty_config_map());
    hub.add_managed_cluster(test_managed_cluster("east", "uuid-east"));

    let store = MockWorkStore::new();
    store.set_auto_apply(true);

    (hub, store, MockViewGetter::new(), MockObjectStoreGetter::new())
}

#[test]
fn test_validate_cidrs_format() {
    assert!(validate_cidrs_format(&test_dr_cluster("east", "r1", &["10.0.0.0/16"])).is_ok());
    assert!(validate_cidrs_format(&test_dr_cluster("east", "r1", &[])).is_ok());

    let err =
        validate_cidrs_format(&test_dr_cluster("east", "r1", &["10.0.0.0/99"])).unwrap_err();
    assert!(err.to_string().contains("10.0.0.0/99"));
}

#[tokio::test]
async fn test_fresh_dr_cluster_becomes_available() {
    let (hub, store, views, object_stores) = fixture();

    hub.add_config_map(test_config_map_with_profile("minio-east", "ramen-s3-secret"));
    hub.add_secret(test_s3_secret("ramen-s3-secret"));

    let mut east = test_dr_cluster("east", "r1", &["10.0.0.0/16"]);
    east.spec.s3_profile_name = "minio-east".to_string();
    hub.add_dr_cluster(east);

    let reconciler = test_reconciler(&hub, &store, &views, &object_stores);
    let requeue = reconciler.reconcile_dr_cluster("east").await.unwrap();
    assert!(!requeue);

    let east = hub.get_dr_cluster_cloned("east").unwrap();

    // Finalizer and backup label in place.
    assert!(east
        .metadata
        .finalizers
        .as_ref()
        .unwrap()
        .iter()
        .any(|f| f == DRCLUSTER_FINALIZER));
    assert!(east.labels().contains_key(OCM_BACKUP_LABEL_KEY));

    // Both bundles were delivered to the cluster namespace.
    assert!(store.get_cloned(DR_CLUSTER_MANIFEST_WORK_NAME, "east").is_some());
    assert!(store.get_cloned("drcconfig-mw", "east").is_some());

    assert_eq!(
        condition_status(&east, DRCLUSTER_VALIDATED),
        ConditionStatus::True
    );
    assert_eq!(
        condition_status(&east, DRCLUSTER_CONDITION_TYPE_CLEAN),
        ConditionStatus::True
    );
    assert_eq!(
        condition_reason(&east, DRCLUSTER_CONDITION_TYPE_CLEAN),
        REASON_FENCE_STATE_UNSPECIFIED
    );
    assert_eq!(phase_of(&east), DRClusterPhase::Available);
}

#[tokio::test]
async fn test_invalid_cidr_fails_validation() {
    let (hub, store, views, object_stores) = fixture();

    hub.add_dr_cluster(test_dr_cluster("east", "r1", &["10.0.0.0/99"]));

    let reconciler = test_reconciler(&hub, &store, &views, &object_stores);
    let err = reconciler.reconcile_dr_cluster("east").await.unwrap_err();
    assert!(err.to_string().contains("10.0.0.0/99"));

    let east = hub.get_dr_cluster_cloned("east").unwrap();
    let validated = crds::find_condition(
        &east.status.as_ref().unwrap().conditions,
        DRCLUSTER_VALIDATED,
    )
    .unwrap();

    assert_eq!(validated.status, ConditionStatus::False);
    assert_eq!(validated.reason, REASON_VALIDATION_FAILED);
    assert!(validated.message.contains("10.0.0.0/99"));
}

#[tokio::test]
async fn test_missing_s3_profile_fails_validation() {
    let (hub, store, views, object_stores) = fixture();

    let mut east = test_dr_cluster("east", "r1", &["10.0.0.0/16"]);
    east.spec.s3_profile_name = "unconfigured-profile".to_string();
    hub.add_dr_cluster(east);

    let reconciler = test_reconciler(&hub, &store, &views, &object_stores);
    assert!(reconciler.reconcile_dr_cluster("east").await.is_err());

    let east = hub.get_dr_cluster_cloned("east").unwrap();
    assert_eq!(
        condition_reason(&east, DRCLUSTER_VALIDATED),
        "s3ConnectionFailed"
    );
}

#[tokio::test]
async fn test_manual_fence_sets_conditions_without_network_fence() {
    let (hub, store, views, object_stores) = fixture();

    let mut east = test_dr_cluster("east", "r1", &["10.0.0.0/16"]);
    east.spec.cluster_fence = ClusterFenceState::ManuallyFenced;
    hub.add_dr_cluster(east);

    let reconciler = test_reconciler(&hub, &store, &views, &object_stores);
    let requeue = reconciler.reconcile_dr_cluster("east").await.unwrap();
    assert!(!requeue);

    let east = hub.get_dr_cluster_cloned("east").unwrap();
    assert_eq!(
        condition_status(&east, DRCLUSTER_CONDITION_TYPE_FENCED),
        ConditionStatus::True
    );
    assert_eq!(
        condition_status(&east, DRCLUSTER_CONDITION_TYPE_CLEAN),
        ConditionStatus::False
    );
    assert_eq!(phase_of(&east), DRClusterPhase::Fenced);

    // Manual fencing never produces a NetworkFence ManifestWork.
    assert!(store
        .all()
        .iter()
        .all(|mw| !mw.name_any().ends_with("-nf-mw")));
}

#[tokio::test]
async fn test_manual_unfence_marks_clean() {
    let (hub, store, views, object_stores) = fixture();

    let mut east = test_dr_cluster("east", "r1", &["10.0.0.0/16"]);
    east.spec.cluster_fence = ClusterFenceState::ManuallyUnfenced;
    hub.add_dr_cluster(east);

    let reconciler = test_reconciler(&hub, &store, &views, &object_stores);
    reconciler.reconcile_dr_cluster("east").await.unwrap();

    let east = hub.get_dr_cluster_cloned("east").unwrap();
    assert_eq!(
        condition_status(&east, DRCLUSTER_CONDITION_TYPE_CLEAN),
        ConditionStatus::True
    );
    assert_eq!(phase_of(&east), DRClusterPhase::Unfenced);
}

#[tokio::test]
async fn test_deletion_undeploys_and_removes_finalizer() {
    let (hub, store, views, object_stores) = fixture();

    let mut east = test_dr_cluster("east", "r1", &["10.0.0.0/16"]);
    east.metadata.finalizers = Some(vec![DRCLUSTER_FINALIZER.to_string()]);
    hub.add_dr_cluster(east);

    let reconciler = test_reconciler(&hub, &store, &views, &object_stores);

    // Deploy first so there is something to undeploy.
    reconciler.reconcile_dr_cluster("east").await.unwrap();
    assert!(store.get_cloned(DR_CLUSTER_MANIFEST_WORK_NAME, "east").is_some());

    let mut east = hub.get_dr_cluster_cloned("east").unwrap();
    east.metadata.deletion_timestamp = Some(Time(chrono::Utc::now()));
    hub.add_dr_cluster(east);

    let requeue = reconciler.reconcile_dr_cluster("east").await.unwrap();
    assert!(!requeue);

    assert!(store.get_cloned(DR_CLUSTER_MANIFEST_WORK_NAME, "east").is_none());
    assert!(store.get_cloned("drcconfig-mw", "east").is_none());

    let east = hub.get_dr_cluster_cloned("east").unwrap();
    assert!(east
        .metadata
        .finalizers
        .as_ref()
        .map(|f| !f.iter().any(|x| x == DRCLUSTER_FINALIZER))
        .unwrap_or(true));
}

#[tokio::test]
async fn test_dr_cluster_config_not_applied_blocks_validation() {
    let (hub, _, views, object_stores) = fixture();

    // Without auto-apply the work agent never reports Applied.
    let store = MockWorkStore::new();

    hub.add_dr_cluster(test_dr_cluster("east", "r1", &["10.0.0.0/16"]));

    let reconciler = test_reconciler(&hub, &store, &views, &object_stores);
    assert!(reconciler.reconcile_dr_cluster("east").await.is_err());

    let east = hub.get_dr_cluster_cloned("east").unwrap();
    assert_eq!(
        condition_reason(&east, DRCLUSTER_VALIDATED),
        "DrClustersDeployStatusCheckFailed"
    );

    // The bundle is there, waiting on the agent.
    assert!(store.get_cloned(DR_CLUSTER_MANIFEST_WORK_NAME, "east").is_some());
}

#[tokio::test]
async fn test_schedule_aggregation_lands_in_delivered_config() {
    let (hub, store, views, object_stores) = fixture();

    hub.add_dr_policy(test_dr_policy("policy-a", &["east", "west"], "5m"));
    hub.add_dr_policy(test_dr_policy("policy-b", &["east", "south"], "5m"));
    hub.add_dr_policy(test_dr_policy("policy-c", &["east", "north"], "1h"));
    hub.add_dr_policy(test_dr_policy("other", &["west", "south"], "2h"));

    hub.add_dr_cluster(test_dr_cluster("east", "r1", &["10.0.0.0/16"]));

    let reconciler = test_reconciler(&hub, &store, &views, &object_stores);
    reconciler.reconcile_dr_cluster("east").await.unwrap();

    let mw = store.get_cloned("drcconfig-mw", "east").unwrap();
    let config: DRClusterConfig =
        ocm_work::extract_drcconfig_from_manifest_work(&mw).unwrap().unwrap();

    assert_eq!(config.spec.cluster_id, "uuid-east");

    let mut schedules = config.spec.replication_schedules.clone();
    schedules.sort();
    assert_eq!(schedules, vec!["1h".to_string(), "5m".to_string()]);
}
