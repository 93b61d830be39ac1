//! Shared test helpers
//!
//! In-memory HubApi plus builders for the resources the reconciler tests
//! need. The ManifestWork store, view getter and object store mocks come
//! from their own crates.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::ByteString;
use kube::ResourceExt;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use crds::{
    ClusterClaim, ClusterFenceState, DRCluster, DRClusterSpec, DRPlacementControl, DRPolicy,
    DRPolicySpec, FenceState, FencingOperationResult, ManagedCluster, ManagedClusterSpec,
    ManagedClusterStatus, NetworkFence, NetworkFenceStatus, STORAGE_ANNOTATION_CLUSTER_ID,
    STORAGE_ANNOTATION_DRIVER, STORAGE_ANNOTATION_SECRET_NAME, STORAGE_ANNOTATION_SECRET_NAMESPACE,
};
use object_store::MockObjectStoreGetter;
use ocm_work::{MockViewGetter, MockWorkStore};

use crate::config::{HUB_OPERATOR_CONFIG_MAP_NAME, NO_S3_STORE_AVAILABLE, RAMEN_CONFIG_KEY};
use crate::error::ControllerError;
use crate::hub::HubApi;
use crate::reconciler::fence::network_fence_resource_name;
use crate::reconciler::DRClusterReconciler;

/// In-memory HubApi.
///
/// Mirrors the API server's subresource split: `update_dr_cluster` keeps
/// the stored status, `update_dr_cluster_status` keeps the stored metadata
/// and spec.
#[derive(Clone, Default)]
pub struct MockHubApi {
    inner: Arc<Mutex<HubState>>,
}

#[derive(Default)]
struct HubState {
    drclusters: HashMap<String, DRCluster>,
    policies: Vec<DRPolicy>,
    drpcs: Vec<DRPlacementControl>,
    config_maps: HashMap<(String, String), ConfigMap>,
    secrets: HashMap<(String, String), Secret>,
    managed_clusters: HashMap<String, ManagedCluster>,
}

impl MockHubApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dr_cluster(&self, drcluster: DRCluster) {
        let name = drcluster.name_any();
        self.inner.lock().unwrap().drclusters.insert(name, drcluster);
    }

    pub fn get_dr_cluster_cloned(&self, name: &str) -> Option<DRCluster> {
        self.inner.lock().unwrap().drclusters.get(name).cloned()
    }

    pub fn add_dr_policy(&self, policy: DRPolicy) {
        self.inner.lock().unwrap().policies.push(policy);
    }

    pub fn add_drpc(&self, drpc: DRPlacementControl) {
        self.inner.lock().unwrap().drpcs.push(drpc);
    }

    pub fn add_config_map(&self, config_map: ConfigMap) {
        let key = (
            config_map.name_any(),
            config_map.namespace().unwrap_or_default(),
        );
        self.inner.lock().unwrap().config_maps.insert(key, config_map);
    }

    pub fn add_secret(&self, secret: Secret) {
        let key = (secret.name_any(), secret.namespace().unwrap_or_default());
        self.inner.lock().unwrap().secrets.insert(key, secret);
    }

    pub fn add_managed_cluster(&self, managed_cluster: ManagedCluster) {
        let name = managed_cluster.name_any();
        self.inner
            .lock()
            .unwrap()
            .managed_clusters
            .insert(name, managed_cluster);
    }
}

#[async_trait]
impl HubApi for MockHubApi {
    async fn get_dr_cluster(&self, name: &str) -> Result<Option<DRCluster>, ControllerError> {
        Ok(self.get_dr_cluster_cloned(name))
    }

    async fn list_dr_clusters(&self) -> Result<Vec<DRCluster>, ControllerError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .drclusters
            .values()
            .cloned()
            .collect())
    }

    async fn list_dr_policies(&self) -> Result<Vec<DRPolicy>, ControllerError> {
        Ok(self.inner.lock().unwrap().policies.clone())
    }

    async fn list_dr_placement_controls(
        &self,
    ) -> Result<Vec<DRPlacementControl>, ControllerError> {
        Ok(self.inner.lock().unwrap().drpcs.clone())
    }

    async fn update_dr_cluster(
        &self,
        drcluster: &DRCluster,
    ) -> Result<DRCluster, ControllerError> {
        let mut state = self.inner.lock().unwrap();
        let name = drcluster.name_any();

        let mut entry = drcluster.clone();
        if let Some(stored) = state.drclusters.get(&name) {
            entry.status = stored.status.clone();
        }

        state.drclusters.insert(name, entry.clone());

        Ok(entry)
    }

    async fn update_dr_cluster_status(
        &self,
        drcluster: &DRCluster,
    ) -> Result<DRCluster, ControllerError> {
        let mut state = self.inner.lock().unwrap();
        let name = drcluster.name_any();

        let mut entry = state
            .drclusters
            .get(&name)
            .cloned()
            .unwrap_or_else(|| drcluster.clone());
        entry.status = drcluster.status.clone();

        state.drclusters.insert(name, entry.clone());

        Ok(entry)
    }

    async fn get_config_map(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<ConfigMap>, ControllerError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .config_maps
            .get(&(name.to_string(), namespace.to_string()))
            .cloned())
    }

    async fn get_secret(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Secret>, ControllerError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .secrets
            .get(&(name.to_string(), namespace.to_string()))
            .cloned())
    }

    async fn get_managed_cluster(
        &self,
        name: &str,
    ) -> Result<Option<ManagedCluster>, ControllerError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .managed_clusters
            .get(name)
            .cloned())
    }
}

pub fn test_reconciler(
    hub: &MockHubApi,
    store: &MockWorkStore,
    views: &MockViewGetter,
    object_stores: &MockObjectStoreGetter,
) -> DRClusterReconciler {
    DRClusterReconciler::new(
        Arc::new(hub.clone()),
        Arc::new(store.clone()),
        Arc::new(views.clone()),
        Arc::new(object_stores.clone()),
    )
}

pub fn test_dr_cluster(name: &str, region: &str, cidrs: &[&str]) -> DRCluster {
    let mut drcluster = DRCluster::new(
        name,
        DRClusterSpec {
            region: region.to_string(),
            cidrs: cidrs.iter().map(|c| c.to_string()).collect(),
            s3_profile_name: NO_S3_STORE_AVAILABLE.to_string(),
            cluster_fence: ClusterFenceState::Unspecified,
        },
    );
    drcluster.metadata.generation = Some(1);

    drcluster
}

pub fn with_storage_annotations(mut drcluster: DRCluster) -> DRCluster {
    let annotations = drcluster
        .metadata
        .annotations
        .get_or_insert_with(BTreeMap::new);

    annotations.insert(
        STORAGE_ANNOTATION_DRIVER.to_string(),
        "rbd.csi.ceph.com".to_string(),
    );
    annotations.insert(
        STORAGE_ANNOTATION_SECRET_NAME.to_string(),
        "rook-csi-rbd-provisioner".to_string(),
    );
    annotations.insert(
        STORAGE_ANNOTATION_SECRET_NAMESPACE.to_string(),
        "rook-ceph".to_string(),
    );
    annotations.insert(
        STORAGE_ANNOTATION_CLUSTER_ID.to_string(),
        "rook-ceph-cluster".to_string(),
    );

    drcluster
}

pub fn test_dr_policy(name: &str, clusters: &[&str], scheduling_interval: &str) -> DRPolicy {
    DRPolicy::new(
        name,
        DRPolicySpec {
            dr_clusters: clusters.iter().map(|c| c.to_string()).collect(),
            scheduling_interval: scheduling_interval.to_string(),
        },
    )
}

pub fn test_managed_cluster(name: &str, cluster_id: &str) -> ManagedCluster {
    let mut managed_cluster = ManagedCluster::new(
        name,
        ManagedClusterSpec {
            hub_accepts_client: true,
        },
    );

    managed_cluster.status = Some(ManagedClusterStatus {
        cluster_claims: vec![ClusterClaim {
            name: "id.k8s.io".to_string(),
            value: cluster_id.to_string(),
        }],
        conditions: vec![],
    });

    managed_cluster
}

fn operator_config_map(payload: &str) -> ConfigMap {
    let mut config_map = ConfigMap::default();
    config_map.metadata.name = Some(HUB_OPERATOR_CONFIG_MAP_NAME.to_string());
    config_map.metadata.namespace = Some("ramen-system".to_string());
    config_map.data = Some(BTreeMap::from([(
        RAMEN_CONFIG_KEY.to_string(),
        payload.to_string(),
    )]));

    config_map
}

pub fn test_empty_config_map() -> ConfigMap {
    operator_config_map("drClusterOperator: {}\n")
}

pub fn test_config_map_with_profile(profile_name: &str, secret_name: &str) -> ConfigMap {
    operator_config_map(&format!(
        r#"
drClusterOperator:
  deploymentAutomationEnabled: true
s3StoreProfiles:
  - s3ProfileName: {profile_name}
    s3Bucket: ramen-metadata
    s3Region: east
    s3CompatibleEndpoint: http://minio.minio-east:9000
    s3SecretRef:
      name: {secret_name}
"#
    ))
}

pub fn test_s3_secret(name: &str) -> Secret {
    let mut secret = Secret::default();
    secret.metadata.name = Some(name.to_string());
    secret.metadata.namespace = Some("ramen-system".to_string());
    secret.data = Some(BTreeMap::from([
        (
            "AWS_ACCESS_KEY_ID".to_string(),
            ByteString(b"access".to_vec()),
        ),
        (
            "AWS_SECRET_ACCESS_KEY".to_string(),
            ByteString(b"secret".to_vec()),
        ),
    ]));

    secret
}

pub fn condition_status(drcluster: &DRCluster, type_: &str) -> crds::ConditionStatus {
    crds::find_condition(&drcluster.status.as_ref().unwrap().conditions, type_)
        .unwrap_or_else(|| panic!("condition {type_} not set"))
        .status
}

pub fn condition_reason(drcluster: &DRCluster, type_: &str) -> String {
    crds::find_condition(&drcluster.status.as_ref().unwrap().conditions, type_)
        .unwrap_or_else(|| panic!("condition {type_} not set"))
        .reason
        .clone()
}

pub fn phase_of(drcluster: &DRCluster) -> crds::DRClusterPhase {
    drcluster.status.as_ref().unwrap().phase
}

/// A NetworkFence snapshot as the peer cluster would report it after a
/// successful fence operation.
pub fn reported_nf(target: &str, nf_class: &str, fence_state: FenceState) -> NetworkFence {
    let mut nf = NetworkFence::new(
        &network_fence_resource_name(target, nf_class),
        crds::NetworkFenceSpec {
            fence_state,
            cidrs: vec!["10.0.0.0/16".to_string()],
            network_fence_class_name: nf_class.to_string(),
            driver: String::new(),
            secret: None,
            parameters: BTreeMap::new(),
        },
    );

    nf.status = Some(NetworkFenceStatus {
        result: Some(FencingOperationResult::Succeeded),
        message: None,
        conditions: vec![],
    });

    nf
}
