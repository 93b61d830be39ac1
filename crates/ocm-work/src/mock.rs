//! In-memory mocks for the distribution layer
//!
//! `MockWorkStore` stands in for the hub API's ManifestWork storage and
//! `MockViewGetter` for the managed-cluster view agents, so the utility and
//! reconciler layers can be unit tested without a cluster.

use async_trait::async_trait;
use k8s_openapi::api::storage::v1::StorageClass;
use kube::core::ObjectMeta;
use kube::ResourceExt;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use crds::{
    Condition, ConditionStatus, DRClusterConfig, ManagedClusterView, ManagedClusterViewSpec,
    ManifestWork, ManifestWorkStatus, NetworkFence, NetworkFenceClass, ViewScope, WORK_APPLIED,
    WORK_AVAILABLE,
};

use crate::error::WorkError;
use crate::store::WorkStore;
use crate::view::{ViewGetter, MCV_TYPE_NFCLASS};

/// Mock WorkStore holding ManifestWorks in memory.
///
/// Stamps resource versions on every write and surfaces conflicts the same
/// way the API server would, so the create-or-update retry loop can be
/// exercised. With `set_auto_apply(true)` every stored work immediately
/// reports Applied and Available, standing in for the work agent.
#[derive(Clone, Default)]
pub struct MockWorkStore {
    inner: Arc<Mutex<MockWorkStoreState>>,
}

#[derive(Default)]
struct MockWorkStoreState {
    works: HashMap<(String, String), ManifestWork>,
    next_version: u64,
    injected_conflicts: u32,
    auto_apply: bool,
    creates: u32,
    updates: u32,
    deletes: u32,
}

impl MockWorkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend the work agent applies every bundle instantly.
    pub fn set_auto_apply(&self, auto_apply: bool) {
        self.inner.lock().unwrap().auto_apply = auto_apply;
    }

    /// Fail the next `count` updates with a resource-version conflict.
    pub fn inject_conflicts(&self, count: u32) {
        self.inner.lock().unwrap().injected_conflicts = count;
    }

    pub fn create_count(&self) -> u32 {
        self.inner.lock().unwrap().creates
    }

    pub fn update_count(&self) -> u32 {
        self.inner.lock().unwrap().updates
    }

    pub fn delete_count(&self) -> u32 {
        self.inner.lock().unwrap().deletes
    }

    pub fn get_cloned(&self, name: &str, namespace: &str) -> Option<ManifestWork> {
        self.inner
            .lock()
            .unwrap()
            .works
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn all(&self) -> Vec<ManifestWork> {
        self.inner.lock().unwrap().works.values().cloned().collect()
    }

    /// Overwrites a stored work wholesale (test setup only).
    pub fn put(&self, mw: ManifestWork) {
        let key = (mw.namespace().unwrap_or_default(), mw.name_any());
        self.inner.lock().unwrap().works.insert(key, mw);
    }

    /// Overwrites the stored status, standing in for the work agent.
    pub fn set_status(&self, name: &str, namespace: &str, status: ManifestWorkStatus) {
        if let Some(mw) = self
            .inner
            .lock()
            .unwrap()
            .works
            .get_mut(&(namespace.to_string(), name.to_string()))
        {
            mw.status = Some(status);
        }
    }
}

fn applied_status() -> ManifestWorkStatus {
    ManifestWorkStatus {
        conditions: vec![
            Condition::new(WORK_APPLIED, ConditionStatus::True, "AppliedManifestComplete", "", None),
            Condition::new(WORK_AVAILABLE, ConditionStatus::True, "ResourcesAvailable", "", None),
        ],
    }
}

#[async_trait]
impl WorkStore for MockWorkStore {
    async fn get(&self, name: &str, namespace: &str) -> Result<Option<ManifestWork>, WorkError> {
        Ok(self.get_cloned(name, namespace))
    }

    async fn create(&self, mw: &ManifestWork) -> Result<(), WorkError> {
        let mut state = self.inner.lock().unwrap();

        let mut mw = mw.clone();
        state.next_version += 1;
        mw.metadata.resource_version = Some(state.next_version.to_string());
        if state.auto_apply {
            mw.status = Some(applied_status());
        }

        let key = (mw.namespace().unwrap_or_default(), mw.name_any());
        state.works.insert(key, mw);
        state.creates += 1;

        Ok(())
    }

    async fn update(&self, mw: &ManifestWork) -> Result<(), WorkError> {
        let mut state = self.inner.lock().unwrap();

        let key = (mw.namespace().unwrap_or_default(), mw.name_any());

        if state.injected_conflicts > 0 {
            state.injected_conflicts -= 1;
            state.next_version += 1;
            let version = state.next_version.to_string();
            if let Some(stored) = state.works.get_mut(&key) {
                stored.metadata.resource_version = Some(version);
            }

            return Err(WorkError::Conflict {
                name: key.1,
                namespace: key.0,
            });
        }

        let stored = state
            .works
            .get(&key)
            .ok_or_else(|| WorkError::not_found("ManifestWork", &key.1, &key.0))?;

        if stored.metadata.resource_version != mw.metadata.resource_version {
            return Err(WorkError::Conflict {
                name: key.1,
                namespace: key.0,
            });
        }

        let mut mw = mw.clone();
        state.next_version += 1;
        mw.metadata.resource_version = Some(state.next_version.to_string());
        if state.auto_apply {
            mw.status = Some(applied_status());
        }

        state.works.insert(key, mw);
        state.updates += 1;

        Ok(())
    }

    async fn delete(&self, name: &str, namespace: &str) -> Result<(), WorkError> {
        let mut state = self.inner.lock().unwrap();

        let key = (namespace.to_string(), name.to_string());
        if state.works.remove(&key).is_none() {
            return Err(WorkError::not_found("ManifestWork", name, namespace));
        }

        state.deletes += 1;

        Ok(())
    }

    async fn list_labeled(
        &self,
        namespace: &str,
        selector: &str,
    ) -> Result<Vec<ManifestWork>, WorkError> {
        let (key, value) = selector.split_once('=').unwrap_or((selector, ""));

        let state = self.inner.lock().unwrap();
        Ok(state
            .works
            .values()
            .filter(|mw| mw.namespace().as_deref() == Some(namespace))
            .filter(|mw| mw.labels().get(key).map(String::as_str) == Some(value))
            .cloned()
            .collect())
    }
}

/// Mock ViewGetter serving remote-object snapshots from memory.
#[derive(Clone, Default)]
pub struct MockViewGetter {
    inner: Arc<Mutex<MockViewState>>,
}

#[derive(Default)]
struct MockViewState {
    // (cluster, kind, name) -> object snapshot
    objects: HashMap<(String, String, String), Value>,
    deleted_views: Vec<(String, String)>,
}

impl MockViewGetter {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&self, cluster: &str, kind: &str, name: &str, value: Value) {
        self.inner.lock().unwrap().objects.insert(
            (cluster.to_string(), kind.to_string(), name.to_string()),
            value,
        );
    }

    fn lookup(&self, cluster: &str, kind: &'static str, name: &str) -> Result<Value, WorkError> {
        self.inner
            .lock()
            .unwrap()
            .objects
            .get(&(cluster.to_string(), kind.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| WorkError::not_found(kind, name, cluster))
    }

    pub fn add_network_fence(&self, cluster: &str, nf: &NetworkFence) {
        let name = nf.name_any();
        self.add(cluster, "NetworkFence", &name, serde_json::to_value(nf).unwrap());
    }

    pub fn remove_network_fence(&self, cluster: &str, name: &str) {
        self.inner.lock().unwrap().objects.remove(&(
            cluster.to_string(),
            "NetworkFence".to_string(),
            name.to_string(),
        ));
    }

    pub fn add_dr_cluster_config(&self, cluster: &str, config: &DRClusterConfig) {
        let name = config.name_any();
        self.add(
            cluster,
            "DRClusterConfig",
            &name,
            serde_json::to_value(config).unwrap(),
        );
    }

    pub fn add_storage_class(&self, cluster: &str, sc: &StorageClass) {
        let name = sc.metadata.name.clone().unwrap_or_default();
        self.add(cluster, "StorageClass", &name, serde_json::to_value(sc).unwrap());
    }

    pub fn add_network_fence_class(&self, cluster: &str, nfc: &NetworkFenceClass) {
        let name = nfc.name_any();
        self.add(
            cluster,
            "NetworkFenceClass",
            &name,
            serde_json::to_value(nfc).unwrap(),
        );
    }

    pub fn deleted_views(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().deleted_views.clone()
    }
}

#[async_trait]
impl ViewGetter for MockViewGetter {
    async fn get_network_fence(
        &self,
        resource_name: &str,
        cluster: &str,
        _annotations: &BTreeMap<String, String>,
    ) -> Result<NetworkFence, WorkError> {
        let value = self.lookup(cluster, "NetworkFence", resource_name)?;

        Ok(serde_json::from_value(value)?)
    }

    async fn get_dr_cluster_config(
        &self,
        cluster: &str,
        _annotations: &BTreeMap<String, String>,
    ) -> Result<DRClusterConfig, WorkError> {
        let value = self.lookup(cluster, "DRClusterConfig", cluster)?;

        Ok(serde_json::from_value(value)?)
    }

    async fn get_storage_class(
        &self,
        name: &str,
        cluster: &str,
        _annotations: &BTreeMap<String, String>,
    ) -> Result<StorageClass, WorkError> {
        let value = self.lookup(cluster, "StorageClass", name)?;

        Ok(serde_json::from_value(value)?)
    }

    async fn get_network_fence_class(
        &self,
        name: &str,
        cluster: &str,
        _annotations: &BTreeMap<String, String>,
    ) -> Result<NetworkFenceClass, WorkError> {
        let value = self.lookup(cluster, "NetworkFenceClass", name)?;

        Ok(serde_json::from_value(value)?)
    }

    async fn list_nf_class_views(
        &self,
        cluster: &str,
    ) -> Result<Vec<ManagedClusterView>, WorkError> {
        let state = self.inner.lock().unwrap();

        Ok(state
            .objects
            .keys()
            .filter(|(c, kind, _)| c == cluster && kind == "NetworkFenceClass")
            .map(|(_, _, name)| ManagedClusterView {
                metadata: ObjectMeta {
                    name: Some(crate::view::managed_cluster_view_name(
                        name,
                        "",
                        MCV_TYPE_NFCLASS,
                    )),
                    namespace: Some(cluster.to_string()),
                    ..Default::default()
                },
                spec: ManagedClusterViewSpec {
                    scope: ViewScope {
                        resource: "NetworkFenceClass".to_string(),
                        name: name.clone(),
                        namespace: String::new(),
                    },
                },
                status: None,
            })
            .collect())
    }

    async fn delete_view(&self, view_name: &str, cluster: &str) -> Result<(), WorkError> {
        self.inner
            .lock()
            .unwrap()
            .deleted_views
            .push((cluster.to_string(), view_name.to_string()));

        Ok(())
    }

    async fn delete_views_for(
        &self,
        _drcluster_name: &str,
        cluster: &str,
    ) -> Result<(), WorkError> {
        self.inner
            .lock()
            .unwrap()
            .deleted_views
            .push((cluster.to_string(), "*".to_string()));

        Ok(())
    }
}
