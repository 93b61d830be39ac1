//! ManifestWork utility
//!
//! Wraps bundles of hub-generated objects into ManifestWorks addressed to a
//! managed-cluster namespace, with deterministic naming, idempotent
//! create-or-update and observation of the Applied/Available/Degraded
//! conditions reported by the work agent.

use std::collections::BTreeMap;
use std::sync::Arc;

use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::rbac::v1::{ClusterRole, PolicyRule};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta as CoreObjectMeta;
use kube::core::ObjectMeta;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crds::{
    DRClusterConfig, DeleteOption, MaintenanceMode, Manifest, ManifestWork, ManifestWorkSpec,
    ManifestsTemplate, NetworkFence, PropagationPolicy, VolumeReplicationGroup, WORK_APPLIED,
    WORK_AVAILABLE, WORK_DEGRADED, CLUSTER_ROLE_AGGREGATE_LABEL, CREATED_BY_RAMEN_LABEL,
    CREATED_BY_RAMEN_VALUE, MMODES_LABEL,
};

use crate::error::WorkError;
use crate::store::WorkStore;

/// Singleton bundle of ClusterRoles delivered to every DR-enabled cluster.
pub const DR_CLUSTER_MANIFEST_WORK_NAME: &str = "ramen-dr-cluster";

// ManifestWork types; each formats into the work's name.
pub const MW_TYPE_VRG: &str = "vrg";
pub const MW_TYPE_NS: &str = "ns";
pub const MW_TYPE_NF: &str = "nf";
pub const MW_TYPE_MMODE: &str = "mmode";
pub const MW_TYPE_DRCCONFIG: &str = "drcconfig";

/// Bounded retries for the optimistic-concurrency update loop.
const UPDATE_CONFLICT_RETRIES: usize = 5;

/// Outcome of a create-or-update call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    Created,
    Updated,
    Unchanged,
}

/// Per-application ManifestWork name: `<name>-<namespace>-<type>-mw`.
pub fn manifest_work_name(name: &str, namespace: &str, mw_type: &str) -> String {
    format!("{name}-{namespace}-{mw_type}-mw")
}

/// Cluster-scoped ManifestWork name: `<name>-<type>-mw`.
pub fn manifest_work_name_cluster_scope(name: &str, mw_type: &str) -> String {
    format!("{name}-{mw_type}-mw")
}

/// Singleton ManifestWork name: `<type>-mw`.
pub fn manifest_work_name_type(mw_type: &str) -> String {
    format!("{mw_type}-mw")
}

/// Utility scoped to one instance (a DRCluster or a protected application)
/// and an optional target namespace, delivering bundles to managed-cluster
/// namespaces through a [`WorkStore`].
#[derive(Clone)]
pub struct MwUtil {
    store: Arc<dyn WorkStore>,
    inst_name: String,
    target_namespace: String,
}

impl MwUtil {
    pub fn new(
        store: Arc<dyn WorkStore>,
        inst_name: impl Into<String>,
        target_namespace: impl Into<String>,
    ) -> Self {
        Self {
            store,
            inst_name: inst_name.into(),
            target_namespace: target_namespace.into(),
        }
    }

    pub fn build_manifest_work_name(&self, mw_type: &str) -> String {
        if mw_type == MW_TYPE_DRCCONFIG {
            return manifest_work_name_type(MW_TYPE_DRCCONFIG);
        }

        manifest_work_name(&self.inst_name, &self.target_namespace, mw_type)
    }

    pub async fn find_manifest_work(
        &self,
        mw_name: &str,
        managed_cluster: &str,
    ) -> Result<ManifestWork, WorkError> {
        if managed_cluster.is_empty() {
            return Err(WorkError::InvalidCluster(mw_name.to_string()));
        }

        self.store
            .get(mw_name, managed_cluster)
            .await?
            .ok_or_else(|| WorkError::not_found("ManifestWork", mw_name, managed_cluster))
    }

    pub async fn find_manifest_work_by_type(
        &self,
        mw_type: &str,
        managed_cluster: &str,
    ) -> Result<ManifestWork, WorkError> {
        let mw_name = self.build_manifest_work_name(mw_type);

        self.find_manifest_work(&mw_name, managed_cluster).await
    }

    /// True when the named bundle reached the applied state on the cluster.
    pub async fn is_manifest_applied(&self, cluster: &str, mw_type: &str) -> bool {
        match self
            .find_manifest_work(&self.build_manifest_work_name(mw_type), cluster)
            .await
        {
            Ok(mw) => is_manifest_in_applied_state(&mw),
            Err(_) => false,
        }
    }

    /// The DR-cluster bundle for a cluster, `None` when not yet deployed.
    pub async fn get_dr_cluster_manifest_work(
        &self,
        cluster_name: &str,
    ) -> Result<Option<ManifestWork>, WorkError> {
        match self
            .find_manifest_work(DR_CLUSTER_MANIFEST_WORK_NAME, cluster_name)
            .await
        {
            Ok(mw) => Ok(Some(mw)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Delivers the DR-cluster bundle: the three aggregated ClusterRoles
    /// followed by caller-supplied extras.
    pub async fn create_or_update_dr_cluster_manifest_work(
        &self,
        cluster_name: &str,
        objects_to_append: &[Value],
        annotations: BTreeMap<String, String>,
    ) -> Result<OperationResult, WorkError> {
        let mut manifests = vec![
            typed_manifest(&vrg_cluster_role())?,
            typed_manifest(&mmode_cluster_role())?,
            typed_manifest(&dr_cluster_config_cluster_role())?,
        ];

        for object in objects_to_append {
            manifests.push(Manifest(object.clone()));
        }

        let mw = self.new_manifest_work(
            DR_CLUSTER_MANIFEST_WORK_NAME.to_string(),
            cluster_name,
            BTreeMap::new(),
            manifests,
            Some(annotations),
        );

        self.create_or_update_manifest_work(mw, cluster_name).await
    }

    /// Delivers the synthesized DRClusterConfig as a one-object bundle.
    pub async fn create_or_update_drcconfig_manifest_work(
        &self,
        cluster: &str,
        config: &DRClusterConfig,
    ) -> Result<OperationResult, WorkError> {
        let manifests = vec![generate_manifest(config)?];

        let mw = self.new_manifest_work(
            self.build_manifest_work_name(MW_TYPE_DRCCONFIG),
            cluster,
            BTreeMap::new(),
            manifests,
            None,
        );

        self.create_or_update_manifest_work(mw, cluster).await
    }

    /// Delivers a Namespace as a one-object bundle with Orphan delete
    /// semantics: tearing the work down leaves the namespace in place.
    pub async fn create_or_update_namespace_manifest(
        &self,
        name: &str,
        namespace_name: &str,
        managed_cluster_namespace: &str,
        annotations: Option<BTreeMap<String, String>>,
    ) -> Result<OperationResult, WorkError> {
        let manifests = vec![typed_manifest(&namespace_resource(namespace_name))?];

        let mw_name = manifest_work_name(name, namespace_name, MW_TYPE_NS);
        let mut mw = self.new_manifest_work(
            mw_name,
            managed_cluster_namespace,
            BTreeMap::new(),
            manifests,
            annotations,
        );

        mw.spec.delete_option = Some(DeleteOption {
            propagation_policy: Some(PropagationPolicy::Orphan),
        });

        self.create_or_update_manifest_work(mw, managed_cluster_namespace)
            .await
    }

    /// Deletes the Namespace ManifestWork, first ensuring its Orphan delete
    /// option is in place so the namespace itself survives.
    pub async fn delete_namespace_manifest_work(
        &self,
        cluster_name: &str,
        annotations: Option<BTreeMap<String, String>>,
    ) -> Result<(), WorkError> {
        let mw_name = self.build_manifest_work_name(MW_TYPE_NS);

        let mw = match self.store.get(&mw_name, cluster_name).await? {
            Some(mw) => mw,
            None => return Ok(()),
        };

        if mw.metadata.deletion_timestamp.is_some() {
            return Ok(());
        }

        if mw.spec.delete_option.is_none() {
            self.create_or_update_namespace_manifest(
                &self.inst_name,
                &self.target_namespace,
                cluster_name,
                annotations,
            )
            .await?;
        }

        self.delete_manifest_work(&mw_name, cluster_name).await
    }

    /// Delivers a NetworkFence to the peer cluster. The fence-class name,
    /// when present, is folded into the work's name so class-scoped fences
    /// coexist with the generic one.
    pub async fn create_or_update_nf_manifest_work(
        &self,
        name: &str,
        home_cluster: &str,
        nf: &NetworkFence,
        annotations: BTreeMap<String, String>,
    ) -> Result<OperationResult, WorkError> {
        let mut name = name.to_string();
        if !nf.spec.network_fence_class_name.is_empty() {
            name = format!("{name}-{}", nf.spec.network_fence_class_name);
        }

        let manifests = vec![generate_manifest(nf)?];

        let labels = BTreeMap::from([("app".to_string(), "NF".to_string())]);
        let mw = self.new_manifest_work(
            manifest_work_name(&name, home_cluster, MW_TYPE_NF),
            home_cluster,
            labels,
            manifests,
            Some(annotations),
        );

        self.create_or_update_manifest_work(mw, home_cluster).await
    }

    /// Delivers a MaintenanceMode, labelled for list-by-label discovery.
    pub async fn create_or_update_mmode_manifest_work(
        &self,
        name: &str,
        cluster: &str,
        mmode: &MaintenanceMode,
        annotations: BTreeMap<String, String>,
    ) -> Result<OperationResult, WorkError> {
        let manifests = vec![generate_manifest(mmode)?];

        let labels = BTreeMap::from([(MMODES_LABEL.to_string(), String::new())]);
        let mw = self.new_manifest_work(
            manifest_work_name_cluster_scope(name, MW_TYPE_MMODE),
            cluster,
            labels,
            manifests,
            Some(annotations),
        );

        self.create_or_update_manifest_work(mw, cluster).await
    }

    /// Lists the MaintenanceMode ManifestWorks on a cluster.
    pub async fn list_mmode_manifests(
        &self,
        cluster: &str,
    ) -> Result<Vec<ManifestWork>, WorkError> {
        self.store
            .list_labeled(cluster, &format!("{MMODES_LABEL}="))
            .await
    }

    /// Delivers a VolumeReplicationGroup for a protected application.
    pub async fn create_or_update_vrg_manifest_work(
        &self,
        name: &str,
        namespace: &str,
        home_cluster: &str,
        vrg: &VolumeReplicationGroup,
        annotations: BTreeMap<String, String>,
    ) -> Result<OperationResult, WorkError> {
        let manifests = vec![generate_manifest(vrg)?];

        let mw = self.new_manifest_work(
            manifest_work_name(name, namespace, MW_TYPE_VRG),
            home_cluster,
            BTreeMap::new(),
            manifests,
            Some(annotations),
        );

        self.create_or_update_manifest_work(mw, home_cluster).await
    }

    /// Replaces the VRG embedded in an existing work in place.
    pub async fn update_vrg_manifest_work(
        &self,
        vrg: &VolumeReplicationGroup,
        mw: &mut ManifestWork,
    ) -> Result<(), WorkError> {
        let manifest = generate_manifest(vrg)?;

        if mw.spec.workload.manifests.is_empty() {
            mw.spec.workload.manifests.push(manifest);
        } else {
            mw.spec.workload.manifests[0] = manifest;
        }

        self.store.update(mw).await?;

        info!(
            vrg = %vrg.metadata.name.as_deref().unwrap_or_default(),
            mw = %mw.metadata.name.as_deref().unwrap_or_default(),
            cluster = %mw.metadata.namespace.as_deref().unwrap_or_default(),
            "Updated VRG in ManifestWork"
        );

        Ok(())
    }

    /// Deletes a ManifestWork; absence counts as success.
    pub async fn delete_manifest_work(
        &self,
        mw_name: &str,
        mw_namespace: &str,
    ) -> Result<(), WorkError> {
        debug!(name = %mw_name, namespace = %mw_namespace, "Deleting ManifestWork");

        match self.store.delete(mw_name, mw_namespace).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn new_manifest_work(
        &self,
        name: String,
        mc_namespace: &str,
        mut labels: BTreeMap<String, String>,
        manifests: Vec<Manifest>,
        annotations: Option<BTreeMap<String, String>>,
    ) -> ManifestWork {
        labels.insert(
            CREATED_BY_RAMEN_LABEL.to_string(),
            CREATED_BY_RAMEN_VALUE.to_string(),
        );

        ManifestWork {
            metadata: ObjectMeta {
                name: Some(name),
                namespace: Some(mc_namespace.to_string()),
                labels: Some(labels),
                annotations,
                ..Default::default()
            },
            spec: ManifestWorkSpec {
                workload: ManifestsTemplate { manifests },
                delete_option: None,
            },
            status: None,
        }
    }

    /// Creates the work when absent, replaces its spec when it drifted, and
    /// leaves it untouched otherwise. The update path is a bounded
    /// read-modify-write loop retried on resource-version conflicts.
    async fn create_or_update_manifest_work(
        &self,
        mw: ManifestWork,
        managed_cluster_namespace: &str,
    ) -> Result<OperationResult, WorkError> {
        let name = mw.metadata.name.clone().unwrap_or_default();

        let found = match self.store.get(&name, managed_cluster_namespace).await? {
            Some(found) => found,
            None => {
                info!(cluster = %managed_cluster_namespace, mw = %name, "Creating ManifestWork");
                self.store.create(&mw).await?;

                return Ok(OperationResult::Created);
            }
        };

        if found.spec == mw.spec {
            return Ok(OperationResult::Unchanged);
        }

        info!(name = %name, namespace = %managed_cluster_namespace, "Updating ManifestWork");

        for attempt in 0..UPDATE_CONFLICT_RETRIES {
            let mut found = self
                .store
                .get(&name, managed_cluster_namespace)
                .await?
                .ok_or_else(|| {
                    WorkError::not_found("ManifestWork", &name, managed_cluster_namespace)
                })?;

            found.spec = mw.spec.clone();

            match self.store.update(&found).await {
                Ok(()) => return Ok(OperationResult::Updated),
                Err(WorkError::Conflict { .. }) if attempt + 1 < UPDATE_CONFLICT_RETRIES => {
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(WorkError::Conflict {
            name,
            namespace: managed_cluster_namespace.to_string(),
        })
    }
}

/// True iff the work's conditions contain Applied=True and Available=True
/// and do not contain Degraded=True.
pub fn is_manifest_in_applied_state(mw: &ManifestWork) -> bool {
    let mut applied = false;
    let mut available = false;
    let mut degraded = false;

    if let Some(status) = &mw.status {
        for condition in &status.conditions {
            if condition.is_true() {
                match condition.type_.as_str() {
                    WORK_APPLIED => applied = true,
                    WORK_AVAILABLE => available = true,
                    WORK_DEGRADED => degraded = true,
                    _ => {}
                }
            }
        }
    }

    applied && available && !degraded
}

/// First embedded manifest whose group-version-kind matches, if any.
pub fn get_raw_extension<'a>(
    manifests: &'a [Manifest],
    api_version: &str,
    kind: &str,
) -> Option<&'a Manifest> {
    manifests
        .iter()
        .find(|m| m.api_version() == Some(api_version) && m.kind() == Some(kind))
}

/// Decodes the first embedded manifest of the requested kind.
/// Returns `Ok(None)` when the bundle holds no such manifest.
pub fn extract_resource<T: DeserializeOwned>(
    mw: &ManifestWork,
    api_version: &str,
    kind: &str,
) -> Result<Option<T>, WorkError> {
    let raw = get_raw_extension(&mw.spec.workload.manifests, api_version, kind);

    match raw {
        Some(manifest) => Ok(Some(serde_json::from_value(manifest.0.clone())?)),
        None => Ok(None),
    }
}

pub fn extract_mmode_from_manifest_work(
    mw: &ManifestWork,
) -> Result<Option<MaintenanceMode>, WorkError> {
    extract_resource(mw, "ramendr.openshift.io/v1alpha1", "MaintenanceMode")
}

pub fn extract_drcconfig_from_manifest_work(
    mw: &ManifestWork,
) -> Result<Option<DRClusterConfig>, WorkError> {
    extract_resource(mw, "ramendr.openshift.io/v1alpha1", "DRClusterConfig")
}

pub fn extract_nf_from_manifest_work(
    mw: &ManifestWork,
) -> Result<Option<NetworkFence>, WorkError> {
    extract_resource(mw, "csiaddons.openshift.io/v1alpha1", "NetworkFence")
}

pub fn extract_vrg_from_manifest_work(
    mw: &ManifestWork,
) -> Result<Option<VolumeReplicationGroup>, WorkError> {
    extract_resource(mw, "ramendr.openshift.io/v1alpha1", "VolumeReplicationGroup")
}

/// Serializes a kube-derived custom resource into a raw manifest. The derive
/// emits apiVersion and kind, so the value is self-describing.
pub fn generate_manifest<T: Serialize>(obj: &T) -> Result<Manifest, WorkError> {
    Ok(Manifest(serde_json::to_value(obj)?))
}

/// Serializes a k8s-openapi resource, injecting the apiVersion and kind the
/// openapi types do not carry as fields.
pub fn typed_manifest<K>(obj: &K) -> Result<Manifest, WorkError>
where
    K: k8s_openapi::Resource + Serialize,
{
    let mut value = serde_json::to_value(obj)?;
    value["apiVersion"] = Value::String(K::API_VERSION.to_string());
    value["kind"] = Value::String(K::KIND.to_string());

    Ok(Manifest(value))
}

pub fn namespace_resource(name: &str) -> Namespace {
    Namespace {
        metadata: CoreObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn aggregated_cluster_role(name: &str, resources: &[&str]) -> ClusterRole {
    ClusterRole {
        metadata: CoreObjectMeta {
            name: Some(name.to_string()),
            labels: Some(BTreeMap::from([(
                CLUSTER_ROLE_AGGREGATE_LABEL.to_string(),
                "true".to_string(),
            )])),
            ..Default::default()
        },
        rules: Some(vec![PolicyRule {
            api_groups: Some(vec!["ramendr.openshift.io".to_string()]),
            resources: Some(resources.iter().map(|r| r.to_string()).collect()),
            verbs: ["create", "get", "list", "update", "delete"]
                .iter()
                .map(|v| v.to_string())
                .collect(),
            ..Default::default()
        }]),
        ..Default::default()
    }
}

pub fn vrg_cluster_role() -> ClusterRole {
    aggregated_cluster_role(
        "open-cluster-management:klusterlet-work-sa:agent:volrepgroup-edit",
        &["volumereplicationgroups"],
    )
}

pub fn mmode_cluster_role() -> ClusterRole {
    aggregated_cluster_role(
        "open-cluster-management:klusterlet-work-sa:agent:mmode-edit",
        &["maintenancemodes"],
    )
}

pub fn dr_cluster_config_cluster_role() -> ClusterRole {
    aggregated_cluster_role(
        "open-cluster-management:klusterlet-work-sa:agent:drclusterconfig-edit",
        &["drclusterconfigs"],
    )
}
