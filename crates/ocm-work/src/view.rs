//! ManagedClusterView getter
//!
//! Requests read-only projections of remote objects from managed clusters
//! and decodes the returned snapshots. A view is trusted only once its
//! Processing condition is True; anything earlier reads as not-ready so
//! callers requeue.

use async_trait::async_trait;
use k8s_openapi::api::storage::v1::StorageClass;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::core::ObjectMeta;
use kube::{Client, ResourceExt};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crds::{
    find_condition, DRClusterConfig, ManagedClusterView, ManagedClusterViewSpec,
    ManagedClusterViewStatus, NetworkFence, NetworkFenceClass, ViewScope, CREATED_BY_RAMEN_LABEL,
    CREATED_BY_RAMEN_VALUE, DRCLUSTER_NAME_ANNOTATION, VIEW_PROCESSING,
};

use crate::error::WorkError;

// View types; each formats into the view's name.
pub const MCV_TYPE_NF: &str = "nf";
pub const MCV_TYPE_DRCCONFIG: &str = "drcconfig";
pub const MCV_TYPE_SCLASS: &str = "sc";
pub const MCV_TYPE_NFCLASS: &str = "nfc";

/// Label keying a view by the remote kind it mirrors.
pub const VIEW_TYPE_LABEL: &str = "ramendr.openshift.io/view-type";

/// View name: `<name>-<namespace>-<type>-mcv`, or `<name>-<type>-mcv` for
/// cluster-scoped remote objects.
pub fn managed_cluster_view_name(name: &str, namespace: &str, mcv_type: &str) -> String {
    if namespace.is_empty() {
        return format!("{name}-{mcv_type}-mcv");
    }

    format!("{name}-{namespace}-{mcv_type}-mcv")
}

#[async_trait]
pub trait ViewGetter: Send + Sync {
    /// Snapshot of a NetworkFence on a managed cluster, by resource name.
    async fn get_network_fence(
        &self,
        resource_name: &str,
        cluster: &str,
        annotations: &BTreeMap<String, String>,
    ) -> Result<NetworkFence, WorkError>;

    /// Snapshot of the cluster's DRClusterConfig (named after the cluster).
    async fn get_dr_cluster_config(
        &self,
        cluster: &str,
        annotations: &BTreeMap<String, String>,
    ) -> Result<DRClusterConfig, WorkError>;

    async fn get_storage_class(
        &self,
        name: &str,
        cluster: &str,
        annotations: &BTreeMap<String, String>,
    ) -> Result<StorageClass, WorkError>;

    async fn get_network_fence_class(
        &self,
        name: &str,
        cluster: &str,
        annotations: &BTreeMap<String, String>,
    ) -> Result<NetworkFenceClass, WorkError>;

    /// All NetworkFenceClass views currently held for a cluster.
    async fn list_nf_class_views(
        &self,
        cluster: &str,
    ) -> Result<Vec<ManagedClusterView>, WorkError>;

    async fn delete_view(&self, view_name: &str, cluster: &str) -> Result<(), WorkError>;

    /// Deletes every view owned by the named DRCluster in a cluster
    /// namespace; used on undeploy.
    async fn delete_views_for(
        &self,
        drcluster_name: &str,
        cluster: &str,
    ) -> Result<(), WorkError>;
}

/// Retires class views whose remote class disappeared from the inventory.
pub async fn prune_class_views(
    getter: &dyn ViewGetter,
    cluster: &str,
    survivor_class_names: &[String],
    views: &[ManagedClusterView],
) -> Result<(), WorkError> {
    for view in views {
        let class_name = view.spec.scope.name.clone();
        if survivor_class_names.contains(&class_name) {
            continue;
        }

        debug!(cluster = %cluster, class = %class_name, "Pruning stale class view");
        getter.delete_view(&view.name_any(), cluster).await?;
    }

    Ok(())
}

/// ViewGetter backed by the hub Kubernetes API.
#[derive(Clone)]
pub struct KubeViewGetter {
    client: Client,
}

impl KubeViewGetter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, cluster: &str) -> Api<ManagedClusterView> {
        Api::namespaced(self.client.clone(), cluster)
    }

    /// Ensures the view exists with the requested scope and decodes its
    /// processed result into the expected type.
    async fn get_resource<T: DeserializeOwned>(
        &self,
        view_name: &str,
        mcv_type: &str,
        scope: ViewScope,
        cluster: &str,
        annotations: &BTreeMap<String, String>,
    ) -> Result<T, WorkError> {
        let api = self.api(cluster);

        let view = match api.get_opt(view_name).await? {
            Some(existing) => {
                if existing.spec.scope != scope {
                    let mut updated = existing.clone();
                    updated.spec.scope = scope;
                    api.replace(view_name, &PostParams::default(), &updated)
                        .await?
                } else {
                    existing
                }
            }
            None => {
                info!(view = %view_name, cluster = %cluster, "Creating ManagedClusterView");

                let view = new_view(view_name, cluster, mcv_type, scope, annotations);
                api.create(&PostParams::default(), &view).await?
            }
        };

        decode_view_result(&view, cluster)
    }
}

fn new_view(
    view_name: &str,
    cluster: &str,
    mcv_type: &str,
    scope: ViewScope,
    annotations: &BTreeMap<String, String>,
) -> ManagedClusterView {
    let labels = BTreeMap::from([
        (
            CREATED_BY_RAMEN_LABEL.to_string(),
            CREATED_BY_RAMEN_VALUE.to_string(),
        ),
        (VIEW_TYPE_LABEL.to_string(), mcv_type.to_string()),
    ]);

    ManagedClusterView {
        metadata: ObjectMeta {
            name: Some(view_name.to_string()),
            namespace: Some(cluster.to_string()),
            labels: Some(labels),
            annotations: Some(annotations.clone()),
            ..Default::default()
        },
        spec: ManagedClusterViewSpec { scope },
        status: None,
    }
}

/// Decodes a processed view snapshot; unprocessed or empty views read as
/// not-ready.
pub fn decode_view_result<T: DeserializeOwned>(
    view: &ManagedClusterView,
    cluster: &str,
) -> Result<T, WorkError> {
    let not_ready = || WorkError::ViewNotReady {
        name: view.name_any(),
        cluster: cluster.to_string(),
    };

    let status: &ManagedClusterViewStatus = view.status.as_ref().ok_or_else(not_ready)?;

    let processing = find_condition(&status.conditions, VIEW_PROCESSING);
    if !processing.map(|c| c.is_true()).unwrap_or(false) {
        return Err(not_ready());
    }

    let result = status.result.as_ref().ok_or_else(not_ready)?;

    Ok(serde_json::from_value(result.clone())?)
}

#[async_trait]
impl ViewGetter for KubeViewGetter {
    async fn get_network_fence(
        &self,
        resource_name: &str,
        cluster: &str,
        annotations: &BTreeMap<String, String>,
    ) -> Result<NetworkFence, WorkError> {
        let view_name = managed_cluster_view_name(resource_name, "", MCV_TYPE_NF);
        let scope = ViewScope {
            resource: "NetworkFence".to_string(),
            name: resource_name.to_string(),
            namespace: String::new(),
        };

        self.get_resource(&view_name, MCV_TYPE_NF, scope, cluster, annotations)
            .await
    }

    async fn get_dr_cluster_config(
        &self,
        cluster: &str,
        annotations: &BTreeMap<String, String>,
    ) -> Result<DRClusterConfig, WorkError> {
        let view_name = managed_cluster_view_name(cluster, "", MCV_TYPE_DRCCONFIG);
        let scope = ViewScope {
            resource: "DRClusterConfig".to_string(),
            name: cluster.to_string(),
            namespace: String::new(),
        };

        self.get_resource(&view_name, MCV_TYPE_DRCCONFIG, scope, cluster, annotations)
            .await
    }

    async fn get_storage_class(
        &self,
        name: &str,
        cluster: &str,
        annotations: &BTreeMap<String, String>,
    ) -> Result<StorageClass, WorkError> {
        let view_name = managed_cluster_view_name(name, "", MCV_TYPE_SCLASS);
        let scope = ViewScope {
            resource: "StorageClass".to_string(),
            name: name.to_string(),
            namespace: String::new(),
        };

        self.get_resource(&view_name, MCV_TYPE_SCLASS, scope, cluster, annotations)
            .await
    }

    async fn get_network_fence_class(
        &self,
        name: &str,
        cluster: &str,
        annotations: &BTreeMap<String, String>,
    ) -> Result<NetworkFenceClass, WorkError> {
        let view_name = managed_cluster_view_name(name, "", MCV_TYPE_NFCLASS);
        let scope = ViewScope {
            resource: "NetworkFenceClass".to_string(),
            name: name.to_string(),
            namespace: String::new(),
        };

        self.get_resource(&view_name, MCV_TYPE_NFCLASS, scope, cluster, annotations)
            .await
    }

    async fn list_nf_class_views(
        &self,
        cluster: &str,
    ) -> Result<Vec<ManagedClusterView>, WorkError> {
        let params = ListParams::default().labels(&format!("{VIEW_TYPE_LABEL}={MCV_TYPE_NFCLASS}"));
        let list = self.api(cluster).list(&params).await?;

        Ok(list.items)
    }

    async fn delete_view(&self, view_name: &str, cluster: &str) -> Result<(), WorkError> {
        match self
            .api(cluster)
            .delete(view_name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_views_for(
        &self,
        drcluster_name: &str,
        cluster: &str,
    ) -> Result<(), WorkError> {
        let params =
            ListParams::default().labels(&format!("{CREATED_BY_RAMEN_LABEL}={CREATED_BY_RAMEN_VALUE}"));
        let list = self.api(cluster).list(&params).await?;

        for view in list.items {
            let owned = view
                .annotations()
                .get(DRCLUSTER_NAME_ANNOTATION)
                .map(|owner| owner == drcluster_name)
                .unwrap_or(false);

            if owned {
                self.delete_view(&view.name_any(), cluster).await?;
            }
        }

        Ok(())
    }
}
