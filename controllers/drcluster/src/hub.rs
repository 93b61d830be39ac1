//! Hub API access
//!
//! Trait over the typed hub reads and writes the reconciler performs, with a
//! Kubernetes implementation. Peers are always looked up by name through
//! this seam, never through in-memory references, which keeps the
//! cluster/policy/peer reference cycle out of the object graph. The
//! in-memory mock lives in `test_utils`.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::api::{Api, PostParams};
use kube::{Client, ResourceExt};

use crds::{DRCluster, DRPlacementControl, DRPolicy, ManagedCluster};

use crate::error::ControllerError;

#[async_trait]
pub trait HubApi: Send + Sync {
    async fn get_dr_cluster(&self, name: &str) -> Result<Option<DRCluster>, ControllerError>;

    async fn list_dr_clusters(&self) -> Result<Vec<DRCluster>, ControllerError>;

    async fn list_dr_policies(&self) -> Result<Vec<DRPolicy>, ControllerError>;

    async fn list_dr_placement_controls(
        &self,
    ) -> Result<Vec<DRPlacementControl>, ControllerError>;

    /// Replaces metadata and spec; status is untouched.
    async fn update_dr_cluster(&self, drcluster: &DRCluster)
        -> Result<DRCluster, ControllerError>;

    /// Replaces the status subresource only.
    async fn update_dr_cluster_status(
        &self,
        drcluster: &DRCluster,
    ) -> Result<DRCluster, ControllerError>;

    async fn get_config_map(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<ConfigMap>, ControllerError>;

    async fn get_secret(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Secret>, ControllerError>;

    async fn get_managed_cluster(
        &self,
        name: &str,
    ) -> Result<Option<ManagedCluster>, ControllerError>;
}

/// HubApi over the live Kubernetes API.
#[derive(Clone)]
pub struct KubeHubApi {
    client: Client,
}

impl KubeHubApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn dr_clusters(&self) -> Api<DRCluster> {
        Api::all(self.client.clone())
    }
}

#[async_trait]
impl HubApi for KubeHubApi {
    async fn get_dr_cluster(&self, name: &str) -> Result<Option<DRCluster>, ControllerError> {
        Ok(self.dr_clusters().get_opt(name).await?)
    }

    async fn list_dr_clusters(&self) -> Result<Vec<DRCluster>, ControllerError> {
        Ok(self.dr_clusters().list(&Default::default()).await?.items)
    }

    async fn list_dr_policies(&self) -> Result<Vec<DRPolicy>, ControllerError> {
        let api: Api<DRPolicy> = Api::all(self.client.clone());

        Ok(api.list(&Default::default()).await?.items)
    }

    async fn list_dr_placement_controls(
        &self,
    ) -> Result<Vec<DRPlacementControl>, ControllerError> {
        let api: Api<DRPlacementControl> = Api::all(self.client.clone());

        Ok(api.list(&Default::default()).await?.items)
    }

    async fn update_dr_cluster(
        &self,
        drcluster: &DRCluster,
    ) -> Result<DRCluster, ControllerError> {
        Ok(self
            .dr_clusters()
            .replace(&drcluster.name_any(), &PostParams::default(), drcluster)
            .await?)
    }

    async fn update_dr_cluster_status(
        &self,
        drcluster: &DRCluster,
    ) -> Result<DRCluster, ControllerError> {
        Ok(self
            .dr_clusters()
            .replace_status(
                &drcluster.name_any(),
                &PostParams::default(),
                serde_json::to_vec(drcluster)?,
            )
            .await?)
    }

    async fn get_config_map(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<ConfigMap>, ControllerError> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);

        Ok(api.get_opt(name).await?)
    }

    async fn get_secret(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Secret>, ControllerError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);

        Ok(api.get_opt(name).await?)
    }

    async fn get_managed_cluster(
        &self,
        name: &str,
    ) -> Result<Option<ManagedCluster>, ControllerError> {
        let api: Api<ManagedCluster> = Api::all(self.client.clone());

        Ok(api.get_opt(name).await?)
    }
}
