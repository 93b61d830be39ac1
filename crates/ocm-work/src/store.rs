//! ManifestWork store trait and its Kubernetes implementation
//!
//! Abstracts the hub-side CRUD on ManifestWorks so the utility layer can be
//! unit tested against an in-memory store (see `mock.rs`).

use async_trait::async_trait;
use crds::ManifestWork;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::{Client, ResourceExt};

use crate::error::WorkError;

#[async_trait]
pub trait WorkStore: Send + Sync {
    /// Fetches a ManifestWork, `None` when absent.
    async fn get(&self, name: &str, namespace: &str) -> Result<Option<ManifestWork>, WorkError>;

    async fn create(&self, mw: &ManifestWork) -> Result<(), WorkError>;

    /// Replaces the stored object; surfaces `Conflict` on a resource-version
    /// mismatch so the caller can retry its read-modify-write loop.
    async fn update(&self, mw: &ManifestWork) -> Result<(), WorkError>;

    /// Deletes by name; absent objects surface `NotFound`.
    async fn delete(&self, name: &str, namespace: &str) -> Result<(), WorkError>;

    /// Lists ManifestWorks in a cluster namespace matching a label selector.
    async fn list_labeled(
        &self,
        namespace: &str,
        selector: &str,
    ) -> Result<Vec<ManifestWork>, WorkError>;
}

/// WorkStore backed by the hub Kubernetes API.
#[derive(Clone)]
pub struct KubeWorkStore {
    client: Client,
}

impl KubeWorkStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<ManifestWork> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn is_api_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 409)
}

fn is_api_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}

#[async_trait]
impl WorkStore for KubeWorkStore {
    async fn get(&self, name: &str, namespace: &str) -> Result<Option<ManifestWork>, WorkError> {
        Ok(self.api(namespace).get_opt(name).await?)
    }

    async fn create(&self, mw: &ManifestWork) -> Result<(), WorkError> {
        let namespace = mw.namespace().unwrap_or_default();
        self.api(&namespace)
            .create(&PostParams::default(), mw)
            .await?;

        Ok(())
    }

    async fn update(&self, mw: &ManifestWork) -> Result<(), WorkError> {
        let name = mw.name_any();
        let namespace = mw.namespace().unwrap_or_default();

        match self
            .api(&namespace)
            .replace(&name, &PostParams::default(), mw)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_api_conflict(&e) => Err(WorkError::Conflict { name, namespace }),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, name: &str, namespace: &str) -> Result<(), WorkError> {
        match self
            .api(namespace)
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_api_not_found(&e) => {
                Err(WorkError::not_found("ManifestWork", name, namespace))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_labeled(
        &self,
        namespace: &str,
        selector: &str,
    ) -> Result<Vec<ManifestWork>, WorkError> {
        let params = ListParams::default().labels(selector);
        let list = self.api(namespace).list(&params).await?;

        Ok(list.items)
    }
}
