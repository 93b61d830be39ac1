//! Controller wiring
//!
//! Builds the Kubernetes client, the distribution and object-store
//! collaborators, and the reconciler, then hands them to the watcher.

use std::sync::Arc;

use kube::Client;
use object_store::S3ObjectStoreGetter;
use ocm_work::{KubeViewGetter, KubeWorkStore};
use tracing::info;

use crate::config::ramen_operator_namespace;
use crate::error::ControllerError;
use crate::hub::KubeHubApi;
use crate::reconciler::DRClusterReconciler;
use crate::watcher;

/// Hub controller for DRCluster resources.
pub struct Controller {
    client: Client,
    reconciler: Arc<DRClusterReconciler>,
    operator_namespace: String,
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new() -> Result<Self, ControllerError> {
        info!("Initializing DRCluster Controller");

        let client = Client::try_default().await?;

        let hub = Arc::new(KubeHubApi::new(client.clone()));
        let work_store = Arc::new(KubeWorkStore::new(client.clone()));
        let views = Arc::new(KubeViewGetter::new(client.clone()));
        let object_stores = Arc::new(S3ObjectStoreGetter::new());

        let reconciler = Arc::new(DRClusterReconciler::new(
            hub,
            work_store,
            views,
            object_stores,
        ));

        Ok(Self {
            client,
            reconciler,
            operator_namespace: ramen_operator_namespace(),
        })
    }

    /// Runs the controller until shutdown.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("DRCluster Controller running");

        watcher::run(self.client, self.reconciler, self.operator_namespace).await
    }
}
