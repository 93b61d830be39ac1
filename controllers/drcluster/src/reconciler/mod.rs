//! DRCluster reconciliation
//!
//! Organized by concern:
//! - `dr_cluster`: the ordered reconcile tick and the deletion path
//! - `fence`: the fence sub-state machine, peer selection and NetworkFence
//!   synthesis
//! - `dr_cluster_config`: per-cluster config synthesis and delivery
//! - `mmode`: maintenance-mode ManifestWork pruning

pub mod dr_cluster;
pub mod dr_cluster_config;
pub mod fence;
pub mod mmode;

#[cfg(test)]
mod dr_cluster_config_test;
#[cfg(test)]
mod dr_cluster_test;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use kube::ResourceExt;
use object_store::ObjectStoreGetter;
use tracing::{debug, info};

use crds::{Condition, DRCluster, DRClusterPhase, DRClusterStatus};
use ocm_work::{MwUtil, ViewGetter, WorkStore};

use crate::backoff::RequeueRateLimiter;
use crate::config::RamenConfig;
use crate::error::ControllerError;
use crate::hub::HubApi;

/// Reconciles DRCluster objects.
pub struct DRClusterReconciler {
    pub(crate) hub: Arc<dyn HubApi>,
    pub(crate) work_store: Arc<dyn WorkStore>,
    pub(crate) views: Arc<dyn ViewGetter>,
    pub(crate) object_stores: Arc<dyn ObjectStoreGetter>,

    /// Last parsed operator config; read by the secret watch mapper.
    pub(crate) config_cache: Arc<RwLock<RamenConfig>>,

    /// Last seen DRClusters; read by the config-map and secret watch
    /// mappers, which cannot reach the API synchronously.
    pub(crate) cluster_cache: Arc<Mutex<HashMap<String, DRCluster>>>,

    /// Per-cluster error backoff for the watcher's error policy.
    pub(crate) requeue_backoff: RequeueRateLimiter,
}

impl DRClusterReconciler {
    pub fn new(
        hub: Arc<dyn HubApi>,
        work_store: Arc<dyn WorkStore>,
        views: Arc<dyn ViewGetter>,
        object_stores: Arc<dyn ObjectStoreGetter>,
    ) -> Self {
        Self {
            hub,
            work_store,
            views,
            object_stores,
            config_cache: Arc::new(RwLock::new(RamenConfig::default())),
            cluster_cache: Arc::new(Mutex::new(HashMap::new())),
            requeue_backoff: RequeueRateLimiter::new(1, 60),
        }
    }

    /// One reconcile tick for the named DRCluster. Returns whether another
    /// tick should be scheduled soon.
    pub async fn reconcile_dr_cluster(&self, name: &str) -> Result<bool, ControllerError> {
        info!(drcluster = %name, "reconcile enter");

        let object = match self.hub.get_dr_cluster(name).await? {
            Some(object) => object,
            None => {
                debug!(drcluster = %name, "DRCluster no longer exists");
                self.cluster_cache.lock().unwrap().remove(name);
                return Ok(false);
            }
        };

        self.cluster_cache
            .lock()
            .unwrap()
            .insert(name.to_string(), object.clone());

        let mwu = MwUtil::new(self.work_store.clone(), name, "");

        let mut instance = DrClusterInstance {
            reconciler: self,
            object,
            saved_status: DRClusterStatus::default(),
            mwu,
            requeue: false,
        };

        instance.initialize_status();

        let result = if instance.object.metadata.deletion_timestamp.is_some() {
            instance.process_deletion().await
        } else {
            instance.process_create_or_update().await
        };

        info!(drcluster = %name, "reconcile exit");

        result
    }
}

/// Per-tick working state for one DRCluster.
pub(crate) struct DrClusterInstance<'a> {
    pub(crate) reconciler: &'a DRClusterReconciler,
    pub(crate) object: DRCluster,
    pub(crate) saved_status: DRClusterStatus,
    pub(crate) mwu: MwUtil,
    pub(crate) requeue: bool,
}

impl DrClusterInstance<'_> {
    pub(crate) fn name(&self) -> String {
        self.object.name_any()
    }

    pub(crate) fn generation(&self) -> i64 {
        self.object.metadata.generation.unwrap_or(0)
    }

    pub(crate) fn conditions_mut(&mut self) -> &mut Vec<Condition> {
        &mut self
            .object
            .status
            .get_or_insert_with(DRClusterStatus::default)
            .conditions
    }

    pub(crate) fn phase(&self) -> DRClusterPhase {
        self.object
            .status
            .as_ref()
            .map(|s| s.phase)
            .unwrap_or_default()
    }

    pub(crate) fn set_phase(&mut self, next_phase: DRClusterPhase) {
        if self.phase() != next_phase {
            info!(
                drcluster = %self.name(),
                current = ?self.phase(),
                next = ?next_phase,
                "Phase transition"
            );

            self.object
                .status
                .get_or_insert_with(DRClusterStatus::default)
                .phase = next_phase;
        }
    }

    pub(crate) fn advance_to_next_phase(&mut self) {
        let next_phase = match self.phase() {
            DRClusterPhase::Fencing => DRClusterPhase::Fenced,
            DRClusterPhase::Unfencing => DRClusterPhase::Unfenced,
            other => other,
        };

        self.set_phase(next_phase);
    }

    pub(crate) fn is_fencing_or_fenced(&self) -> bool {
        matches!(
            self.phase(),
            DRClusterPhase::Fencing | DRClusterPhase::Fenced
        )
    }

    pub(crate) fn is_unfencing_or_unfenced(&self) -> bool {
        matches!(
            self.phase(),
            DRClusterPhase::Unfencing | DRClusterPhase::Unfenced
        )
    }

    /// Saves the incoming status for the end-of-tick diff and seeds the
    /// Unknown conditions on first sight.
    pub(crate) fn initialize_status(&mut self) {
        if self.object.status.is_none() {
            self.object.status = Some(DRClusterStatus::default());
        }

        self.saved_status = self.object.status.clone().unwrap_or_default();

        let generation = self.generation();
        let status = self.object.status.as_mut().unwrap();

        if status.conditions.is_empty() {
            crate::conditions::set_dr_cluster_initial_condition(
                &mut status.conditions,
                generation,
                "Initializing DRCluster",
            );
            status.phase = DRClusterPhase::Starting;
        }
    }

    /// Persists status iff it drifted from the saved copy.
    pub(crate) async fn status_update(&mut self) -> Result<(), ControllerError> {
        let current = self.object.status.clone().unwrap_or_default();

        if current == self.saved_status {
            debug!(drcluster = %self.name(), "Status unchanged");
            return Ok(());
        }

        let updated = self
            .reconciler
            .hub
            .update_dr_cluster_status(&self.object)
            .await?;

        self.object.metadata.resource_version = updated.metadata.resource_version;
        self.saved_status = current;

        info!(drcluster = %self.name(), "Updated DRCluster status");

        Ok(())
    }

    /// Records a validation failure on the Validated condition and returns
    /// the original error for the caller to propagate.
    pub(crate) async fn validated_set_false_and_update(
        &mut self,
        reason: &str,
        err: ControllerError,
    ) -> ControllerError {
        let generation = self.generation();
        let message = err.to_string();

        crate::conditions::set_status_condition(
            self.conditions_mut(),
            Condition::new(
                crds::DRCLUSTER_VALIDATED,
                crds::ConditionStatus::False,
                reason,
                message,
                Some(generation),
            ),
        );

        if let Err(update_err) = self.status_update().await {
            return update_err;
        }

        err
    }
}
