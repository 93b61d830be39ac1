//! Maintenance-mode handling
//!
//! The DRPC controller activates maintenance modes while a workload fails
//! over; this side deactivates them once no failover toward this cluster is
//! in progress anymore.

use tracing::{debug, info};

use crds::{find_condition, DRAction, DRPlacementControl, DRPC_CONDITION_AVAILABLE};
use kube::ResourceExt;
use ocm_work::extract_mmode_from_manifest_work;

use crate::error::ControllerError;
use crate::hub::HubApi as _;
use crate::reconciler::DrClusterInstance;

impl DrClusterInstance<'_> {
    /// Step 9: retire maintenance-mode works that no in-progress failover
    /// toward this cluster needs anymore.
    pub(crate) async fn cluster_mmode_handler(&mut self) -> Result<(), ControllerError> {
        let cluster = self.name();

        let works = self.mwu.list_mmode_manifests(&cluster).await?;
        if works.is_empty() {
            return Ok(());
        }

        let drpcs = self.reconciler.hub.list_dr_placement_controls().await?;
        if drpcs
            .iter()
            .any(|drpc| failover_in_progress(drpc, &cluster))
        {
            debug!(drcluster = %cluster, "Maintenance modes still required by a failover");
            return Ok(());
        }

        for mw in &works {
            if let Some(mmode) = extract_mmode_from_manifest_work(mw)? {
                info!(
                    drcluster = %cluster,
                    provisioner = %mmode.spec.storage_provisioner,
                    "Deactivating maintenance mode"
                );
            }

            self.mwu
                .delete_manifest_work(&mw.name_any(), &cluster)
                .await?;
        }

        Ok(())
    }
}

/// True while a DRPC is failing over to the cluster and has not reported
/// Available at its current generation.
pub(crate) fn failover_in_progress(drpc: &DRPlacementControl, cluster: &str) -> bool {
    if drpc.spec.action != DRAction::Failover || drpc.spec.failover_cluster != cluster {
        return false;
    }

    let available = drpc
        .status
        .as_ref()
        .and_then(|s| find_condition(&s.conditions, DRPC_CONDITION_AVAILABLE))
        .map(|c| c.is_true() && c.observed_generation == drpc.metadata.generation)
        .unwrap_or(false);

    !available
}
