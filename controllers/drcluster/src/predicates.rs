//! Event-filtering predicates
//!
//! Watch events are filtered and mapped to the affected DRCluster name here,
//! so spurious events never turn into full reconciles.

use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::ResourceExt;

use crds::{
    find_condition, DRAction, DRCluster, DRPlacementControl, ManagedClusterView, ManifestWork,
    DRCLUSTER_NAME_ANNOTATION, DRPC_CONDITION_AVAILABLE,
};

use crate::config::{RamenConfig, HUB_OPERATOR_CONFIG_MAP_NAME, NO_S3_STORE_AVAILABLE};

/// Whether a DRPC update requires a DRCluster reconcile. Passes only
/// failing-over DRPCs, and among those only the interesting transitions:
/// the action or failover cluster just changed, or Available just turned
/// True at the current generation.
pub fn drpc_update_of_interest(
    old: Option<&DRPlacementControl>,
    new: &DRPlacementControl,
) -> bool {
    if new.spec.action != DRAction::Failover {
        return false;
    }

    let Some(old) = old else {
        return true;
    };

    if old.spec.action != DRAction::Failover {
        return true;
    }

    if old.spec.failover_cluster != new.spec.failover_cluster {
        return true;
    }

    let available_now = new
        .status
        .as_ref()
        .and_then(|s| find_condition(&s.conditions, DRPC_CONDITION_AVAILABLE))
        .map(|c| c.is_true() && c.observed_generation == new.metadata.generation)
        .unwrap_or(false);

    if available_now {
        // Interesting only when it just flipped; a steady Available DRPC
        // would otherwise retrigger maintenance-mode handling forever.
        let available_before = old
            .status
            .as_ref()
            .and_then(|s| find_condition(&s.conditions, DRPC_CONDITION_AVAILABLE))
            .map(|c| c.is_true())
            .unwrap_or(false);

        return !available_before;
    }

    true
}

/// DRCluster affected by a failing-over DRPC.
pub fn filter_drpc(drpc: &DRPlacementControl) -> Option<String> {
    if drpc.spec.failover_cluster.is_empty() {
        return None;
    }

    Some(drpc.spec.failover_cluster.clone())
}

/// DRCluster owning a ManifestWork, from its annotation.
pub fn filter_dr_cluster_mw(mw: &ManifestWork) -> Option<String> {
    mw.annotations()
        .get(DRCLUSTER_NAME_ANNOTATION)
        .filter(|name| !name.is_empty())
        .cloned()
}

/// DRCluster owning a ManagedClusterView, from its annotation.
pub fn filter_dr_cluster_mcv(mcv: &ManagedClusterView) -> Option<String> {
    mcv.annotations()
        .get(DRCLUSTER_NAME_ANNOTATION)
        .filter(|name| !name.is_empty())
        .cloned()
}

/// True only for the single hub operator config map.
pub fn is_hub_operator_config_map(config_map: &ConfigMap, operator_namespace: &str) -> bool {
    config_map.name_any() == HUB_OPERATOR_CONFIG_MAP_NAME
        && config_map.namespace().as_deref() == Some(operator_namespace)
}

/// DRClusters whose configured S3 profile references the secret.
pub fn filter_dr_cluster_secret(
    secret: &Secret,
    drclusters: &[DRCluster],
    config: &RamenConfig,
    operator_namespace: &str,
) -> Vec<String> {
    if secret.namespace().as_deref() != Some(operator_namespace) {
        return Vec::new();
    }

    let secret_name = secret.name_any();

    drclusters
        .iter()
        .filter(|drcluster| {
            let profile_name = &drcluster.spec.s3_profile_name;
            if profile_name == NO_S3_STORE_AVAILABLE {
                return false;
            }

            config
                .s3_store_profiles
                .iter()
                .any(|p| &p.s3_profile_name == profile_name && p.s3_secret_ref.name == secret_name)
        })
        .map(|drcluster| drcluster.name_any())
        .collect()
}
