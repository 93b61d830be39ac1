//! Watch wiring
//!
//! One kube-runtime Controller over DRCluster, with mapped watches for
//! DRPolicy, DRPlacementControl, ManifestWork, ManagedClusterView,
//! ConfigMap and Secret. The predicates keep spurious events from turning
//! into reconciles; mapped events enqueue exactly the affected DRCluster.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::api::Api;
use kube::{Client, ResourceExt};
use kube_runtime::controller::{Action, Controller};
use kube_runtime::reflector::ObjectRef;
use kube_runtime::watcher;
use tracing::{debug, error};

use crds::{DRCluster, DRPlacementControl, DRPolicy, ManagedClusterView, ManifestWork};

use crate::error::ControllerError;
use crate::predicates::{
    drpc_update_of_interest, filter_dr_cluster_mcv, filter_dr_cluster_mw, filter_dr_cluster_secret,
    filter_drpc, is_hub_operator_config_map,
};
use crate::reconciler::DRClusterReconciler;

/// Delay before re-checking awaited remote state (fence status and the
/// like).
const REQUEUE_DELAY: Duration = Duration::from_secs(10);

pub async fn run(
    client: Client,
    reconciler: Arc<DRClusterReconciler>,
    operator_namespace: String,
) -> Result<(), ControllerError> {
    let drclusters: Api<DRCluster> = Api::all(client.clone());
    let drpolicies: Api<DRPolicy> = Api::all(client.clone());
    let drpcs: Api<DRPlacementControl> = Api::all(client.clone());
    let manifest_works: Api<ManifestWork> = Api::all(client.clone());
    let views: Api<ManagedClusterView> = Api::all(client.clone());
    let config_maps: Api<ConfigMap> = Api::namespaced(client.clone(), &operator_namespace);
    let secrets: Api<Secret> = Api::namespaced(client.clone(), &operator_namespace);

    // Last seen DRPCs, for the old/new comparison the update predicate
    // needs.
    let drpc_seen: Arc<Mutex<HashMap<String, DRPlacementControl>>> =
        Arc::new(Mutex::new(HashMap::new()));

    let cm_namespace = operator_namespace.clone();
    let cm_clusters = reconciler.cluster_cache.clone();
    let secret_namespace = operator_namespace.clone();
    let secret_clusters = reconciler.cluster_cache.clone();
    let secret_config = reconciler.config_cache.clone();

    let reconcile = |obj: Arc<DRCluster>, ctx: Arc<DRClusterReconciler>| async move {
        let name = obj.name_any();

        match ctx.reconcile_dr_cluster(&name).await {
            Ok(requeue) => {
                ctx.requeue_backoff.reset(&name);

                if requeue {
                    Ok(Action::requeue(REQUEUE_DELAY))
                } else {
                    Ok(Action::await_change())
                }
            }
            Err(e) => Err(e),
        }
    };

    let error_policy =
        |obj: Arc<DRCluster>, err: &ControllerError, ctx: Arc<DRClusterReconciler>| {
            let name = obj.name_any();
            error!(drcluster = %name, error = %err, "Reconciliation error");

            Action::requeue(ctx.requeue_backoff.delay(&name))
        };

    Controller::new(drclusters, watcher::Config::default())
        .watches(drpolicies, watcher::Config::default(), |policy: DRPolicy| {
            policy
                .spec
                .dr_clusters
                .iter()
                .map(|name| ObjectRef::new(name))
                .collect::<Vec<_>>()
        })
        .watches(drpcs, watcher::Config::default(), move |drpc: DRPlacementControl| {
            let key = format!(
                "{}/{}",
                drpc.namespace().unwrap_or_default(),
                drpc.name_any()
            );

            let mut seen = drpc_seen.lock().unwrap();
            let interesting = drpc_update_of_interest(seen.get(&key), &drpc);
            seen.insert(key, drpc.clone());

            if !interesting {
                return Vec::new();
            }

            filter_drpc(&drpc)
                .map(|name| ObjectRef::new(&name))
                .into_iter()
                .collect()
        })
        .watches(
            manifest_works,
            watcher::Config::default(),
            |mw: ManifestWork| {
                filter_dr_cluster_mw(&mw)
                    .map(|name| ObjectRef::new(&name))
                    .into_iter()
                    .collect::<Vec<_>>()
            },
        )
        .watches(views, watcher::Config::default(), |mcv: ManagedClusterView| {
            filter_dr_cluster_mcv(&mcv)
                .map(|name| ObjectRef::new(&name))
                .into_iter()
                .collect::<Vec<_>>()
        })
        .watches(config_maps, watcher::Config::default(), move |cm: ConfigMap| {
            if !is_hub_operator_config_map(&cm, &cm_namespace) {
                return Vec::new();
            }

            cm_clusters
                .lock()
                .unwrap()
                .keys()
                .map(|name| ObjectRef::new(name))
                .collect()
        })
        .watches(secrets, watcher::Config::default(), move |secret: Secret| {
            let config = secret_config.read().unwrap().clone();
            let drclusters: Vec<DRCluster> =
                secret_clusters.lock().unwrap().values().cloned().collect();

            filter_dr_cluster_secret(&secret, &drclusters, &config, &secret_namespace)
                .into_iter()
                .map(|name| ObjectRef::new(&name))
                .collect::<Vec<_>>()
        })
        .shutdown_on_signal()
        .run(reconcile, error_policy, reconciler)
        .for_each(|result| async move {
            match result {
                Ok(obj) => debug!(object = ?obj, "Reconciled"),
                Err(e) => error!(error = %e, "Controller error"),
            }
        })
        .await;

    Ok(())
}
