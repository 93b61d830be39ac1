//! Fence sub-state machine
//!
//! Drives the fence intent from `spec.clusterFence`: places NetworkFence
//! ManifestWorks on the selected peer, observes remote fence status through
//! views, and cleans fence artifacts from both clusters once unfenced. The
//! NetworkFence always lands on the peer; placing it on the target would
//! make the fence unreachable along with the cluster it isolates.

use std::collections::BTreeMap;
use tracing::{info, warn};

use k8s_openapi::api::storage::v1::StorageClass;
use kube::ResourceExt;

use crds::{
    ClusterFenceState, DRCluster, DRClusterPhase, DRPolicy, FencingOperationResult, NetworkFence,
    NetworkFenceClass, NetworkFenceSpec, SecretSpec, ALL_DRPOLICY_ANNOTATION,
    CREATED_BY_RAMEN_LABEL, CREATED_BY_RAMEN_VALUE, DRCLUSTER_NAME_ANNOTATION,
    NETWORK_FENCE_PREFIX, STORAGE_ANNOTATION_CLUSTER_ID, STORAGE_ANNOTATION_DRIVER,
    STORAGE_ANNOTATION_SECRET_NAME, STORAGE_ANNOTATION_SECRET_NAMESPACE, STORAGE_ID_LABEL,
};
use ocm_work::{
    manifest_work_name, prune_class_views, ViewGetter as _, WorkStore as _, MW_TYPE_NF,
};

use crate::conditions::*;
use crate::error::ControllerError;
use crate::hub::HubApi as _;
use crate::reconciler::DrClusterInstance;

impl DrClusterInstance<'_> {
    /// Dispatches the fence intent. Manual intents only assert conditions;
    /// ramen-driven intents run the fence/unfence machines.
    pub(crate) async fn cluster_fence_handle(&mut self) -> Result<bool, ControllerError> {
        let generation = self.generation();

        match self.object.spec.cluster_fence {
            ClusterFenceState::Unfenced => self.cluster_unfence().await,

            ClusterFenceState::ManuallyFenced => {
                set_dr_cluster_fenced_condition(
                    self.conditions_mut(),
                    generation,
                    "Cluster Manually fenced",
                );
                self.set_phase(DRClusterPhase::Fenced);

                Ok(false)
            }

            ClusterFenceState::ManuallyUnfenced => {
                set_dr_cluster_clean_condition(
                    self.conditions_mut(),
                    generation,
                    "Cluster Manually Unfenced and clean",
                );
                self.set_phase(DRClusterPhase::Unfenced);

                Ok(false)
            }

            ClusterFenceState::Fenced => self.cluster_fence().await,

            ClusterFenceState::Unspecified => {
                set_dr_cluster_fence_unspecified_condition(
                    self.conditions_mut(),
                    generation,
                    "Cluster clean, no fence state requested",
                );
                self.set_phase(DRClusterPhase::Available);

                Ok(false)
            }
        }
    }

    async fn cluster_fence(&mut self) -> Result<bool, ControllerError> {
        let generation = self.generation();

        let peer = self.get_peer_cluster().await?;
        let nf_classes = self.nf_classes_from_dr_cluster_config(&peer).await?;

        if !self.is_fencing_or_fenced() {
            info!(
                drcluster = %self.name(),
                peer = %peer.name_any(),
                "Initiating cluster fence from the peer"
            );

            for nf_class in &nf_classes {
                if let Err(e) = self.create_nf_manifest_work(&peer, nf_class).await {
                    set_dr_cluster_fencing_failed_condition(
                        self.conditions_mut(),
                        generation,
                        REASON_FENCE_ERROR,
                        &format!("NetworkFence ManifestWork creation failed: {e}"),
                    );

                    return Err(e);
                }
            }

            set_dr_cluster_fencing_condition(
                self.conditions_mut(),
                generation,
                "ManifestWork for NetworkFence fence operation created",
            );
            self.set_phase(DRClusterPhase::Fencing);

            // Just placed the fencing resources; observe them next tick.
            return Ok(true);
        }

        for nf_class in &nf_classes {
            if self.fence_pending_on_peer(&peer, nf_class).await? {
                return Ok(true);
            }
        }

        set_dr_cluster_fenced_condition(
            self.conditions_mut(),
            generation,
            "Cluster successfully fenced",
        );
        self.advance_to_next_phase();

        Ok(false)
    }

    async fn cluster_unfence(&mut self) -> Result<bool, ControllerError> {
        let generation = self.generation();

        // Unfence already completed and cleaned; the phase settled back to
        // Available. Re-initiating would recreate the works just deleted.
        if self.phase() == DRClusterPhase::Available && self.clean_condition_is_true() {
            return Ok(false);
        }

        let peer = self.get_peer_cluster().await?;
        let nf_classes = self.nf_classes_from_dr_cluster_config(&peer).await?;

        if !self.is_unfencing_or_unfenced() {
            info!(
                drcluster = %self.name(),
                peer = %peer.name_any(),
                "Initiating cluster unfence from the peer"
            );

            for nf_class in &nf_classes {
                if let Err(e) = self.create_nf_manifest_work(&peer, nf_class).await {
                    set_dr_cluster_unfencing_failed_condition(
                        self.conditions_mut(),
                        generation,
                        REASON_UNFENCE_ERROR,
                        &format!("NetworkFence ManifestWork for unfence failed: {e}"),
                    );

                    return Err(e);
                }
            }

            set_dr_cluster_unfencing_condition(
                self.conditions_mut(),
                generation,
                "ManifestWork for NetworkFence unfence operation created",
            );
            self.set_phase(DRClusterPhase::Unfencing);

            return Ok(true);
        }

        for nf_class in &nf_classes {
            if self.unfence_pending_on_peer(&peer, nf_class).await? {
                info!(drcluster = %self.name(), "Requeueing, cluster unfence not complete");
                return Ok(true);
            }
        }

        set_dr_cluster_unfenced_condition(
            self.conditions_mut(),
            generation,
            "Cluster successfully unfenced",
        );
        self.advance_to_next_phase();

        // Unfenced everywhere; retire the fencing artifacts from both sides.
        self.clean_clusters(&[self.object.clone(), peer]).await
    }

    /// Whether the fence of one class is still pending on the peer. Returns
    /// false only once the remote NetworkFence carries the requested state
    /// with a succeeded result.
    async fn fence_pending_on_peer(
        &mut self,
        peer: &DRCluster,
        nf_class: &str,
    ) -> Result<bool, ControllerError> {
        let generation = self.generation();

        let nf = match self.network_fence_view(peer, nf_class).await {
            Ok(nf) => nf,
            Err(e) if e.is_not_found() => {
                // The NetworkFence or its view may not exist on the managed
                // cluster yet; fencing never deletes it, so wait.
                return Ok(true);
            }
            Err(e) => return Err(e),
        };

        if Some(nf.spec.fence_state) != self.object.spec.cluster_fence.fence_state() {
            info!(drcluster = %self.name(), "NetworkFence fence state not yet updated");
            return Ok(true);
        }

        if nf.status.as_ref().and_then(|s| s.result) != Some(FencingOperationResult::Succeeded) {
            set_dr_cluster_fencing_failed_condition(
                self.conditions_mut(),
                generation,
                REASON_FENCE_ERROR,
                "fencing operation not successful",
            );

            warn!(drcluster = %self.name(), "Fencing operation not successful");

            return Ok(true);
        }

        Ok(false)
    }

    /// Unfence counterpart of [`Self::fence_pending_on_peer`]; a missing
    /// NetworkFence may mean the artifacts are already cleaned.
    async fn unfence_pending_on_peer(
        &mut self,
        peer: &DRCluster,
        nf_class: &str,
    ) -> Result<bool, ControllerError> {
        let generation = self.generation();

        let nf = match self.network_fence_view(peer, nf_class).await {
            Ok(nf) => nf,
            Err(e) if e.is_not_found() => {
                return self.requeue_if_nf_mw_exists(peer, nf_class).await;
            }
            Err(e) => return Err(e),
        };

        if Some(nf.spec.fence_state) != self.object.spec.cluster_fence.fence_state() {
            info!(drcluster = %self.name(), "NetworkFence fence state not yet updated");
            return Ok(true);
        }

        if nf.status.as_ref().and_then(|s| s.result) != Some(FencingOperationResult::Succeeded) {
            set_dr_cluster_unfencing_failed_condition(
                self.conditions_mut(),
                generation,
                REASON_UNFENCE_ERROR,
                "unfencing operation not successful",
            );

            warn!(drcluster = %self.name(), "Unfencing operation not successful");

            return Ok(true);
        }

        Ok(false)
    }

    fn clean_condition_is_true(&self) -> bool {
        self.object
            .status
            .as_ref()
            .and_then(|s| crds::find_condition(&s.conditions, crds::DRCLUSTER_CONDITION_TYPE_CLEAN))
            .map(|c| c.is_true())
            .unwrap_or(false)
    }

    async fn network_fence_view(
        &self,
        peer: &DRCluster,
        nf_class: &str,
    ) -> Result<NetworkFence, ControllerError> {
        let annotations = BTreeMap::from([(
            DRCLUSTER_NAME_ANNOTATION.to_string(),
            self.name(),
        )]);

        let nf_name = network_fence_resource_name(&self.name(), nf_class);

        Ok(self
            .reconciler
            .views
            .get_network_fence(&nf_name, &peer.name_any(), &annotations)
            .await?)
    }

    /// The NetworkFence is gone; the work wrapping it must be gone too
    /// before the unfence leg can be considered cleaned.
    async fn requeue_if_nf_mw_exists(
        &self,
        peer: &DRCluster,
        nf_class: &str,
    ) -> Result<bool, ControllerError> {
        let mw_name = nf_manifest_work_name(&self.name(), nf_class, &peer.name_any());

        match self.mwu.find_manifest_work(&mw_name, &peer.name_any()).await {
            Err(e) if e.is_not_found() => {
                info!(drcluster = %self.name(), "NetworkFence and its ManifestWork are gone");
                Ok(false)
            }
            Ok(_) => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    /// Deletion-path cleanup: unfence artifacts on both the target and the
    /// peer.
    pub(crate) async fn handle_deletion(&mut self) -> Result<bool, ControllerError> {
        let peer = self.get_peer_cluster().await?;

        self.clean_clusters(&[self.object.clone(), peer]).await
    }

    /// Deletes the fencing works from every listed cluster's namespace and
    /// asserts Clean once all are gone.
    pub(crate) async fn clean_clusters(
        &mut self,
        clusters: &[DRCluster],
    ) -> Result<bool, ControllerError> {
        info!(drcluster = %self.name(), "Initiating removal of NetworkFence resources");

        let generation = self.generation();

        let mut need_requeue = false;
        let mut cleaned_count = 0;

        for cluster in clusters {
            match self.remove_fencing_crs(cluster).await {
                Ok(false) => cleaned_count += 1,
                Ok(true) => need_requeue = true,
                Err(e) => {
                    warn!(
                        drcluster = %self.name(),
                        cluster = %cluster.name_any(),
                        error = %e,
                        "Failed to remove fencing resources"
                    );
                    need_requeue = true;
                }
            }
        }

        if cleaned_count == clusters.len() {
            set_dr_cluster_clean_condition(
                self.conditions_mut(),
                generation,
                "fencing resource cleaned from cluster",
            );

            if self.phase() == DRClusterPhase::Unfenced {
                self.set_phase(DRClusterPhase::Available);
            }
        } else {
            set_dr_cluster_cleaning_condition(
                self.conditions_mut(),
                generation,
                "NetworkFence resource clean started",
            );
        }

        Ok(need_requeue)
    }

    /// Deletes every NetworkFence work this DRCluster owns in the given
    /// cluster's namespace, generic and class-scoped alike.
    async fn remove_fencing_crs(&self, cluster: &DRCluster) -> Result<bool, ControllerError> {
        let cluster_name = cluster.name_any();

        let works = self
            .reconciler
            .work_store
            .list_labeled(&cluster_name, "app=NF")
            .await?;

        for mw in &works {
            let owned = mw
                .annotations()
                .get(DRCLUSTER_NAME_ANNOTATION)
                .map(|owner| owner == &self.name())
                .unwrap_or(false);

            if owned {
                self.mwu
                    .delete_manifest_work(&mw.name_any(), &cluster_name)
                    .await?;
            }
        }

        Ok(false)
    }

    async fn create_nf_manifest_work(
        &mut self,
        peer: &DRCluster,
        nf_class: &str,
    ) -> Result<(), ControllerError> {
        info!(
            peer = %peer.name_any(),
            target = %self.name(),
            "Creating NetworkFence ManifestWork on the peer"
        );

        let nf = generate_network_fence(&self.object, nf_class)?;

        let annotations = BTreeMap::from([(
            DRCLUSTER_NAME_ANNOTATION.to_string(),
            self.name(),
        )]);

        self.mwu
            .create_or_update_nf_manifest_work(&self.name(), &peer.name_any(), &nf, annotations)
            .await?;

        Ok(())
    }

    /// Selects the peer by scanning policies through the API store.
    async fn get_peer_cluster(&mut self) -> Result<DRCluster, ControllerError> {
        let policies = self.reconciler.hub.list_dr_policies().await?;
        let clusters = self.reconciler.hub.list_dr_clusters().await?;

        match select_peer(&policies, &clusters, &self.object) {
            Some(peer) => Ok(peer),
            None => {
                let generation = self.generation();
                let message = format!("no peer cluster found for cluster {}", self.name());

                if self.object.spec.cluster_fence == ClusterFenceState::Unfenced {
                    set_dr_cluster_unfencing_failed_condition(
                        self.conditions_mut(),
                        generation,
                        REASON_ERROR,
                        &message,
                    );
                } else {
                    set_dr_cluster_fencing_failed_condition(
                        self.conditions_mut(),
                        generation,
                        REASON_ERROR,
                        &message,
                    );
                }

                Err(ControllerError::PeerNotFound(self.name()))
            }
        }
    }

    /// Reads the peer's advertised inventory and matches fence classes
    /// against storage classes. The stale class views are pruned as a side
    /// effect.
    async fn nf_classes_from_dr_cluster_config(
        &self,
        peer: &DRCluster,
    ) -> Result<Vec<String>, ControllerError> {
        let peer_name = peer.name_any();

        let annotations = BTreeMap::from([
            (ALL_DRPOLICY_ANNOTATION.to_string(), peer_name.clone()),
            (DRCLUSTER_NAME_ANNOTATION.to_string(), self.name()),
        ]);

        let drc_config = self
            .reconciler
            .views
            .get_dr_cluster_config(&peer_name, &annotations)
            .await?;

        let nf_class_names: Vec<String> = drc_config
            .status
            .as_ref()
            .map(|s| s.network_fence_classes.clone())
            .unwrap_or_default();

        let mut nf_classes = Vec::with_capacity(nf_class_names.len());
        for name in &nf_class_names {
            nf_classes.push(
                self.reconciler
                    .views
                    .get_network_fence_class(name, &peer_name, &annotations)
                    .await?,
            );
        }

        let views = self.reconciler.views.list_nf_class_views(&peer_name).await?;
        prune_class_views(
            self.reconciler.views.as_ref(),
            &peer_name,
            &nf_class_names,
            &views,
        )
        .await?;

        let storage_class_names: Vec<String> = drc_config
            .status
            .as_ref()
            .map(|s| s.storage_classes.clone())
            .unwrap_or_default();

        let mut storage_classes = Vec::with_capacity(storage_class_names.len());
        for name in &storage_class_names {
            storage_classes.push(
                self.reconciler
                    .views
                    .get_storage_class(name, &peer_name, &annotations)
                    .await?,
            );
        }

        Ok(find_matching_nf_classes(&nf_classes, &storage_classes))
    }
}

/// NetworkFence resource name:
/// `network-fence-<target>`, or `network-fence-<class>-<target>`.
pub(crate) fn network_fence_resource_name(target: &str, nf_class: &str) -> String {
    if nf_class.is_empty() {
        return format!("{NETWORK_FENCE_PREFIX}-{target}");
    }

    format!("{NETWORK_FENCE_PREFIX}-{nf_class}-{target}")
}

/// ManifestWork name wrapping a NetworkFence:
/// `<target>[-class]-<cluster>-nf-mw`.
pub(crate) fn nf_manifest_work_name(target: &str, nf_class: &str, cluster: &str) -> String {
    let inst = if nf_class.is_empty() {
        target.to_string()
    } else {
        format!("{target}-{nf_class}")
    };

    manifest_work_name(&inst, cluster, MW_TYPE_NF)
}

/// Picks the peer for a target: scan the policies containing the target and
/// accept the first other member that exists, is not being deleted, and is
/// either storage-peered (non-empty peer classes) or in the same region.
pub(crate) fn select_peer(
    policies: &[DRPolicy],
    clusters: &[DRCluster],
    target: &DRCluster,
) -> Option<DRCluster> {
    let target_name = target.name_any();

    for policy in policies {
        if !policy.contains_dr_cluster(&target_name) {
            continue;
        }

        for candidate_name in &policy.spec.dr_clusters {
            if candidate_name == &target_name {
                continue;
            }

            let Some(candidate) = clusters
                .iter()
                .find(|c| &c.name_any() == candidate_name)
            else {
                continue;
            };

            if candidate.metadata.deletion_timestamp.is_some() {
                info!(
                    peer = %candidate_name,
                    target = %target_name,
                    "Skipping peer being deleted"
                );
                continue;
            }

            let peered = policy
                .status
                .as_ref()
                .map(|s| !s.sync.peer_classes.is_empty())
                .unwrap_or(false);

            if peered || candidate.spec.region == target.spec.region {
                return Some(candidate.clone());
            }
        }
    }

    None
}

/// Emits the fence-class names whose provisioner and storage-ID set match a
/// discovered storage class. With no match at all, a single empty entry
/// selects the generic fence path.
pub(crate) fn find_matching_nf_classes(
    network_fence_classes: &[NetworkFenceClass],
    storage_classes: &[StorageClass],
) -> Vec<String> {
    let mut nf_classes = Vec::new();

    for nfc in network_fence_classes {
        let Some(id_set) = nfc.annotations().get(STORAGE_ID_LABEL) else {
            continue;
        };
        let ids: Vec<&str> = id_set.split(',').collect();

        for sc in storage_classes {
            let storage_id = sc
                .metadata
                .labels
                .as_ref()
                .and_then(|l| l.get(STORAGE_ID_LABEL))
                .map(String::as_str)
                .unwrap_or_default();

            if sc.provisioner == nfc.spec.provisioner && ids.contains(&storage_id) {
                nf_classes.push(nfc.name_any());
            }
        }
    }

    if nf_classes.is_empty() {
        nf_classes.push(String::new());
    }

    nf_classes
}

/// Builds the NetworkFence for a target cluster. With a class the storage
/// details come from the class; without one they are filled from the
/// target's storage annotations.
pub(crate) fn generate_network_fence(
    target: &DRCluster,
    nf_class: &str,
) -> Result<NetworkFence, ControllerError> {
    if target.spec.cidrs.is_empty() {
        return Err(ControllerError::Validation("CIDRs has no values".to_string()));
    }

    let fence_state = target.spec.cluster_fence.fence_state().ok_or_else(|| {
        ControllerError::Validation(format!(
            "fence state {:?} does not map to a NetworkFence state",
            target.spec.cluster_fence
        ))
    })?;

    let mut nf = NetworkFence::new(
        &network_fence_resource_name(&target.name_any(), nf_class),
        NetworkFenceSpec {
            fence_state,
            cidrs: target.spec.cidrs.clone(),
            network_fence_class_name: String::new(),
            driver: String::new(),
            secret: None,
            parameters: BTreeMap::new(),
        },
    );

    nf.metadata
        .labels
        .get_or_insert_with(BTreeMap::new)
        .insert(
            CREATED_BY_RAMEN_LABEL.to_string(),
            CREATED_BY_RAMEN_VALUE.to_string(),
        );

    if !nf_class.is_empty() {
        nf.spec.network_fence_class_name = nf_class.to_string();

        return Ok(nf);
    }

    fill_storage_details(target, &mut nf)?;

    Ok(nf)
}

/// Fills driver, secret and cluster ID from the DRCluster's storage
/// annotations; each one is required for a generic fence.
fn fill_storage_details(
    cluster: &DRCluster,
    nf: &mut NetworkFence,
) -> Result<(), ControllerError> {
    let annotation = |key: &str, what: &str| -> Result<String, ControllerError> {
        cluster
            .annotations()
            .get(key)
            .cloned()
            .ok_or_else(|| {
                ControllerError::Validation(format!("failed to find {what} in annotations"))
            })
    };

    let storage_driver = annotation(STORAGE_ANNOTATION_DRIVER, "storage driver")?;
    let secret_name = annotation(STORAGE_ANNOTATION_SECRET_NAME, "storage secret name")?;
    let secret_namespace =
        annotation(STORAGE_ANNOTATION_SECRET_NAMESPACE, "storage secret namespace")?;
    let cluster_id = annotation(STORAGE_ANNOTATION_CLUSTER_ID, "storage cluster id")?;

    nf.spec.driver = storage_driver;
    nf.spec.secret = Some(SecretSpec {
        name: secret_name,
        namespace: secret_namespace,
    });
    nf.spec.parameters = BTreeMap::from([("clusterID".to_string(), cluster_id)]);

    Ok(())
}
