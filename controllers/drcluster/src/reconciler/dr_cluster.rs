//! DRCluster reconcile tick
//!
//! The create/update path runs a fixed sequence of steps, each
//! short-circuiting with a typed reason on the Validated condition. Fencing
//! is processed right after spec validation: the cluster being fenced may be
//! unreachable and fail later liveness checks, but the fence request must
//! still make progress.

use ipnetwork::IpNetwork;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crds::{
    ClusterFenceState, DRCluster, DRCLUSTER_FINALIZER, DRCLUSTER_NAME_ANNOTATION,
    OCM_BACKUP_LABEL_KEY, OCM_BACKUP_LABEL_VALUE,
};
use object_store::{ObjectStore as _, ObjectStoreGetter as _};
use ocm_work::{
    is_manifest_in_applied_state, manifest_work_name_type, ViewGetter as _, MW_TYPE_DRCCONFIG,
};

use crate::conditions::{set_dr_cluster_validated_condition, REASON_VALIDATION_FAILED};
use crate::hub::HubApi as _;
use crate::config::{
    config_map_get, get_s3_store_profile, ramen_operator_namespace, s3_credentials_from_secret,
    NO_S3_STORE_AVAILABLE,
};
use crate::error::ControllerError;
use crate::reconciler::DrClusterInstance;

impl DrClusterInstance<'_> {
    pub(crate) async fn process_create_or_update(&mut self) -> Result<bool, ControllerError> {
        info!(drcluster = %self.name(), "create/update");

        let config = match config_map_get(self.reconciler.hub.as_ref()).await {
            Ok((_, config)) => config,
            Err(e) => {
                return Err(self
                    .validated_set_false_and_update("ConfigMapGetFailed", e)
                    .await)
            }
        };

        *self.reconciler.config_cache.write().unwrap() = config.clone();

        if let Err(e) = self.add_labels_and_finalizers().await {
            return Err(self
                .validated_set_false_and_update("FinalizerAddFailed", e)
                .await);
        }

        if let Err(e) = self.dr_cluster_deploy().await {
            return Err(self
                .validated_set_false_and_update("DrClustersDeployFailed", e)
                .await);
        }

        if let Err(e) = validate_cidrs_format(&self.object) {
            return Err(self
                .validated_set_false_and_update(REASON_VALIDATION_FAILED, e)
                .await);
        }

        // Fence errors are logged but do not short-circuit validation.
        match self.cluster_fence_handle().await {
            Ok(requeue) => self.requeue = self.requeue || requeue,
            Err(e) => {
                warn!(drcluster = %self.name(), error = %e, "Error during fence processing");
                self.requeue = true;
            }
        }

        if let Err((reason, e)) = self.validate_s3_profile(&config).await {
            return Err(self.validated_set_false_and_update(&reason, e).await);
        }

        if let Err(e) = self.get_dr_cluster_deployed_status().await {
            return Err(self
                .validated_set_false_and_update("DrClustersDeployStatusCheckFailed", e)
                .await);
        }

        if let Err(e) = self.ensure_dr_cluster_config().await {
            return Err(self
                .validated_set_false_and_update("DRClusterConfigInProgress", e)
                .await);
        }

        let generation = self.generation();
        set_dr_cluster_validated_condition(
            self.conditions_mut(),
            generation,
            "Validated the cluster",
        );

        if let Err(e) = self.cluster_mmode_handler().await {
            warn!(drcluster = %self.name(), error = %e, "Error during maintenance-mode processing");
            self.requeue = true;
        }

        if let Err(e) = self.status_update().await {
            warn!(drcluster = %self.name(), error = %e, "Failed to update status");
        }

        Ok(self.requeue)
    }

    pub(crate) async fn process_deletion(&mut self) -> Result<bool, ControllerError> {
        info!(drcluster = %self.name(), "delete");

        self.dr_cluster_undeploy().await?;

        if matches!(
            self.object.spec.cluster_fence,
            ClusterFenceState::Fenced | ClusterFenceState::Unfenced
        ) {
            let requeue = self.handle_deletion().await?;
            if requeue {
                if let Err(e) = self.status_update().await {
                    warn!(drcluster = %self.name(), error = %e, "Failed to update status");
                }

                return Ok(true);
            }
        }

        self.finalizer_remove().await?;

        Ok(false)
    }

    /// Adds the backup label and the finalizer, persisting only on change.
    pub(crate) async fn add_labels_and_finalizers(&mut self) -> Result<(), ControllerError> {
        let mut changed = false;

        let labels = self
            .object
            .metadata
            .labels
            .get_or_insert_with(BTreeMap::new);
        if labels.get(OCM_BACKUP_LABEL_KEY).map(String::as_str) != Some(OCM_BACKUP_LABEL_VALUE) {
            labels.insert(
                OCM_BACKUP_LABEL_KEY.to_string(),
                OCM_BACKUP_LABEL_VALUE.to_string(),
            );
            changed = true;
        }

        let finalizers = self
            .object
            .metadata
            .finalizers
            .get_or_insert_with(Vec::new);
        if !finalizers.iter().any(|f| f == DRCLUSTER_FINALIZER) {
            finalizers.push(DRCLUSTER_FINALIZER.to_string());
            changed = true;
        }

        if changed {
            let updated = self.reconciler.hub.update_dr_cluster(&self.object).await?;
            self.object.metadata = updated.metadata;
        }

        Ok(())
    }

    pub(crate) async fn finalizer_remove(&mut self) -> Result<(), ControllerError> {
        let finalizers = match self.object.metadata.finalizers.as_mut() {
            Some(f) if f.iter().any(|f| f == DRCLUSTER_FINALIZER) => f,
            _ => return Ok(()),
        };

        finalizers.retain(|f| f != DRCLUSTER_FINALIZER);

        let updated = self.reconciler.hub.update_dr_cluster(&self.object).await?;
        self.object.metadata = updated.metadata;

        Ok(())
    }

    /// Step 3: deliver the DR-cluster bundle to the managed cluster.
    async fn dr_cluster_deploy(&mut self) -> Result<(), ControllerError> {
        let annotations = BTreeMap::from([(
            DRCLUSTER_NAME_ANNOTATION.to_string(),
            self.name(),
        )]);

        self.mwu
            .create_or_update_dr_cluster_manifest_work(&self.name(), &[], annotations)
            .await?;

        Ok(())
    }

    /// Deletion: retire everything this controller placed for the cluster.
    async fn dr_cluster_undeploy(&mut self) -> Result<(), ControllerError> {
        let cluster = self.name();

        self.mwu
            .delete_manifest_work(ocm_work::DR_CLUSTER_MANIFEST_WORK_NAME, &cluster)
            .await?;

        self.mwu
            .delete_manifest_work(&manifest_work_name_type(MW_TYPE_DRCCONFIG), &cluster)
            .await?;

        for mw in self.mwu.list_mmode_manifests(&cluster).await? {
            let name = mw.metadata.name.clone().unwrap_or_default();
            self.mwu.delete_manifest_work(&name, &cluster).await?;
        }

        self.reconciler
            .views
            .delete_views_for(&cluster, &cluster)
            .await?;

        Ok(())
    }

    /// Step 6: prove the configured S3 profile is reachable by listing keys
    /// under this cluster's prefix. Returns the condition reason alongside
    /// the error.
    async fn validate_s3_profile(
        &self,
        config: &crate::config::RamenConfig,
    ) -> Result<(), (String, ControllerError)> {
        let profile_name = self.object.spec.s3_profile_name.clone();

        if profile_name.is_empty() || profile_name == NO_S3_STORE_AVAILABLE {
            return Ok(());
        }

        let connect_failed =
            |e: ControllerError| ("s3ConnectionFailed".to_string(), e);

        let profile = get_s3_store_profile(config, &profile_name)
            .map_err(connect_failed)?
            .clone();

        let secret_namespace = if profile.s3_secret_ref.namespace.is_empty() {
            ramen_operator_namespace()
        } else {
            profile.s3_secret_ref.namespace.clone()
        };

        let secret = self
            .reconciler
            .hub
            .get_secret(&profile.s3_secret_ref.name, &secret_namespace)
            .await
            .map_err(connect_failed)?
            .ok_or_else(|| {
                connect_failed(ControllerError::InvalidConfig(format!(
                    "s3 secret {} not found in {}",
                    profile.s3_secret_ref.name, secret_namespace
                )))
            })?;

        let credentials = s3_credentials_from_secret(&secret).map_err(connect_failed)?;

        let store = self
            .reconciler
            .object_stores
            .object_store(&profile, credentials, "drcluster validation")
            .await
            .map_err(|e| connect_failed(e.into()))?;

        store
            .list_keys(&self.name())
            .await
            .map_err(|e| ("s3ListFailed".to_string(), e.into()))?;

        Ok(())
    }

    /// Step 7: confirm the DR-cluster bundle reached the applied state.
    async fn get_dr_cluster_deployed_status(&self) -> Result<(), ControllerError> {
        let mw = self
            .mwu
            .get_dr_cluster_manifest_work(&self.name())
            .await?
            .ok_or_else(|| {
                ControllerError::NotReady("missing DRCluster ManifestWork resource".to_string())
            })?;

        if !is_manifest_in_applied_state(&mw) {
            return Err(ControllerError::NotReady(
                "DRCluster ManifestWork is not in applied state".to_string(),
            ));
        }

        Ok(())
    }
}

/// Step 4: every spec CIDR must parse as an IP network.
pub(crate) fn validate_cidrs_format(drcluster: &DRCluster) -> Result<(), ControllerError> {
    let invalid_cidrs: Vec<&str> = drcluster
        .spec
        .cidrs
        .iter()
        .filter(|cidr| cidr.parse::<IpNetwork>().is_err())
        .map(String::as_str)
        .collect();

    if !invalid_cidrs.is_empty() {
        return Err(ControllerError::Validation(format!(
            "invalid CIDRs specified {}",
            invalid_cidrs.join(", ")
        )));
    }

    Ok(())
}
