//! DRClusterConfig synthesis
//!
//! Builds the per-cluster config from the managed cluster's identity claim
//! and the distinct replication schedules of every policy the cluster
//! belongs to, then delivers it and gates on the applied state.

use std::collections::HashSet;
use tracing::debug;

use crds::{
    DRClusterConfig, DRClusterConfigSpec, CREATED_BY_RAMEN_LABEL, CREATED_BY_RAMEN_VALUE,
};
use ocm_work::{ManagedClusterInstance, MW_TYPE_DRCCONFIG};

use crate::error::ControllerError;
use crate::hub::HubApi as _;
use crate::reconciler::DrClusterInstance;

impl DrClusterInstance<'_> {
    /// Step 8: deliver the synthesized DRClusterConfig and require it to be
    /// applied before validation completes.
    pub(crate) async fn ensure_dr_cluster_config(&mut self) -> Result<(), ControllerError> {
        let drc_config = self.generate_dr_cluster_config().await?;

        self.mwu
            .create_or_update_drcconfig_manifest_work(&self.name(), &drc_config)
            .await?;

        if !self
            .mwu
            .is_manifest_applied(&self.name(), MW_TYPE_DRCCONFIG)
            .await
        {
            return Err(ControllerError::NotReady(format!(
                "DRClusterConfig is not applied to cluster ({})",
                self.name()
            )));
        }

        Ok(())
    }

    pub(crate) async fn generate_dr_cluster_config(
        &self,
    ) -> Result<DRClusterConfig, ControllerError> {
        let managed_cluster = self
            .reconciler
            .hub
            .get_managed_cluster(&self.name())
            .await?
            .ok_or_else(|| {
                ControllerError::NotReady(format!(
                    "managed cluster {} is not registered",
                    self.name()
                ))
            })?;

        let cluster_id = ManagedClusterInstance::new(managed_cluster).cluster_id()?;

        let policies = self.reconciler.hub.list_dr_policies().await?;

        let mut drc_config = DRClusterConfig::new(
            &self.name(),
            DRClusterConfigSpec {
                cluster_id,
                replication_schedules: Vec::new(),
            },
        );

        drc_config
            .metadata
            .labels
            .get_or_insert_with(Default::default)
            .insert(
                CREATED_BY_RAMEN_LABEL.to_string(),
                CREATED_BY_RAMEN_VALUE.to_string(),
            );

        // Track what was added so a schedule shared by several policies
        // lands once.
        let mut added: HashSet<&str> = HashSet::new();

        for policy in &policies {
            if policy.metadata.deletion_timestamp.is_some() {
                continue;
            }

            let interval = policy.spec.scheduling_interval.as_str();
            if interval.is_empty() {
                continue;
            }

            if !policy.contains_dr_cluster(&self.name()) {
                continue;
            }

            if added.insert(interval) {
                drc_config
                    .spec
                    .replication_schedules
                    .push(interval.to_string());

                debug!(drcluster = %self.name(), schedule = %interval, "Added replication schedule");
            }
        }

        Ok(drc_config)
    }
}
