//! DRCluster Controller
//!
//! Hub-side controller driving each managed cluster's fencing lifecycle and
//! distributing per-cluster configuration:
//! - DRCluster: validation, fence state machine, finalizer handling
//! - DRClusterConfig: replication-schedule aggregation delivered per cluster
//! - NetworkFence: placed on the peer cluster through ManifestWorks

mod backoff;
mod conditions;
mod config;
mod controller;
mod error;
mod hub;
mod predicates;
mod reconciler;
mod watcher;

#[cfg(test)]
mod test_utils;

use anyhow::Context;
use tracing::info;

use crate::config::ramen_operator_namespace;
use crate::controller::Controller;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    info!("Starting DRCluster Controller");
    info!("  Operator namespace: {}", ramen_operator_namespace());

    let controller = Controller::new()
        .await
        .context("failed to initialize the DRCluster controller")?;

    controller.run().await.context("controller exited")?;

    Ok(())
}
