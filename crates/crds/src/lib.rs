//! Ramen CRD Definitions
//!
//! Custom resources consumed and produced by the hub controllers:
//! - Hub resources: DRCluster, DRPolicy, DRClusterConfig, DRPlacementControl,
//!   VolumeReplicationGroup, MaintenanceMode
//! - Mirrored remote resources: ManifestWork, ManagedClusterView,
//!   ManagedCluster, NetworkFence, NetworkFenceClass

pub mod condition;
pub mod labels;

// Hub resources
pub mod dr_cluster;
pub mod dr_cluster_config;
pub mod dr_placement_control;
pub mod dr_policy;
pub mod maintenance_mode;
pub mod volume_replication_group;

// Open-Cluster-Management resources
pub mod managed_cluster;
pub mod managed_cluster_view;
pub mod manifest_work;

// csi-addons resources
pub mod network_fence;

// Re-exports
pub use condition::*;
pub use labels::*;

pub use dr_cluster::*;
pub use dr_cluster_config::*;
pub use dr_placement_control::*;
pub use dr_policy::*;
pub use maintenance_mode::*;
pub use volume_replication_group::*;

pub use managed_cluster::*;
pub use managed_cluster_view::*;
pub use manifest_work::*;

pub use network_fence::*;
