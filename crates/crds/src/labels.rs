//! Well-known labels and annotations
//!
//! Keys shared between the hub controllers and the manifest-work substrate.

/// Stamped on every object the hub produces.
pub const CREATED_BY_RAMEN_LABEL: &str = "ramendr.openshift.io/created-by-ramen";
pub const CREATED_BY_RAMEN_VALUE: &str = "true";

/// Marks the aggregated ClusterRoles so the managed-cluster work agent
/// inherits their verbs.
pub const CLUSTER_ROLE_AGGREGATE_LABEL: &str = "open-cluster-management.io/aggregate-to-work";

/// Selects hub resources for OCM cluster backups.
pub const OCM_BACKUP_LABEL_KEY: &str = "cluster.open-cluster-management.io/backup";
pub const OCM_BACKUP_LABEL_VALUE: &str = "ramen";

/// Ties a ManifestWork or ManagedClusterView back to its owning DRCluster.
pub const DRCLUSTER_NAME_ANNOTATION: &str = "drcluster.ramendr.openshift.io/drcluster-name";

/// Marks MaintenanceMode ManifestWorks for list-by-label discovery.
pub const MMODES_LABEL: &str = "ramendr.openshift.io/maintenancemodes";

/// Carried on ManagedClusterViews created while scanning all policies.
pub const ALL_DRPOLICY_ANNOTATION: &str = "drpolicy.ramendr.openshift.io/drpolicies";

/// Storage identity discovered on StorageClasses (label) and
/// NetworkFenceClasses (annotation, comma-separated set).
pub const STORAGE_ID_LABEL: &str = "ramendr.openshift.io/storageID";

/// Replication identity discovered on replication classes.
pub const REPLICATION_ID_LABEL: &str = "ramendr.openshift.io/replicationID";

// DRCluster annotations consumed when a generic NetworkFence is produced.
pub const STORAGE_ANNOTATION_DRIVER: &str = "drcluster.ramendr.openshift.io/storage-driver";
pub const STORAGE_ANNOTATION_SECRET_NAME: &str = "drcluster.ramendr.openshift.io/storage-secret-name";
pub const STORAGE_ANNOTATION_SECRET_NAMESPACE: &str =
    "drcluster.ramendr.openshift.io/storage-secret-namespace";
pub const STORAGE_ANNOTATION_CLUSTER_ID: &str = "drcluster.ramendr.openshift.io/storage-clusterid";
