//! Unit tests for managed-cluster claim lookups

use kube::core::ObjectMeta;

use crds::{ClusterClaim, ManagedCluster, ManagedClusterSpec, ManagedClusterStatus};

use crate::error::WorkError;
use crate::managed_cluster::ManagedClusterInstance;

fn managed_cluster(name: &str, claims: Vec<ClusterClaim>) -> ManagedCluster {
    ManagedCluster {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec: ManagedClusterSpec {
            hub_accepts_client: true,
        },
        status: Some(ManagedClusterStatus {
            cluster_claims: claims,
            conditions: vec![],
        }),
    }
}

#[test]
fn test_cluster_id_from_claim() {
    let mc = managed_cluster(
        "east",
        vec![
            ClusterClaim {
                name: "platform.open-cluster-management.io".to_string(),
                value: "Other".to_string(),
            },
            ClusterClaim {
                name: "id.k8s.io".to_string(),
                value: "cluster-uuid-east".to_string(),
            },
        ],
    );

    let id = ManagedClusterInstance::new(mc).cluster_id().unwrap();
    assert_eq!(id, "cluster-uuid-east");
}

#[test]
fn test_cluster_id_missing_claim() {
    let mc = managed_cluster("east", vec![]);

    let err = ManagedClusterInstance::new(mc).cluster_id().unwrap_err();
    assert!(matches!(err, WorkError::MissingClusterClaim(_)));
}

#[test]
fn test_cluster_id_empty_claim_rejected() {
    let mc = managed_cluster(
        "east",
        vec![ClusterClaim {
            name: "id.k8s.io".to_string(),
            value: String::new(),
        }],
    );

    assert!(ManagedClusterInstance::new(mc).cluster_id().is_err());
}
