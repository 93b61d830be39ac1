//! Object-store validation client
//!
//! Abstract S3-like list interface used by the hub only to validate that a
//! configured store profile is reachable. The concrete implementation rides
//! the AWS SDK; the mock serves unit tests.

pub mod error;
pub mod mock;
pub mod profile;
pub mod s3;

pub use error::ObjectStoreError;
pub use mock::{MockObjectStore, MockObjectStoreGetter};
pub use profile::{S3Credentials, S3StoreProfile, SecretRef};
pub use s3::{S3ObjectStore, S3ObjectStoreGetter};

use async_trait::async_trait;

/// Read-only listing facade over one bucket of an object store.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug {
    /// Keys under the given prefix. Used to prove list access end to end.
    async fn list_keys(&self, key_prefix: &str) -> Result<Vec<String>, ObjectStoreError>;
}

/// Resolves a store profile and credentials into a connected store.
#[async_trait]
pub trait ObjectStoreGetter: Send + Sync {
    async fn object_store(
        &self,
        profile: &S3StoreProfile,
        credentials: S3Credentials,
        purpose: &str,
    ) -> Result<Box<dyn ObjectStore>, ObjectStoreError>;
}
