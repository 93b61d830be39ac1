//! Object-store error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    /// The profile could not be turned into a connected client
    #[error("failed to connect to object store {profile}: {source_message}")]
    Connect {
        profile: String,
        source_message: String,
    },

    /// Listing keys failed after a connection was established
    #[error("failed to list keys in bucket {bucket}: {source_message}")]
    List {
        bucket: String,
        source_message: String,
    },

    /// The profile itself is unusable (missing endpoint, bucket, ...)
    #[error("invalid object store profile {profile}: {reason}")]
    InvalidProfile { profile: String, reason: String },
}
