//! Error types for the sync context.
//!
//! Only malformed input and bad snapshots are errors. Duplicates, unknown
//! event types and unresolvable references are ordinary
//! [`ApplyOutcome`](crate::ApplyOutcome)s.

use thiserror::Error;

use mirror_events::ValidationError;

/// Snapshot (de)serialization failures.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Written by an incompatible build.
    #[error("unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version in the snapshot.
        found: u32,
        /// Version this build reads.
        expected: u32,
    },

    /// Not valid snapshot JSON.
    #[error("snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors returned across the [`DirectorySync`](crate::DirectorySync) boundary.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The event was rejected by the integrity gate and dropped.
    #[error("event rejected: {0}")]
    Validation(#[from] ValidationError),

    /// A snapshot could not be restored.
    #[error("snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Convenience alias for sync results.
pub type Result<T> = std::result::Result<T, SyncError>;
