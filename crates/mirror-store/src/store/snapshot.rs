//! Versioned deep copies of the store for persisting and resuming a mirror.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::DirectoryStore;
use crate::errors::SnapshotError;

/// Snapshot format written by this build.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A self-contained copy of a [`DirectoryStore`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    /// Format version.
    pub version: u32,
    /// The copied state.
    pub store: DirectoryStore,
}

impl StoreSnapshot {
    /// Serialize to JSON text.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse JSON text, rejecting unknown format versions.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    fn check_version(&self) -> Result<(), SnapshotError> {
        if self.version == SNAPSHOT_VERSION {
            Ok(())
        } else {
            Err(SnapshotError::UnsupportedVersion {
                found: self.version,
                expected: SNAPSHOT_VERSION,
            })
        }
    }
}

impl DirectoryStore {
    /// Deep copy of the current state.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            version: SNAPSHOT_VERSION,
            store: self.clone(),
        }
    }

    /// Replace the whole state with a snapshot's.
    pub fn restore(&mut self, snapshot: StoreSnapshot) -> Result<(), SnapshotError> {
        snapshot.check_version()?;
        *self = snapshot.store;
        let counts = self.counts();
        info!(
            sessions = counts.sessions,
            messages = counts.messages,
            parts = counts.parts,
            "restored directory store from snapshot"
        );
        Ok(())
    }
}
