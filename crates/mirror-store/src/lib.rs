//! # mirror-store
//!
//! The mirrored state of one workspace directory and everything that mutates it:
//!
//! - **Store**: [`DirectoryStore`], sorted collections plus secondary indices,
//!   mutated only through [`StoreCommand`]
//! - **Reducer**: [`EventReducer`] turns validated envelopes into commands and
//!   reconciles optimistic placeholder messages with their canonical IDs
//! - **Auditor**: [`audit`] reports broken references without repairing them
//! - **Sync context**: [`DirectorySync`] wires gate, deduplicator, reducer and
//!   change notifications together for one directory
//! - **Ingest**: [`ingest::drive`] and [`ingest::drive_sse`] feed a transport
//!   stream into a [`SharedSync`]

#![deny(unsafe_code)]

pub mod audit;
pub mod errors;
pub mod ingest;
pub mod reducer;
pub mod sorted;
pub mod store;
pub mod sync;

pub use audit::{AuditReport, IntegrityViolation, audit};
pub use errors::{Result, SnapshotError, SyncError};
pub use ingest::IngestSummary;
pub use reducer::{ApplyOutcome, EventReducer, UnresolvedReference};
pub use sorted::{Keyed, SortedVec};
pub use store::{
    CorrelationKey, DirectoryStore, PendingRequest, RequestTable, SNAPSHOT_VERSION, StoreChange,
    StoreCommand, StoreCounts, StoreSnapshot, StoredMessage,
};
pub use sync::{DirectorySync, SharedSync, SyncStats};
