//! Per-directory sync context.
//!
//! [`DirectorySync`] owns everything one mirrored directory needs: the
//! store, the deduplicator, the reducer, apply counters and the change
//! notifier. The host builds one per directory; nothing is process-wide.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use mirror_core::{MessageInfo, Part};
use mirror_events::{
    DedupStats, Deduplicator, Envelope, SseFrame, ValidationError, validate, validate_frame,
    validate_str,
};
use mirror_settings::MirrorSettings;

use crate::audit::{AuditReport, audit};
use crate::errors::{Result, SyncError};
use crate::reducer::{ApplyOutcome, EventReducer};
use crate::store::{DirectoryStore, StoreChange, StoreCommand, StoreSnapshot};

/// A [`DirectorySync`] shared between the ingest task and readers.
pub type SharedSync = Arc<RwLock<DirectorySync>>;

/// Counters of what happened to incoming events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    /// Events reduced into the store.
    pub applied: u64,
    /// Events dropped as already seen.
    pub duplicates: u64,
    /// Events of a type the mirror doesn't handle.
    pub ignored: u64,
    /// Events whose parent could not be resolved.
    pub unresolved: u64,
    /// Events rejected by the integrity gate.
    pub rejected: u64,
}

/// Mirror of one workspace directory.
#[derive(Debug)]
pub struct DirectorySync {
    store: DirectoryStore,
    dedup: Deduplicator,
    reducer: EventReducer,
    stats: SyncStats,
    notifier: broadcast::Sender<StoreChange>,
}

impl Default for DirectorySync {
    fn default() -> Self {
        Self::new(&MirrorSettings::default())
    }
}

impl DirectorySync {
    /// Empty mirror configured from `settings`.
    pub fn new(settings: &MirrorSettings) -> Self {
        let (notifier, _) = broadcast::channel(settings.notifications.channel_capacity.max(1));
        Self {
            store: DirectoryStore::new(),
            dedup: Deduplicator::new(settings.dedup.max_size),
            reducer: EventReducer::new(&settings.reconcile),
            stats: SyncStats::default(),
            notifier,
        }
    }

    /// Wrap for sharing between an ingest task and readers.
    pub fn into_shared(self) -> SharedSync {
        Arc::new(RwLock::new(self))
    }

    // ── Applying events ──────────────────────────────────────────────

    /// Validate and apply one raw envelope.
    ///
    /// A rejected event is dropped and logged; the error is returned so the
    /// caller can count or surface it, and the stream should continue.
    pub fn apply_event(&mut self, raw: &Value) -> Result<ApplyOutcome> {
        let envelope = validate(raw).map_err(|error| self.reject(error))?;
        Ok(self.apply_envelope(envelope))
    }

    /// [`apply_event`](Self::apply_event) for JSON text.
    pub fn apply_str(&mut self, raw: &str) -> Result<ApplyOutcome> {
        let envelope = validate_str(raw).map_err(|error| self.reject(error))?;
        Ok(self.apply_envelope(envelope))
    }

    /// [`apply_event`](Self::apply_event) for one SSE frame.
    pub fn apply_frame(&mut self, frame: &SseFrame) -> Result<ApplyOutcome> {
        let envelope = validate_frame(frame).map_err(|error| self.reject(error))?;
        Ok(self.apply_envelope(envelope))
    }

    /// Apply an already validated envelope.
    pub fn apply_envelope(&mut self, envelope: Envelope) -> ApplyOutcome {
        if self.dedup.is_duplicate(&envelope.event_id) {
            self.stats.duplicates += 1;
            debug!(event_id = %envelope.event_id, "dropping duplicate event");
            return ApplyOutcome::Duplicate;
        }

        let was_ready = self.store.is_ready();
        let outcome = self.reducer.reduce(&mut self.store, envelope);
        match &outcome {
            ApplyOutcome::Applied { changes } => {
                self.stats.applied += 1;
                self.publish(changes);
            }
            ApplyOutcome::Ignored { .. } => self.stats.ignored += 1,
            ApplyOutcome::Unresolved(_) => self.stats.unresolved += 1,
            ApplyOutcome::Duplicate => self.stats.duplicates += 1,
        }
        if !was_ready && self.store.is_ready() {
            info!("directory store ready");
        }
        outcome
    }

    /// Register a client-side placeholder message awaiting its canonical
    /// `message.updated`.
    pub fn insert_optimistic_message(
        &mut self,
        info: MessageInfo,
        parts: Vec<Part>,
    ) -> Vec<StoreChange> {
        self.execute(StoreCommand::InsertOptimisticMessage { info, parts })
    }

    /// Run a store command directly and publish what it changed.
    pub fn execute(&mut self, command: StoreCommand) -> Vec<StoreChange> {
        let changes = self.store.execute(command);
        self.publish(&changes);
        changes
    }

    fn reject(&mut self, error: ValidationError) -> SyncError {
        self.stats.rejected += 1;
        warn!(error = %error, "dropping invalid event");
        error.into()
    }

    fn publish(&self, changes: &[StoreChange]) {
        for change in changes {
            // No receivers is fine.
            let _ = self.notifier.send(change.clone());
        }
    }

    // ── Reading ──────────────────────────────────────────────────────

    /// The mirrored state.
    pub fn store(&self) -> &DirectoryStore {
        &self.store
    }

    /// Apply counters.
    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Deduplicator counters.
    pub fn dedup_stats(&self) -> DedupStats {
        self.dedup.stats()
    }

    /// Scan the store for broken references.
    pub fn audit(&self) -> AuditReport {
        audit(&self.store)
    }

    /// Receive every [`StoreChange`] published from now on.
    ///
    /// A receiver that falls behind the channel capacity gets
    /// `RecvError::Lagged` and should re-read the store.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.notifier.subscribe()
    }

    // ── Snapshots ────────────────────────────────────────────────────

    /// Deep copy of the store.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.store.snapshot()
    }

    /// Replace the store with a snapshot and forget seen event IDs, so a
    /// replayed backlog is reduced against the restored state.
    pub fn restore(&mut self, snapshot: StoreSnapshot) -> Result<()> {
        self.store.restore(snapshot)?;
        self.dedup.clear();
        self.publish(&[StoreChange::Restored]);
        Ok(())
    }
}
