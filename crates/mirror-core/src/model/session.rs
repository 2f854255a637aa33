//! Session records and the session status side table.

use serde::{Deserialize, Serialize};

use crate::ids::SessionId;

/// Root of the entity hierarchy: one per conversation thread in the workspace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Session identifier.
    pub session_id: SessionId,
    /// Workspace directory the session belongs to (empty when unknown).
    pub resource_id: String,
    /// Optional thread identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    /// Human-readable title, when the server has announced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Parent session for forked/child sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<SessionId>,
    /// Epoch millis of the first event that mentioned this session.
    pub created_at: i64,
    /// Epoch millis of the latest event that touched this session.
    pub last_accessed: i64,
}

impl Session {
    /// Minimal record for a session known only by ID.
    ///
    /// Used when a message, part or request references a session that hasn't
    /// been announced yet.
    #[must_use]
    pub fn placeholder(session_id: SessionId, timestamp: i64) -> Self {
        Self {
            session_id,
            resource_id: String::new(),
            thread_id: None,
            title: None,
            parent_id: None,
            created_at: timestamp,
            last_accessed: timestamp,
        }
    }

    /// Fold a newer record for the same session into this one.
    ///
    /// `created_at` keeps its earliest value and `last_accessed` its latest,
    /// so replaying an older event never moves either backwards. Descriptive
    /// fields are overwritten only when the incoming record carries them.
    pub fn merge_from(&mut self, incoming: Session) {
        if !incoming.resource_id.is_empty() {
            self.resource_id = incoming.resource_id;
        }
        if incoming.thread_id.is_some() {
            self.thread_id = incoming.thread_id;
        }
        if incoming.title.is_some() {
            self.title = incoming.title;
        }
        if incoming.parent_id.is_some() {
            self.parent_id = incoming.parent_id;
        }
        self.created_at = self.created_at.min(incoming.created_at);
        self.last_accessed = self.last_accessed.max(incoming.last_accessed);
    }
}

/// Busy/idle state of a session, as last reported by the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SessionStatus {
    /// Nothing running.
    Idle,
    /// A turn is in progress.
    Busy,
    /// The provider failed and the server will retry.
    Retry {
        /// Attempt number (1-based).
        attempt: u32,
        /// Reason for the retry.
        message: String,
        /// Epoch millis of the next attempt.
        next: i64,
    },
}
