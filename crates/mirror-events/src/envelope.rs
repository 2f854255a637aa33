//! Validated wire envelopes.
//!
//! An [`Envelope`] is only ever built by the integrity gate, so holding one
//! means every field has the right type and the payload matches its schema.

use mirror_core::{EventId, SessionId};

use crate::event_kind::EventKind;
use crate::payloads::{
    MessageRemovedPayload, MessageUpdatedPayload, PartRemovedPayload, PartUpdatedPayload,
    PermissionAskedPayload, PermissionRepliedPayload, QuestionAskedPayload,
    QuestionRejectedPayload, QuestionRepliedPayload, SessionPayload, SessionStatusPayload,
};

/// A validated event with its transport metadata.
///
/// ```json
/// { "eventId": "0190…", "sequence": 12, "timestamp": 1736935200000,
///   "sessionID": "ses_1", "directory": "/work", "type": "message.updated",
///   "properties": { "info": { … } } }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    /// Globally unique event ID (UUIDv7).
    pub event_id: EventId,
    /// Server-assigned sequence number (not used for ordering).
    pub sequence: u64,
    /// Emission time (epoch millis, > 0).
    pub timestamp: i64,
    /// Envelope-level session, used when the payload doesn't name one.
    pub session_id: Option<SessionId>,
    /// Workspace directory.
    pub directory: Option<String>,
    /// Typed payload.
    pub event: DirectoryEvent,
}

impl Envelope {
    /// The wire `type` string.
    pub fn event_type(&self) -> &str {
        self.event.event_type()
    }
}

/// Typed payload, one variant per [`EventKind`] plus a fallback.
#[derive(Clone, Debug, PartialEq)]
pub enum DirectoryEvent {
    // ── Sessions ─────────────────────────────────────────────────────
    /// `session.created`
    SessionCreated(SessionPayload),
    /// `session.updated`
    SessionUpdated(SessionPayload),
    /// `session.deleted`
    SessionDeleted(SessionPayload),
    /// `session.status`
    SessionStatus(SessionStatusPayload),

    // ── Messages ─────────────────────────────────────────────────────
    /// `message.updated`
    MessageUpdated(MessageUpdatedPayload),
    /// `message.removed`
    MessageRemoved(MessageRemovedPayload),
    /// `message.part.updated`
    PartUpdated(PartUpdatedPayload),
    /// `message.part.removed`
    PartRemoved(PartRemovedPayload),

    // ── Requests ─────────────────────────────────────────────────────
    /// `permission.asked`
    PermissionAsked(PermissionAskedPayload),
    /// `permission.replied`
    PermissionReplied(PermissionRepliedPayload),
    /// `question.asked`
    QuestionAsked(QuestionAskedPayload),
    /// `question.replied`
    QuestionReplied(QuestionRepliedPayload),
    /// `question.rejected`
    QuestionRejected(QuestionRejectedPayload),

    /// A structurally valid event of a type the mirror doesn't handle.
    Unknown {
        /// The wire `type` string.
        event_type: String,
    },
}

impl DirectoryEvent {
    /// The known kind, or `None` for [`DirectoryEvent::Unknown`].
    #[must_use]
    pub fn kind(&self) -> Option<EventKind> {
        let kind = match self {
            Self::SessionCreated(_) => EventKind::SessionCreated,
            Self::SessionUpdated(_) => EventKind::SessionUpdated,
            Self::SessionDeleted(_) => EventKind::SessionDeleted,
            Self::SessionStatus(_) => EventKind::SessionStatus,
            Self::MessageUpdated(_) => EventKind::MessageUpdated,
            Self::MessageRemoved(_) => EventKind::MessageRemoved,
            Self::PartUpdated(_) => EventKind::PartUpdated,
            Self::PartRemoved(_) => EventKind::PartRemoved,
            Self::PermissionAsked(_) => EventKind::PermissionAsked,
            Self::PermissionReplied(_) => EventKind::PermissionReplied,
            Self::QuestionAsked(_) => EventKind::QuestionAsked,
            Self::QuestionReplied(_) => EventKind::QuestionReplied,
            Self::QuestionRejected(_) => EventKind::QuestionRejected,
            Self::Unknown { .. } => return None,
        };
        Some(kind)
    }

    /// The wire `type` string.
    pub fn event_type(&self) -> &str {
        match self {
            Self::Unknown { event_type } => event_type,
            known => known.kind().map_or("", EventKind::as_str),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_has_no_kind() {
        let event = DirectoryEvent::Unknown {
            event_type: "server.heartbeat".into(),
        };
        assert!(event.kind().is_none());
        assert_eq!(event.event_type(), "server.heartbeat");
    }

    #[test]
    fn known_event_type_string() {
        let event = DirectoryEvent::SessionDeleted(SessionPayload::default());
        assert_eq!(event.kind(), Some(EventKind::SessionDeleted));
        assert_eq!(event.event_type(), "session.deleted");
    }

    #[test]
    fn envelope_delegates_event_type() {
        let envelope = Envelope {
            event_id: EventId::new(),
            sequence: 0,
            timestamp: 1,
            session_id: None,
            directory: None,
            event: DirectoryEvent::SessionCreated(SessionPayload::default()),
        };
        assert_eq!(envelope.event_type(), "session.created");
    }
}
