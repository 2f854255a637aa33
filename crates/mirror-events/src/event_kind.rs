//! The [`EventKind`] enum: every event `type` the mirror understands.
//!
//! Each variant has an exact `#[serde(rename)]` matching the server's
//! dot-separated type string. Types outside this set still pass envelope
//! validation and are carried as [`DirectoryEvent::Unknown`].
//!
//! [`DirectoryEvent::Unknown`]: crate::envelope::DirectoryEvent::Unknown

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Known event types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    // -- Sessions --
    /// Session announced.
    #[serde(rename = "session.created")]
    SessionCreated,
    /// Session metadata or status changed.
    #[serde(rename = "session.updated")]
    SessionUpdated,
    /// Session deleted, with everything it owns.
    #[serde(rename = "session.deleted")]
    SessionDeleted,
    /// Busy/idle/retry status changed.
    #[serde(rename = "session.status")]
    SessionStatus,

    // -- Messages --
    /// Message created or its metadata changed.
    #[serde(rename = "message.updated")]
    MessageUpdated,
    /// Message removed, with its parts.
    #[serde(rename = "message.removed")]
    MessageRemoved,
    /// Part created or updated.
    #[serde(rename = "message.part.updated")]
    PartUpdated,
    /// Part removed.
    #[serde(rename = "message.part.removed")]
    PartRemoved,

    // -- Permissions --
    /// Tool permission requested.
    #[serde(rename = "permission.asked")]
    PermissionAsked,
    /// Tool permission decided.
    #[serde(rename = "permission.replied")]
    PermissionReplied,

    // -- Questions --
    /// Question to the user raised.
    #[serde(rename = "question.asked")]
    QuestionAsked,
    /// Question answered.
    #[serde(rename = "question.replied")]
    QuestionReplied,
    /// Question dismissed.
    #[serde(rename = "question.rejected")]
    QuestionRejected,
}

/// All event kinds in definition order.
pub const ALL_EVENT_KINDS: [EventKind; 13] = [
    EventKind::SessionCreated,
    EventKind::SessionUpdated,
    EventKind::SessionDeleted,
    EventKind::SessionStatus,
    EventKind::MessageUpdated,
    EventKind::MessageRemoved,
    EventKind::PartUpdated,
    EventKind::PartRemoved,
    EventKind::PermissionAsked,
    EventKind::PermissionReplied,
    EventKind::QuestionAsked,
    EventKind::QuestionReplied,
    EventKind::QuestionRejected,
];

impl EventKind {
    /// Canonical wire string (e.g. `"message.part.updated"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SessionCreated => "session.created",
            Self::SessionUpdated => "session.updated",
            Self::SessionDeleted => "session.deleted",
            Self::SessionStatus => "session.status",
            Self::MessageUpdated => "message.updated",
            Self::MessageRemoved => "message.removed",
            Self::PartUpdated => "message.part.updated",
            Self::PartRemoved => "message.part.removed",
            Self::PermissionAsked => "permission.asked",
            Self::PermissionReplied => "permission.replied",
            Self::QuestionAsked => "question.asked",
            Self::QuestionReplied => "question.replied",
            Self::QuestionRejected => "question.rejected",
        }
    }

    /// Payload fields whose absence is a schema violation.
    ///
    /// Correlation fields such as `sessionID` are deliberately absent: a
    /// payload without them is well-formed but unresolvable, which the
    /// reducer reports as a no-op rather than the gate as an error.
    #[must_use]
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            Self::SessionCreated
            | Self::SessionUpdated
            | Self::SessionDeleted
            | Self::MessageRemoved => &[],
            Self::SessionStatus => &["status"],
            Self::MessageUpdated => &["info"],
            Self::PartUpdated => &["part"],
            Self::PartRemoved => &["partID"],
            Self::PermissionAsked => &["id", "permission", "patterns"],
            Self::PermissionReplied => &["requestID", "reply"],
            Self::QuestionAsked => &["id", "questions"],
            Self::QuestionReplied | Self::QuestionRejected => &["requestID"],
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_EVENT_KINDS
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown event type: {s}"))
    }
}
