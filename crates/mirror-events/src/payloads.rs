//! Typed payload schemas, one per [`EventKind`](crate::EventKind).
//!
//! Payloads mirror the server's `properties` object. Correlation IDs are
//! optional here even where the server always sends them: a payload that
//! lacks one is valid but unresolvable, and the reducer turns it into a
//! counted no-op. Conversion into store entities happens once the reducer has
//! resolved those IDs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use mirror_core::{
    MessageId, MessageInfo, MessageTime, Part, PartBody, PartId, PermissionRequest,
    QuestionInfo, QuestionRequest, RequestId, Role, Session, SessionId, SessionStatus, ToolRef,
};

// ── Sessions ────────────────────────────────────────────────────────────────

/// Session timestamps as sent in a session `info` object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTime {
    /// Creation time (epoch millis).
    #[serde(default)]
    pub created: Option<i64>,
    /// Last update time (epoch millis).
    #[serde(default)]
    pub updated: Option<i64>,
}

/// Full session object, when the server sends one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Session ID.
    pub id: SessionId,
    /// Workspace directory.
    #[serde(default)]
    pub directory: Option<String>,
    /// Title.
    #[serde(default)]
    pub title: Option<String>,
    /// Parent session.
    #[serde(rename = "parentID", default)]
    pub parent_id: Option<SessionId>,
    /// Thread identifier.
    #[serde(rename = "threadID", default)]
    pub thread_id: Option<String>,
    /// Timestamps.
    #[serde(default)]
    pub time: Option<SessionTime>,
}

/// `session.created` / `session.updated` / `session.deleted`.
///
/// The session is named either by a nested `info` object or a flat
/// `sessionID`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPayload {
    /// Flat session ID.
    #[serde(rename = "sessionID", default)]
    pub session_id: Option<SessionId>,
    /// Workspace directory.
    #[serde(default)]
    pub directory: Option<String>,
    /// Full session object.
    #[serde(default)]
    pub info: Option<SessionInfo>,
    /// Status carried by `session.updated`.
    #[serde(default)]
    pub status: Option<SessionStatus>,
}

impl SessionPayload {
    /// Session named by this payload: `info.id`, then `sessionID`, then the
    /// envelope's `sessionID`.
    #[must_use]
    pub fn resolve_session_id(&self, envelope_session: Option<&SessionId>) -> Option<SessionId> {
        self.info
            .as_ref()
            .map(|info| info.id.clone())
            .or_else(|| self.session_id.clone())
            .or_else(|| envelope_session.cloned())
    }

    /// Build the session record this payload describes.
    ///
    /// `directory` is the envelope's directory, used when neither the payload
    /// nor its `info` carry one.
    #[must_use]
    pub fn to_session(
        &self,
        session_id: SessionId,
        timestamp: i64,
        directory: Option<&str>,
    ) -> Session {
        let mut session = Session::placeholder(session_id, timestamp);
        session.resource_id = self
            .info
            .as_ref()
            .and_then(|info| info.directory.clone())
            .or_else(|| self.directory.clone())
            .or_else(|| directory.map(str::to_owned))
            .unwrap_or_default();
        if let Some(info) = &self.info {
            session.title.clone_from(&info.title);
            session.parent_id.clone_from(&info.parent_id);
            session.thread_id.clone_from(&info.thread_id);
            if let Some(created) = info.time.and_then(|t| t.created) {
                session.created_at = created;
            }
        }
        session
    }
}

/// `session.status`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatusPayload {
    /// Session the status applies to.
    #[serde(rename = "sessionID", default)]
    pub session_id: Option<SessionId>,
    /// New status.
    pub status: SessionStatus,
}

// ── Messages ────────────────────────────────────────────────────────────────

/// Message metadata as sent in `message.updated`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageInfoPayload {
    /// Message ID.
    pub id: MessageId,
    /// Author role.
    pub role: Role,
    /// Owning session.
    #[serde(rename = "sessionID", default)]
    pub session_id: Option<SessionId>,
    /// Timestamps.
    #[serde(default)]
    pub time: Option<MessageTime>,
    /// Triggering user message.
    #[serde(rename = "parentID", default)]
    pub parent_id: Option<MessageId>,
    /// Model.
    #[serde(alias = "modelID", default)]
    pub model: Option<String>,
    /// Provider.
    #[serde(alias = "providerID", default)]
    pub provider: Option<String>,
}

impl MessageInfoPayload {
    /// Convert into a store record once the owning session is resolved.
    ///
    /// A missing `time` falls back to the envelope timestamp.
    #[must_use]
    pub fn into_info(self, session_id: SessionId, timestamp: i64) -> MessageInfo {
        MessageInfo {
            id: self.id,
            role: self.role,
            session_id,
            time: self.time.unwrap_or(MessageTime {
                created: timestamp,
                completed: None,
            }),
            parent_id: self.parent_id,
            model: self.model,
            provider: self.provider,
        }
    }
}

/// `message.updated`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageUpdatedPayload {
    /// Message metadata.
    pub info: MessageInfoPayload,
}

/// `message.removed`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRemovedPayload {
    /// Owning session.
    #[serde(rename = "sessionID", default)]
    pub session_id: Option<SessionId>,
    /// Message to remove.
    #[serde(rename = "messageID", default)]
    pub message_id: Option<MessageId>,
}

/// A part as sent in `message.part.updated`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartPayload {
    /// Part ID.
    pub id: PartId,
    /// Owning message.
    #[serde(rename = "messageID", default)]
    pub message_id: Option<MessageId>,
    /// Owning session.
    #[serde(rename = "sessionID", default)]
    pub session_id: Option<SessionId>,
    /// Type-specific fields.
    #[serde(flatten)]
    pub body: PartBody,
}

impl PartPayload {
    /// Convert into a store record once the owning message is resolved.
    #[must_use]
    pub fn into_part(self, message_id: MessageId, session_id: Option<SessionId>) -> Part {
        Part {
            id: self.id,
            message_id,
            session_id: session_id.or(self.session_id),
            body: self.body,
        }
    }
}

/// `message.part.updated`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartUpdatedPayload {
    /// The part's full current state.
    pub part: PartPayload,
    /// Text appended since the previous update (informational).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,
}

/// `message.part.removed`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartRemovedPayload {
    /// Owning session.
    #[serde(rename = "sessionID", default)]
    pub session_id: Option<SessionId>,
    /// Owning message.
    #[serde(rename = "messageID", default)]
    pub message_id: Option<MessageId>,
    /// Part to remove.
    #[serde(rename = "partID")]
    pub part_id: PartId,
}

// ── Permissions ─────────────────────────────────────────────────────────────

/// `permission.asked`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PermissionAskedPayload {
    /// Request ID.
    pub id: RequestId,
    /// Owning session.
    #[serde(rename = "sessionID", default)]
    pub session_id: Option<SessionId>,
    /// Permission being asked for.
    pub permission: String,
    /// Resource patterns.
    pub patterns: Vec<String>,
    /// Patterns remembered by an "always" reply.
    #[serde(default)]
    pub always: Vec<String>,
    /// Display metadata.
    #[serde(default)]
    pub metadata: Value,
    /// Originating tool call.
    #[serde(default)]
    pub tool: Option<ToolRef>,
}

impl PermissionAskedPayload {
    /// Convert into a store record once the owning session is resolved.
    #[must_use]
    pub fn into_request(self, session_id: SessionId) -> PermissionRequest {
        PermissionRequest {
            id: self.id,
            session_id,
            permission: self.permission,
            patterns: self.patterns,
            always: self.always,
            metadata: self.metadata,
            tool: self.tool,
        }
    }
}

/// The user's decision on a permission request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionReply {
    /// Allow this one call.
    Once,
    /// Allow and remember the `always` patterns.
    Always,
    /// Deny.
    Reject,
}

/// `permission.replied`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRepliedPayload {
    /// Owning session.
    #[serde(rename = "sessionID", default)]
    pub session_id: Option<SessionId>,
    /// Request being answered.
    #[serde(rename = "requestID")]
    pub request_id: RequestId,
    /// Decision.
    pub reply: PermissionReply,
}

// ── Questions ───────────────────────────────────────────────────────────────

/// `question.asked`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionAskedPayload {
    /// Request ID.
    pub id: RequestId,
    /// Owning session.
    #[serde(rename = "sessionID", default)]
    pub session_id: Option<SessionId>,
    /// Questions to answer.
    pub questions: Vec<QuestionInfo>,
    /// Originating tool call.
    #[serde(default)]
    pub tool: Option<ToolRef>,
}

impl QuestionAskedPayload {
    /// Convert into a store record once the owning session is resolved.
    #[must_use]
    pub fn into_request(self, session_id: SessionId) -> QuestionRequest {
        QuestionRequest {
            id: self.id,
            session_id,
            questions: self.questions,
            tool: self.tool,
        }
    }
}

/// `question.replied`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuestionRepliedPayload {
    /// Owning session.
    #[serde(rename = "sessionID", default)]
    pub session_id: Option<SessionId>,
    /// Request being answered.
    #[serde(rename = "requestID")]
    pub request_id: RequestId,
    /// The answers, opaque to the mirror.
    #[serde(alias = "answers", default)]
    pub reply: Value,
}

/// `question.rejected`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRejectedPayload {
    /// Owning session.
    #[serde(rename = "sessionID", default)]
    pub session_id: Option<SessionId>,
    /// Request being dismissed.
    #[serde(rename = "requestID")]
    pub request_id: RequestId,
    /// Why it was dismissed.
    #[serde(default)]
    pub reason: Option<String>,
}
