//! Permission and question requests awaiting a user decision.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{MessageId, RequestId, SessionId};

/// The tool call a request was raised from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRef {
    /// Message carrying the tool call.
    #[serde(rename = "messageID")]
    pub message_id: MessageId,
    /// Provider tool-call ID.
    #[serde(rename = "callID")]
    pub call_id: String,
}

/// A pending request for the user to allow or deny a tool action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PermissionRequest {
    /// Request ID.
    pub id: RequestId,
    /// Owning session.
    #[serde(rename = "sessionID")]
    pub session_id: SessionId,
    /// Permission being asked for (e.g. `write`, `bash`).
    pub permission: String,
    /// Resource patterns the permission would cover.
    pub patterns: Vec<String>,
    /// Patterns that an "always" reply would remember.
    #[serde(default)]
    pub always: Vec<String>,
    /// Extra detail for display, opaque to the mirror.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
    /// Originating tool call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<ToolRef>,
}

/// One selectable answer of a question.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    /// Display label.
    pub label: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A single question within a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionInfo {
    /// The question text.
    pub question: String,
    /// Short header shown above the question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    /// Available options (empty for free-form questions).
    #[serde(default)]
    pub options: Vec<QuestionOption>,
    /// Whether several options may be selected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple: Option<bool>,
}

/// A pending request for the user to answer one or more questions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRequest {
    /// Request ID.
    pub id: RequestId,
    /// Owning session.
    #[serde(rename = "sessionID")]
    pub session_id: SessionId,
    /// Questions to answer.
    pub questions: Vec<QuestionInfo>,
    /// Originating tool call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<ToolRef>,
}
