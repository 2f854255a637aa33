//! Message records.

use serde::{Deserialize, Serialize};

use crate::ids::{MessageId, SessionId};

use super::part::Part;

/// Author of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed by the user.
    User,
    /// Produced by the model.
    Assistant,
    /// Injected by the system.
    System,
}

impl Role {
    /// Wire string for this role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

/// Message timestamps (epoch millis).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTime {
    /// When the message was created.
    pub created: i64,
    /// When the message finished (assistant messages only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<i64>,
}

/// Metadata of a message, as carried by `message.updated`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageInfo {
    /// Message ID.
    pub id: MessageId,
    /// Author role.
    pub role: Role,
    /// Owning session.
    #[serde(rename = "sessionID")]
    pub session_id: SessionId,
    /// Creation/completion times.
    pub time: MessageTime,
    /// User message that triggered this one (assistant messages).
    #[serde(rename = "parentID", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<MessageId>,
    /// Model that produced the message.
    #[serde(alias = "modelID", default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Provider that served the model.
    #[serde(alias = "providerID", default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// A message joined with its parts, in part-ID order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageWithParts {
    /// Message metadata.
    pub info: MessageInfo,
    /// Parts currently indexed under the message.
    pub parts: Vec<Part>,
    /// Epoch millis of the event that first created the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    /// Epoch millis of the latest event that updated the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_accepts_server_field_names() {
        let info: MessageInfo = serde_json::from_value(serde_json::json!({
            "id": "msg-a",
            "role": "assistant",
            "sessionID": "s-a",
            "time": {"created": 100, "completed": 200},
            "parentID": "msg-u",
            "modelID": "claude",
            "providerID": "anthropic"
        }))
        .unwrap();
        assert_eq!(info.id.as_str(), "msg-a");
        assert_eq!(info.role, Role::Assistant);
        assert_eq!(info.time.completed, Some(200));
        assert_eq!(info.parent_id.as_ref().map(MessageId::as_str), Some("msg-u"));
        assert_eq!(info.model.as_deref(), Some("claude"));
        assert_eq!(info.provider.as_deref(), Some("anthropic"));
    }

    #[test]
    fn info_serializes_optional_fields_sparingly() {
        let info = MessageInfo {
            id: MessageId::from("msg-a"),
            role: Role::User,
            session_id: SessionId::from("s-a"),
            time: MessageTime { created: 1, completed: None },
            parent_id: None,
            model: None,
            provider: None,
        };
        let val = serde_json::to_value(&info).unwrap();
        assert_eq!(val["sessionID"], "s-a");
        assert!(val.get("parentID").is_none());
        assert!(val["time"].get("completed").is_none());
    }

    #[test]
    fn role_strings() {
        assert_eq!(Role::User.as_str(), "user");
        assert_eq!(Role::Assistant.as_str(), "assistant");
        assert_eq!(Role::System.as_str(), "system");
        assert!(serde_json::from_str::<Role>("\"tool\"").is_err());
    }
}
