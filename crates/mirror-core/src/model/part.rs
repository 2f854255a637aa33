//! Message parts.
//!
//! A [`Part`] is the unit the server streams a message in: text chunks, tool
//! invocations, reasoning, step markers, file snapshots. All parts share the
//! identity fields (`id`, `messageID`, `sessionID`); the rest of the shape is
//! selected by the `type` discriminator.
//!
//! Part types this crate doesn't model are kept verbatim in
//! [`PartBody::Other`] so a newer server never loses data in the mirror.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::{MessageId, PartId, RequestId, SessionId};

/// Part `type` strings with a typed shape in [`PartKind`].
pub const KNOWN_PART_TYPES: &[&str] = &[
    "text",
    "reasoning",
    "tool",
    "step-start",
    "step-finish",
    "snapshot",
    "patch",
    "permission",
    "question",
];

/// One streamed piece of a message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Part ID.
    pub id: PartId,
    /// Owning message.
    #[serde(rename = "messageID")]
    pub message_id: MessageId,
    /// Owning session, when the server includes it.
    #[serde(rename = "sessionID", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    /// Type-specific payload, including the `type` discriminator.
    #[serde(flatten)]
    pub body: PartBody,
}

impl Part {
    /// The `type` discriminator.
    #[must_use]
    pub fn part_type(&self) -> &str {
        self.body.part_type()
    }

    /// Text content for `text` and `reasoning` parts.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            PartBody::Known(PartKind::Text { text, .. } | PartKind::Reasoning { text, .. }) => {
                Some(text.as_str())
            }
            _ => None,
        }
    }
}

/// Start/end times of a streamed part (epoch millis).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartTime {
    /// Streaming started.
    pub start: i64,
    /// Streaming finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
}

/// Typed or passthrough part payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartBody {
    /// A part type with a known shape.
    Known(PartKind),
    /// Any other part type, fields preserved as-is.
    Other(OtherPart),
}

impl PartBody {
    /// The `type` discriminator.
    #[must_use]
    pub fn part_type(&self) -> &str {
        match self {
            Self::Known(kind) => kind.part_type(),
            Self::Other(other) => &other.part_type,
        }
    }

    /// Whether this body claims a known `type` but didn't match its shape.
    #[must_use]
    pub fn is_malformed_known_type(&self) -> bool {
        matches!(self, Self::Other(other) if KNOWN_PART_TYPES.contains(&other.part_type.as_str()))
    }
}

/// Part variants with a typed shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PartKind {
    /// Assistant or user text.
    Text {
        /// Full text so far.
        text: String,
        /// Injected by the system rather than typed or generated.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        synthetic: Option<bool>,
        /// Streaming times.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time: Option<PartTime>,
    },
    /// Model reasoning text.
    Reasoning {
        /// Full reasoning text so far.
        text: String,
        /// Streaming times.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time: Option<PartTime>,
    },
    /// A tool invocation and its evolving state.
    Tool {
        /// Provider tool-call ID.
        #[serde(rename = "callID")]
        call_id: String,
        /// Tool name.
        tool: String,
        /// Tool state (status, input, output), opaque to the mirror.
        #[serde(default)]
        state: Value,
    },
    /// Start of an agent step.
    StepStart {
        /// Workspace snapshot hash at step start.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        snapshot: Option<String>,
    },
    /// End of an agent step.
    StepFinish {
        /// Finish reason.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        /// Cost of the step.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cost: Option<f64>,
        /// Token accounting, opaque to the mirror.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tokens: Option<Value>,
    },
    /// Workspace snapshot marker.
    Snapshot {
        /// Snapshot hash.
        snapshot: String,
    },
    /// Files changed during a step.
    Patch {
        /// Snapshot hash the patch applies to.
        hash: String,
        /// Changed file paths.
        files: Vec<String>,
    },
    /// Inline reference to a permission request.
    Permission {
        /// Referenced request.
        #[serde(rename = "requestID", default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
    },
    /// Inline reference to a question request.
    Question {
        /// Referenced request.
        #[serde(rename = "requestID", default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
    },
}

impl PartKind {
    /// The `type` discriminator.
    #[must_use]
    pub fn part_type(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Reasoning { .. } => "reasoning",
            Self::Tool { .. } => "tool",
            Self::StepStart { .. } => "step-start",
            Self::StepFinish { .. } => "step-finish",
            Self::Snapshot { .. } => "snapshot",
            Self::Patch { .. } => "patch",
            Self::Permission { .. } => "permission",
            Self::Question { .. } => "question",
        }
    }
}

/// A part whose `type` has no typed shape here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OtherPart {
    /// The `type` discriminator.
    #[serde(rename = "type")]
    pub part_type: String,
    /// Every other field of the part.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn text_part_from_wire() {
        let part: Part = serde_json::from_value(json!({
            "id": "part-a",
            "type": "text",
            "messageID": "msg-a",
            "sessionID": "s-a",
            "text": "Hello from assistant"
        }))
        .unwrap();
        assert_eq!(part.part_type(), "text");
        assert_eq!(part.text(), Some("Hello from assistant"));
        assert_eq!(part.session_id.as_ref().map(SessionId::as_str), Some("s-a"));
    }

    #[test]
    fn tool_part_keeps_state() {
        let part: Part = serde_json::from_value(json!({
            "id": "part-t",
            "type": "tool",
            "messageID": "msg-a",
            "callID": "call_1",
            "tool": "bash",
            "state": {"status": "running", "input": {"command": "ls"}}
        }))
        .unwrap();
        assert_matches!(
            &part.body,
            PartBody::Known(PartKind::Tool { call_id, tool, state })
                if call_id == "call_1" && tool == "bash" && state["status"] == "running"
        );
        assert!(part.text().is_none());
    }

    #[test]
    fn step_finish_accepts_integer_cost() {
        let part: Part = serde_json::from_value(json!({
            "id": "part-f",
            "type": "step-finish",
            "messageID": "msg-a",
            "cost": 0,
            "reason": "stop"
        }))
        .unwrap();
        assert_matches!(
            part.body,
            PartBody::Known(PartKind::StepFinish { cost: Some(c), .. }) if c == 0.0
        );
    }

    #[test]
    fn unknown_type_is_preserved() {
        let wire = json!({
            "id": "part-x",
            "type": "agent",
            "messageID": "msg-a",
            "name": "explorer",
            "source": {"start": 1, "end": 4}
        });
        let part: Part = serde_json::from_value(wire.clone()).unwrap();
        assert_eq!(part.part_type(), "agent");
        assert!(!part.body.is_malformed_known_type());
        assert_eq!(serde_json::to_value(&part).unwrap(), wire);
    }

    #[test]
    fn known_type_with_wrong_shape_is_flagged() {
        let part: Part = serde_json::from_value(json!({
            "id": "part-bad",
            "type": "text",
            "messageID": "msg-a",
            "text": 42
        }))
        .unwrap();
        assert!(part.body.is_malformed_known_type());
    }

    #[test]
    fn text_part_serializes_type_tag() {
        let part = Part {
            id: PartId::from("part-a"),
            message_id: MessageId::from("msg-a"),
            session_id: None,
            body: PartBody::Known(PartKind::Text {
                text: "hi".into(),
                synthetic: None,
                time: None,
            }),
        };
        let val = serde_json::to_value(&part).unwrap();
        assert_eq!(
            val,
            json!({"id": "part-a", "messageID": "msg-a", "type": "text", "text": "hi"})
        );
    }

    #[test]
    fn every_known_type_has_a_kind() {
        let kinds = [
            PartKind::Text { text: String::new(), synthetic: None, time: None },
            PartKind::Reasoning { text: String::new(), time: None },
            PartKind::Tool { call_id: String::new(), tool: String::new(), state: Value::Null },
            PartKind::StepStart { snapshot: None },
            PartKind::StepFinish { reason: None, cost: None, tokens: None },
            PartKind::Snapshot { snapshot: String::new() },
            PartKind::Patch { hash: String::new(), files: Vec::new() },
            PartKind::Permission { request_id: None },
            PartKind::Question { request_id: None },
        ];
        let names: Vec<&str> = kinds.iter().map(PartKind::part_type).collect();
        assert_eq!(names, KNOWN_PART_TYPES);
    }
}
