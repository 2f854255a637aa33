//! Integrity gate: raw JSON in, [`Envelope`] or [`ValidationError`] out.
//!
//! Checks run in a fixed order (envelope fields, then required payload
//! fields, then the full payload schema) so the first error reported is the
//! most specific one. Nothing here touches state.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

use mirror_core::{EventId, SessionId};

use crate::envelope::{DirectoryEvent, Envelope};
use crate::errors::{Result, ValidationError};
use crate::event_kind::EventKind;
use crate::payloads::PartUpdatedPayload;
use crate::sse::SseFrame;

/// Validate a raw envelope.
pub fn validate(raw: &Value) -> Result<Envelope> {
    let obj = raw.as_object().ok_or(ValidationError::NotAnObject)?;

    let event_id = validate_event_id(obj)?;

    let sequence = required(obj, "sequence")?
        .as_u64()
        .ok_or_else(|| ValidationError::invalid("sequence", "must be a non-negative integer"))?;

    let timestamp = required(obj, "timestamp")?
        .as_i64()
        .filter(|ts| *ts > 0)
        .ok_or_else(|| ValidationError::invalid("timestamp", "must be a positive integer"))?;

    let event_type = required(obj, "type")?
        .as_str()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ValidationError::invalid("type", "must be a non-empty string"))?;

    let properties = required(obj, "properties")?
        .as_object()
        .ok_or_else(|| ValidationError::invalid("properties", "must be an object"))?;

    let session_id = optional_str(obj, "sessionID")?.map(SessionId::from);
    let directory = optional_str(obj, "directory")?.map(str::to_owned);

    let event = match event_type.parse::<EventKind>() {
        Ok(kind) => decode_event(kind, properties)?,
        Err(_) => DirectoryEvent::Unknown {
            event_type: event_type.to_owned(),
        },
    };

    Ok(Envelope {
        event_id,
        sequence,
        timestamp,
        session_id,
        directory,
        event,
    })
}

/// Parse `raw` as JSON, then [`validate`] it.
pub fn validate_str(raw: &str) -> Result<Envelope> {
    let value: Value = serde_json::from_str(raw)?;
    validate(&value)
}

/// Validate the `data` of one SSE frame.
pub fn validate_frame(frame: &SseFrame) -> Result<Envelope> {
    validate_str(&frame.data)
}

fn required<'a>(obj: &'a Map<String, Value>, field: &str) -> Result<&'a Value> {
    match obj.get(field) {
        Some(Value::Null) | None => Err(ValidationError::missing(field)),
        Some(value) => Ok(value),
    }
}

fn optional_str<'a>(obj: &'a Map<String, Value>, field: &str) -> Result<Option<&'a str>> {
    match obj.get(field) {
        Some(Value::Null) | None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(ValidationError::invalid(field, "must be a string")),
    }
}

fn validate_event_id(obj: &Map<String, Value>) -> Result<EventId> {
    let raw = required(obj, "eventId")?
        .as_str()
        .ok_or_else(|| ValidationError::invalid("eventId", "must be a string"))?;
    let uuid = Uuid::parse_str(raw)
        .map_err(|e| ValidationError::invalid("eventId", format!("not a UUID: {e}")))?;
    if uuid.get_version_num() != 7 {
        return Err(ValidationError::invalid(
            "eventId",
            format!("expected UUID version 7, got {}", uuid.get_version_num()),
        ));
    }
    Ok(EventId::from(raw))
}

fn decode_event(kind: EventKind, properties: &Map<String, Value>) -> Result<DirectoryEvent> {
    for field in kind.required_fields() {
        if properties.get(*field).is_none_or(Value::is_null) {
            return Err(ValidationError::missing(format!("properties.{field}")));
        }
    }

    let event = match kind {
        EventKind::SessionCreated => DirectoryEvent::SessionCreated(decode(kind, properties)?),
        EventKind::SessionUpdated => DirectoryEvent::SessionUpdated(decode(kind, properties)?),
        EventKind::SessionDeleted => DirectoryEvent::SessionDeleted(decode(kind, properties)?),
        EventKind::SessionStatus => DirectoryEvent::SessionStatus(decode(kind, properties)?),
        EventKind::MessageUpdated => DirectoryEvent::MessageUpdated(decode(kind, properties)?),
        EventKind::MessageRemoved => DirectoryEvent::MessageRemoved(decode(kind, properties)?),
        EventKind::PartUpdated => {
            let payload: PartUpdatedPayload = decode(kind, properties)?;
            if payload.part.body.is_malformed_known_type() {
                return Err(ValidationError::invalid(
                    "properties.part",
                    format!(
                        "fields do not match part type `{}`",
                        payload.part.body.part_type()
                    ),
                ));
            }
            DirectoryEvent::PartUpdated(payload)
        }
        EventKind::PartRemoved => DirectoryEvent::PartRemoved(decode(kind, properties)?),
        EventKind::PermissionAsked => DirectoryEvent::PermissionAsked(decode(kind, properties)?),
        EventKind::PermissionReplied => {
            DirectoryEvent::PermissionReplied(decode(kind, properties)?)
        }
        EventKind::QuestionAsked => DirectoryEvent::QuestionAsked(decode(kind, properties)?),
        EventKind::QuestionReplied => DirectoryEvent::QuestionReplied(decode(kind, properties)?),
        EventKind::QuestionRejected => {
            DirectoryEvent::QuestionRejected(decode(kind, properties)?)
        }
    };
    Ok(event)
}

fn decode<T: DeserializeOwned>(kind: EventKind, properties: &Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(properties.clone())).map_err(|source| {
        ValidationError::Payload {
            event_type: kind.as_str().to_owned(),
            source,
        }
    })
}
