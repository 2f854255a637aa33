//! Error types for the integrity gate.
//!
//! A [`ValidationError`] means one event was rejected. It is never fatal to
//! the stream: the caller logs it, drops the event, and keeps reading.

use thiserror::Error;

/// Why an inbound event was rejected before touching state.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The frame was not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The envelope was valid JSON but not an object.
    #[error("envelope is not a JSON object")]
    NotAnObject,

    /// A required field is absent.
    #[error("missing field `{field}`")]
    MissingField {
        /// Dotted path of the field (e.g. `properties.info`).
        field: String,
    },

    /// A field is present but has the wrong type or value.
    #[error("invalid field `{field}`: {reason}")]
    InvalidField {
        /// Dotted path of the field.
        field: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The payload of a known event type doesn't match its schema.
    #[error("invalid `{event_type}` payload: {source}")]
    Payload {
        /// The envelope `type`.
        event_type: String,
        /// Deserialization failure.
        #[source]
        source: serde_json::Error,
    },
}

impl ValidationError {
    pub(crate) fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias for gate results.
pub type Result<T> = std::result::Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_display() {
        let err = ValidationError::missing("eventId");
        assert_eq!(err.to_string(), "missing field `eventId`");
    }

    #[test]
    fn invalid_field_display() {
        let err = ValidationError::invalid("sequence", "must be a non-negative integer");
        assert_eq!(
            err.to_string(),
            "invalid field `sequence`: must be a non-negative integer"
        );
    }

    #[test]
    fn payload_error_keeps_source() {
        let source = serde_json::from_str::<u8>("\"x\"").unwrap_err();
        let err = ValidationError::Payload {
            event_type: "message.updated".into(),
            source,
        };
        assert!(err.to_string().starts_with("invalid `message.updated` payload"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn from_serde_error() {
        let err: ValidationError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, ValidationError::Json(_)));
    }
}
