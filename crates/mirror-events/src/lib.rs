//! # mirror-events
//!
//! Everything between the transport and the reducer:
//!
//! - **Event kinds**: [`EventKind`], the closed set of `type` strings the mirror understands
//! - **Payloads**: one typed schema per event kind
//! - **Envelope**: [`Envelope`] with a [`DirectoryEvent`] tagged union, produced only by the gate
//! - **Integrity gate**: [`validate`] turns raw JSON into an [`Envelope`] or a [`ValidationError`]
//! - **SSE framing**: [`SseDecoder`] splits a `text/event-stream` body into frames
//! - **Deduplication**: [`Deduplicator`], a bounded LRU set of seen event IDs

#![deny(unsafe_code)]

pub mod dedup;
pub mod envelope;
pub mod errors;
pub mod event_kind;
pub mod gate;
pub mod payloads;
pub mod sse;

pub use dedup::{DEFAULT_DEDUP_MAX_SIZE, DedupStats, Deduplicator};
pub use envelope::{DirectoryEvent, Envelope};
pub use errors::{Result, ValidationError};
pub use event_kind::{ALL_EVENT_KINDS, EventKind};
pub use gate::{validate, validate_frame, validate_str};
pub use sse::{SseDecoder, SseFrame};
