//! Async ingest loop: feed a transport stream into a [`SharedSync`].
//!
//! Each event is applied to completion under a short write lock before the
//! next one is awaited. The lock is never held across an `.await`, so readers
//! can take read locks between applications.

use std::pin::pin;

use futures::{Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use mirror_events::SseDecoder;

use crate::errors::Result;
use crate::reducer::ApplyOutcome;
use crate::sync::SharedSync;

/// What one ingest run did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    /// Events pulled from the stream.
    pub received: u64,
    /// Events reduced into the store.
    pub applied: u64,
    /// Already-seen events.
    pub duplicates: u64,
    /// Unhandled event types.
    pub ignored: u64,
    /// Events with no resolvable parent.
    pub unresolved: u64,
    /// Events rejected by the integrity gate.
    pub rejected: u64,
}

impl IngestSummary {
    fn record(&mut self, result: &Result<ApplyOutcome>) {
        self.received += 1;
        match result {
            Ok(ApplyOutcome::Applied { .. }) => self.applied += 1,
            Ok(ApplyOutcome::Duplicate) => self.duplicates += 1,
            Ok(ApplyOutcome::Ignored { .. }) => self.ignored += 1,
            Ok(ApplyOutcome::Unresolved(_)) => self.unresolved += 1,
            Err(_) => self.rejected += 1,
        }
    }
}

/// Apply every raw envelope from `events` until the stream ends.
pub async fn drive<S>(sync: &SharedSync, events: S) -> IngestSummary
where
    S: Stream<Item = Value>,
{
    let mut events = pin!(events);
    let mut summary = IngestSummary::default();
    while let Some(raw) = events.next().await {
        let result = sync.write().apply_event(&raw);
        summary.record(&result);
    }
    debug!(
        received = summary.received,
        applied = summary.applied,
        rejected = summary.rejected,
        "event stream ended"
    );
    summary
}

/// Decode a `text/event-stream` body from raw byte chunks and apply each
/// frame. A final frame left unterminated when the stream ends is applied too.
pub async fn drive_sse<S, B>(sync: &SharedSync, chunks: S) -> IngestSummary
where
    S: Stream<Item = B>,
    B: AsRef<[u8]>,
{
    let mut chunks = pin!(chunks);
    let mut decoder = SseDecoder::new();
    let mut summary = IngestSummary::default();
    while let Some(chunk) = chunks.next().await {
        let frames = decoder.push(chunk.as_ref());
        for frame in &frames {
            let result = sync.write().apply_frame(frame);
            summary.record(&result);
        }
    }
    if let Some(frame) = decoder.finish() {
        let result = sync.write().apply_frame(&frame);
        summary.record(&result);
    }
    debug!(
        received = summary.received,
        applied = summary.applied,
        rejected = summary.rejected,
        "SSE stream ended"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::DirectorySync;
    use futures::stream;
    use mirror_core::{EventId, SessionId};
    use serde_json::json;

    fn session_created(event_id: &EventId, session: &str) -> Value {
        json!({
            "eventId": event_id.to_string(),
            "sequence": 1,
            "timestamp": 1_700_000_000_000_i64,
            "type": "session.created",
            "properties": {"sessionID": session},
        })
    }

    #[tokio::test]
    async fn drive_counts_every_outcome() {
        let sync = DirectorySync::default().into_shared();
        let repeated = EventId::new();
        let events = vec![
            session_created(&repeated, "s-1"),
            session_created(&repeated, "s-1"),
            json!({"type": "session.created"}),
            session_created(&EventId::new(), "s-2"),
        ];

        let summary = drive(&sync, stream::iter(events)).await;
        assert_eq!(
            summary,
            IngestSummary {
                received: 4,
                applied: 2,
                duplicates: 1,
                ignored: 0,
                unresolved: 0,
                rejected: 1,
            }
        );
        assert_eq!(sync.read().store().sessions().len(), 2);
    }

    #[tokio::test]
    async fn drive_sse_reassembles_split_frames() {
        let sync = DirectorySync::default().into_shared();
        let first = format!("data: {}\n\n", session_created(&EventId::new(), "s-1"));
        let second = format!(": keepalive\n\ndata: {}", session_created(&EventId::new(), "s-2"));
        let body = format!("{first}{second}");
        let (head, tail) = body.as_bytes().split_at(first.len() / 2);
        let chunks = vec![head.to_vec(), tail.to_vec()];

        let summary = drive_sse(&sync, stream::iter(chunks)).await;
        assert_eq!(summary.applied, 2);
        let guard = sync.read();
        assert!(guard.store().session(&SessionId::from("s-1")).is_some());
        assert!(guard.store().session(&SessionId::from("s-2")).is_some());
    }

    #[tokio::test]
    async fn empty_stream_does_nothing() {
        let sync = DirectorySync::default().into_shared();
        let summary = drive(&sync, stream::iter(Vec::<Value>::new())).await;
        assert_eq!(summary, IngestSummary::default());
        assert!(!sync.read().store().is_ready());
    }
}
