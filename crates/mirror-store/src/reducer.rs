//! Event reducer: one validated [`Envelope`] in, store commands out.
//!
//! Every branch is total. An event that cannot be tied to a parent entity
//! (no session or message ID anywhere) becomes
//! [`ApplyOutcome::Unresolved`] and leaves the store untouched; anything
//! else is translated into [`StoreCommand`]s and executed.
//!
//! Events are applied in arrival order. `sequence` is not consulted: when two
//! overwriting updates to the same entity arrive swapped, the later-applied
//! one wins even though it was sequenced earlier.

use thiserror::Error;
use tracing::debug;

use mirror_core::{MessageId, MessageInfo};
use mirror_events::{DirectoryEvent, Envelope, EventKind};
use mirror_settings::ReconcileSettings;

use crate::store::{DirectoryStore, StoreChange, StoreCommand};

/// An event named no parent the reducer could resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum UnresolvedReference {
    /// No session ID in the payload or the envelope.
    #[error("`{kind}` event names no session")]
    MissingSession {
        /// Event kind.
        kind: EventKind,
    },
    /// No message ID in the payload.
    #[error("`{kind}` event names no message")]
    MissingMessage {
        /// Event kind.
        kind: EventKind,
    },
}

/// What applying one event did.
#[derive(Clone, Debug, PartialEq)]
pub enum ApplyOutcome {
    /// The event was reduced. `changes` may be empty for a no-op re-application.
    Applied {
        /// Observable changes, in order.
        changes: Vec<StoreChange>,
    },
    /// The event ID was seen recently; nothing was done.
    Duplicate,
    /// The event type is not one the mirror handles.
    Ignored {
        /// The wire `type`.
        event_type: String,
    },
    /// The event could not be tied to a parent entity.
    Unresolved(UnresolvedReference),
}

impl ApplyOutcome {
    /// Changes made, empty unless [`ApplyOutcome::Applied`].
    pub fn changes(&self) -> &[StoreChange] {
        match self {
            Self::Applied { changes } => changes,
            _ => &[],
        }
    }

    /// Whether the event was reduced.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Reduces envelopes into a [`DirectoryStore`].
#[derive(Clone, Debug)]
pub struct EventReducer {
    reconcile_window_ms: i64,
}

impl Default for EventReducer {
    fn default() -> Self {
        Self::new(&ReconcileSettings::default())
    }
}

impl EventReducer {
    /// Reducer using the given reconciliation window.
    pub fn new(settings: &ReconcileSettings) -> Self {
        Self {
            reconcile_window_ms: settings.window_ms.max(0),
        }
    }

    /// Apply one envelope to `store`.
    pub fn reduce(&self, store: &mut DirectoryStore, envelope: Envelope) -> ApplyOutcome {
        let commands = match self.commands_for(store, envelope) {
            Ok(commands) => commands,
            Err(outcome) => return outcome,
        };
        let mut changes = store.execute_all(commands);
        changes.extend(store.execute(StoreCommand::MarkReady));
        ApplyOutcome::Applied { changes }
    }

    fn commands_for(
        &self,
        store: &DirectoryStore,
        envelope: Envelope,
    ) -> Result<Vec<StoreCommand>, ApplyOutcome> {
        let Envelope {
            timestamp,
            session_id: envelope_session,
            directory,
            event,
            ..
        } = envelope;
        let Some(kind) = event.kind() else {
            let event_type = event.event_type().to_owned();
            debug!(event_type = %event_type, "ignoring unhandled event type");
            return Err(ApplyOutcome::Ignored { event_type });
        };
        let missing_session = || unresolved(UnresolvedReference::MissingSession { kind });
        let missing_message = || unresolved(UnresolvedReference::MissingMessage { kind });

        let commands = match event {
            DirectoryEvent::SessionCreated(payload) | DirectoryEvent::SessionUpdated(payload) => {
                let session_id = payload
                    .resolve_session_id(envelope_session.as_ref())
                    .ok_or_else(missing_session)?;
                let session =
                    payload.to_session(session_id.clone(), timestamp, directory.as_deref());
                let mut commands = vec![StoreCommand::UpsertSession { session }];
                if let Some(status) = payload.status {
                    commands.push(StoreCommand::SetSessionStatus {
                        session_id,
                        status,
                        timestamp,
                    });
                }
                commands
            }
            DirectoryEvent::SessionDeleted(payload) => {
                let session_id = payload
                    .resolve_session_id(envelope_session.as_ref())
                    .ok_or_else(missing_session)?;
                vec![StoreCommand::RemoveSessionCascade { session_id }]
            }
            DirectoryEvent::SessionStatus(payload) => {
                let session_id = payload
                    .session_id
                    .or(envelope_session)
                    .ok_or_else(missing_session)?;
                vec![StoreCommand::SetSessionStatus {
                    session_id,
                    status: payload.status,
                    timestamp,
                }]
            }
            DirectoryEvent::MessageUpdated(payload) => {
                let session_id = payload
                    .info
                    .session_id
                    .clone()
                    .or(envelope_session)
                    .ok_or_else(missing_session)?;
                let info = payload.info.into_info(session_id, timestamp);
                match self.find_placeholder(store, &info) {
                    Some(from) => {
                        debug!(from = %from, to = %info.id, "reconciling optimistic message");
                        vec![StoreCommand::RekeyMessage {
                            from,
                            info,
                            timestamp,
                        }]
                    }
                    None => vec![StoreCommand::UpsertMessage { info, timestamp }],
                }
            }
            DirectoryEvent::MessageRemoved(payload) => {
                let message_id = payload.message_id.ok_or_else(missing_message)?;
                vec![StoreCommand::RemoveMessageCascade { message_id }]
            }
            DirectoryEvent::PartUpdated(payload) => {
                let message_id = payload.part.message_id.clone().ok_or_else(missing_message)?;
                let session_id = payload
                    .part
                    .session_id
                    .clone()
                    .or(envelope_session)
                    .or_else(|| store.message(&message_id).map(|m| m.info.session_id.clone()));
                let part = payload.part.into_part(message_id, session_id);
                vec![StoreCommand::UpsertPart { part, timestamp }]
            }
            DirectoryEvent::PartRemoved(payload) => {
                vec![StoreCommand::RemovePart {
                    part_id: payload.part_id,
                }]
            }
            DirectoryEvent::PermissionAsked(payload) => {
                let session_id = payload
                    .session_id
                    .clone()
                    .or(envelope_session)
                    .ok_or_else(missing_session)?;
                vec![StoreCommand::UpsertPermission {
                    request: payload.into_request(session_id),
                    timestamp,
                }]
            }
            DirectoryEvent::PermissionReplied(payload) => {
                debug!(
                    request_id = %payload.request_id,
                    reply = ?payload.reply,
                    "permission answered"
                );
                vec![StoreCommand::RemovePermission {
                    request_id: payload.request_id,
                }]
            }
            DirectoryEvent::QuestionAsked(payload) => {
                let session_id = payload
                    .session_id
                    .clone()
                    .or(envelope_session)
                    .ok_or_else(missing_session)?;
                vec![StoreCommand::UpsertQuestion {
                    request: payload.into_request(session_id),
                    timestamp,
                }]
            }
            DirectoryEvent::QuestionReplied(payload) => vec![StoreCommand::RemoveQuestion {
                request_id: payload.request_id,
            }],
            DirectoryEvent::QuestionRejected(payload) => vec![StoreCommand::RemoveQuestion {
                request_id: payload.request_id,
            }],
            DirectoryEvent::Unknown { event_type } => {
                return Err(ApplyOutcome::Ignored { event_type });
            }
        };
        Ok(commands)
    }

    /// Closest unconfirmed placeholder `info` should replace, if any.
    ///
    /// Only consulted when no message with `info.id` exists. Ties on
    /// distance go to the lowest placeholder ID.
    fn find_placeholder(&self, store: &DirectoryStore, info: &MessageInfo) -> Option<MessageId> {
        if store.message(&info.id).is_some() {
            return None;
        }
        store
            .optimistic_messages()
            .filter(|(id, _)| **id != info.id)
            .filter_map(|(id, key)| {
                key.distance(info, self.reconcile_window_ms)
                    .map(|distance| (distance, id))
            })
            .min()
            .map(|(_, id)| id.clone())
    }
}

fn unresolved(reference: UnresolvedReference) -> ApplyOutcome {
    debug!(%reference, "dropping unresolvable event");
    ApplyOutcome::Unresolved(reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use mirror_core::{
        EventId, MessageTime, Part, PartBody, PartId, PartKind, Role, SessionId, SessionStatus,
    };
    use mirror_events::validate;
    use serde_json::{Value, json};

    fn envelope(event_type: &str, timestamp: i64, properties: Value) -> Envelope {
        validate(&json!({
            "eventId": EventId::new().as_str(),
            "sequence": 0,
            "timestamp": timestamp,
            "type": event_type,
            "properties": properties,
        }))
        .unwrap()
    }

    fn optimistic(store: &mut DirectoryStore, id: &str, created: i64) {
        optimistic_with_part(store, id, &format!("{id}-part"), created);
    }

    fn optimistic_with_part(store: &mut DirectoryStore, id: &str, part_id: &str, created: i64) {
        let info = MessageInfo {
            id: MessageId::from(id),
            role: Role::User,
            session_id: SessionId::from("s-1"),
            time: MessageTime {
                created,
                completed: None,
            },
            parent_id: None,
            model: None,
            provider: None,
        };
        let part = Part {
            id: PartId::from(part_id),
            message_id: MessageId::from(id),
            session_id: None,
            body: PartBody::Known(PartKind::Text {
                text: "draft".into(),
                synthetic: None,
                time: None,
            }),
        };
        let _ = store.execute(StoreCommand::InsertOptimisticMessage {
            info,
            parts: vec![part],
        });
    }

    fn user_message(id: &str, created: i64) -> Envelope {
        envelope(
            "message.updated",
            created,
            json!({"info": {
                "id": id,
                "role": "user",
                "sessionID": "s-1",
                "time": {"created": created},
            }}),
        )
    }

    #[test]
    fn first_applied_event_marks_ready() {
        let reducer = EventReducer::default();
        let mut store = DirectoryStore::new();
        let created = |timestamp, session: &str| {
            envelope("session.created", timestamp, json!({"sessionID": session}))
        };
        let outcome = reducer.reduce(&mut store, created(1, "s-1"));
        assert!(outcome.changes().contains(&StoreChange::Ready));
        let outcome = reducer.reduce(&mut store, created(2, "s-2"));
        assert!(!outcome.changes().contains(&StoreChange::Ready));
    }

    #[test]
    fn unresolved_does_not_mark_ready() {
        let reducer = EventReducer::default();
        let mut store = DirectoryStore::new();
        let outcome = reducer.reduce(
            &mut store,
            envelope("session.status", 1, json!({"status": {"type": "idle"}})),
        );
        assert_matches!(
            outcome,
            ApplyOutcome::Unresolved(UnresolvedReference::MissingSession {
                kind: EventKind::SessionStatus
            })
        );
        assert!(!store.is_ready());
        assert_eq!(store, DirectoryStore::new());
    }

    #[test]
    fn unknown_type_is_ignored() {
        let reducer = EventReducer::default();
        let mut store = DirectoryStore::new();
        let outcome = reducer.reduce(&mut store, envelope("server.connected", 1, json!({})));
        assert_matches!(
            outcome,
            ApplyOutcome::Ignored { ref event_type } if event_type == "server.connected"
        );
    }

    #[test]
    fn session_updated_writes_status() {
        let reducer = EventReducer::default();
        let mut store = DirectoryStore::new();
        let _ = reducer.reduce(
            &mut store,
            envelope("session.updated", 5, json!({"sessionID": "s-1", "status": {"type": "busy"}})),
        );
        assert_eq!(store.session_status(&SessionId::from("s-1")), Some(&SessionStatus::Busy));
    }

    #[test]
    fn last_accessed_is_latest_timestamp() {
        let reducer = EventReducer::default();
        let mut store = DirectoryStore::new();
        let s1 = json!({"sessionID": "s-1"});
        let _ = reducer.reduce(&mut store, envelope("session.updated", 50, s1.clone()));
        let _ = reducer.reduce(&mut store, envelope("session.created", 10, s1));
        let session = store.session(&SessionId::from("s-1")).unwrap();
        assert_eq!(session.created_at, 10);
        assert_eq!(session.last_accessed, 50);
    }

    #[test]
    fn message_session_falls_back_to_envelope() {
        let reducer = EventReducer::default();
        let mut store = DirectoryStore::new();
        let mut raw = json!({
            "eventId": EventId::new().as_str(),
            "sequence": 0,
            "timestamp": 9,
            "sessionID": "s-env",
            "type": "message.updated",
            "properties": {"info": {"id": "m-1", "role": "assistant"}},
        });
        let env = validate(&raw).unwrap();
        let _ = reducer.reduce(&mut store, env);
        assert_eq!(store.messages_for_session(&SessionId::from("s-env")).len(), 1);

        raw["sessionID"] = Value::Null;
        raw["eventId"] = json!(EventId::new().as_str());
        raw["properties"]["info"]["id"] = json!("m-2");
        let outcome = reducer.reduce(&mut store, validate(&raw).unwrap());
        assert_matches!(
            outcome,
            ApplyOutcome::Unresolved(UnresolvedReference::MissingSession { .. })
        );
    }

    #[test]
    fn part_without_message_is_unresolved() {
        let reducer = EventReducer::default();
        let mut store = DirectoryStore::new();
        let outcome = reducer.reduce(
            &mut store,
            envelope(
                "message.part.updated",
                1,
                json!({"part": {"id": "p-1", "type": "text", "text": "x"}}),
            ),
        );
        assert_matches!(
            outcome,
            ApplyOutcome::Unresolved(UnresolvedReference::MissingMessage { .. })
        );
        assert!(store.parts().is_empty());
    }

    #[test]
    fn part_inherits_session_from_known_message() {
        let reducer = EventReducer::default();
        let mut store = DirectoryStore::new();
        let _ = reducer.reduce(&mut store, user_message("m-1", 10));
        let _ = reducer.reduce(
            &mut store,
            envelope(
                "message.part.updated",
                11,
                json!({"part": {"id": "p-1", "messageID": "m-1", "type": "text", "text": "x"}}),
            ),
        );
        let part = store.part(&PartId::from("p-1")).unwrap();
        assert_eq!(part.session_id.as_ref().map(SessionId::as_str), Some("s-1"));
    }

    #[test]
    fn canonical_message_replaces_placeholder() {
        let reducer = EventReducer::default();
        let mut store = DirectoryStore::new();
        optimistic(&mut store, "opt-1", 1_000);

        let outcome = reducer.reduce(&mut store, user_message("m-1", 1_400));
        assert!(outcome.changes().iter().any(|c| matches!(c, StoreChange::MessageRekeyed { .. })));

        assert!(store.message(&MessageId::from("opt-1")).is_none());
        assert!(store.parts_for_message(&MessageId::from("opt-1")).is_empty());
        let parts = store.parts_for_message(&MessageId::from("m-1"));
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].id.as_str(), "opt-1-part");
        assert_eq!(store.counts().optimistic, 0);
    }

    fn streamed_part(part_id: &str, message_id: &str, text: &str) -> Envelope {
        envelope(
            "message.part.updated",
            1_100,
            json!({"part": {
                "id": part_id,
                "messageID": message_id,
                "sessionID": "s-1",
                "type": "text",
                "text": text,
            }}),
        )
    }

    fn part_text<'a>(store: &'a DirectoryStore, part_id: &str) -> Option<&'a str> {
        match &store.part(&PartId::from(part_id))?.body {
            PartBody::Known(PartKind::Text { text, .. }) => Some(text.as_str()),
            _ => None,
        }
    }

    #[test]
    fn rekeyed_parts_merge_with_parts_streamed_under_canonical_id() {
        let reducer = EventReducer::default();
        let mut store = DirectoryStore::new();
        let _ = reducer.reduce(&mut store, streamed_part("srv-part", "m-1", "streamed"));
        optimistic(&mut store, "opt-1", 1_000);

        let _ = reducer.reduce(&mut store, user_message("m-1", 1_200));

        assert!(store.message(&MessageId::from("opt-1")).is_none());
        assert!(store.parts_for_message(&MessageId::from("opt-1")).is_empty());
        let ids: Vec<&str> = store
            .parts_for_message(&MessageId::from("m-1"))
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, ["opt-1-part", "srv-part"]);
        assert_eq!(part_text(&store, "srv-part"), Some("streamed"));
        assert!(crate::audit::audit(&store).valid);
    }

    #[test]
    fn streamed_copy_of_shared_part_survives_placeholder_insert() {
        let reducer = EventReducer::default();
        let mut store = DirectoryStore::new();
        let _ = reducer.reduce(&mut store, streamed_part("p-1", "m-1", "server"));
        optimistic_with_part(&mut store, "opt-1", "p-1", 1_000);

        assert_eq!(part_text(&store, "p-1"), Some("server"));
        assert!(store.parts_for_message(&MessageId::from("opt-1")).is_empty());

        let _ = reducer.reduce(&mut store, user_message("m-1", 1_200));
        assert!(store.message(&MessageId::from("opt-1")).is_none());
        let parts = store.parts_for_message(&MessageId::from("m-1"));
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].id.as_str(), "p-1");
        assert_eq!(part_text(&store, "p-1"), Some("server"));
        assert_eq!(store.parts().len(), 1);
    }

    #[test]
    fn streamed_update_of_placeholder_part_wins_over_draft() {
        let reducer = EventReducer::default();
        let mut store = DirectoryStore::new();
        optimistic_with_part(&mut store, "opt-1", "p-1", 1_000);
        let _ = reducer.reduce(&mut store, streamed_part("p-1", "m-1", "server"));

        assert!(store.parts_for_message(&MessageId::from("opt-1")).is_empty());
        let _ = reducer.reduce(&mut store, user_message("m-1", 1_200));
        assert!(store.message(&MessageId::from("opt-1")).is_none());
        assert_eq!(store.part_ids_for_message(&MessageId::from("m-1")), [PartId::from("p-1")]);
        assert_eq!(part_text(&store, "p-1"), Some("server"));
    }

    #[test]
    fn placeholder_outside_window_is_kept() {
        let reducer = EventReducer::new(&ReconcileSettings { window_ms: 100 });
        let mut store = DirectoryStore::new();
        optimistic(&mut store, "opt-1", 1_000);
        let _ = reducer.reduce(&mut store, user_message("m-1", 2_000));
        assert!(store.message(&MessageId::from("opt-1")).is_some());
        assert!(store.message(&MessageId::from("m-1")).is_some());
        assert_eq!(store.counts().optimistic, 1);
    }

    #[test]
    fn closest_placeholder_wins() {
        let reducer = EventReducer::default();
        let mut store = DirectoryStore::new();
        optimistic(&mut store, "opt-a", 1_000);
        optimistic(&mut store, "opt-b", 1_900);
        let _ = reducer.reduce(&mut store, user_message("m-1", 2_000));
        assert!(store.message(&MessageId::from("opt-a")).is_some());
        assert!(store.message(&MessageId::from("opt-b")).is_none());
    }

    #[test]
    fn equal_distance_prefers_lowest_id() {
        let reducer = EventReducer::default();
        let mut store = DirectoryStore::new();
        optimistic(&mut store, "opt-b", 1_000);
        optimistic(&mut store, "opt-a", 3_000);
        let _ = reducer.reduce(&mut store, user_message("m-1", 2_000));
        assert!(store.message(&MessageId::from("opt-a")).is_none());
        assert!(store.message(&MessageId::from("opt-b")).is_some());
    }

    #[test]
    fn exact_id_confirms_placeholder_without_rekey() {
        let reducer = EventReducer::default();
        let mut store = DirectoryStore::new();
        optimistic(&mut store, "m-1", 1_000);
        let outcome = reducer.reduce(&mut store, user_message("m-1", 1_050));
        assert!(!outcome.changes().iter().any(|c| matches!(c, StoreChange::MessageRekeyed { .. })));
        assert_eq!(store.counts().optimistic, 0);
        assert_eq!(store.parts_for_message(&MessageId::from("m-1")).len(), 1);
    }

    #[test]
    fn replayed_event_is_a_no_op() {
        let reducer = EventReducer::default();
        let mut store = DirectoryStore::new();
        optimistic(&mut store, "opt-1", 1_000);
        let event = user_message("m-1", 1_400);
        let _ = reducer.reduce(&mut store, event.clone());
        let after_first = store.clone();
        let outcome = reducer.reduce(&mut store, event);
        assert_eq!(store, after_first);
        assert!(outcome.changes().is_empty());
    }

    #[test]
    fn question_lifecycle() {
        let reducer = EventReducer::default();
        let mut store = DirectoryStore::new();
        let _ = reducer.reduce(
            &mut store,
            envelope(
                "question.asked",
                1,
                json!({"id": "q-1", "sessionID": "s-1", "questions": [{"question": "Which db?"}]}),
            ),
        );
        assert_eq!(store.questions().pending(&SessionId::from("s-1")).len(), 1);
        let _ = reducer.reduce(
            &mut store,
            envelope("question.rejected", 2, json!({"sessionID": "s-1", "requestID": "q-1"})),
        );
        assert!(store.questions_for_session(&SessionId::from("s-1")).is_empty());
        assert!(store.questions().pending(&SessionId::from("s-1")).is_empty());
    }
}
