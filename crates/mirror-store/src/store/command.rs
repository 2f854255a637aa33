//! Closed set of store mutations and the changes they report.

use serde::{Deserialize, Serialize};

use mirror_core::{
    MessageId, MessageInfo, Part, PartId, PermissionRequest, QuestionRequest, RequestId, Session,
    SessionId, SessionStatus,
};

use super::DirectoryStore;

/// One mutation intent. Every variant is total: applying it to any store
/// state succeeds, and applying it twice equals applying it once.
#[derive(Clone, Debug, PartialEq)]
pub enum StoreCommand {
    /// Insert a session or merge into the existing record.
    UpsertSession {
        /// Incoming record; `last_accessed` carries the event time.
        session: Session,
    },
    /// Remove a session with its messages, parts, requests and status.
    RemoveSessionCascade {
        /// Session to remove.
        session_id: SessionId,
    },
    /// Replace a session's status entry, creating the session if needed.
    SetSessionStatus {
        /// Session.
        session_id: SessionId,
        /// New status.
        status: SessionStatus,
        /// Event time.
        timestamp: i64,
    },
    /// Insert or replace a message by exact ID, keeping its parts.
    UpsertMessage {
        /// Message metadata.
        info: MessageInfo,
        /// Event time.
        timestamp: i64,
    },
    /// Remove a message with its parts.
    RemoveMessageCascade {
        /// Message to remove.
        message_id: MessageId,
    },
    /// Replace an optimistic placeholder with its canonical message,
    /// moving the placeholder's parts to the canonical ID.
    RekeyMessage {
        /// Placeholder ID.
        from: MessageId,
        /// Canonical metadata.
        info: MessageInfo,
        /// Event time.
        timestamp: i64,
    },
    /// Insert or replace a part by ID.
    UpsertPart {
        /// The part's full state.
        part: Part,
        /// Event time.
        timestamp: i64,
    },
    /// Remove a part.
    RemovePart {
        /// Part to remove.
        part_id: PartId,
    },
    /// Insert or replace a permission request and mark it pending.
    UpsertPermission {
        /// The request.
        request: PermissionRequest,
        /// Event time.
        timestamp: i64,
    },
    /// Drop a permission request.
    RemovePermission {
        /// Request to drop.
        request_id: RequestId,
    },
    /// Insert or replace a question request and mark it pending.
    UpsertQuestion {
        /// The request.
        request: QuestionRequest,
        /// Event time.
        timestamp: i64,
    },
    /// Drop a question request.
    RemoveQuestion {
        /// Request to drop.
        request_id: RequestId,
    },
    /// Register a client-side placeholder message with its parts.
    InsertOptimisticMessage {
        /// Placeholder metadata.
        info: MessageInfo,
        /// Parts attached to the placeholder.
        parts: Vec<Part>,
    },
    /// Flag the store as usable. Only the first call has an effect.
    MarkReady,
}

/// Something observable that a command changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum StoreChange {
    /// A session was created or its record changed.
    SessionUpserted {
        /// Session.
        session_id: SessionId,
    },
    /// A session was removed.
    SessionRemoved {
        /// Session.
        session_id: SessionId,
    },
    /// A session's status changed.
    StatusChanged {
        /// Session.
        session_id: SessionId,
    },
    /// A message was created or changed.
    MessageUpserted {
        /// Owning session.
        session_id: SessionId,
        /// Message.
        message_id: MessageId,
    },
    /// A message was removed.
    MessageRemoved {
        /// Owning session.
        session_id: SessionId,
        /// Message.
        message_id: MessageId,
    },
    /// An optimistic placeholder was replaced by its canonical message.
    MessageRekeyed {
        /// Owning session.
        session_id: SessionId,
        /// Placeholder ID.
        from: MessageId,
        /// Canonical ID.
        to: MessageId,
    },
    /// A part was created or changed.
    PartUpserted {
        /// Owning message.
        message_id: MessageId,
        /// Part.
        part_id: PartId,
    },
    /// A part was removed.
    PartRemoved {
        /// Owning message.
        message_id: MessageId,
        /// Part.
        part_id: PartId,
    },
    /// A permission request was raised or changed.
    PermissionUpserted {
        /// Owning session.
        session_id: SessionId,
        /// Request.
        request_id: RequestId,
    },
    /// A permission request was answered or dropped.
    PermissionRemoved {
        /// Owning session.
        session_id: SessionId,
        /// Request.
        request_id: RequestId,
    },
    /// A question was raised or changed.
    QuestionUpserted {
        /// Owning session.
        session_id: SessionId,
        /// Request.
        request_id: RequestId,
    },
    /// A question was answered, rejected or dropped.
    QuestionRemoved {
        /// Owning session.
        session_id: SessionId,
        /// Request.
        request_id: RequestId,
    },
    /// The store became usable.
    Ready,
    /// The whole state was replaced from a snapshot.
    Restored,
}

impl DirectoryStore {
    /// Apply one command, returning what it changed (empty if nothing).
    pub fn execute(&mut self, command: StoreCommand) -> Vec<StoreChange> {
        let mut changes = Vec::new();
        match command {
            StoreCommand::UpsertSession { session } => self.upsert_session(session, &mut changes),
            StoreCommand::RemoveSessionCascade { session_id } => {
                self.remove_session_cascade(&session_id, &mut changes);
            }
            StoreCommand::SetSessionStatus {
                session_id,
                status,
                timestamp,
            } => self.set_session_status(&session_id, status, timestamp, &mut changes),
            StoreCommand::UpsertMessage { info, timestamp } => {
                self.upsert_message(info, timestamp, &mut changes);
            }
            StoreCommand::RemoveMessageCascade { message_id } => {
                self.remove_message_cascade(&message_id, &mut changes);
            }
            StoreCommand::RekeyMessage {
                from,
                info,
                timestamp,
            } => self.rekey_message(&from, info, timestamp, &mut changes),
            StoreCommand::UpsertPart { part, timestamp } => {
                self.upsert_part(part, timestamp, &mut changes);
            }
            StoreCommand::RemovePart { part_id } => self.remove_part(&part_id, &mut changes),
            StoreCommand::UpsertPermission { request, timestamp } => {
                self.upsert_permission(request, timestamp, &mut changes);
            }
            StoreCommand::RemovePermission { request_id } => {
                self.remove_permission(&request_id, &mut changes);
            }
            StoreCommand::UpsertQuestion { request, timestamp } => {
                self.upsert_question(request, timestamp, &mut changes);
            }
            StoreCommand::RemoveQuestion { request_id } => {
                self.remove_question(&request_id, &mut changes);
            }
            StoreCommand::InsertOptimisticMessage { info, parts } => {
                self.insert_optimistic_message(info, parts, &mut changes);
            }
            StoreCommand::MarkReady => self.mark_ready(&mut changes),
        }
        changes
    }

    /// Apply commands in order, concatenating their changes.
    pub fn execute_all(
        &mut self,
        commands: impl IntoIterator<Item = StoreCommand>,
    ) -> Vec<StoreChange> {
        commands
            .into_iter()
            .flat_map(|command| self.execute(command))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn permission(id: &str, session: &str) -> PermissionRequest {
        PermissionRequest {
            id: RequestId::from(id),
            session_id: SessionId::from(session),
            permission: "write".into(),
            patterns: vec!["src/file.ts".into()],
            always: Vec::new(),
            metadata: serde_json::Value::Null,
            tool: None,
        }
    }

    #[test]
    fn every_command_is_idempotent() {
        let session_id = SessionId::from("s-1");
        let commands = vec![
            StoreCommand::UpsertSession {
                session: Session::placeholder(session_id.clone(), 5),
            },
            StoreCommand::SetSessionStatus {
                session_id: session_id.clone(),
                status: SessionStatus::Idle,
                timestamp: 6,
            },
            StoreCommand::UpsertPermission {
                request: permission("perm-1", "s-1"),
                timestamp: 7,
            },
            StoreCommand::RemovePermission {
                request_id: RequestId::from("perm-1"),
            },
            StoreCommand::RemoveSessionCascade { session_id },
            StoreCommand::MarkReady,
        ];

        for command in commands {
            let mut once = DirectoryStore::new();
            let _ = once.execute(command.clone());
            let mut twice = once.clone();
            let second = twice.execute(command.clone());
            assert_eq!(once, twice, "{command:?}");
            assert!(second.is_empty(), "{command:?} reported {second:?}");
        }
    }

    #[test]
    fn permission_lifecycle_changes() {
        let mut store = DirectoryStore::new();
        let changes = store.execute(StoreCommand::UpsertPermission {
            request: permission("perm-c", "s-c"),
            timestamp: 1,
        });
        assert!(changes.contains(&StoreChange::PermissionUpserted {
            session_id: SessionId::from("s-c"),
            request_id: RequestId::from("perm-c"),
        }));
        assert_eq!(store.permissions().pending(&SessionId::from("s-c")).len(), 1);

        let changes = store.execute(StoreCommand::RemovePermission {
            request_id: RequestId::from("perm-c"),
        });
        assert_eq!(changes.len(), 1);
        assert!(store.permissions_for_session(&SessionId::from("s-c")).is_empty());
        assert!(store.permissions().pending(&SessionId::from("s-c")).is_empty());
    }

    #[test]
    fn execute_all_concatenates() {
        let mut store = DirectoryStore::new();
        let changes = store.execute_all([
            StoreCommand::UpsertSession {
                session: Session::placeholder(SessionId::from("s-1"), 1),
            },
            StoreCommand::MarkReady,
        ]);
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn change_wire_shape() {
        let change = StoreChange::PartRemoved {
            message_id: MessageId::from("m-1"),
            part_id: PartId::from("p-1"),
        };
        assert_eq!(
            serde_json::to_value(&change).unwrap(),
            json!({"type": "partRemoved", "messageId": "m-1", "partId": "p-1"})
        );
        assert_eq!(serde_json::to_value(StoreChange::Ready).unwrap(), json!({"type": "ready"}));
    }
}
