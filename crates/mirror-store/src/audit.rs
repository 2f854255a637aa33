//! Integrity auditor: a read-only scan that reports broken references.
//!
//! The auditor never repairs anything. Parts whose message has not arrived
//! yet show up as [`IntegrityViolation::PartMissingMessage`] and in
//! [`AuditReport::orphaned_parts`]; that is the expected state until the
//! message event is delivered.

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use mirror_core::{MessageId, PartId, RequestId, SessionId};

use crate::store::{DirectoryStore, PendingRequest, RequestTable};
use crate::sorted::Keyed;

/// One broken reference or index entry.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum IntegrityViolation {
    /// A message's session is not in the store.
    #[error("message `{message_id}` references missing session `{session_id}`")]
    MessageMissingSession {
        /// Message.
        message_id: MessageId,
        /// Missing session.
        session_id: SessionId,
    },
    /// A part's message is not in the store.
    #[error("part `{part_id}` references missing message `{message_id}`")]
    PartMissingMessage {
        /// Part.
        part_id: PartId,
        /// Missing message.
        message_id: MessageId,
    },
    /// A part names a session that is not in the store.
    #[error("part `{part_id}` references missing session `{session_id}`")]
    PartMissingSession {
        /// Part.
        part_id: PartId,
        /// Missing session.
        session_id: SessionId,
    },
    /// A part and its message disagree on the session.
    #[error("part `{part_id}` is in session `{part_session}`, its message in `{message_session}`")]
    PartSessionMismatch {
        /// Part.
        part_id: PartId,
        /// Session on the part.
        part_session: SessionId,
        /// Session on the message.
        message_session: SessionId,
    },
    /// A secondary index lists an ID its primary collection doesn't hold.
    #[error("{index} lists `{id}` under `{owner}` but no such entry exists")]
    IndexDangling {
        /// Index name.
        index: &'static str,
        /// Owner key.
        owner: String,
        /// Listed ID.
        id: String,
    },
    /// A secondary index lists an ID under the wrong owner.
    #[error("{index} lists `{id}` under `{owner}` but it belongs to `{actual}`")]
    IndexOwnerMismatch {
        /// Index name.
        index: &'static str,
        /// Owner key the index uses.
        owner: String,
        /// Listed ID.
        id: String,
        /// Owner the entity names.
        actual: String,
    },
    /// An entity is missing from its secondary index.
    #[error("`{id}` is missing from {index}")]
    IndexUnlisted {
        /// Index name.
        index: &'static str,
        /// Unlisted ID.
        id: String,
    },
    /// A request's session is not in the store.
    #[error("{table} request `{request_id}` references missing session `{session_id}`")]
    RequestMissingSession {
        /// `permission` or `question`.
        table: &'static str,
        /// Request.
        request_id: RequestId,
        /// Missing session.
        session_id: SessionId,
    },
    /// A pending list names a request that isn't stored under that session.
    #[error("{table} pending list of `{session_id}` names unknown request `{request_id}`")]
    PendingDangling {
        /// `permission` or `question`.
        table: &'static str,
        /// Session of the list.
        session_id: SessionId,
        /// Listed request.
        request_id: RequestId,
    },
    /// A stored request is absent from its session's pending list.
    #[error("{table} request `{request_id}` is not pending in `{session_id}`")]
    PendingUnlisted {
        /// `permission` or `question`.
        table: &'static str,
        /// Owning session.
        session_id: SessionId,
        /// Request.
        request_id: RequestId,
    },
    /// A status entry for a session that isn't stored.
    #[error("status entry for missing session `{session_id}`")]
    StatusMissingSession {
        /// Missing session.
        session_id: SessionId,
    },
    /// An optimistic correlation entry without its message.
    #[error("optimistic entry `{message_id}` has no message")]
    OptimisticMissingMessage {
        /// Message.
        message_id: MessageId,
    },
}

/// Result of [`audit`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    /// Whether no violations were found.
    pub valid: bool,
    /// Every violation found.
    #[serde(serialize_with = "serialize_violations")]
    pub errors: Vec<IntegrityViolation>,
    /// Messages whose session is missing.
    pub orphaned_messages: Vec<MessageId>,
    /// Parts whose message is missing.
    pub orphaned_parts: Vec<PartId>,
    /// Sessions referenced but not stored, deduplicated and sorted.
    pub missing_sessions: Vec<SessionId>,
}

fn serialize_violations<S: serde::Serializer>(
    errors: &[IntegrityViolation],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(ToString::to_string))
}

/// Scan `store` for broken references.
pub fn audit(store: &DirectoryStore) -> AuditReport {
    let mut auditor = Auditor {
        store,
        report: AuditReport::default(),
        missing_sessions: BTreeSet::new(),
    };
    auditor.messages();
    auditor.parts();
    auditor.secondary_indices();
    auditor.requests("permission", "permissions_by_session", store.permissions());
    auditor.requests("question", "questions_by_session", store.questions());
    auditor.side_tables();

    let Auditor {
        mut report,
        missing_sessions,
        ..
    } = auditor;
    report.valid = report.errors.is_empty();
    report.missing_sessions = missing_sessions.into_iter().collect();
    debug!(
        violations = report.errors.len(),
        orphaned_messages = report.orphaned_messages.len(),
        orphaned_parts = report.orphaned_parts.len(),
        "directory store audited"
    );
    report
}

struct Auditor<'a> {
    store: &'a DirectoryStore,
    report: AuditReport,
    missing_sessions: BTreeSet<SessionId>,
}

impl Auditor<'_> {
    fn flag(&mut self, violation: IntegrityViolation) {
        self.report.errors.push(violation);
    }

    fn session_exists(&mut self, session_id: &SessionId) -> bool {
        let exists = self.store.session(session_id).is_some();
        if !exists {
            let _ = self.missing_sessions.insert(session_id.clone());
        }
        exists
    }

    fn messages(&mut self) {
        let store = self.store;
        for message in store.messages() {
            let info = &message.info;
            if !self.session_exists(&info.session_id) {
                self.report.orphaned_messages.push(info.id.clone());
                self.flag(IntegrityViolation::MessageMissingSession {
                    message_id: info.id.clone(),
                    session_id: info.session_id.clone(),
                });
            }
            if !store.message_ids_for_session(&info.session_id).contains(&info.id) {
                self.flag(IntegrityViolation::IndexUnlisted {
                    index: "messages_by_session",
                    id: info.id.to_string(),
                });
            }
        }
    }

    fn parts(&mut self) {
        let store = self.store;
        for part in store.parts() {
            let message = store.message(&part.message_id);
            if message.is_none() {
                self.report.orphaned_parts.push(part.id.clone());
                self.flag(IntegrityViolation::PartMissingMessage {
                    part_id: part.id.clone(),
                    message_id: part.message_id.clone(),
                });
            }
            if let Some(session_id) = &part.session_id {
                if !self.session_exists(session_id) {
                    self.flag(IntegrityViolation::PartMissingSession {
                        part_id: part.id.clone(),
                        session_id: session_id.clone(),
                    });
                }
                match message {
                    Some(message) if &message.info.session_id != session_id => {
                        self.flag(IntegrityViolation::PartSessionMismatch {
                            part_id: part.id.clone(),
                            part_session: session_id.clone(),
                            message_session: message.info.session_id.clone(),
                        });
                    }
                    _ => {}
                }
            }
            if !store.part_ids_for_message(&part.message_id).contains(&part.id) {
                self.flag(IntegrityViolation::IndexUnlisted {
                    index: "parts_by_message",
                    id: part.id.to_string(),
                });
            }
        }
    }

    fn secondary_indices(&mut self) {
        let store = self.store;
        for (session_id, ids) in store.messages_by_session() {
            for id in ids {
                match store.message(id) {
                    None => self.flag(dangling("messages_by_session", session_id, id)),
                    Some(message) if &message.info.session_id != session_id => self.flag(misowned(
                        "messages_by_session",
                        session_id,
                        id,
                        &message.info.session_id,
                    )),
                    Some(_) => {}
                }
            }
        }
        for (message_id, ids) in store.parts_by_message() {
            for id in ids {
                match store.part(id) {
                    None => self.flag(dangling("parts_by_message", message_id, id)),
                    Some(part) if &part.message_id != message_id => {
                        self.flag(misowned("parts_by_message", message_id, id, &part.message_id));
                    }
                    Some(_) => {}
                }
            }
        }
    }

    fn requests<T: PendingRequest>(
        &mut self,
        table_name: &'static str,
        index: &'static str,
        table: &RequestTable<T>,
    ) {
        for request in table.all() {
            let request_id = request.key();
            let session_id = request.session_id();
            if !self.session_exists(session_id) {
                self.flag(IntegrityViolation::RequestMissingSession {
                    table: table_name,
                    request_id: request_id.clone(),
                    session_id: session_id.clone(),
                });
            }
            let indexed = table
                .by_session()
                .get(session_id)
                .is_some_and(|ids| ids.contains(request_id));
            if !indexed {
                self.flag(IntegrityViolation::IndexUnlisted {
                    index,
                    id: request_id.to_string(),
                });
            }
            if !table.pending(session_id).contains(request_id) {
                self.flag(IntegrityViolation::PendingUnlisted {
                    table: table_name,
                    session_id: session_id.clone(),
                    request_id: request_id.clone(),
                });
            }
        }

        for (session_id, ids) in table.by_session() {
            for id in ids {
                match table.get(id) {
                    None => self.flag(dangling(index, session_id, id)),
                    Some(request) if request.session_id() != session_id => {
                        self.flag(misowned(index, session_id, id, request.session_id()));
                    }
                    Some(_) => {}
                }
            }
        }

        for (session_id, ids) in table.pending_order() {
            for id in ids {
                if !table.get(id).is_some_and(|request| request.session_id() == session_id) {
                    self.flag(IntegrityViolation::PendingDangling {
                        table: table_name,
                        session_id: session_id.clone(),
                        request_id: id.clone(),
                    });
                }
            }
        }
    }

    fn side_tables(&mut self) {
        let store = self.store;
        for (session_id, _) in store.statuses() {
            if !self.session_exists(session_id) {
                self.flag(IntegrityViolation::StatusMissingSession {
                    session_id: session_id.clone(),
                });
            }
        }
        for (message_id, _) in store.optimistic_messages() {
            if store.message(message_id).is_none() {
                self.flag(IntegrityViolation::OptimisticMissingMessage {
                    message_id: message_id.clone(),
                });
            }
        }
    }
}

fn dangling(index: &'static str, owner: &impl ToString, id: &impl ToString) -> IntegrityViolation {
    IntegrityViolation::IndexDangling {
        index,
        owner: owner.to_string(),
        id: id.to_string(),
    }
}

fn misowned(
    index: &'static str,
    owner: &impl ToString,
    id: &impl ToString,
    actual: &impl ToString,
) -> IntegrityViolation {
    IntegrityViolation::IndexOwnerMismatch {
        index,
        owner: owner.to_string(),
        id: id.to_string(),
        actual: actual.to_string(),
    }
}
