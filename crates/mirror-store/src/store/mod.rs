//! The mirrored state of one workspace directory.
//!
//! [`DirectoryStore`] is a passive container: five sorted collections
//! (sessions, messages, parts, permissions, questions), their secondary
//! indices, a session status side table, and the optimistic correlation
//! table. Reads go through the query methods below; every write goes through
//! [`DirectoryStore::execute`] with a [`StoreCommand`].
//!
//! All maps are ordered, so two stores holding equal state serialize to
//! identical bytes.

mod command;
pub(crate) mod index;
mod requests;
mod snapshot;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use mirror_core::{
    MessageId, MessageInfo, MessageWithParts, Part, PartId, PermissionRequest, QuestionRequest,
    RequestId, Role, Session, SessionId, SessionStatus,
};

use crate::sorted::SortedVec;

pub use command::{StoreChange, StoreCommand};
pub use requests::{PendingRequest, RequestTable};
pub use snapshot::{SNAPSHOT_VERSION, StoreSnapshot};

/// A message as held by the store: server metadata plus first/last seen times.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    /// Message metadata.
    pub info: MessageInfo,
    /// Earliest timestamp at which the message was written.
    pub created_at: i64,
    /// Latest timestamp at which the message was written.
    pub updated_at: i64,
}

/// What an optimistic placeholder must share with its canonical message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationKey {
    /// Owning session.
    pub session_id: SessionId,
    /// Author role.
    pub role: Role,
    /// Triggering user message.
    pub parent_id: Option<MessageId>,
    /// Client-side creation time.
    pub created: i64,
}

impl CorrelationKey {
    /// Key derived from a placeholder's metadata.
    pub fn for_info(info: &MessageInfo) -> Self {
        Self {
            session_id: info.session_id.clone(),
            role: info.role,
            parent_id: info.parent_id.clone(),
            created: info.time.created,
        }
    }

    /// Creation-time distance to `info` if it correlates within `window_ms`.
    ///
    /// Wire timestamps are untrusted, so the distance is unsigned and never
    /// overflows; a negative window matches nothing.
    pub fn distance(&self, info: &MessageInfo, window_ms: i64) -> Option<u64> {
        if self.session_id != info.session_id
            || self.role != info.role
            || self.parent_id != info.parent_id
        {
            return None;
        }
        let window = u64::try_from(window_ms).ok()?;
        let distance = info.time.created.abs_diff(self.created);
        (distance <= window).then_some(distance)
    }
}

/// Collection sizes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreCounts {
    /// Sessions.
    pub sessions: usize,
    /// Session status entries.
    pub statuses: usize,
    /// Messages.
    pub messages: usize,
    /// Parts.
    pub parts: usize,
    /// Pending permission requests.
    pub permissions: usize,
    /// Pending question requests.
    pub questions: usize,
    /// Unconfirmed optimistic messages.
    pub optimistic: usize,
}

/// Mirrored directory state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectoryStore {
    sessions: SortedVec<Session>,
    status: BTreeMap<SessionId, SessionStatus>,
    messages: SortedVec<StoredMessage>,
    messages_by_session: index::Index<SessionId, MessageId>,
    parts: SortedVec<Part>,
    parts_by_message: index::Index<MessageId, PartId>,
    permissions: RequestTable<PermissionRequest>,
    questions: RequestTable<QuestionRequest>,
    optimistic: BTreeMap<MessageId, CorrelationKey>,
    ready: bool,
}

impl DirectoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether at least one event has been applied successfully.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    // ── Sessions ─────────────────────────────────────────────────────

    /// All sessions in ID order.
    pub fn sessions(&self) -> &[Session] {
        self.sessions.as_slice()
    }

    /// Session by ID.
    pub fn session(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// Last reported status of a session.
    pub fn session_status(&self, id: &SessionId) -> Option<&SessionStatus> {
        self.status.get(id)
    }

    /// Every status entry in session ID order.
    pub fn statuses(&self) -> impl Iterator<Item = (&SessionId, &SessionStatus)> {
        self.status.iter()
    }

    // ── Messages ─────────────────────────────────────────────────────

    /// All messages in ID order.
    pub fn messages(&self) -> &[StoredMessage] {
        self.messages.as_slice()
    }

    /// Message by ID.
    pub fn message(&self, id: &MessageId) -> Option<&StoredMessage> {
        self.messages.get(id)
    }

    /// Message IDs indexed under a session, in ID order.
    pub fn message_ids_for_session(&self, session_id: &SessionId) -> &[MessageId] {
        self.messages_by_session
            .get(session_id)
            .map(SortedVec::as_slice)
            .unwrap_or_default()
    }

    /// Messages of a session, in ID order.
    pub fn messages_for_session(&self, session_id: &SessionId) -> Vec<&StoredMessage> {
        self.message_ids_for_session(session_id)
            .iter()
            .filter_map(|id| self.messages.get(id))
            .collect()
    }

    /// A message joined with its parts.
    pub fn message_with_parts(&self, id: &MessageId) -> Option<MessageWithParts> {
        let message = self.messages.get(id)?;
        Some(MessageWithParts {
            info: message.info.clone(),
            parts: self.parts_for_message(id).into_iter().cloned().collect(),
            created_at: Some(message.created_at),
            updated_at: Some(message.updated_at),
        })
    }

    // ── Parts ────────────────────────────────────────────────────────

    /// All parts in ID order.
    pub fn parts(&self) -> &[Part] {
        self.parts.as_slice()
    }

    /// Part by ID.
    pub fn part(&self, id: &PartId) -> Option<&Part> {
        self.parts.get(id)
    }

    /// Part IDs indexed under a message, in ID order.
    pub fn part_ids_for_message(&self, message_id: &MessageId) -> &[PartId] {
        self.parts_by_message
            .get(message_id)
            .map(SortedVec::as_slice)
            .unwrap_or_default()
    }

    /// Parts of a message, in ID order. Works whether or not the message
    /// itself has arrived.
    pub fn parts_for_message(&self, message_id: &MessageId) -> Vec<&Part> {
        self.part_ids_for_message(message_id)
            .iter()
            .filter_map(|id| self.parts.get(id))
            .collect()
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Pending permission requests.
    pub fn permissions(&self) -> &RequestTable<PermissionRequest> {
        &self.permissions
    }

    /// Permission request by ID.
    pub fn permission(&self, id: &RequestId) -> Option<&PermissionRequest> {
        self.permissions.get(id)
    }

    /// Permission requests of a session, in ID order.
    pub fn permissions_for_session(&self, session_id: &SessionId) -> Vec<&PermissionRequest> {
        self.permissions.for_session(session_id)
    }

    /// Pending question requests.
    pub fn questions(&self) -> &RequestTable<QuestionRequest> {
        &self.questions
    }

    /// Question request by ID.
    pub fn question(&self, id: &RequestId) -> Option<&QuestionRequest> {
        self.questions.get(id)
    }

    /// Question requests of a session, in ID order.
    pub fn questions_for_session(&self, session_id: &SessionId) -> Vec<&QuestionRequest> {
        self.questions.for_session(session_id)
    }

    // ── Optimistic ───────────────────────────────────────────────────

    /// Correlation key of an unconfirmed optimistic message.
    pub fn optimistic_key(&self, id: &MessageId) -> Option<&CorrelationKey> {
        self.optimistic.get(id)
    }

    /// Unconfirmed optimistic messages in ID order.
    pub fn optimistic_messages(&self) -> impl Iterator<Item = (&MessageId, &CorrelationKey)> {
        self.optimistic.iter()
    }

    /// Per-collection sizes.
    pub fn counts(&self) -> StoreCounts {
        StoreCounts {
            sessions: self.sessions.len(),
            statuses: self.status.len(),
            messages: self.messages.len(),
            parts: self.parts.len(),
            permissions: self.permissions.len(),
            questions: self.questions.len(),
            optimistic: self.optimistic.len(),
        }
    }

    pub(crate) fn messages_by_session(&self) -> &index::Index<SessionId, MessageId> {
        &self.messages_by_session
    }

    pub(crate) fn parts_by_message(&self) -> &index::Index<MessageId, PartId> {
        &self.parts_by_message
    }

    // ── Mutations (reached through `execute`) ────────────────────────

    fn upsert_session(&mut self, incoming: Session, changes: &mut Vec<StoreChange>) {
        let session_id = incoming.session_id.clone();
        let changed = match self.sessions.get_mut(&session_id) {
            Some(existing) => {
                let before = existing.clone();
                existing.merge_from(incoming);
                *existing != before
            }
            None => {
                let _ = self.sessions.upsert(incoming);
                true
            }
        };
        if changed {
            changes.push(StoreChange::SessionUpserted { session_id });
        }
    }

    fn touch_session(
        &mut self,
        session_id: &SessionId,
        timestamp: i64,
        changes: &mut Vec<StoreChange>,
    ) {
        self.upsert_session(Session::placeholder(session_id.clone(), timestamp), changes);
    }

    fn remove_session_cascade(&mut self, session_id: &SessionId, changes: &mut Vec<StoreChange>) {
        if let Some(message_ids) = self.messages_by_session.remove(session_id) {
            for message_id in &message_ids {
                self.remove_message_cascade(message_id, changes);
            }
        }

        // Parts that arrived before their message are only reachable by session.
        let stray = self
            .parts
            .extract_if(|part| part.session_id.as_ref() == Some(session_id));
        for part in stray {
            let _ = index::remove(&mut self.parts_by_message, &part.message_id, &part.id);
            changes.push(StoreChange::PartRemoved {
                message_id: part.message_id,
                part_id: part.id,
            });
        }

        for request in self.permissions.remove_session(session_id) {
            changes.push(StoreChange::PermissionRemoved {
                session_id: request.session_id,
                request_id: request.id,
            });
        }
        for request in self.questions.remove_session(session_id) {
            changes.push(StoreChange::QuestionRemoved {
                session_id: request.session_id,
                request_id: request.id,
            });
        }

        let _ = self.status.remove(session_id);
        if self.sessions.remove(session_id).is_some() {
            changes.push(StoreChange::SessionRemoved {
                session_id: session_id.clone(),
            });
        }
    }

    fn set_session_status(
        &mut self,
        session_id: &SessionId,
        status: SessionStatus,
        timestamp: i64,
        changes: &mut Vec<StoreChange>,
    ) {
        self.touch_session(session_id, timestamp, changes);
        if self.status.get(session_id) != Some(&status) {
            let _ = self.status.insert(session_id.clone(), status);
            changes.push(StoreChange::StatusChanged {
                session_id: session_id.clone(),
            });
        }
    }

    fn upsert_message(
        &mut self,
        info: MessageInfo,
        timestamp: i64,
        changes: &mut Vec<StoreChange>,
    ) {
        let message_id = info.id.clone();
        let session_id = info.session_id.clone();
        self.touch_session(&session_id, timestamp, changes);
        let confirmed = self.optimistic.remove(&message_id).is_some();

        let stored = match self.messages.get(&message_id) {
            Some(existing) => {
                if existing.info.session_id != session_id {
                    let _ = index::remove(
                        &mut self.messages_by_session,
                        &existing.info.session_id,
                        &message_id,
                    );
                }
                StoredMessage {
                    info,
                    created_at: existing.created_at.min(timestamp),
                    updated_at: existing.updated_at.max(timestamp),
                }
            }
            None => StoredMessage {
                info,
                created_at: timestamp,
                updated_at: timestamp,
            },
        };

        index::insert(&mut self.messages_by_session, session_id.clone(), message_id.clone());
        let unchanged = self.messages.get(&message_id) == Some(&stored);
        let _ = self.messages.upsert(stored);
        if confirmed || !unchanged {
            changes.push(StoreChange::MessageUpserted {
                session_id,
                message_id,
            });
        }
    }

    fn remove_message_cascade(&mut self, message_id: &MessageId, changes: &mut Vec<StoreChange>) {
        if let Some(part_ids) = self.parts_by_message.remove(message_id) {
            for part_id in &part_ids {
                if self.parts.remove(part_id).is_some() {
                    changes.push(StoreChange::PartRemoved {
                        message_id: message_id.clone(),
                        part_id: part_id.clone(),
                    });
                }
            }
        }

        let _ = self.optimistic.remove(message_id);
        if let Some(message) = self.messages.remove(message_id) {
            let session_id = message.info.session_id;
            let _ = index::remove(&mut self.messages_by_session, &session_id, message_id);
            changes.push(StoreChange::MessageRemoved {
                session_id,
                message_id: message_id.clone(),
            });
        }
    }

    fn rekey_message(
        &mut self,
        from: &MessageId,
        info: MessageInfo,
        timestamp: i64,
        changes: &mut Vec<StoreChange>,
    ) {
        let to = info.id.clone();
        let Some(placeholder) = self.messages.remove(from) else {
            self.upsert_message(info, timestamp, changes);
            return;
        };
        let _ = index::remove(
            &mut self.messages_by_session,
            &placeholder.info.session_id,
            from,
        );
        let _ = self.optimistic.remove(from);
        changes.push(StoreChange::MessageRekeyed {
            session_id: info.session_id.clone(),
            from: from.clone(),
            to: to.clone(),
        });

        if let Some(part_ids) = self.parts_by_message.remove(from) {
            for part_id in &part_ids {
                let Some(part) = self.parts.get_mut(part_id) else {
                    continue;
                };
                part.message_id = to.clone();
                if part.session_id.is_none() {
                    part.session_id = Some(info.session_id.clone());
                }
                index::insert(&mut self.parts_by_message, to.clone(), part_id.clone());
                changes.push(StoreChange::PartUpserted {
                    message_id: to.clone(),
                    part_id: part_id.clone(),
                });
            }
        }

        self.upsert_message(info, timestamp, changes);
        if let Some(canonical) = self.messages.get_mut(&to) {
            canonical.created_at = canonical.created_at.min(placeholder.created_at);
        }
    }

    fn upsert_part(&mut self, part: Part, timestamp: i64, changes: &mut Vec<StoreChange>) {
        if let Some(session_id) = &part.session_id {
            self.touch_session(session_id, timestamp, changes);
        }
        if self.parts.get(&part.id) == Some(&part) {
            return;
        }

        let part_id = part.id.clone();
        let message_id = part.message_id.clone();
        if let Some(existing) = self.parts.get(&part_id) {
            if existing.message_id != message_id {
                let _ = index::remove(&mut self.parts_by_message, &existing.message_id, &part_id);
            }
        }
        index::insert(&mut self.parts_by_message, message_id.clone(), part_id.clone());
        let _ = self.parts.upsert(part);
        changes.push(StoreChange::PartUpserted {
            message_id,
            part_id,
        });
    }

    fn remove_part(&mut self, part_id: &PartId, changes: &mut Vec<StoreChange>) {
        let Some(part) = self.parts.remove(part_id) else {
            return;
        };
        let _ = index::remove(&mut self.parts_by_message, &part.message_id, part_id);
        changes.push(StoreChange::PartRemoved {
            message_id: part.message_id,
            part_id: part_id.clone(),
        });
    }

    fn upsert_permission(
        &mut self,
        request: PermissionRequest,
        timestamp: i64,
        changes: &mut Vec<StoreChange>,
    ) {
        let session_id = request.session_id.clone();
        let request_id = request.id.clone();
        self.touch_session(&session_id, timestamp, changes);
        if self.permissions.upsert(request) {
            changes.push(StoreChange::PermissionUpserted {
                session_id,
                request_id,
            });
        }
    }

    fn remove_permission(&mut self, request_id: &RequestId, changes: &mut Vec<StoreChange>) {
        if let Some(request) = self.permissions.remove(request_id) {
            changes.push(StoreChange::PermissionRemoved {
                session_id: request.session_id,
                request_id: request.id,
            });
        }
    }

    fn upsert_question(
        &mut self,
        request: QuestionRequest,
        timestamp: i64,
        changes: &mut Vec<StoreChange>,
    ) {
        let session_id = request.session_id.clone();
        let request_id = request.id.clone();
        self.touch_session(&session_id, timestamp, changes);
        if self.questions.upsert(request) {
            changes.push(StoreChange::QuestionUpserted {
                session_id,
                request_id,
            });
        }
    }

    fn remove_question(&mut self, request_id: &RequestId, changes: &mut Vec<StoreChange>) {
        if let Some(request) = self.questions.remove(request_id) {
            changes.push(StoreChange::QuestionRemoved {
                session_id: request.session_id,
                request_id: request.id,
            });
        }
    }

    fn insert_optimistic_message(
        &mut self,
        info: MessageInfo,
        parts: Vec<Part>,
        changes: &mut Vec<StoreChange>,
    ) {
        let key = CorrelationKey::for_info(&info);
        let message_id = info.id.clone();
        let created = info.time.created;
        self.upsert_message(info, created, changes);
        let _ = self.optimistic.insert(message_id.clone(), key);
        for mut part in parts {
            // A part the server already streamed is the canonical copy.
            let streamed = self
                .parts
                .get(&part.id)
                .is_some_and(|existing| !self.optimistic.contains_key(&existing.message_id));
            if streamed {
                continue;
            }
            part.message_id = message_id.clone();
            self.upsert_part(part, created, changes);
        }
    }

    fn mark_ready(&mut self, changes: &mut Vec<StoreChange>) {
        if !self.ready {
            self.ready = true;
            changes.push(StoreChange::Ready);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_core::{MessageTime, PartBody, PartKind};

    fn info(id: &str, session: &str, role: Role, created: i64) -> MessageInfo {
        MessageInfo {
            id: MessageId::from(id),
            role,
            session_id: SessionId::from(session),
            time: MessageTime {
                created,
                completed: None,
            },
            parent_id: None,
            model: None,
            provider: None,
        }
    }

    fn text_part(id: &str, message: &str, text: &str) -> Part {
        Part {
            id: PartId::from(id),
            message_id: MessageId::from(message),
            session_id: None,
            body: PartBody::Known(PartKind::Text {
                text: text.into(),
                synthetic: None,
                time: None,
            }),
        }
    }

    #[test]
    fn correlation_requires_same_role_and_parent() {
        let key = CorrelationKey::for_info(&info("opt-1", "s-1", Role::User, 1_000));
        assert_eq!(key.distance(&info("m-1", "s-1", Role::User, 1_500), 1_000), Some(500));
        assert!(key.distance(&info("m-1", "s-1", Role::Assistant, 1_000), 1_000).is_none());
        assert!(key.distance(&info("m-1", "s-2", Role::User, 1_000), 1_000).is_none());
        assert!(key.distance(&info("m-1", "s-1", Role::User, 5_000), 1_000).is_none());

        let mut with_parent = info("m-1", "s-1", Role::User, 1_000);
        with_parent.parent_id = Some(MessageId::from("m-0"));
        assert!(key.distance(&with_parent, 1_000).is_none());
    }

    #[test]
    fn correlation_with_extreme_timestamps_does_not_overflow() {
        let key = CorrelationKey::for_info(&info("opt-1", "s-1", Role::User, 1_000));
        assert!(key.distance(&info("m-1", "s-1", Role::User, i64::MIN), 120_000).is_none());
        assert!(key.distance(&info("m-1", "s-1", Role::User, i64::MIN), i64::MAX).is_none());
        assert_eq!(key.distance(&info("m-1", "s-1", Role::User, -1_000), i64::MAX), Some(2_000));

        let key = CorrelationKey::for_info(&info("opt-1", "s-1", Role::User, -10));
        assert!(key.distance(&info("m-1", "s-1", Role::User, i64::MAX), 120_000).is_none());

        let key = CorrelationKey::for_info(&info("opt-1", "s-1", Role::User, i64::MAX));
        assert_eq!(
            key.distance(&info("m-1", "s-1", Role::User, i64::MIN), i64::MAX),
            None
        );
        assert_eq!(key.distance(&info("m-1", "s-1", Role::User, i64::MAX), 0), Some(0));
    }

    #[test]
    fn negative_window_matches_nothing() {
        let key = CorrelationKey::for_info(&info("opt-1", "s-1", Role::User, 1_000));
        assert!(key.distance(&info("m-1", "s-1", Role::User, 1_000), -1).is_none());
    }

    #[test]
    fn upsert_message_creates_session_and_index() {
        let mut store = DirectoryStore::new();
        let mut changes = Vec::new();
        store.upsert_message(info("m-1", "s-1", Role::User, 10), 10, &mut changes);
        assert!(store.session(&SessionId::from("s-1")).is_some());
        assert_eq!(store.messages_for_session(&SessionId::from("s-1")).len(), 1);
        assert_eq!(
            changes,
            [
                StoreChange::SessionUpserted { session_id: SessionId::from("s-1") },
                StoreChange::MessageUpserted {
                    session_id: SessionId::from("s-1"),
                    message_id: MessageId::from("m-1"),
                },
            ]
        );
    }

    #[test]
    fn repeat_upsert_reports_no_change() {
        let mut store = DirectoryStore::new();
        let mut changes = Vec::new();
        store.upsert_message(info("m-1", "s-1", Role::User, 10), 10, &mut changes);
        changes.clear();
        store.upsert_message(info("m-1", "s-1", Role::User, 10), 10, &mut changes);
        assert!(changes.is_empty());
    }

    #[test]
    fn part_moves_between_messages() {
        let mut store = DirectoryStore::new();
        let mut changes = Vec::new();
        store.upsert_part(text_part("p-1", "m-1", "a"), 1, &mut changes);
        store.upsert_part(text_part("p-1", "m-2", "a"), 2, &mut changes);
        assert!(store.part_ids_for_message(&MessageId::from("m-1")).is_empty());
        assert_eq!(store.part_ids_for_message(&MessageId::from("m-2")).len(), 1);
        assert!(!store.parts_by_message().contains_key(&MessageId::from("m-1")));
    }

    #[test]
    fn message_cascade_removes_parts() {
        let mut store = DirectoryStore::new();
        let mut changes = Vec::new();
        store.upsert_message(info("m-1", "s-1", Role::Assistant, 1), 1, &mut changes);
        store.upsert_part(text_part("p-1", "m-1", "a"), 1, &mut changes);
        store.upsert_part(text_part("p-2", "m-1", "b"), 1, &mut changes);
        store.remove_message_cascade(&MessageId::from("m-1"), &mut changes);
        assert_eq!(store.counts().messages, 0);
        assert_eq!(store.counts().parts, 0);
        assert!(store.messages_by_session().is_empty());
        assert!(store.parts_by_message().is_empty());
    }

    #[test]
    fn session_cascade_removes_everything_it_owns() {
        let mut store = DirectoryStore::new();
        let mut changes = Vec::new();
        let s1 = SessionId::from("s-1");
        store.upsert_message(info("m-1", "s-1", Role::Assistant, 1), 1, &mut changes);
        store.upsert_part(text_part("p-1", "m-1", "a"), 1, &mut changes);
        let mut early = text_part("p-9", "m-9", "early");
        early.session_id = Some(s1.clone());
        store.upsert_part(early, 1, &mut changes);
        store.set_session_status(&s1, SessionStatus::Busy, 1, &mut changes);
        store.upsert_message(info("m-2", "s-2", Role::User, 1), 1, &mut changes);

        store.remove_session_cascade(&s1, &mut changes);

        let counts = store.counts();
        assert_eq!(counts.sessions, 1);
        assert_eq!(counts.messages, 1);
        assert_eq!(counts.parts, 0);
        assert_eq!(counts.statuses, 0);
        assert!(store.session(&SessionId::from("s-2")).is_some());
    }

    #[test]
    fn rekey_moves_parts_to_canonical_id() {
        let mut store = DirectoryStore::new();
        let mut changes = Vec::new();
        store.insert_optimistic_message(
            info("opt-1", "s-1", Role::User, 100),
            vec![text_part("p-1", "ignored", "hi")],
            &mut changes,
        );
        assert_eq!(store.part(&PartId::from("p-1")).unwrap().message_id.as_str(), "opt-1");

        store.rekey_message(
            &MessageId::from("opt-1"),
            info("m-1", "s-1", Role::User, 150),
            200,
            &mut changes,
        );

        assert!(store.message(&MessageId::from("opt-1")).is_none());
        assert!(store.optimistic_key(&MessageId::from("opt-1")).is_none());
        assert!(store.part_ids_for_message(&MessageId::from("opt-1")).is_empty());
        let canonical = store.message_with_parts(&MessageId::from("m-1")).unwrap();
        assert_eq!(canonical.parts.len(), 1);
        assert_eq!(canonical.parts[0].message_id.as_str(), "m-1");
        assert_eq!(canonical.created_at, Some(100));
    }

    #[test]
    fn mark_ready_once() {
        let mut store = DirectoryStore::new();
        let mut changes = Vec::new();
        store.mark_ready(&mut changes);
        store.mark_ready(&mut changes);
        assert_eq!(changes, [StoreChange::Ready]);
        assert!(store.is_ready());
    }

    #[test]
    fn equal_state_serializes_identically() {
        let mut a = DirectoryStore::new();
        let mut b = DirectoryStore::new();
        let mut changes = Vec::new();
        a.upsert_message(info("m-2", "s-1", Role::User, 1), 1, &mut changes);
        a.upsert_message(info("m-1", "s-1", Role::User, 1), 1, &mut changes);
        b.upsert_message(info("m-1", "s-1", Role::User, 1), 1, &mut changes);
        b.upsert_message(info("m-2", "s-1", Role::User, 1), 1, &mut changes);
        assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap()
        );
    }
}
