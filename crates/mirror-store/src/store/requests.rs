//! Transient request tables (permissions and questions).
//!
//! Both kinds share one shape: a primary collection keyed by request ID, a
//! per-session ID index, and a per-session `pending_order` list recording
//! arrival order. A request leaves all three when it is answered.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use mirror_core::{PermissionRequest, QuestionRequest, RequestId, SessionId};

use super::index;
use crate::sorted::{Keyed, SortedVec};

/// A request owned by one session and answered at most once.
pub trait PendingRequest: Keyed<Key = RequestId> + Clone + PartialEq {
    /// Owning session.
    fn session_id(&self) -> &SessionId;
}

impl PendingRequest for PermissionRequest {
    fn session_id(&self) -> &SessionId {
        &self.session_id
    }
}

impl PendingRequest for QuestionRequest {
    fn session_id(&self) -> &SessionId {
        &self.session_id
    }
}

/// Requests of one kind with their session index and arrival order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    bound(deserialize = "T: Keyed + Deserialize<'de>")
)]
pub struct RequestTable<T> {
    items: SortedVec<T>,
    by_session: BTreeMap<SessionId, SortedVec<RequestId>>,
    pending_order: BTreeMap<SessionId, Vec<RequestId>>,
}

impl<T> Default for RequestTable<T> {
    fn default() -> Self {
        Self {
            items: SortedVec::default(),
            by_session: BTreeMap::new(),
            pending_order: BTreeMap::new(),
        }
    }
}

impl<T: PendingRequest> RequestTable<T> {
    /// Request by ID.
    pub fn get(&self, id: &RequestId) -> Option<&T> {
        self.items.get(id)
    }

    /// All requests in ID order.
    pub fn all(&self) -> &[T] {
        self.items.as_slice()
    }

    /// Requests of one session in ID order.
    pub fn for_session(&self, session_id: &SessionId) -> Vec<&T> {
        self.by_session
            .get(session_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.items.get(id))
            .collect()
    }

    /// Pending request IDs of one session in arrival order.
    pub fn pending(&self, session_id: &SessionId) -> &[RequestId] {
        self.pending_order
            .get(session_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of requests.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn by_session(&self) -> &BTreeMap<SessionId, SortedVec<RequestId>> {
        &self.by_session
    }

    pub(crate) fn pending_order(&self) -> &BTreeMap<SessionId, Vec<RequestId>> {
        &self.pending_order
    }

    /// Insert or replace. Returns whether anything changed.
    pub(crate) fn upsert(&mut self, request: T) -> bool {
        let id = request.key().clone();
        let session_id = request.session_id().clone();

        if let Some(existing) = self.items.get(&id) {
            if *existing == request {
                return false;
            }
            if existing.session_id() != &session_id {
                let previous_session = existing.session_id().clone();
                let _ = index::remove(&mut self.by_session, &previous_session, &id);
                remove_pending(&mut self.pending_order, &previous_session, &id);
            }
        }

        index::insert(&mut self.by_session, session_id.clone(), id.clone());
        let pending = self.pending_order.entry(session_id).or_default();
        if !pending.contains(&id) {
            pending.push(id);
        }
        let _ = self.items.upsert(request);
        true
    }

    /// Remove a request from the table, its index, and the pending list.
    pub(crate) fn remove(&mut self, id: &RequestId) -> Option<T> {
        let request = self.items.remove(id)?;
        let session_id = request.session_id().clone();
        let _ = index::remove(&mut self.by_session, &session_id, id);
        remove_pending(&mut self.pending_order, &session_id, id);
        Some(request)
    }

    /// Remove every request of one session.
    pub(crate) fn remove_session(&mut self, session_id: &SessionId) -> Vec<T> {
        let _ = self.pending_order.remove(session_id);
        let Some(ids) = self.by_session.remove(session_id) else {
            return Vec::new();
        };
        ids.iter().filter_map(|id| self.items.remove(id)).collect()
    }
}

fn remove_pending(
    pending_order: &mut BTreeMap<SessionId, Vec<RequestId>>,
    session_id: &SessionId,
    id: &RequestId,
) {
    if let Some(list) = pending_order.get_mut(session_id) {
        list.retain(|pending| pending != id);
        if list.is_empty() {
            let _ = pending_order.remove(session_id);
        }
    }
}
