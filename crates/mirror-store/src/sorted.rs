//! The one sorted-collection primitive shared by every store collection.
//!
//! [`SortedVec`] keeps its items in ascending key order with at most one item
//! per key. Lookup is a binary search; upsert replaces in place on a hit and
//! splice-inserts at the search position on a miss.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use mirror_core::{
    MessageId, Part, PartId, PermissionRequest, QuestionRequest, RequestId, Session, SessionId,
};

use crate::store::StoredMessage;

/// Something with a primary key.
pub trait Keyed {
    /// Key type; ordering of the collection follows `Ord` on this.
    type Key: Ord + Clone;

    /// The primary key.
    fn key(&self) -> &Self::Key;
}

macro_rules! keyed_by_self {
    ($($id:ty),* $(,)?) => {
        $(
            impl Keyed for $id {
                type Key = $id;
                fn key(&self) -> &$id {
                    self
                }
            }
        )*
    };
}

keyed_by_self!(SessionId, MessageId, PartId, RequestId);

impl Keyed for Session {
    type Key = SessionId;
    fn key(&self) -> &SessionId {
        &self.session_id
    }
}

impl Keyed for StoredMessage {
    type Key = MessageId;
    fn key(&self) -> &MessageId {
        &self.info.id
    }
}

impl Keyed for Part {
    type Key = PartId;
    fn key(&self) -> &PartId {
        &self.id
    }
}

impl Keyed for PermissionRequest {
    type Key = RequestId;
    fn key(&self) -> &RequestId {
        &self.id
    }
}

impl Keyed for QuestionRequest {
    type Key = RequestId;
    fn key(&self) -> &RequestId {
        &self.id
    }
}

/// Vector kept sorted and unique by [`Keyed::key`].
#[derive(Clone, Debug, PartialEq)]
pub struct SortedVec<T> {
    items: Vec<T>,
}

impl<T> Default for SortedVec<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Keyed> SortedVec<T> {
    /// Empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from items in any order. Later items win on duplicate keys.
    pub fn from_unsorted(items: Vec<T>) -> Self {
        let mut sorted = Self::new();
        for item in items {
            let _ = sorted.upsert(item);
        }
        sorted
    }

    fn search(&self, key: &T::Key) -> Result<usize, usize> {
        self.items.binary_search_by(|item| item.key().cmp(key))
    }

    /// Insert or replace. Returns the replaced item, if any.
    pub fn upsert(&mut self, item: T) -> Option<T> {
        match self.search(item.key()) {
            Ok(index) => Some(std::mem::replace(&mut self.items[index], item)),
            Err(index) => {
                self.items.insert(index, item);
                None
            }
        }
    }

    /// Item with `key`.
    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.search(key).ok().map(|index| &self.items[index])
    }

    /// Mutable item with `key`. Callers must not change the key.
    pub fn get_mut(&mut self, key: &T::Key) -> Option<&mut T> {
        self.search(key).ok().map(|index| &mut self.items[index])
    }

    /// Whether an item with `key` exists.
    pub fn contains(&self, key: &T::Key) -> bool {
        self.search(key).is_ok()
    }

    /// Remove and return the item with `key`.
    pub fn remove(&mut self, key: &T::Key) -> Option<T> {
        self.search(key).ok().map(|index| self.items.remove(index))
    }

    /// Remove every item matching `remove`, returning them in key order.
    pub fn extract_if(&mut self, mut remove: impl FnMut(&T) -> bool) -> Vec<T> {
        let (removed, kept): (Vec<T>, Vec<T>) = std::mem::take(&mut self.items)
            .into_iter()
            .partition(|item| remove(item));
        self.items = kept;
        removed
    }

    /// Items in ascending key order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &T::Key> {
        self.items.iter().map(Keyed::key)
    }

    /// Items as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a, T> IntoIterator for &'a SortedVec<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Serialize> Serialize for SortedVec<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'de, T: Keyed + Deserialize<'de>> Deserialize<'de> for SortedVec<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<T>::deserialize(deserializer).map(Self::from_unsorted)
    }
}
