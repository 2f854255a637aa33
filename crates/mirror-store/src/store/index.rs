//! Secondary index maintenance: owner ID to a sorted list of child IDs.
//!
//! An owner whose list becomes empty is removed from the map, so an index
//! never holds empty lists.

use std::collections::BTreeMap;

use crate::sorted::{Keyed, SortedVec};

/// Secondary index from an owner key to the sorted IDs it owns.
pub type Index<K, V> = BTreeMap<K, SortedVec<V>>;

/// Add `id` under `owner`.
pub fn insert<K, V>(index: &mut Index<K, V>, owner: K, id: V)
where
    K: Ord,
    V: Keyed<Key = V>,
{
    let _ = index.entry(owner).or_default().upsert(id);
}

/// Remove `id` from under `owner`. Returns whether it was listed.
pub fn remove<K, V>(index: &mut Index<K, V>, owner: &K, id: &V) -> bool
where
    K: Ord,
    V: Keyed<Key = V>,
{
    let Some(list) = index.get_mut(owner) else {
        return false;
    };
    let removed = list.remove(id).is_some();
    if list.is_empty() {
        let _ = index.remove(owner);
    }
    removed
}
