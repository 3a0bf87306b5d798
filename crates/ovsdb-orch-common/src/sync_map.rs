//! Map wrapper that never creates entries implicitly.
//!
//! Caches in this workspace mirror state owned elsewhere (the switch, the
//! device inventory). An entry that appears because a lookup created it
//! would claim existence nobody observed, so `SyncMap` offers only explicit
//! insertion:
//! - `get()` returns `Option<&V>`
//! - `insert()` / `remove()` / `replace_all()` are the only mutators

use std::collections::HashMap;
use std::hash::Hash;

/// A map wrapper whose lookups never create entries.
///
/// # Example
///
/// ```
/// use ovsdb_orch_common::SyncMap;
///
/// let mut map: SyncMap<String, u64> = SyncMap::new();
///
/// assert!(map.get(&"br0".to_string()).is_none());
/// assert!(map.is_empty());
///
/// map.insert("br0".to_string(), 4);
/// assert_eq!(map.get(&"br0".to_string()), Some(&4));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncMap<K, V>
where
    K: Eq + Hash,
{
    inner: HashMap<K, V>,
}

impl<K, V> SyncMap<K, V>
where
    K: Eq + Hash,
{
    /// Creates a new empty map.
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns a reference to the value for the given key.
    ///
    /// **This never creates entries.**
    pub fn get(&self, key: &K) -> Option<&V> {
        self.inner.get(key)
    }

    /// Inserts a key-value pair into the map.
    ///
    /// Returns the old value if the key was already present.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.inner.insert(key, value)
    }

    /// Removes a key from the map.
    ///
    /// Returns the removed value if the key was present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.remove(key)
    }

    /// Clears all entries from the map.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Replaces the whole content with `other` in one step.
    ///
    /// Returns the previous content.
    pub fn replace_all(&mut self, other: SyncMap<K, V>) -> SyncMap<K, V> {
        std::mem::replace(self, other)
    }

    /// Returns an iterator over key-value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.inner.iter()
    }
}

impl<K, V> Default for SyncMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> FromIterator<(K, V)> for SyncMap<K, V>
where
    K: Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}
