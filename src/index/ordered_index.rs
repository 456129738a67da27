use std::collections::btree_map::{self, BTreeMap};
use std::fmt::Display;
use std::ops::Bound;

use crate::common::{Result, StrataError};

/// Ordered key → value map with strict insert/lookup contracts.
///
/// `put` refuses existing keys, `get`/`remove`/`replace` refuse missing
/// ones. Iteration is in ascending key order.
#[derive(Debug, Clone)]
pub struct OrderedIndex<K, V> {
    map: BTreeMap<K, V>,
}

impl<K: Ord + Display, V> OrderedIndex<K, V> {
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }

    /// Inserts a new key. Fails with `DuplicateKey` if it is present.
    pub fn put(&mut self, key: K, value: V) -> Result<()> {
        match self.map.entry(key) {
            btree_map::Entry::Occupied(occupied) => {
                Err(StrataError::DuplicateKey(occupied.key().to_string()))
            }
            btree_map::Entry::Vacant(vacant) => {
                vacant.insert(value);
                Ok(())
            }
        }
    }

    pub fn get(&self, key: &K) -> Result<&V> {
        self.map
            .get(key)
            .ok_or_else(|| StrataError::KeyNotExist(key.to_string()))
    }

    pub fn get_mut(&mut self, key: &K) -> Result<&mut V> {
        self.map
            .get_mut(key)
            .ok_or_else(|| StrataError::KeyNotExist(key.to_string()))
    }

    /// Removes a key and returns its value.
    pub fn remove(&mut self, key: &K) -> Result<V> {
        self.map
            .remove(key)
            .ok_or_else(|| StrataError::KeyNotExist(key.to_string()))
    }

    /// Overwrites the value of an existing key, returning the old value.
    pub fn replace(&mut self, key: &K, value: V) -> Result<V> {
        let slot = self.get_mut(key)?;
        Ok(std::mem::replace(slot, value))
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Returns the smallest key strictly greater than `after`, or the first
    /// key when `after` is None.
    pub fn next_key(&self, after: Option<&K>) -> Option<&K> {
        let lower = match after {
            Some(key) => Bound::Excluded(key),
            None => Bound::Unbounded,
        };
        self.map
            .range((lower, Bound::Unbounded))
            .next()
            .map(|(k, _)| k)
    }

    /// Iterates `(key, value)` pairs in ascending key order.
    pub fn iter(&self) -> btree_map::Iter<'_, K, V> {
        self.map.iter()
    }

    pub fn keys(&self) -> btree_map::Keys<'_, K, V> {
        self.map.keys()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

impl<K: Ord + Display, V> Default for OrderedIndex<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
