//! Active and dormant storage tiers

use std::collections::HashMap;
use std::hash::Hash;

use super::frequency::FrequencyIndex;
use super::types::Entry;

/// Bounded region; access counts live in its [`FrequencyIndex`]
pub struct ActiveRegion<K: Hash + Eq + Clone, V> {
    capacity: usize,
    entries: HashMap<K, V>,
    frequencies: FrequencyIndex<K>,
}

impl<K: Hash + Eq + Clone, V> ActiveRegion<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            frequencies: FrequencyIndex::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert a new key at frequency 0
    pub fn insert(&mut self, key: K, value: V) -> bool {
        self.insert_entry(key, Entry::new(value))
    }

    /// Insert an entry keeping its counter.
    ///
    /// Returns false, leaving the region untouched, when the key is present
    /// or the region is full.
    pub fn insert_entry(&mut self, key: K, entry: Entry<V>) -> bool {
        if self.is_full() || self.entries.contains_key(&key) {
            return false;
        }
        self.frequencies.insert(key.clone(), entry.frequency);
        self.entries.insert(key, entry.value);
        true
    }

    /// Counted access: bumps the key's frequency
    pub fn lookup(&mut self, key: &K) -> Option<&V> {
        self.frequencies.increment(key)?;
        self.entries.get(key)
    }

    /// Uncounted access
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn frequency(&self, key: &K) -> Option<u64> {
        self.frequencies.frequency(key)
    }

    /// Overwrite the value and bump the frequency; false if absent
    pub fn update_value(&mut self, key: &K, value: V) -> bool {
        match self.entries.get_mut(key) {
            Some(slot) => {
                *slot = value;
                self.frequencies.increment(key);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<Entry<V>> {
        let value = self.entries.remove(key)?;
        let frequency = self.frequencies.remove(key).unwrap_or_default();
        Some(Entry::with_frequency(value, frequency))
    }

    /// Coldest key and its count
    pub fn coldest(&self) -> Option<(&K, u64)> {
        self.frequencies.peek_minimum()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.frequencies.clear();
    }
}

/// Unbounded overflow region
pub struct DormantRegion<K: Hash + Eq, V> {
    entries: HashMap<K, Entry<V>>,
}

impl<K: Hash + Eq, V> DormantRegion<K, V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert a new key at frequency 0; false if present
    pub fn insert(&mut self, key: K, value: V) -> bool {
        self.insert_entry(key, Entry::new(value))
    }

    pub fn insert_entry(&mut self, key: K, entry: Entry<V>) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, entry);
        true
    }

    /// Counted access: bumps the key's frequency
    pub fn lookup(&mut self, key: &K) -> Option<&Entry<V>> {
        let entry = self.entries.get_mut(key)?;
        entry.frequency = entry.frequency.saturating_add(1);
        Some(entry)
    }

    /// Uncounted access
    pub fn peek(&self, key: &K) -> Option<&Entry<V>> {
        self.entries.get(key)
    }

    /// Overwrite the value and bump the frequency; false if absent
    pub fn update_value(&mut self, key: &K, value: V) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.value = value;
                entry.frequency = entry.frequency.saturating_add(1);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<Entry<V>> {
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<K: Hash + Eq, V> Default for DormantRegion<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
