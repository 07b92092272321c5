//! Frequency Index for the active region
//!
//! Keys are grouped into buckets by access count. Each bucket is an intrusive
//! doubly-linked list of slots (newest at the head, oldest at the tail), so the
//! coldest key is always the tail of the lowest bucket:
//!
//! ```text
//! min_frequency = 0
//!       │
//!       ▼
//! freq=0: head ──► [c] ◄──► [a] ◄── tail   (a inserted first, picked first)
//! freq=3: head ──► [b] ◄── tail
//! ```
//!
//! `increment` and `peek_minimum` never scan; the lowest bucket is tracked
//! directly and only re-read from the ordered bucket map when a removal
//! empties it.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

struct Node<K> {
    key: K,
    frequency: u64,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Clone, Copy)]
struct Bucket {
    head: usize,
    tail: usize,
}

/// Per-key access counters with O(1) minimum lookup
pub struct FrequencyIndex<K: Hash + Eq + Clone> {
    slots: HashMap<K, usize>,
    nodes: Vec<Option<Node<K>>>,
    free: Vec<usize>,
    buckets: BTreeMap<u64, Bucket>,
    min_frequency: Option<u64>,
}

impl<K: Hash + Eq + Clone> FrequencyIndex<K> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: HashMap::with_capacity(capacity),
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
            buckets: BTreeMap::new(),
            min_frequency: None,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Current access count of a tracked key
    pub fn frequency(&self, key: &K) -> Option<u64> {
        let slot = *self.slots.get(key)?;
        self.node(slot).map(|node| node.frequency)
    }

    /// Start tracking `key` at `frequency`, as the newest member of its bucket.
    ///
    /// Returns false if the key is already tracked.
    pub fn insert(&mut self, key: K, frequency: u64) -> bool {
        if self.slots.contains_key(&key) {
            return false;
        }

        let node = Node {
            key: key.clone(),
            frequency,
            prev: None,
            next: None,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                slot
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.slots.insert(key, slot);
        self.push_front(frequency, slot);

        self.min_frequency = Some(self.min_frequency.map_or(frequency, |m| m.min(frequency)));
        true
    }

    /// Move `key` from bucket `f` to bucket `f + 1`; returns the new count.
    pub fn increment(&mut self, key: &K) -> Option<u64> {
        let slot = *self.slots.get(key)?;
        let current = self.node(slot)?.frequency;
        let next = current.saturating_add(1);
        if next == current {
            return Some(current);
        }

        let emptied = self.unlink(current, slot);
        if let Some(node) = self.node_mut(slot) {
            node.frequency = next;
        }
        self.push_front(next, slot);

        if emptied && self.min_frequency == Some(current) {
            self.min_frequency = Some(next);
        }

        Some(next)
    }

    /// Stop tracking `key`; returns its last access count.
    pub fn remove(&mut self, key: &K) -> Option<u64> {
        let slot = self.slots.remove(key)?;
        let frequency = self.node(slot)?.frequency;

        let emptied = self.unlink(frequency, slot);
        self.nodes[slot] = None;
        self.free.push(slot);

        if emptied && self.min_frequency == Some(frequency) {
            self.min_frequency = self.buckets.keys().next().copied();
        }

        Some(frequency)
    }

    /// Key with the smallest count; the oldest member of the bucket on ties.
    pub fn peek_minimum(&self) -> Option<(&K, u64)> {
        let frequency = self.min_frequency?;
        let bucket = self.buckets.get(&frequency)?;
        self.node(bucket.tail).map(|node| (&node.key, node.frequency))
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.nodes.clear();
        self.free.clear();
        self.buckets.clear();
        self.min_frequency = None;
    }

    fn node(&self, slot: usize) -> Option<&Node<K>> {
        self.nodes.get(slot).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, slot: usize) -> Option<&mut Node<K>> {
        self.nodes.get_mut(slot).and_then(Option::as_mut)
    }

    fn push_front(&mut self, frequency: u64, slot: usize) {
        match self.buckets.get_mut(&frequency) {
            Some(bucket) => {
                let old_head = std::mem::replace(&mut bucket.head, slot);
                if let Some(head) = self.node_mut(old_head) {
                    head.prev = Some(slot);
                }
                if let Some(node) = self.node_mut(slot) {
                    node.prev = None;
                    node.next = Some(old_head);
                }
            }
            None => {
                self.buckets.insert(
                    frequency,
                    Bucket {
                        head: slot,
                        tail: slot,
                    },
                );
                if let Some(node) = self.node_mut(slot) {
                    node.prev = None;
                    node.next = None;
                }
            }
        }
    }

    /// Detach `slot` from its bucket list; true if the bucket became empty.
    fn unlink(&mut self, frequency: u64, slot: usize) -> bool {
        let (prev, next) = match self.node(slot) {
            Some(node) => (node.prev, node.next),
            None => return false,
        };

        if let Some(p) = prev.and_then(|p| self.node_mut(p)) {
            p.next = next;
        }
        if let Some(n) = next.and_then(|n| self.node_mut(n)) {
            n.prev = prev;
        }

        let emptied = match self.buckets.get_mut(&frequency) {
            Some(bucket) => {
                if let (None, Some(n)) = (prev, next) {
                    bucket.head = n;
                }
                if let (Some(p), None) = (prev, next) {
                    bucket.tail = p;
                }
                prev.is_none() && next.is_none()
            }
            None => false,
        };

        if emptied {
            self.buckets.remove(&frequency);
        }
        if let Some(node) = self.node_mut(slot) {
            node.prev = None;
            node.next = None;
        }

        emptied
    }
}

impl<K: Hash + Eq + Clone> Default for FrequencyIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek_minimum_empty() {
        let index: FrequencyIndex<&str> = FrequencyIndex::new();
        assert!(index.peek_minimum().is_none());
        assert!(index.is_empty());
    }

    #[test]
    fn test_ties_pick_oldest() {
        let mut index = FrequencyIndex::new();
        index.insert("a", 0);
        index.insert("b", 0);
        index.insert("c", 0);

        assert_eq!(index.peek_minimum(), Some((&"a", 0)));

        index.increment(&"a");
        assert_eq!(index.peek_minimum(), Some((&"b", 0)));
    }

    #[test]
    fn test_increment_moves_minimum() {
        let mut index = FrequencyIndex::new();
        index.insert("a", 0);

        assert_eq!(index.increment(&"a"), Some(1));
        assert_eq!(index.increment(&"a"), Some(2));
        assert_eq!(index.peek_minimum(), Some((&"a", 2)));
        assert_eq!(index.increment(&"missing"), None);
    }

    #[test]
    fn test_remove_recomputes_minimum() {
        let mut index = FrequencyIndex::new();
        index.insert("a", 0);
        index.insert("b", 5);
        index.insert("c", 9);

        assert_eq!(index.remove(&"a"), Some(0));
        assert_eq!(index.peek_minimum(), Some((&"b", 5)));

        assert_eq!(index.remove(&"b"), Some(5));
        assert_eq!(index.peek_minimum(), Some((&"c", 9)));

        assert_eq!(index.remove(&"c"), Some(9));
        assert!(index.peek_minimum().is_none());
        assert_eq!(index.remove(&"c"), None);
    }

    #[test]
    fn test_remove_middle_of_bucket() {
        let mut index = FrequencyIndex::new();
        index.insert("a", 1);
        index.insert("b", 1);
        index.insert("c", 1);

        index.remove(&"b");
        assert_eq!(index.peek_minimum(), Some((&"a", 1)));
        index.remove(&"a");
        assert_eq!(index.peek_minimum(), Some((&"c", 1)));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_insert_with_preserved_frequency() {
        let mut index = FrequencyIndex::new();
        index.insert("hot", 7);
        index.insert("warm", 3);

        assert_eq!(index.peek_minimum(), Some((&"warm", 3)));
        assert!(!index.insert("warm", 0));
        assert_eq!(index.frequency(&"warm"), Some(3));
    }

    #[test]
    fn test_slot_reuse_after_remove() {
        let mut index = FrequencyIndex::new();
        for i in 0..10 {
            index.insert(i, 0);
        }
        for i in 0..10 {
            index.remove(&i);
        }
        for i in 10..20 {
            index.insert(i, 0);
        }

        assert_eq!(index.len(), 10);
        assert_eq!(index.nodes.len(), 10);
        assert_eq!(index.peek_minimum(), Some((&10, 0)));
    }

    #[test]
    fn test_clear() {
        let mut index = FrequencyIndex::new();
        index.insert("a", 0);
        index.increment(&"a");
        index.clear();

        assert!(index.is_empty());
        assert!(index.peek_minimum().is_none());
        assert_eq!(index.frequency(&"a"), None);
    }
}
