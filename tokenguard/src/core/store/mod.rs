//! Fixed-capacity keyed store with least-recently-used eviction
//!
//! [`LruStore`] keeps per-key state in memory and never holds more than its
//! configured number of entries. It knows nothing about rate limiting; it only
//! tracks which entry was touched least recently and drops that one when a
//! new key needs room.
//!
//! The store itself is not synchronised. The [`RateLimiter`](crate::RateLimiter)
//! wraps it in a mutex so that a lookup and the insert that may follow it happen
//! in one critical section.

use crate::core::ConfigError;
use std::borrow::Borrow;
use std::hash::Hash;
use std::mem;

#[cfg(feature = "ahash")]
use ahash::AHashMap as HashMap;
#[cfg(not(feature = "ahash"))]
use std::collections::HashMap;


/// A slot in the recency list. Links are indices into `LruStore::slots`.
struct Slot<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Bounded map ordered by recency of use
///
/// Both [`get`](LruStore::get) and [`put`](LruStore::put) run in O(1): a hash
/// index maps each key to a slot, and the slots form a doubly linked list
/// from most recently used (head) to least recently used (tail).
///
/// Slots are never freed individually. Once the store is full, an insert of a
/// new key reuses the tail slot in place, so the slot vector never grows past
/// `capacity`.
///
/// # Example
///
/// ```
/// use tokenguard::LruStore;
///
/// let mut store = LruStore::new(3).unwrap();
/// store.put("u1", 1);
/// store.put("u2", 2);
/// store.put("u3", 3);
///
/// // Touching u1 makes u2 the oldest entry
/// assert_eq!(store.get("u1"), Some(&1));
///
/// let evicted = store.put("u4", 4);
/// assert_eq!(evicted, Some(("u2", 2)));
/// assert_eq!(store.keys().copied().collect::<Vec<_>>(), vec!["u4", "u1", "u3"]);
/// ```
pub struct LruStore<K, V> {
    capacity: usize,
    index: HashMap<K, usize>,
    slots: Vec<Slot<K, V>>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<K, V> LruStore<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create an empty store holding at most `capacity` entries
    ///
    /// # Errors
    ///
    /// [`ConfigError::CacheCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::CacheCapacity);
        }

        Ok(LruStore {
            capacity,
            index: HashMap::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            head: None,
            tail: None,
        })
    }

    /// Look up `key` and mark it as the most recently used entry
    ///
    /// A miss has no side effects.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.index.get(key)?;
        self.promote(idx);
        Some(&self.slots[idx].value)
    }

    /// Look up `key` without touching its recency
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.get(key).map(|&idx| &self.slots[idx].value)
    }

    /// Whether `key` is present, without touching its recency
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(key)
    }

    /// Insert or overwrite `key` and mark it as the most recently used entry
    ///
    /// If `key` is new and the store is full, the least recently used entry is
    /// evicted first and returned. Nothing is returned when an existing key is
    /// overwritten; the previous value is dropped.
    pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(&idx) = self.index.get(&key) {
            self.slots[idx].value = value;
            self.promote(idx);
            return None;
        }

        match self.tail {
            Some(idx) if self.slots.len() >= self.capacity => {
                // Recycle the least recently used slot
                self.unlink(idx);
                let slot = &mut self.slots[idx];
                let old_key = mem::replace(&mut slot.key, key.clone());
                let old_value = mem::replace(&mut slot.value, value);
                self.index.remove(&old_key);
                self.index.insert(key, idx);
                self.push_front(idx);
                Some((old_key, old_value))
            }
            _ => {
                let idx = self.slots.len();
                self.slots.push(Slot {
                    key: key.clone(),
                    value,
                    prev: None,
                    next: None,
                });
                self.index.insert(key, idx);
                self.push_front(idx);
                None
            }
        }
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.head = None;
        self.tail = None;
    }

    /// Number of entries currently held
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Maximum number of entries, fixed at construction
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries from most to least recently used
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: &self.slots,
            cursor: self.head,
        }
    }

    /// Keys from most to least recently used
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    fn promote(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.push_front(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);

        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }

        self.slots[idx].prev = None;
        self.slots[idx].next = None;
    }

    fn push_front(&mut self, idx: usize) {
        self.slots[idx].prev = None;
        self.slots[idx].next = self.head;

        if let Some(h) = self.head {
            self.slots[h].prev = Some(idx);
        }
        self.head = Some(idx);

        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    /// Walks the list and the index and checks they agree
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        assert!(self.slots.len() <= self.capacity);
        assert_eq!(self.index.len(), self.slots.len());

        let mut seen = 0;
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let slot = &self.slots[idx];
            assert_eq!(slot.prev, prev, "broken back link at slot {idx}");
            assert_eq!(self.index.get(&slot.key), Some(&idx));
            seen += 1;
            prev = cursor;
            cursor = slot.next;
        }
        assert_eq!(prev, self.tail);
        assert_eq!(seen, self.slots.len());
    }
}

/// Iterator over an [`LruStore`] in recency order
pub struct Iter<'a, K, V> {
    slots: &'a [Slot<K, V>],
    cursor: Option<usize>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let slot = &self.slots[self.cursor?];
        self.cursor = slot.next;
        Some((&slot.key, &slot.value))
    }
}
