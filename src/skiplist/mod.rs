//! A probabilistic skip list keyed by opaque byte strings.
//!
//! This is both a free-standing ordered structure and the promoted form of a
//! [`crate::hashmap::HybridMap`] bucket: a chain that has grown past
//! [`crate::hashmap::HASHMAP_THRESHOLD`] entries is replaced by one of these so
//! that lookups in a degenerate bucket stay logarithmic instead of linear.
//!
//! Level assignment is geometric with `p = 0.5`, capped at
//! [`SkipListOptions::max_level`]; ties are disallowed, so `insert` with
//! `update = false` against an existing key is an error rather than a second
//! entry.

mod node;

use crate::error::{Error, Result};
use crate::rng::{RandomSource, ThreadRng, RAND_MAX};
use node::NodeArena;

/// A three-way comparator over byte-string keys, `memcmp`-style: negative if
/// `a < b`, zero if equal, positive if `a > b`.
pub type CompareFn = fn(&[u8], &[u8]) -> i32;

/// The default comparator: plain lexicographic byte ordering.
pub fn byte_compare(a: &[u8], b: &[u8]) -> i32 {
    a.cmp(b) as i32
}

/// Tunables for a [`SkipList`], mirroring the reference's `SKIPLIST_MAX_LEVEL`.
#[derive(Debug, Clone, Copy)]
pub struct SkipListOptions {
    /// Hard cap on the number of forward-pointer levels a node may carry.
    pub max_level: usize,
}

impl Default for SkipListOptions {
    fn default() -> Self {
        SkipListOptions { max_level: 32 }
    }
}

/// An ordered map over `Box<[u8]>` keys, backed by a probabilistic skip list.
pub struct SkipList<V, R: RandomSource = ThreadRng> {
    arena: NodeArena<V>,
    /// Forward pointers out of the virtual head, one per level; `-1` is "none".
    head: Vec<i32>,
    /// Highest level currently in use by any node (always >= 1 once non-empty,
    /// and left at 1 when empty).
    level: usize,
    size: usize,
    max_level: usize,
    compare: CompareFn,
    rng: R,
}

impl<V> SkipList<V, ThreadRng> {
    /// Creates an empty skip list using the default comparator and RNG.
    pub fn new() -> Self {
        Self::with_options(byte_compare, SkipListOptions::default())
    }

    /// Creates an empty skip list with an explicit comparator.
    pub fn with_compare(compare: CompareFn) -> Self {
        Self::with_options(compare, SkipListOptions::default())
    }
}

impl<V> Default for SkipList<V, ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, R: RandomSource> SkipList<V, R> {
    /// Creates an empty skip list with an explicit comparator and options,
    /// using the default `RandomSource`.
    pub fn with_options(compare: CompareFn, options: SkipListOptions) -> Self
    where
        R: Default,
    {
        SkipList {
            arena: NodeArena::new(),
            head: vec![-1; options.max_level.max(1)],
            level: 1,
            size: 0,
            max_level: options.max_level.max(1),
            compare,
            rng: R::default(),
        }
    }

    /// Creates an empty skip list with an injected random source, for
    /// reproducible tests and benchmarks.
    pub fn with_rng(compare: CompareFn, options: SkipListOptions, rng: R) -> Self {
        SkipList {
            arena: NodeArena::new(),
            head: vec![-1; options.max_level.max(1)],
            level: 1,
            size: 0,
            max_level: options.max_level.max(1),
            compare,
            rng,
        }
    }

    /// Number of keys currently stored.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Highest level presently in use (`1` for an empty list).
    pub fn level(&self) -> usize {
        self.level
    }

    fn forward_at(&self, prev: Option<u32>, lv: usize) -> i32 {
        match prev {
            None => self.head[lv],
            Some(idx) => self.arena.get(idx).forward[lv],
        }
    }

    /// Locates `key`, returning the predecessor chain (`updates[lv] = -1`
    /// meaning "the virtual head") alongside the matching node's index, if any.
    fn search(&self, key: &[u8]) -> (Vec<i32>, Option<u32>) {
        let mut updates = vec![-1i32; self.max_level];
        let mut prev: Option<u32> = None;
        for lv in (0..self.level).rev() {
            loop {
                let next = self.forward_at(prev, lv);
                if next == -1 {
                    break;
                }
                let node = self.arena.get(next as u32);
                if (self.compare)(&node.key, key) < 0 {
                    prev = Some(next as u32);
                } else {
                    break;
                }
            }
            updates[lv] = prev.map(|i| i as i32).unwrap_or(-1);
        }
        let curr = self.forward_at(prev, 0);
        let found = curr != -1 && (self.compare)(&self.arena.get(curr as u32).key, key) == 0;
        (updates, if found { Some(curr as u32) } else { None })
    }

    /// A lighter-weight lookup for callers that don't need the predecessor
    /// chain (`get`, `set`, `exists`).
    fn find(&self, key: &[u8]) -> Option<u32> {
        let mut prev: Option<u32> = None;
        for lv in (0..self.level).rev() {
            loop {
                let next = self.forward_at(prev, lv);
                if next == -1 {
                    break;
                }
                let node = self.arena.get(next as u32);
                if (self.compare)(&node.key, key) < 0 {
                    prev = Some(next as u32);
                } else {
                    break;
                }
            }
        }
        let curr = self.forward_at(prev, 0);
        if curr != -1 && (self.compare)(&self.arena.get(curr as u32).key, key) == 0 {
            Some(curr as u32)
        } else {
            None
        }
    }

    fn random_level(&mut self) -> usize {
        let mut lv = 1;
        while lv < self.max_level && self.rng.next_u32() < RAND_MAX / 2 {
            lv += 1;
        }
        lv
    }

    /// Returns whether `key` is present.
    pub fn exists(&self, key: &[u8]) -> bool {
        self.find(key).is_some()
    }

    /// Returns the value for `key`, or `default` if absent.
    pub fn get<'a>(&'a self, key: &[u8], default: &'a V) -> &'a V {
        match self.find(key) {
            Some(idx) => &self.arena.get(idx).value,
            None => default,
        }
    }

    /// Returns the value for `key`, if present.
    pub fn try_get(&self, key: &[u8]) -> Option<&V> {
        self.find(key).map(|idx| &self.arena.get(idx).value)
    }

    /// Overwrites the value for an existing key. Fails with
    /// [`Error::MissingKey`] if `key` isn't present — unlike `insert`, `set`
    /// never creates a new entry.
    pub fn set(&mut self, key: &[u8], value: V) -> Result<()> {
        match self.find(key) {
            Some(idx) => {
                self.arena.get_mut(idx).value = value;
                Ok(())
            }
            None => Err(Error::MissingKey),
        }
    }

    /// Inserts `key` with `value`. If `key` already exists: overwrites the
    /// value and leaves `size` unchanged when `update` is `true`, otherwise
    /// fails with [`Error::DuplicateKey]`. A pure update never bumps `size`,
    /// even though it touches an existing node.
    pub fn insert(&mut self, key: impl Into<Box<[u8]>>, value: V, update: bool) -> Result<()> {
        let key = key.into();
        let (updates, found) = self.search(&key);
        if let Some(idx) = found {
            if !update {
                return Err(Error::DuplicateKey);
            }
            self.arena.get_mut(idx).value = value;
            return Ok(());
        }

        let level = self.random_level();
        if level > self.level {
            self.level = level;
        }
        let idx = self.arena.alloc(key, value, level);
        for lv in 0..level {
            let prev = updates[lv];
            let next = self.forward_at(if prev == -1 { None } else { Some(prev as u32) }, lv);
            self.arena.get_mut(idx).forward[lv] = next;
            if prev == -1 {
                self.head[lv] = idx as i32;
            } else {
                self.arena.get_mut(prev as u32).forward[lv] = idx as i32;
            }
        }
        self.size += 1;
        tracing::trace!(size = self.size, level, "skiplist insert");
        Ok(())
    }

    /// Removes `key`. Fails with [`Error::MissingKey`] if absent.
    pub fn remove(&mut self, key: &[u8]) -> Result<()> {
        let (updates, found) = self.search(key);
        let idx = found.ok_or(Error::MissingKey)?;
        let node_level = self.arena.get(idx).forward.len();
        for lv in 0..node_level {
            let prev = updates[lv];
            let next = self.arena.get(idx).forward[lv];
            if prev == -1 {
                self.head[lv] = next;
            } else {
                self.arena.get_mut(prev as u32).forward[lv] = next;
            }
        }
        self.arena.release(idx);
        self.size -= 1;
        while self.level > 1 && self.head[self.level - 1] == -1 {
            self.level -= 1;
        }
        tracing::trace!(size = self.size, "skiplist remove");
        Ok(())
    }

    /// Removes every entry, dropping all nodes and resetting the level to 1.
    pub fn clear(&mut self) {
        self.arena.clear();
        for slot in &mut self.head {
            *slot = -1;
        }
        self.level = 1;
        self.size = 0;
    }

    /// Visits every entry in ascending key order.
    pub fn for_each(&self, mut f: impl FnMut(&[u8], &V)) {
        let mut curr = self.head[0];
        while curr != -1 {
            let node = self.arena.get(curr as u32);
            f(&node.key, &node.value);
            curr = node.forward[0];
        }
    }

    /// Consumes the list, handing back every `(key, value)` pair in ascending
    /// key order. Used by [`crate::hashmap::HybridMap`] when demoting a
    /// promoted bucket back into a chain.
    pub fn drain_ascending(mut self) -> Vec<(Box<[u8]>, V)> {
        let mut out = Vec::with_capacity(self.size);
        let mut curr = self.head[0];
        while curr != -1 {
            let node = self.arena.take(curr as u32);
            curr = node.forward[0];
            out.push((node.key, node.value));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::Lcg;

    fn list() -> SkipList<i32, Lcg> {
        SkipList::with_rng(byte_compare, SkipListOptions::default(), Lcg::new(7))
    }

    #[test]
    fn insert_get_exists_roundtrip() {
        let mut list = list();
        list.insert(b"alpha".to_vec().into_boxed_slice(), 1, true).unwrap();
        list.insert(b"beta".to_vec().into_boxed_slice(), 2, true).unwrap();
        assert!(list.exists(b"alpha"));
        assert_eq!(list.try_get(b"beta"), Some(&2));
        assert_eq!(list.get(b"missing", &-1), &-1);
        assert_eq!(list.size(), 2);
    }

    #[test]
    fn insert_without_update_rejects_duplicate() {
        let mut list = list();
        list.insert(b"k".to_vec().into_boxed_slice(), 1, true).unwrap();
        let err = list.insert(b"k".to_vec().into_boxed_slice(), 2, false).unwrap_err();
        assert_eq!(err, Error::DuplicateKey);
        assert_eq!(list.try_get(b"k"), Some(&1));
    }

    #[test]
    fn pure_update_does_not_grow_size() {
        let mut list = list();
        list.insert(b"k".to_vec().into_boxed_slice(), 1, true).unwrap();
        assert_eq!(list.size(), 1);
        list.insert(b"k".to_vec().into_boxed_slice(), 2, true).unwrap();
        assert_eq!(list.size(), 1);
        assert_eq!(list.try_get(b"k"), Some(&2));
    }

    #[test]
    fn set_requires_existing_key() {
        let mut list = list();
        assert_eq!(list.set(b"k", 1).unwrap_err(), Error::MissingKey);
        list.insert(b"k".to_vec().into_boxed_slice(), 1, true).unwrap();
        list.set(b"k", 9).unwrap();
        assert_eq!(list.try_get(b"k"), Some(&9));
    }

    #[test]
    fn remove_unlinks_and_shrinks_level() {
        let mut list = list();
        for k in [b"a", b"b", b"c", b"d"] {
            list.insert(k.to_vec().into_boxed_slice(), 0, true).unwrap();
        }
        assert_eq!(list.remove(b"missing").unwrap_err(), Error::MissingKey);
        list.remove(b"b").unwrap();
        assert!(!list.exists(b"b"));
        assert_eq!(list.size(), 3);
    }

    #[test]
    fn for_each_visits_in_ascending_order() {
        let mut list = list();
        for k in [b"delta", b"alpha", b"charlie", b"bravo"] {
            list.insert(k.to_vec().into_boxed_slice(), 0, true).unwrap();
        }
        let mut seen = Vec::new();
        list.for_each(|k, _| seen.push(k.to_vec()));
        assert_eq!(
            seen,
            vec![b"alpha".to_vec(), b"bravo".to_vec(), b"charlie".to_vec(), b"delta".to_vec()]
        );
    }

    #[test]
    fn clear_resets_to_empty() {
        let mut list = list();
        for k in [b"a", b"b", b"c"] {
            list.insert(k.to_vec().into_boxed_slice(), 0, true).unwrap();
        }
        list.clear();
        assert_eq!(list.size(), 0);
        assert_eq!(list.level(), 1);
        assert!(!list.exists(b"a"));
    }

    #[test]
    fn many_insertions_stay_ordered_and_findable() {
        let mut list = list();
        let mut keys: Vec<Vec<u8>> = (0..500).map(|i| format!("key-{i:04}").into_bytes()).collect();
        for k in &keys {
            list.insert(k.clone().into_boxed_slice(), 0, true).unwrap();
        }
        assert_eq!(list.size(), 500);
        keys.sort();
        let mut seen = Vec::new();
        list.for_each(|k, _| seen.push(k.to_vec()));
        assert_eq!(seen, keys);
    }
}
