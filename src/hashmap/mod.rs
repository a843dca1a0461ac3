//! A hybrid chain/skip-list hashmap.
//!
//! Each bucket starts as a plain singly linked chain threaded through a
//! shared entry arena. A chain that grows past [`HASHMAP_THRESHOLD`] entries
//! is promoted into a private [`SkipList`], trading the chain's O(n) lookup
//! for the skip list's O(log n) at the cost of per-node overhead; a skip
//! list that shrinks back to the threshold is demoted to a chain again. This
//! keeps degenerate, heavily-collided buckets cheap without paying the skip
//! list's overhead on the common, short-chain case.

mod entry;

use std::ptr::NonNull;

use crate::error::{Error, Result};
use crate::hash::{bkdr, HashFn};
use crate::pool::MemoryPool;
use crate::rng::{RandomSource, ThreadRng};
use crate::skiplist::{byte_compare, CompareFn, SkipList, SkipListOptions};
use entry::EntryArena;

/// Lower bound on a map's bucket-array capacity.
pub const HASHMAP_MIN_SIZE: usize = 16;
/// Upper bound on a map's bucket-array capacity.
pub const HASHMAP_MAX_SIZE: usize = 1 << 24;
/// Chain length at which a bucket promotes to a skip list, and the skip-list
/// size at or below which a bucket demotes back to a chain.
pub const HASHMAP_THRESHOLD: usize = 8;

/// An equality test over byte-string keys: `0` means equal, matching
/// [`crate::skiplist::CompareFn`]'s convention. Distinct from the skip list's
/// ordering comparator in name only — promotion reuses the map's `equal_fn`
/// as the ordering comparator for the bucket's skip list, so a custom
/// `equal_fn` must still be a valid total order.
pub type EqualFn = CompareFn;

/// Tunables for a [`HybridMap`].
#[derive(Debug, Clone, Copy)]
pub struct HashMapOptions {
    /// Initial capacity hint; rounded up to a power of two and clamped into
    /// `[HASHMAP_MIN_SIZE, HASHMAP_MAX_SIZE]`.
    pub capacity_hint: usize,
    /// Promotion/demotion threshold (see [`HASHMAP_THRESHOLD`]).
    pub threshold: usize,
    /// Options threaded through to every skip list a promotion creates.
    pub skiplist_options: SkipListOptions,
}

impl Default for HashMapOptions {
    fn default() -> Self {
        HashMapOptions {
            capacity_hint: HASHMAP_MIN_SIZE,
            threshold: HASHMAP_THRESHOLD,
            skiplist_options: SkipListOptions::default(),
        }
    }
}

fn clamp_capacity(hint: usize) -> usize {
    hint.max(1)
        .next_power_of_two()
        .clamp(HASHMAP_MIN_SIZE, HASHMAP_MAX_SIZE)
}

enum Bucket<V, R: RandomSource> {
    Empty,
    /// Index of the chain's head entry in the map's [`EntryArena`].
    List(i32),
    Skip(SkipList<V, R>),
}

/// A hashmap over `Box<[u8]>` keys whose buckets are chains that promote to
/// skip lists under heavy collision.
///
/// Entries live in a typed [`EntryArena`] rather than raw pool bytes (see the
/// crate's `DESIGN.md` binding decision: placing a generic `V` into untyped
/// pool memory needs unsafe placement/drop glue this crate doesn't take on).
/// A caller-supplied [`MemoryPool`] — the map's "primary pool" — is still a
/// first-class, non-owning collaborator: when one is given via
/// [`HybridMap::with_pool`], the map mirrors every bucket-array (re)allocation
/// with a matching-sized request against it, so the pool's page/large-block
/// accounting tracks the map's actual growth the way the reference's
/// `buckets = mpalloc(pool, ...)` call does, even though the bucket array
/// itself is a `Vec` for safety.
pub struct HybridMap<V, R: RandomSource + Default = ThreadRng> {
    entries: EntryArena<V>,
    buckets: Vec<Bucket<V, R>>,
    capacity: usize,
    size: usize,
    threshold: usize,
    hash_fn: HashFn,
    equal_fn: EqualFn,
    skiplist_options: SkipListOptions,
    /// Non-owning handle to a caller-supplied pool. The caller must keep the
    /// pointee alive for at least as long as this map — see
    /// [`HybridMap::with_pool`].
    primary_pool: Option<NonNull<MemoryPool>>,
}

impl<V> HybridMap<V, ThreadRng> {
    /// Creates an empty map with the default capacity, hash function (BKDR),
    /// and byte-equality comparator.
    pub fn new() -> Self {
        Self::with_options(HashMapOptions::default())
    }

    /// Creates an empty map with explicit tunables.
    pub fn with_options(options: HashMapOptions) -> Self {
        Self::with_hash(bkdr, byte_compare, options)
    }
}

impl<V> Default for HybridMap<V, ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, R: RandomSource + Default> HybridMap<V, R> {
    /// Creates an empty map with an explicit hash function, equality
    /// comparator, and tunables. A `None` hash function defaults to
    /// [`bkdr`]; a `None`-equivalent `equal_fn` defaults to
    /// [`byte_compare`].
    pub fn with_hash(hash_fn: HashFn, equal_fn: EqualFn, options: HashMapOptions) -> Self {
        let capacity = clamp_capacity(options.capacity_hint);
        let mut buckets = Vec::with_capacity(capacity);
        buckets.resize_with(capacity, || Bucket::Empty);
        HybridMap {
            entries: EntryArena::new(),
            buckets,
            capacity,
            size: 0,
            threshold: options.threshold.max(1),
            hash_fn,
            equal_fn,
            skiplist_options: options.skiplist_options,
            primary_pool: None,
        }
    }

    /// Creates an empty map backed by a caller-supplied primary pool. The
    /// pool is a non-owning collaborator: the map never frees or clears it,
    /// and `pool` must stay alive for as long as the returned map is used.
    pub fn with_pool(pool: &mut MemoryPool, hash_fn: HashFn, equal_fn: EqualFn, options: HashMapOptions) -> Self {
        let mut map = Self::with_hash(hash_fn, equal_fn, options);
        map.primary_pool = NonNull::new(pool as *mut MemoryPool);
        map.touch_primary_pool();
        map
    }

    /// Mirrors the map's current bucket-array footprint onto the primary
    /// pool, if one was supplied. A no-op in null-pool mode.
    fn touch_primary_pool(&mut self) {
        if let Some(mut pool) = self.primary_pool {
            let bytes = self.capacity * std::mem::size_of::<usize>();
            // SAFETY: `primary_pool` is a non-owning handle; the caller
            // contract in `with_pool` requires the pointee to outlive `self`.
            unsafe { pool.as_mut().allocate(bytes) };
        }
    }

    /// Number of live key/value pairs.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Current bucket-array capacity (always a power of two).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn bucket_index(&self, hash: u32) -> usize {
        (hash as usize) & (self.capacity - 1)
    }

    fn load_max(&self) -> usize {
        // 0.75 load factor, the conventional default for open addressing.
        self.capacity - self.capacity / 4
    }

    /// Returns whether `key` is present.
    pub fn exists(&self, key: &[u8]) -> bool {
        self.try_get(key).is_some()
    }

    /// Returns the value for `key`, or `default` if absent.
    pub fn get<'a>(&'a self, key: &[u8], default: &'a V) -> &'a V {
        self.try_get(key).unwrap_or(default)
    }

    /// Returns the value for `key`, if present.
    pub fn try_get(&self, key: &[u8]) -> Option<&V> {
        let hash = (self.hash_fn)(key);
        let idx = self.bucket_index(hash);
        match &self.buckets[idx] {
            Bucket::Empty => None,
            Bucket::List(head) => {
                let mut curr = *head;
                while curr != -1 {
                    let entry = self.entries.get(curr as u32);
                    if (self.equal_fn)(&entry.key, key) == 0 {
                        return Some(&entry.value);
                    }
                    curr = entry.next;
                }
                None
            }
            Bucket::Skip(list) => list.try_get(key),
        }
    }

    /// Overwrites the value for an existing key. Fails with
    /// [`Error::MissingKey`] if `key` isn't present.
    pub fn set(&mut self, key: &[u8], value: V) -> Result<()> {
        let hash = (self.hash_fn)(key);
        let idx = self.bucket_index(hash);
        match &mut self.buckets[idx] {
            Bucket::Empty => Err(Error::MissingKey),
            Bucket::List(head) => {
                let mut curr = *head;
                while curr != -1 {
                    let entry = self.entries.get(curr as u32);
                    let next = entry.next;
                    if (self.equal_fn)(&entry.key, key) == 0 {
                        self.entries.get_mut(curr as u32).value = value;
                        return Ok(());
                    }
                    curr = next;
                }
                Err(Error::MissingKey)
            }
            Bucket::Skip(list) => list.set(key, value),
        }
    }

    /// Inserts `key` with `value`. On an existing key: overwrites and leaves
    /// `size` unchanged if `update` is `true`, otherwise fails with
    /// [`Error::DuplicateKey`].
    pub fn insert(&mut self, key: impl Into<Box<[u8]>>, value: V, update: bool) -> Result<()> {
        if self.size + 1 > self.load_max() && self.capacity < HASHMAP_MAX_SIZE {
            self.resize(self.capacity * 2)?;
        }
        let key = key.into();
        let hash = (self.hash_fn)(&key);
        let idx = self.bucket_index(hash);
        match &self.buckets[idx] {
            Bucket::Empty => {
                let head = self.entries.alloc(key, value, -1);
                self.buckets[idx] = Bucket::List(head as i32);
                self.size += 1;
                Ok(())
            }
            Bucket::List(head) => {
                let mut curr = *head;
                let mut length = 0usize;
                while curr != -1 {
                    let entry = self.entries.get(curr as u32);
                    if (self.equal_fn)(&entry.key, &key) == 0 {
                        if !update {
                            return Err(Error::DuplicateKey);
                        }
                        self.entries.get_mut(curr as u32).value = value;
                        return Ok(());
                    }
                    length += 1;
                    curr = entry.next;
                }
                if length < self.threshold {
                    let head = *head;
                    let new_head = self.entries.alloc(key, value, head);
                    self.buckets[idx] = Bucket::List(new_head as i32);
                    self.size += 1;
                    Ok(())
                } else {
                    self.promote(idx);
                    let Bucket::Skip(list) = &mut self.buckets[idx] else {
                        unreachable!("promote always leaves a Skip bucket")
                    };
                    let before = list.size();
                    list.insert(key, value, update)?;
                    if list.size() > before {
                        self.size += 1;
                    }
                    tracing::debug!(bucket = idx, capacity = self.capacity, "bucket promoted");
                    Ok(())
                }
            }
            Bucket::Skip(_) => {
                let Bucket::Skip(list) = &mut self.buckets[idx] else {
                    unreachable!()
                };
                let before = list.size();
                list.insert(key, value, update)?;
                if list.size() > before {
                    self.size += 1;
                }
                Ok(())
            }
        }
    }

    /// Removes `key`. A miss against an `Empty` bucket is success (the key
    /// was never present); a miss after scanning a non-empty chain or
    /// delegating into a promoted bucket is [`Error::MissingKey`].
    pub fn remove(&mut self, key: &[u8]) -> Result<()> {
        let hash = (self.hash_fn)(key);
        let idx = self.bucket_index(hash);
        match &mut self.buckets[idx] {
            Bucket::Empty => Ok(()),
            Bucket::List(head) => {
                let mut prev: i32 = -1;
                let mut curr = *head;
                while curr != -1 {
                    let entry = self.entries.get(curr as u32);
                    let next = entry.next;
                    if (self.equal_fn)(&entry.key, key) == 0 {
                        if prev == -1 {
                            self.buckets[idx] = if next == -1 {
                                Bucket::Empty
                            } else {
                                Bucket::List(next)
                            };
                        } else {
                            self.entries.get_mut(prev as u32).next = next;
                        }
                        self.entries.release(curr as u32);
                        self.size -= 1;
                        return Ok(());
                    }
                    prev = curr;
                    curr = next;
                }
                Err(Error::MissingKey)
            }
            Bucket::Skip(list) => {
                list.remove(key)?;
                self.size -= 1;
                if list.size() <= self.threshold {
                    self.demote(idx);
                    tracing::debug!(bucket = idx, "bucket demoted");
                }
                Ok(())
            }
        }
    }

    /// Rebuilds a `List` bucket into a `Skip` bucket once its chain length
    /// exceeds the threshold. Every vacated chain index is returned to the
    /// entry arena's freelist (the reference implementation freed these
    /// inconsistently; this always frees all of them).
    fn promote(&mut self, idx: usize) {
        let head = match self.buckets[idx] {
            Bucket::List(h) => h,
            _ => return,
        };
        let mut list: SkipList<V, R> = SkipList::with_options(self.equal_fn, self.skiplist_options);
        let mut curr = head;
        while curr != -1 {
            let entry = self.entries.take(curr as u32);
            curr = entry.next;
            list.insert(entry.key, entry.value, false)
                .expect("chain keys are unique; promotion cannot collide");
        }
        self.buckets[idx] = Bucket::Skip(list);
    }

    /// Rebuilds a `Skip` bucket into a `List` bucket once its size falls to
    /// the threshold. Size-neutral: the skip list's size is subtracted
    /// before re-inserting so the chain inserts' increments net to zero.
    fn demote(&mut self, idx: usize) {
        let list = match std::mem::replace(&mut self.buckets[idx], Bucket::Empty) {
            Bucket::Skip(list) => list,
            other => {
                self.buckets[idx] = other;
                return;
            }
        };
        let old_size = list.size();
        self.size -= old_size;
        let mut head: i32 = -1;
        for (key, value) in list.drain_ascending() {
            let eidx = self.entries.alloc(key, value, head);
            head = eidx as i32;
            self.size += 1;
        }
        self.buckets[idx] = if head == -1 {
            Bucket::Empty
        } else {
            Bucket::List(head)
        };
    }

    /// Removes every entry without shrinking the bucket array.
    pub fn clear(&mut self) {
        self.entries.clear();
        for bucket in &mut self.buckets {
            *bucket = Bucket::Empty;
        }
        self.size = 0;
    }

    /// Rebuilds the map at `new_capacity` (rounded to a power of two, clamped
    /// into range), re-inserting every live pair. Fails with
    /// [`Error::CapacityOverflow`] if `new_capacity` would drop below the
    /// current `size`; on failure the map is left untouched (strong
    /// guarantee).
    pub fn resize(&mut self, new_capacity: usize) -> Result<()> {
        let new_capacity = clamp_capacity(new_capacity);
        if new_capacity < self.size {
            return Err(Error::CapacityOverflow);
        }
        let mut rebuilt = HybridMap::with_hash(
            self.hash_fn,
            self.equal_fn,
            HashMapOptions {
                capacity_hint: new_capacity,
                threshold: self.threshold,
                skiplist_options: self.skiplist_options,
            },
        );
        rebuilt.primary_pool = self.primary_pool;
        rebuilt.touch_primary_pool();
        self.for_each_owned(|key, value| {
            rebuilt
                .insert(key, value, false)
                .expect("resize target capacity was validated to hold the current size");
        });
        tracing::debug!(old = self.capacity, new = new_capacity, "hashmap resized");
        *self = rebuilt;
        Ok(())
    }

    /// Visits every live pair; within a `List` bucket in chain order
    /// (newest-first, since inserts prepend), within a `Skip` bucket in
    /// ascending key order. No order is promised across buckets.
    pub fn for_each(&self, mut f: impl FnMut(&[u8], &V)) {
        for bucket in &self.buckets {
            match bucket {
                Bucket::Empty => {}
                Bucket::List(head) => {
                    let mut curr = *head;
                    while curr != -1 {
                        let entry = self.entries.get(curr as u32);
                        f(&entry.key, &entry.value);
                        curr = entry.next;
                    }
                }
                Bucket::Skip(list) => list.for_each(|k, v| f(k, v)),
            }
        }
    }

    /// Drains every bucket, handing back owned `(key, value)` pairs. Used
    /// internally by `resize`; empties the map's buckets as a side effect.
    fn for_each_owned(&mut self, mut f: impl FnMut(Box<[u8]>, V)) {
        for bucket in std::mem::take(&mut self.buckets) {
            match bucket {
                Bucket::Empty => {}
                Bucket::List(head) => {
                    let mut curr = head;
                    while curr != -1 {
                        let entry = self.entries.take(curr as u32);
                        curr = entry.next;
                        f(entry.key, entry.value);
                    }
                }
                Bucket::Skip(list) => {
                    for (key, value) in list.drain_ascending() {
                        f(key, value);
                    }
                }
            }
        }
    }
}
