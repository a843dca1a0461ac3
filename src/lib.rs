//! # Hybrid hashmap
//!
//! A chain-of-buckets hashmap whose individual buckets promote themselves to
//! skip lists under heavy collision, backed by a bump-allocating memory pool
//! for the small, short-lived allocations the C reference this is ported
//! from would otherwise hand to `malloc`.
//!
//! ## Core idea
//! Most buckets stay short chains, which are cheap to scan and cheap to
//! allocate. A bucket that grows past [`hashmap::HASHMAP_THRESHOLD`] entries
//! is rebuilt as a private skip list instead, trading a few words of
//! per-node overhead for logarithmic lookup once a bucket's collisions make
//! linear scanning the bottleneck; a skip list that shrinks back down is
//! demoted to a chain again.

pub mod error;
pub mod hash;
pub mod hashmap;
pub mod pool;
pub mod rng;
pub mod skiplist;

pub use error::{Error, Result};
pub use hashmap::{HashMapOptions, HybridMap};
pub use pool::{MemoryPool, PoolOptions};
pub use skiplist::{SkipList, SkipListOptions};
