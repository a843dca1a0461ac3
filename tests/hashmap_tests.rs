use hybrid_hashmap::hashmap::{HashMapOptions, HybridMap};
use hybrid_hashmap::pool::MemoryPool;
use hybrid_hashmap::skiplist::byte_compare;
use hybrid_hashmap::rng::Lcg;
use hybrid_hashmap::Error;

fn k(s: &str) -> Box<[u8]> {
    s.as_bytes().to_vec().into_boxed_slice()
}

/// Sends every key starting with '0'..'3' to bucket 0 and everything else to
/// bucket 1, to force one bucket to cross the promotion/demotion threshold
/// while the other stays a plain chain.
fn two_bucket_hash(bytes: &[u8]) -> u32 {
    match bytes.first() {
        Some(b'0'..=b'3') => 0,
        _ => 1,
    }
}

#[test]
fn scenario_1_promotion_and_demotion_by_bucket_population() {
    let mut m: HybridMap<i32, Lcg> = HybridMap::with_hash(
        two_bucket_hash,
        byte_compare,
        HashMapOptions {
            capacity_hint: 16,
            ..HashMapOptions::default()
        },
    );

    let groups = ["0", "1", "2", "3"];
    let letters = ["A", "B", "C", "D"];
    let mut n = 0;
    for g in groups {
        for l in letters {
            m.insert(k(&format!("{g}{l}")), n, true).unwrap();
            n += 1;
        }
    }
    for l in letters {
        m.insert(k(&format!("4{l}")), n, true).unwrap();
        n += 1;
    }
    assert_eq!(m.size(), 20);

    let mut bucket0 = 0;
    let mut bucket1 = 0;
    m.for_each(|key, _| {
        if two_bucket_hash(key) == 0 {
            bucket0 += 1;
        } else {
            bucket1 += 1;
        }
    });
    assert_eq!(bucket0, 16);
    assert_eq!(bucket1, 4);

    // Remove 9 of the 16 keys in the '0'..'3' group; bucket 0's skip list
    // should demote back to a chain once its count reaches the threshold.
    let mut removed = 0;
    'outer: for g in groups {
        for l in letters {
            if removed == 9 {
                break 'outer;
            }
            m.remove(format!("{g}{l}").as_bytes()).unwrap();
            removed += 1;
        }
    }
    let mut remaining_bucket0 = 0;
    m.for_each(|key, _| {
        if two_bucket_hash(key) == 0 {
            remaining_bucket0 += 1;
        }
    });
    // 16 - 9 removed; the count crossed the threshold (8) partway through,
    // which is where the bucket should demote back to a chain.
    assert_eq!(remaining_bucket0, 16 - 9);
}

#[test]
fn scenario_2_duplicate_vs_update_semantics() {
    let mut m: HybridMap<&str> = HybridMap::new();
    m.insert(k("k1"), "v1", true).unwrap();
    assert_eq!(m.insert(k("k1"), "v2", false).unwrap_err(), Error::DuplicateKey);
    assert_eq!(m.try_get(b"k1"), Some(&"v1"));

    m.insert(k("k1"), "v2", true).unwrap();
    assert_eq!(m.try_get(b"k1"), Some(&"v2"));
    assert_eq!(m.size(), 1);
}

#[test]
fn scenario_4_resize_preserves_contents_and_rejects_too_small_a_target() {
    let mut m: HybridMap<i32> = HybridMap::new();
    for i in 0..20 {
        m.insert(k(&format!("item{i}")), i, true).unwrap();
    }
    m.resize(32).unwrap();
    assert_eq!(m.capacity(), 32);
    for i in 0..20 {
        assert_eq!(m.try_get(format!("item{i}").as_bytes()), Some(&i));
    }
    assert_eq!(m.resize(4).unwrap_err(), Error::CapacityOverflow);
}

#[test]
fn scenario_6_default_bkdr_hash_and_byte_equality() {
    let mut m: HybridMap<i32> = HybridMap::new();
    m.insert(k("hello"), 1, true).unwrap();
    m.insert(k("world"), 2, true).unwrap();
    assert_eq!(m.get(b"hello", &0), &1);
    assert_eq!(m.get(b"world", &0), &2);
    assert_eq!(m.get(b"missing", &-1), &-1);
}

fn single_bucket_hash(_: &[u8]) -> u32 {
    0
}

#[test]
fn remove_on_empty_bucket_is_success_remove_on_scanned_miss_is_an_error() {
    let mut m: HybridMap<i32> = HybridMap::new();
    assert!(m.remove(b"never-inserted").is_ok());

    let mut m: HybridMap<i32, Lcg> =
        HybridMap::with_hash(single_bucket_hash, byte_compare, HashMapOptions::default());
    m.insert(k("present"), 1, true).unwrap();
    assert_eq!(m.remove(b"absent").unwrap_err(), Error::MissingKey);
}

#[test]
fn size_accounting_matches_sum_of_bucket_contents_after_mixed_workload() {
    let mut m: HybridMap<i32, Lcg> = HybridMap::with_hash(
        hybrid_hashmap::hash::bkdr,
        byte_compare,
        HashMapOptions::default(),
    );
    for i in 0..300 {
        m.insert(k(&format!("key-{i}")), i, true).unwrap();
    }
    for i in (0..300).step_by(3) {
        m.remove(format!("key-{i}").as_bytes()).unwrap();
    }
    let mut counted = 0;
    m.for_each(|_, _| counted += 1);
    assert_eq!(counted, m.size());
    assert_eq!(m.size(), 300 - (0..300).step_by(3).count());
}

#[test]
fn scenario_5_primary_pool_tracks_map_growth_and_is_left_intact_on_drop() {
    let mut pool = MemoryPool::new();
    {
        let mut m: HybridMap<i32> =
            HybridMap::with_pool(&mut pool, hybrid_hashmap::hash::bkdr, byte_compare, HashMapOptions::default());
        for i in 0..200 {
            m.insert(k(&format!("pooled-{i}")), i, true).unwrap();
        }
        assert_eq!(m.size(), 200);
        // The map resized at least once under this load, and every resize
        // mirrors a matching allocation onto the primary pool.
        assert!(pool.small_page_count() + pool.large_block_count() > 1);
    }
    // The map borrowed the pool non-owningly; dropping the map must not
    // touch it. The pool is still usable afterwards, and its own `clear`
    // is the only thing that releases what it is still holding.
    let small_pages = pool.small_page_count();
    pool.clear();
    assert_eq!(pool.large_block_count(), 0, "clear releases every large block");
    assert_eq!(pool.small_page_count(), small_pages, "clear keeps small pages, just resets them");
}
