use hybrid_hashmap::pool::{self, MemoryPool, PoolOptions};

#[test]
fn small_allocations_share_pages_and_large_ones_get_their_own_block() {
    let mut pool = MemoryPool::with_options(PoolOptions {
        page_size: 256,
        max_tries: 8,
    });
    for _ in 0..4 {
        assert!(pool.allocate(32).is_some());
    }
    assert_eq!(pool.small_page_count(), 1);

    assert!(pool.allocate(4096).is_some());
    assert_eq!(pool.large_block_count(), 1);
}

#[test]
fn freeing_a_small_allocation_is_a_no_op_but_large_ones_are_reclaimed() {
    let mut pool = MemoryPool::with_options(PoolOptions {
        page_size: 256,
        max_tries: 8,
    });
    let small = pool.allocate(16).unwrap();
    let large = pool.allocate(4096).unwrap();
    assert_eq!(pool.large_block_count(), 1);

    pool.free(small);
    assert_eq!(pool.large_block_count(), 1, "small blocks are never individually reclaimed");

    pool.free(large);
    assert_eq!(pool.large_block_count(), 0);
}

#[test]
fn clear_releases_large_blocks_and_resets_small_pages_for_reuse() {
    let mut pool = MemoryPool::with_options(PoolOptions {
        page_size: 256,
        max_tries: 8,
    });
    for _ in 0..4 {
        pool.allocate(32).unwrap();
    }
    pool.allocate(4096).unwrap();
    assert_eq!(pool.small_page_count(), 1);
    assert_eq!(pool.large_block_count(), 1);

    pool.clear();
    assert_eq!(pool.large_block_count(), 0);
    assert_eq!(pool.small_page_count(), 1, "small pages are kept, just emptied");

    // The cleared page should satisfy a fresh run of small allocations again.
    for _ in 0..4 {
        assert!(pool.allocate(32).is_some());
    }
    assert_eq!(pool.small_page_count(), 1);
}

#[test]
fn null_pool_mode_falls_through_to_the_system_allocator() {
    let ptr = pool::allocate(None, 64).unwrap();
    unsafe { pool::free(None, ptr) };
}

#[test]
fn max_tries_bounds_the_probe_window_before_a_new_page_is_pushed() {
    // Tiny pages plus a small max_tries should force frequent new-page growth
    // once the head pages fill up.
    let mut pool = MemoryPool::with_options(PoolOptions {
        page_size: 64,
        max_tries: 2,
    });
    for _ in 0..20 {
        assert!(pool.allocate(16).is_some());
    }
    assert!(pool.small_page_count() > 1);
}
