//! A bump-allocating arena with two pools: a small-block freelist of fixed-size
//! pages served by bumping a cursor, and a large-block list of individually
//! freeable oversize allocations.
//!
//! This is a standalone, general-purpose component — it does not know about
//! keys, values, entries, or skip-list nodes. [`crate::hashmap::HybridMap`] and
//! [`crate::skiplist::SkipList`] manage their own generic storage as typed
//! arenas (see the crate's `DESIGN.md`); `MemoryPool` is offered here as a raw
//! byte-arena primitive for callers who want one, e.g. to back their own
//! bulk-reclaimable buffers.

use std::alloc::{Layout, alloc, dealloc};
use std::ptr::NonNull;

/// Tunable knobs for a [`MemoryPool`]. `Default` reproduces the recommended
/// defaults (`PAGE_SIZE = 4096`, `max_tries = 8`).
#[derive(Debug, Clone, Copy)]
pub struct PoolOptions {
    /// Payload capacity of each small-block page.
    pub page_size: usize,
    /// How many small-block pages `allocate` probes before giving up and
    /// pushing a fresh page to the head of the list.
    pub max_tries: usize,
}

impl Default for PoolOptions {
    fn default() -> Self {
        PoolOptions {
            page_size: 4096,
            max_tries: 8,
        }
    }
}

fn align_up(size: usize, align: usize) -> usize {
    (size + (align - 1)) & !(align - 1)
}

struct SmallBlock {
    data: NonNull<u8>,
    layout: Layout,
    used: usize,
    next: Option<Box<SmallBlock>>,
}

struct LargeBlock {
    data: NonNull<u8>,
    layout: Layout,
    next: Option<Box<LargeBlock>>,
}

/// A bump-allocating memory pool. See the module docs for scope.
pub struct MemoryPool {
    options: PoolOptions,
    small: Option<Box<SmallBlock>>,
    large: Option<Box<LargeBlock>>,
}

impl MemoryPool {
    /// Creates a pool with the default options (`PAGE_SIZE = 4096`, `max_tries = 8`).
    pub fn new() -> Self {
        Self::with_options(PoolOptions::default())
    }

    /// Creates a pool with explicit options.
    pub fn with_options(options: PoolOptions) -> Self {
        MemoryPool {
            options,
            small: None,
            large: None,
        }
    }

    /// Allocates `size` bytes, aligned up to a 16-byte multiple. Requests that
    /// fit within a page are served by bumping a small block's cursor; larger
    /// requests get a dedicated, individually-freeable large block. Returns
    /// `None` only if the underlying system allocator fails.
    pub fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
        let aligned = align_up(size.max(1), 16);
        if aligned <= self.options.page_size {
            self.allocate_small(aligned)
        } else {
            self.allocate_large(size)
        }
    }

    fn allocate_small(&mut self, aligned_size: usize) -> Option<NonNull<u8>> {
        let mut tries = 0usize;
        let mut cursor = self.small.as_deref_mut();
        while let Some(block) = cursor {
            if tries >= self.options.max_tries {
                break;
            }
            if block.used + aligned_size <= self.options.page_size {
                // SAFETY: `data` owns `options.page_size` bytes and `used + aligned_size`
                // was just checked to stay within that allocation.
                let ptr = unsafe { NonNull::new_unchecked(block.data.as_ptr().add(block.used)) };
                block.used += aligned_size;
                return Some(ptr);
            }
            tries += 1;
            cursor = block.next.as_deref_mut();
        }

        let layout = Layout::from_size_align(self.options.page_size, 16).ok()?;
        // SAFETY: layout has non-zero size (page_size is never configured to 0 in practice;
        // a zero page_size would make every allocation overflow to the large path instead).
        let raw = unsafe { alloc(layout) };
        let data = NonNull::new(raw)?;
        let new_block = Box::new(SmallBlock {
            data,
            layout,
            used: aligned_size,
            next: self.small.take(),
        });
        let ptr = new_block.data;
        self.small = Some(new_block);
        tracing::trace!(page_size = self.options.page_size, "pool allocated new small page");
        Some(ptr)
    }

    fn allocate_large(&mut self, size: usize) -> Option<NonNull<u8>> {
        let layout = Layout::from_size_align(size.max(1), 16).ok()?;
        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc(layout) };
        let data = NonNull::new(raw)?;
        let new_block = Box::new(LargeBlock {
            data,
            layout,
            next: self.large.take(),
        });
        let ptr = new_block.data;
        self.large = Some(new_block);
        tracing::trace!(size, "pool allocated large block");
        Some(ptr)
    }

    /// Releases `ptr` if it was returned by a large allocation; a no-op
    /// otherwise. Small-block allocations are never individually reclaimed —
    /// they're only released in bulk by `clear`/`drop`.
    pub fn free(&mut self, ptr: NonNull<u8>) {
        let mut current = &mut self.large;
        loop {
            match current.as_mut() {
                Some(block) if block.data == ptr => {
                    let mut owned = current.take().unwrap();
                    *current = owned.next.take();
                    // SAFETY: `owned.layout` is exactly the layout this block was allocated with.
                    unsafe { dealloc(owned.data.as_ptr(), owned.layout) };
                    return;
                }
                Some(block) => current = &mut block.next,
                None => return,
            }
        }
    }

    /// Releases all large blocks and resets every small block's `used` cursor
    /// to zero, allowing the small pages themselves to be reused.
    pub fn clear(&mut self) {
        let mut node = self.large.take();
        while let Some(mut block) = node {
            // SAFETY: see `free`.
            unsafe { dealloc(block.data.as_ptr(), block.layout) };
            node = block.next.take();
        }
        let mut cursor = self.small.as_deref_mut();
        while let Some(block) = cursor {
            block.used = 0;
            cursor = block.next.as_deref_mut();
        }
    }

    /// Number of small-block pages currently held (for tests/diagnostics).
    pub fn small_page_count(&self) -> usize {
        let mut count = 0;
        let mut cursor = self.small.as_deref();
        while let Some(block) = cursor {
            count += 1;
            cursor = block.next.as_deref();
        }
        count
    }

    /// Number of large blocks currently held (for tests/diagnostics).
    pub fn large_block_count(&self) -> usize {
        let mut count = 0;
        let mut cursor = self.large.as_deref();
        while let Some(block) = cursor {
            count += 1;
            cursor = block.next.as_deref();
        }
        count
    }
}

impl Default for MemoryPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MemoryPool {
    fn drop(&mut self) {
        // Iterative teardown: a recursive `Box<Block>` drop chain would blow the
        // stack on a pool with many pages.
        let mut node = self.small.take();
        while let Some(mut block) = node {
            unsafe { dealloc(block.data.as_ptr(), block.layout) };
            node = block.next.take();
        }
        let mut node = self.large.take();
        while let Some(mut block) = node {
            unsafe { dealloc(block.data.as_ptr(), block.layout) };
            node = block.next.take();
        }
    }
}

const STANDALONE_HEADER: usize = std::mem::size_of::<usize>();

/// Allocates directly through the global allocator, bypassing any pool
/// ("null-pool mode"): the size is stashed in a small prefix so
/// [`free_standalone`] can recover the layout without the caller tracking it.
pub fn allocate_standalone(size: usize) -> Option<NonNull<u8>> {
    let layout = Layout::from_size_align(STANDALONE_HEADER + size.max(1), 16).ok()?;
    // SAFETY: layout has non-zero size.
    let raw = unsafe { alloc(layout) };
    let raw = NonNull::new(raw)?;
    // SAFETY: `raw` owns `STANDALONE_HEADER + size` freshly allocated bytes, large
    // enough to hold the `usize` header we write here.
    unsafe { raw.as_ptr().cast::<usize>().write(size) };
    // SAFETY: offsetting past the header stays within the same allocation.
    NonNull::new(unsafe { raw.as_ptr().add(STANDALONE_HEADER) })
}

/// Releases a pointer returned by [`allocate_standalone`].
///
/// # Safety
/// `ptr` must have been returned by [`allocate_standalone`] and not already freed.
pub unsafe fn free_standalone(ptr: NonNull<u8>) {
    unsafe {
        let raw = ptr.as_ptr().sub(STANDALONE_HEADER);
        let size = raw.cast::<usize>().read();
        let layout = Layout::from_size_align(STANDALONE_HEADER + size.max(1), 16).unwrap();
        dealloc(raw, layout);
    }
}

/// Allocates `size` bytes through `pool` if present, else falls through to the
/// system allocator via [`allocate_standalone`] (null-pool mode), making pools
/// an optional layer rather than a hard dependency.
pub fn allocate(pool: Option<&mut MemoryPool>, size: usize) -> Option<NonNull<u8>> {
    match pool {
        Some(pool) => pool.allocate(size),
        None => allocate_standalone(size),
    }
}

/// Frees `ptr` through `pool` if present, else via [`free_standalone`].
///
/// # Safety
/// If `pool` is `None`, `ptr` must have been returned by [`allocate`] called
/// with `pool: None` (or directly via [`allocate_standalone`]), and not
/// already freed.
pub unsafe fn free(pool: Option<&mut MemoryPool>, ptr: NonNull<u8>) {
    match pool {
        Some(pool) => pool.free(ptr),
        None => unsafe { free_standalone(ptr) },
    }
}
