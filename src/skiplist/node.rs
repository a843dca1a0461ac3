//! The skip list's node storage.
//!
//! Per the crate's binding decision (see `DESIGN.md`), nodes live in a single
//! owned, index-addressed slab rather than being individually heap-allocated
//! and pointer-linked — this slab is a promoted bucket's private "secondary
//! pool". `forward` entries are `i32` indices into this slab, `-1` meaning
//! "no successor at this level" (mirroring the entry arena's `next` index).

/// A single skip-list node: a key, a value, and its per-level forward links.
pub(crate) struct Node<V> {
    pub key: Box<[u8]>,
    pub value: V,
    pub forward: Vec<i32>,
}

/// The node slab for one skip list. Freed slots are recycled before the slab
/// grows, matching the entry arena's freelist-then-bump discipline.
pub(crate) struct NodeArena<V> {
    slots: Vec<Option<Node<V>>>,
    free: Vec<u32>,
}

impl<V> NodeArena<V> {
    pub fn new() -> Self {
        NodeArena {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn alloc(&mut self, key: Box<[u8]>, value: V, level: usize) -> u32 {
        let node = Node {
            key,
            value,
            forward: vec![-1; level],
        };
        if let Some(idx) = self.free.pop() {
            self.slots[idx as usize] = Some(node);
            idx
        } else {
            let idx = self.slots.len() as u32;
            self.slots.push(Some(node));
            idx
        }
    }

    pub fn get(&self, idx: u32) -> &Node<V> {
        self.slots[idx as usize]
            .as_ref()
            .expect("index into skip-list arena must reference a live node")
    }

    pub fn get_mut(&mut self, idx: u32) -> &mut Node<V> {
        self.slots[idx as usize]
            .as_mut()
            .expect("index into skip-list arena must reference a live node")
    }

    pub fn release(&mut self, idx: u32) {
        self.slots[idx as usize] = None;
        self.free.push(idx);
    }

    /// Takes ownership of the node at `idx`, recycling its slot.
    pub fn take(&mut self, idx: u32) -> Node<V> {
        let node = self.slots[idx as usize]
            .take()
            .expect("index into skip-list arena must reference a live node");
        self.free.push(idx);
        node
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}
