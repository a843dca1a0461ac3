//! Chain-bucket entry storage, shared across every `List` bucket in a map.
//!
//! Mirrors [`crate::skiplist::node`]'s slab, but links entries with a plain
//! `next` index instead of per-level forward pointers, since a chain bucket
//! is a singly linked list. New entries consume freelist slots before the
//! slab grows.

pub(crate) struct Entry<V> {
    pub key: Box<[u8]>,
    pub value: V,
    pub next: i32,
}

pub(crate) struct EntryArena<V> {
    slots: Vec<Option<Entry<V>>>,
    free: Vec<u32>,
}

impl<V> EntryArena<V> {
    pub fn new() -> Self {
        EntryArena {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn alloc(&mut self, key: Box<[u8]>, value: V, next: i32) -> u32 {
        let entry = Entry { key, value, next };
        if let Some(idx) = self.free.pop() {
            self.slots[idx as usize] = Some(entry);
            idx
        } else {
            let idx = self.slots.len() as u32;
            self.slots.push(Some(entry));
            idx
        }
    }

    pub fn get(&self, idx: u32) -> &Entry<V> {
        self.slots[idx as usize]
            .as_ref()
            .expect("index into entry arena must reference a live entry")
    }

    pub fn get_mut(&mut self, idx: u32) -> &mut Entry<V> {
        self.slots[idx as usize]
            .as_mut()
            .expect("index into entry arena must reference a live entry")
    }

    pub fn release(&mut self, idx: u32) {
        self.slots[idx as usize] = None;
        self.free.push(idx);
    }

    /// Takes ownership of the entry at `idx`, recycling its slot.
    pub fn take(&mut self, idx: u32) -> Entry<V> {
        let entry = self.slots[idx as usize]
            .take()
            .expect("index into entry arena must reference a live entry");
        self.free.push(idx);
        entry
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}
