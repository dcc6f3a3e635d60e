//! Generational handle allocator over densely packed storage.
//!
//! [`HandlePool`] stores elements in a packed `Vec` (cache-friendly
//! iteration, O(1) swap-remove) and hands out [`Handle`]s instead of
//! pointers or indices. Each slot carries a generation that is bumped when
//! the slot is freed, so a stale handle is deterministically detectable
//! rather than silently aliasing whatever reused the slot.
//!
//! # Example
//!
//! ```
//! use vermilion_core::HandlePool;
//!
//! let mut pool: HandlePool<i32> = HandlePool::new();
//! let h1 = pool.add(42);
//! assert_eq!(*pool.get(h1), 42);
//!
//! pool.release(h1);
//! let h2 = pool.add(7); // reuses the slot with a new generation
//! assert_eq!(h2.index(), h1.index());
//! assert!(!pool.valid(h1));
//! assert_eq!(*pool.get(h2), 7);
//! ```
//!
//! The pool is single-threaded; callers needing cross-thread access wrap it
//! in their own lock.

use crate::handle::Handle;

/// One entry of the slot table.
#[derive(Clone, Copy)]
struct Slot {
    /// Dense index of the live element while the slot is occupied, or the
    /// free-list "next slot" link while it is free.
    index: u64,
    /// Live generation; handles issued with an older generation are stale.
    generation: u64,
}

/// A slot-based object pool returning stable, generation-checked handles.
///
/// Three parallel structures are maintained:
///
/// - `slots`: slot → `{dense index, generation}`
/// - `slot_of_element`: dense position → owning slot (for O(1) swap-remove)
/// - `elements`: the dense packed storage of `T`
///
/// A FIFO free list threads through unused slot entries so freed slot
/// numbers are reused (oldest first) before the slot table grows.
///
/// # Invariants
///
/// - `elements.len() == slot_of_element.len()`
/// - for every live slot `s`: `slot_of_element[slots[s].index] == s`
/// - a released handle never validates again, even after slot reuse
///
/// Validity failures are programmer errors: [`get`](Self::get) and
/// [`release`](Self::release) assert, while [`valid`](Self::valid) is the
/// non-asserting check for callers that cannot otherwise prove lifetime.
pub struct HandlePool<T, const INDEX_BITS: u32 = 32, const GENERATION_BITS: u32 = 16> {
    slots: Vec<Slot>,
    slot_of_element: Vec<u64>,
    elements: Vec<T>,
    free_head: u64,
    free_tail: u64,
}

impl<T, const INDEX_BITS: u32, const GENERATION_BITS: u32>
    HandlePool<T, INDEX_BITS, GENERATION_BITS>
{
    const NO_SLOT: u64 = Handle::<T, INDEX_BITS, GENERATION_BITS>::INVALID_INDEX;

    /// Creates a new empty pool.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            slot_of_element: Vec::new(),
            elements: Vec::new(),
            free_head: Self::NO_SLOT,
            free_tail: Self::NO_SLOT,
        }
    }

    /// Creates a pool with storage preallocated for `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            slot_of_element: Vec::with_capacity(capacity),
            elements: Vec::with_capacity(capacity),
            free_head: Self::NO_SLOT,
            free_tail: Self::NO_SLOT,
        }
    }

    /// Adds an element and returns a handle to it.
    ///
    /// Reuses the oldest freed slot if any exist, otherwise grows the slot
    /// table. Other live handles are unaffected.
    pub fn add(&mut self, value: T) -> Handle<T, INDEX_BITS, GENERATION_BITS> {
        let slot = self.acquire_slot();
        let dense = self.elements.len() as u64;
        self.elements.push(value);
        self.slot_of_element.push(slot);
        self.slots[slot as usize].index = dense;
        Handle::new(slot, self.slots[slot as usize].generation)
    }

    /// Adds `count` copies of `value`, returning one handle per element.
    ///
    /// Bulk form of [`add`](Self::add) for homogeneous allocations (e.g.
    /// per-frame batch records). No handle aliases another, within or
    /// across calls.
    pub fn add_n(&mut self, count: usize, value: T) -> Vec<Handle<T, INDEX_BITS, GENERATION_BITS>>
    where
        T: Clone,
    {
        self.elements.reserve(count);
        self.slot_of_element.reserve(count);
        let mut handles = Vec::with_capacity(count);
        for _ in 0..count {
            handles.push(self.add(value.clone()));
        }
        handles
    }

    /// Returns `true` if `handle` refers to a live element: index in range
    /// and generation matching the slot's live generation.
    pub fn valid(&self, handle: Handle<T, INDEX_BITS, GENERATION_BITS>) -> bool {
        let slot = handle.index();
        slot != Self::NO_SLOT
            && (slot as usize) < self.slots.len()
            && self.slots[slot as usize].generation == handle.generation()
    }

    /// Returns a reference to the element behind `handle`.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or invalid. Check [`valid`](Self::valid)
    /// first when the handle's lifetime is not otherwise guaranteed.
    pub fn get(&self, handle: Handle<T, INDEX_BITS, GENERATION_BITS>) -> &T {
        assert!(self.valid(handle), "HandlePool::get with stale handle {handle:?}");
        &self.elements[self.slots[handle.index() as usize].index as usize]
    }

    /// Returns a mutable reference to the element behind `handle`.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or invalid.
    pub fn get_mut(&mut self, handle: Handle<T, INDEX_BITS, GENERATION_BITS>) -> &mut T {
        assert!(self.valid(handle), "HandlePool::get_mut with stale handle {handle:?}");
        &mut self.elements[self.slots[handle.index() as usize].index as usize]
    }

    /// Releases the element behind `handle`, invalidating every outstanding
    /// handle to it.
    ///
    /// The dense storage is compacted by swap-remove: the last element moves
    /// into the freed position and its slot mapping is fixed up, so other
    /// live handles keep their identity (though element storage relocates).
    /// The freed slot index joins the free list for reuse.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or invalid.
    pub fn release(&mut self, handle: Handle<T, INDEX_BITS, GENERATION_BITS>) {
        assert!(self.valid(handle), "HandlePool::release with stale handle {handle:?}");
        let slot = handle.index() as usize;
        let dense = self.slots[slot].index as usize;

        self.elements.swap_remove(dense);
        self.slot_of_element.swap_remove(dense);
        if dense < self.elements.len() {
            // Fix the moved element's slot → dense mapping.
            let moved_slot = self.slot_of_element[dense] as usize;
            self.slots[moved_slot].index = dense as u64;
        }

        let mask = Handle::<T, INDEX_BITS, GENERATION_BITS>::GENERATION_MASK;
        self.slots[slot].generation = self.slots[slot].generation.wrapping_add(1) & mask;
        self.enqueue_free(slot as u64);
    }

    /// Returns the number of live elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if the pool holds no live elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterates over the dense element storage.
    ///
    /// Order is unspecified and changes across [`release`](Self::release).
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.elements.iter()
    }

    /// Mutable iteration over the dense element storage.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.elements.iter_mut()
    }

    /// Pops the oldest free slot, or grows the slot table.
    fn acquire_slot(&mut self) -> u64 {
        if self.free_head != Self::NO_SLOT {
            let slot = self.free_head;
            self.free_head = self.slots[slot as usize].index;
            if self.free_head == Self::NO_SLOT {
                self.free_tail = Self::NO_SLOT;
            }
            slot
        } else {
            let slot = self.slots.len() as u64;
            assert!(slot < Self::NO_SLOT, "HandlePool slot index space exhausted");
            self.slots.push(Slot {
                index: 0,
                generation: 0,
            });
            slot
        }
    }

    /// Appends a freed slot to the free-list tail (FIFO reuse order).
    fn enqueue_free(&mut self, slot: u64) {
        self.slots[slot as usize].index = Self::NO_SLOT;
        if self.free_tail == Self::NO_SLOT {
            self.free_head = slot;
        } else {
            self.slots[self.free_tail as usize].index = slot;
        }
        self.free_tail = slot;
    }
}

impl<T, const I: u32, const G: u32> Default for HandlePool<T, I, G> {
    fn default() -> Self {
        Self::new()
    }
}
