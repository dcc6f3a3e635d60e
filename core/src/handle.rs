use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// A packed, generation-checked reference to an element in a
/// [`HandlePool`](crate::HandlePool).
///
/// Layout (low to high bits of a `u64`):
///
/// - **index** (`INDEX_BITS` wide): slot number in the owning pool
/// - **generation** (`GENERATION_BITS` wide): bumped every time the slot is
///   freed, so a handle to a recycled slot is detectably stale instead of
///   silently aliasing the new occupant
/// - **extra** (remaining bits): spare payload bits, free for the caller
///
/// # Identity
///
/// Two handles are equal if they have the same `(index, generation)`.
/// Extra bits are caller payload and do **not** affect equality or hashing.
///
/// # Example
///
/// ```
/// use vermilion_core::{Handle, HandlePool};
///
/// let mut pool: HandlePool<u32> = HandlePool::new();
/// let h = pool.add(7);
/// assert_eq!(h.generation(), 0);
/// assert_ne!(h.index(), Handle::<u32>::INVALID_INDEX);
/// ```
pub struct Handle<T, const INDEX_BITS: u32 = 32, const GENERATION_BITS: u32 = 16> {
    bits: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T, const INDEX_BITS: u32, const GENERATION_BITS: u32> Handle<T, INDEX_BITS, GENERATION_BITS> {
    /// Compile-time layout check. Forced on every construction.
    const LAYOUT_OK: () = assert!(
        INDEX_BITS > 0 && GENERATION_BITS > 0 && INDEX_BITS + GENERATION_BITS <= 64,
        "Handle bit fields must be non-empty and fit in 64 bits"
    );

    /// Mask covering the index field.
    pub const INDEX_MASK: u64 = (1u64 << INDEX_BITS) - 1;
    /// Mask covering the generation field (before shifting).
    pub const GENERATION_MASK: u64 = (1u64 << GENERATION_BITS) - 1;
    /// Number of spare payload bits above index and generation.
    pub const EXTRA_BITS: u32 = 64 - INDEX_BITS - GENERATION_BITS;
    /// Sentinel index meaning "no slot" (all-ones of the index field).
    pub const INVALID_INDEX: u64 = Self::INDEX_MASK;

    const EXTRA_SHIFT: u32 = INDEX_BITS + GENERATION_BITS;

    /// Packs a handle from a slot index and generation. Extra bits start at 0.
    pub(crate) fn new(index: u64, generation: u64) -> Self {
        #[allow(clippy::let_unit_value)]
        let _ = Self::LAYOUT_OK;
        debug_assert!(index <= Self::INDEX_MASK);
        debug_assert!(generation <= Self::GENERATION_MASK);
        Self {
            bits: index | (generation << INDEX_BITS),
            _marker: PhantomData,
        }
    }

    /// Returns the sentinel handle that refers to no slot.
    pub fn invalid() -> Self {
        Self::new(Self::INVALID_INDEX, 0)
    }

    /// Returns the slot index of this handle.
    pub fn index(&self) -> u64 {
        self.bits & Self::INDEX_MASK
    }

    /// Returns the generation this handle was issued with.
    pub fn generation(&self) -> u64 {
        (self.bits >> INDEX_BITS) & Self::GENERATION_MASK
    }

    /// Returns the spare payload bits.
    pub fn extra(&self) -> u64 {
        self.bits >> Self::EXTRA_SHIFT
    }

    /// Overwrites the spare payload bits. Index and generation are untouched.
    pub fn set_extra(&mut self, extra: u64) {
        debug_assert!(extra < (1u64 << Self::EXTRA_BITS));
        let identity = self.bits & (Self::INDEX_MASK | (Self::GENERATION_MASK << INDEX_BITS));
        self.bits = identity | (extra << Self::EXTRA_SHIFT);
    }

    /// Returns `true` if this is the "no slot" sentinel.
    pub fn is_invalid(&self) -> bool {
        self.index() == Self::INVALID_INDEX
    }

    /// Returns the raw packed bits.
    pub fn bits(&self) -> u64 {
        self.bits
    }

    /// Rebuilds a handle from raw packed bits.
    ///
    /// Validity against any particular pool is not implied; check with
    /// [`HandlePool::valid`](crate::HandlePool::valid) before dereferencing.
    pub fn from_bits(bits: u64) -> Self {
        #[allow(clippy::let_unit_value)]
        let _ = Self::LAYOUT_OK;
        Self {
            bits,
            _marker: PhantomData,
        }
    }

    /// The identity portion of the packed bits: index and generation only.
    fn identity_bits(&self) -> u64 {
        self.bits & (Self::INDEX_MASK | (Self::GENERATION_MASK << INDEX_BITS))
    }
}

impl<T, const I: u32, const G: u32> Clone for Handle<T, I, G> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, const I: u32, const G: u32> Copy for Handle<T, I, G> {}

impl<T, const I: u32, const G: u32> PartialEq for Handle<T, I, G> {
    fn eq(&self, other: &Self) -> bool {
        self.identity_bits() == other.identity_bits()
    }
}

impl<T, const I: u32, const G: u32> Eq for Handle<T, I, G> {}

impl<T, const I: u32, const G: u32> Hash for Handle<T, I, G> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity_bits().hash(state);
    }
}

impl<T, const I: u32, const G: u32> std::fmt::Debug for Handle<T, I, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_invalid() {
            write!(f, "Handle(invalid)")
        } else {
            write!(f, "Handle({}@{})", self.index(), self.generation())
        }
    }
}
