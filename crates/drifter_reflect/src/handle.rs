//! Opaque instance handles
//!
//! A handle names one live object in an engine-owned object table without
//! owning it. Handles are generational: when the object is destroyed its slot
//! generation advances, so the old handle stops resolving instead of aliasing
//! whatever object reuses the slot.
//!
//! Holding a handle never keeps an object alive. Using a handle after its
//! object was destroyed is a caller contract violation; the table reports it
//! as "not found" when it can tell, but callers must not rely on that.

use std::fmt;

/// Opaque, fixed-size reference to a live instance
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct InstanceHandle {
    /// Lower 32 bits: slot index, upper 32 bits: generation
    bits: u64,
}

impl InstanceHandle {
    /// Create a handle from slot index and generation
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self {
            bits: (generation as u64) << 32 | index as u64,
        }
    }

    /// A handle that never resolves
    #[inline]
    pub const fn null() -> Self {
        Self { bits: u64::MAX }
    }

    /// Check if this handle is null
    #[inline]
    pub const fn is_null(&self) -> bool {
        self.bits == u64::MAX
    }

    /// Get the slot index
    #[inline]
    pub const fn index(&self) -> u32 {
        self.bits as u32
    }

    /// Get the generation
    #[inline]
    pub const fn generation(&self) -> u32 {
        (self.bits >> 32) as u32
    }

    /// Raw bits, for passing across an embedding boundary
    #[inline]
    pub const fn to_bits(&self) -> u64 {
        self.bits
    }

    /// Rebuild from raw bits
    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self { bits }
    }
}

impl Default for InstanceHandle {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Debug for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "InstanceHandle(null)")
        } else {
            write!(f, "InstanceHandle({}v{})", self.index(), self.generation())
        }
    }
}

/// Hands out slot indices with generation tracking
#[derive(Debug, Default)]
pub(crate) struct SlotAllocator {
    generations: Vec<u32>,
    live: Vec<bool>,
    free_list: Vec<u32>,
}

impl SlotAllocator {
    pub fn allocate(&mut self) -> InstanceHandle {
        if let Some(index) = self.free_list.pop() {
            let slot = index as usize;
            self.live[slot] = true;
            return InstanceHandle::new(index, self.generations[slot]);
        }

        // u32::MAX is reserved so a fresh handle can never equal null()
        let index = u32::try_from(self.generations.len())
            .ok()
            .filter(|i| *i < u32::MAX)
            .unwrap_or_else(|| panic!("instance slots exhausted"));
        self.generations.push(0);
        self.live.push(true);
        InstanceHandle::new(index, 0)
    }

    pub fn free(&mut self, handle: InstanceHandle) -> bool {
        if !self.is_valid(handle) {
            return false;
        }
        let slot = handle.index() as usize;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.live[slot] = false;
        self.free_list.push(handle.index());
        true
    }

    pub fn is_valid(&self, handle: InstanceHandle) -> bool {
        if handle.is_null() {
            return false;
        }
        let slot = handle.index() as usize;
        slot < self.generations.len()
            && self.live[slot]
            && self.generations[slot] == handle.generation()
    }

    pub fn len(&self) -> usize {
        self.generations.len() - self.free_list.len()
    }
}
