//! Engine-owned instance memory
//!
//! The reflection components never allocate or free instances. They resolve
//! handles through an [`InstanceStore`], which the embedding engine provides.
//! [`ObjectTable`] is the stock store: a generational slot table of
//! [`InstanceBlock`]s.
//!
//! Writes need `&mut` access to the store. The store takes no internal locks;
//! callers that share a store between threads serialize access themselves.

use crate::error::{ReflectError, Result};
use crate::handle::{InstanceHandle, SlotAllocator};
use crate::registry::{TypeDescriptor, TypeRegistry};
use std::collections::BTreeMap;

/// Resolves instance handles to their memory blocks
pub trait InstanceStore {
    /// Get the block for a live handle
    fn block(&self, handle: InstanceHandle) -> Option<&InstanceBlock>;

    /// Get the block for a live handle, mutably
    fn block_mut(&mut self, handle: InstanceHandle) -> Option<&mut InstanceBlock>;
}

/// Memory of one instance: a fixed-size byte region plus engine-owned
/// string bodies keyed by the offset of their layout slot
#[derive(Debug, Clone)]
pub struct InstanceBlock {
    type_name: String,
    bytes: Box<[u8]>,
    strings: BTreeMap<usize, String>,
}

impl InstanceBlock {
    /// Create a zeroed block laid out for a type
    pub fn new(descriptor: &TypeDescriptor) -> Self {
        Self {
            type_name: descriptor.name().to_string(),
            bytes: vec![0u8; descriptor.size()].into_boxed_slice(),
            strings: BTreeMap::new(),
        }
    }

    /// Name of the type this block was created for
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Size of the byte region
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Bounds-checked view of `width` bytes at `offset`
    pub(crate) fn bytes(&self, offset: usize, width: usize) -> Result<&[u8]> {
        let end = self.check_range(offset, width)?;
        Ok(&self.bytes[offset..end])
    }

    /// Bounds-checked mutable view of `width` bytes at `offset`
    pub(crate) fn bytes_mut(&mut self, offset: usize, width: usize) -> Result<&mut [u8]> {
        let end = self.check_range(offset, width)?;
        Ok(&mut self.bytes[offset..end])
    }

    /// String body stored for the slot at `offset` (empty if never set)
    pub(crate) fn string(&self, offset: usize) -> &str {
        self.strings.get(&offset).map(String::as_str).unwrap_or("")
    }

    pub(crate) fn set_string(&mut self, offset: usize, value: String) {
        self.strings.insert(offset, value);
    }

    fn check_range(&self, offset: usize, width: usize) -> Result<usize> {
        let len = self.bytes.len();
        match offset.checked_add(width) {
            Some(end) if end <= len => Ok(end),
            _ => Err(ReflectError::IndexOutOfRange {
                index: offset.saturating_add(width),
                len,
            }),
        }
    }
}

/// Generational table of instance blocks
#[derive(Debug, Default)]
pub struct ObjectTable {
    slots: SlotAllocator,
    blocks: Vec<Option<InstanceBlock>>,
}

impl ObjectTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a zeroed instance of a type
    pub fn create(&mut self, descriptor: &TypeDescriptor) -> InstanceHandle {
        let handle = self.slots.allocate();
        let index = handle.index() as usize;

        if index >= self.blocks.len() {
            self.blocks.resize_with(index + 1, || None);
        }
        self.blocks[index] = Some(InstanceBlock::new(descriptor));

        log::trace!("Created {} instance {:?}", descriptor.name(), handle);
        handle
    }

    /// Create a zeroed instance of a registered type by name
    pub fn create_named(&mut self, registry: &TypeRegistry, type_name: &str) -> Result<InstanceHandle> {
        let descriptor = registry.get_type(type_name)?;
        Ok(self.create(descriptor))
    }

    /// Destroy an instance; its handle stops resolving
    pub fn destroy(&mut self, handle: InstanceHandle) -> bool {
        if !self.slots.free(handle) {
            return false;
        }
        self.blocks[handle.index() as usize] = None;
        true
    }

    /// Check if a handle resolves
    pub fn contains(&self, handle: InstanceHandle) -> bool {
        self.slots.is_valid(handle)
    }

    /// Type name of a live instance
    pub fn type_of(&self, handle: InstanceHandle) -> Option<&str> {
        self.block(handle).map(InstanceBlock::type_name)
    }

    /// Number of live instances
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl InstanceStore for ObjectTable {
    fn block(&self, handle: InstanceHandle) -> Option<&InstanceBlock> {
        if !self.slots.is_valid(handle) {
            return None;
        }
        self.blocks.get(handle.index() as usize)?.as_ref()
    }

    fn block_mut(&mut self, handle: InstanceHandle) -> Option<&mut InstanceBlock> {
        if !self.slots.is_valid(handle) {
            return None;
        }
        self.blocks.get_mut(handle.index() as usize)?.as_mut()
    }
}
