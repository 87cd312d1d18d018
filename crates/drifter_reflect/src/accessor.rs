//! Typed field access on instances
//!
//! The accessor is the only place where raw instance bytes turn into typed
//! values. Every call resolves the field through the registry, checks the
//! caller's tag against the declared one, checks that the handle's instance
//! was created for the named type, and bounds-checks the byte range before
//! touching memory.

use crate::error::{ReflectError, Result};
use crate::handle::InstanceHandle;
use crate::instance::{InstanceBlock, InstanceStore};
use crate::property::{PropertyType, PropertyValue, Reflected};
use crate::registry::{FieldDescriptor, TypeRegistry};

/// Reads and writes single fields through the registry
#[derive(Debug, Clone, Copy)]
pub struct FieldAccessor<'r> {
    registry: &'r TypeRegistry,
}

impl<'r> FieldAccessor<'r> {
    /// Create an accessor over a registry
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry }
    }

    /// The registry this accessor resolves against
    pub fn registry(&self) -> &'r TypeRegistry {
        self.registry
    }

    /// Read a field, requiring its declared tag to be `expected`
    pub fn get_value<S: InstanceStore + ?Sized>(
        &self,
        type_name: &str,
        field_name: &str,
        store: &S,
        handle: InstanceHandle,
        expected: PropertyType,
    ) -> Result<PropertyValue> {
        let field = self.registry.field(type_name, field_name)?;
        if field.property_type() != expected {
            return Err(ReflectError::mismatch(field_name, expected, field.property_type()));
        }
        let block = resolve(store, type_name, field_name, handle)?;
        read(field, block)
    }

    /// Read a field as whatever its declared tag is
    pub fn read_field<S: InstanceStore + ?Sized>(
        &self,
        type_name: &str,
        field_name: &str,
        store: &S,
        handle: InstanceHandle,
    ) -> Result<PropertyValue> {
        let field = self.registry.field(type_name, field_name)?;
        let block = resolve(store, type_name, field_name, handle)?;
        read(field, block)
    }

    /// Write a field; the value's tag must match the declared one
    pub fn set_value<S: InstanceStore + ?Sized>(
        &self,
        type_name: &str,
        field_name: &str,
        store: &mut S,
        handle: InstanceHandle,
        value: PropertyValue,
    ) -> Result<()> {
        let field = self.registry.field(type_name, field_name)?;
        if field.property_type() != value.property_type() {
            return Err(ReflectError::mismatch(
                field_name,
                field.property_type(),
                value.property_type(),
            ));
        }
        if field.is_read_only() {
            return Err(ReflectError::ReadOnlyField {
                type_name: type_name.to_string(),
                field: field_name.to_string(),
            });
        }
        let block = resolve_mut(store, type_name, field_name, handle)?;
        write(field, block, value)
    }

    /// Read a field into a Rust type
    pub fn get<T: Reflected, S: InstanceStore + ?Sized>(
        &self,
        type_name: &str,
        field_name: &str,
        store: &S,
        handle: InstanceHandle,
    ) -> Result<T> {
        let value = self.get_value(type_name, field_name, store, handle, T::TAG)?;
        let found = value.property_type();
        T::from_value(value).ok_or_else(|| ReflectError::mismatch(field_name, T::TAG, found))
    }

    /// Write a Rust value into a field
    pub fn set<T: Reflected, S: InstanceStore + ?Sized>(
        &self,
        type_name: &str,
        field_name: &str,
        store: &mut S,
        handle: InstanceHandle,
        value: T,
    ) -> Result<()> {
        self.set_value(type_name, field_name, store, handle, value.into_value())
    }

    /// Write ignoring the read-only flag; used when restoring saved state
    pub(crate) fn restore_value<S: InstanceStore + ?Sized>(
        &self,
        type_name: &str,
        field_name: &str,
        store: &mut S,
        handle: InstanceHandle,
        value: PropertyValue,
    ) -> Result<()> {
        let field = self.registry.field(type_name, field_name)?;
        if field.property_type() != value.property_type() {
            return Err(ReflectError::mismatch(
                field_name,
                field.property_type(),
                value.property_type(),
            ));
        }
        let block = resolve_mut(store, type_name, field_name, handle)?;
        write(field, block, value)
    }

    /// Check that every declared field of `type_name` fits the handle's block
    pub(crate) fn check_layout<S: InstanceStore + ?Sized>(
        &self,
        type_name: &str,
        store: &S,
        handle: InstanceHandle,
    ) -> Result<()> {
        let descriptor = self.registry.get_type(type_name)?;
        for field in descriptor.fields() {
            let block = resolve(store, type_name, field.name(), handle)?;
            block.bytes(field.offset(), field.width())?;
        }
        Ok(())
    }
}

fn resolve<'s, S: InstanceStore + ?Sized>(
    store: &'s S,
    type_name: &str,
    field_name: &str,
    handle: InstanceHandle,
) -> Result<&'s InstanceBlock> {
    let block = store
        .block(handle)
        .ok_or_else(|| ReflectError::NotFound(format!("instance {:?}", handle)))?;
    check_instance_type(block, type_name, field_name)?;
    Ok(block)
}

fn resolve_mut<'s, S: InstanceStore + ?Sized>(
    store: &'s mut S,
    type_name: &str,
    field_name: &str,
    handle: InstanceHandle,
) -> Result<&'s mut InstanceBlock> {
    let block = store
        .block_mut(handle)
        .ok_or_else(|| ReflectError::NotFound(format!("instance {:?}", handle)))?;
    check_instance_type(block, type_name, field_name)?;
    Ok(block)
}

fn check_instance_type(block: &InstanceBlock, type_name: &str, field_name: &str) -> Result<()> {
    if block.type_name() != type_name {
        return Err(ReflectError::mismatch_described(
            field_name,
            format!("instance of {}", type_name),
            format!("instance of {}", block.type_name()),
        ));
    }
    Ok(())
}

fn read(field: &FieldDescriptor, block: &InstanceBlock) -> Result<PropertyValue> {
    let bytes = block.bytes(field.offset(), field.width())?;
    if field.property_type() == PropertyType::String {
        return Ok(PropertyValue::String(block.string(field.offset()).to_string()));
    }
    PropertyValue::from_le_bytes(field.property_type(), bytes).ok_or_else(|| {
        ReflectError::mismatch_described(
            field.name(),
            field.property_type().to_string(),
            format!("{} bytes", bytes.len()),
        )
    })
}

fn write(field: &FieldDescriptor, block: &mut InstanceBlock, value: PropertyValue) -> Result<()> {
    let offset = field.offset();

    if let PropertyValue::String(s) = value {
        block.bytes(offset, field.width())?;
        block.set_string(offset, s);
        return Ok(());
    }

    let slot = block.bytes_mut(offset, field.width())?;
    let bytes = value.to_le_bytes().unwrap_or_default();
    if bytes.len() != slot.len() {
        return Err(ReflectError::mismatch_described(
            field.name(),
            format!("{}[{}]", field.property_type(), slot.len()),
            format!("{}[{}]", value.property_type(), bytes.len()),
        ));
    }
    slot.copy_from_slice(&bytes);
    Ok(())
}
