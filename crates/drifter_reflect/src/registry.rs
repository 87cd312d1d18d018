//! Type registry for runtime layout information
//!
//! The registry is filled once at startup, then sealed and shared by
//! reference (usually behind an `Arc`). After sealing it is immutable, so
//! concurrent readers need no locking.

use crate::error::{ReflectError, Result};
use crate::property::PropertyType;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Metadata for one named, typed member of a type's layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: String,
    property_type: PropertyType,
    offset: usize,
    width: usize,
    read_only: bool,
}

impl FieldDescriptor {
    /// Create a field with a fixed-width or string tag.
    ///
    /// For `Custom` use [`FieldDescriptor::custom`]; passing it here yields a
    /// zero-width field that registration rejects.
    pub fn new(name: impl Into<String>, property_type: PropertyType, offset: usize) -> Self {
        Self {
            name: name.into(),
            property_type,
            offset,
            width: property_type.fixed_width().unwrap_or(0),
            read_only: false,
        }
    }

    /// Create a `Custom` field spanning `width` bytes
    pub fn custom(name: impl Into<String>, offset: usize, width: usize) -> Self {
        Self {
            name: name.into(),
            property_type: PropertyType::Custom,
            offset,
            width,
            read_only: false,
        }
    }

    /// Mark the field immutable through the accessor
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared tag
    pub fn property_type(&self) -> PropertyType {
        self.property_type
    }

    /// Bytes the field occupies in the layout
    pub fn width(&self) -> usize {
        self.width
    }

    /// Whether writes through the accessor are rejected
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }
}

/// Layout of one registered type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    name: String,
    size: usize,
    fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    /// Create a descriptor; the layout is validated on registration
    pub fn new(name: impl Into<String>, size: usize, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            size,
            fields,
        }
    }

    /// Type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instance size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Get a field by name
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Serializable summary
    pub fn info(&self) -> TypeInfo {
        TypeInfo {
            name: self.name.clone(),
            size: self.size,
            fields: self
                .fields
                .iter()
                .map(|f| FieldInfo {
                    name: f.name.clone(),
                    property_type: f.property_type,
                    read_only: f.read_only,
                })
                .collect(),
        }
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(ReflectError::invalid_layout(
                    &self.name,
                    format!("field '{}' declared twice", field.name),
                ));
            }
            if field.width == 0 {
                return Err(ReflectError::invalid_layout(
                    &self.name,
                    format!("field '{}' has zero width", field.name),
                ));
            }
            let fits = field
                .offset
                .checked_add(field.width)
                .map_or(false, |end| end <= self.size);
            if !fits {
                return Err(ReflectError::invalid_layout(
                    &self.name,
                    format!(
                        "field '{}' ({} bytes at offset {}) exceeds type size {}",
                        field.name, field.width, field.offset, self.size
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Serializable field summary (offsets are not exposed)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    #[serde(default)]
    pub read_only: bool,
}

/// Serializable type summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub name: String,
    pub size: usize,
    pub fields: Vec<FieldInfo>,
}

/// Catalogue of all known types
#[derive(Default)]
pub struct TypeRegistry {
    /// Descriptors in registration order
    types: Vec<TypeDescriptor>,
    /// Name to index in `types`
    by_name: HashMap<String, usize>,
    /// Set once startup registration is over
    sealed: bool,
}

impl TypeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type.
    ///
    /// The first registration of a name wins; the registry is left unchanged
    /// on any error.
    pub fn register_type(
        &mut self,
        name: impl Into<String>,
        size: usize,
        fields: Vec<FieldDescriptor>,
    ) -> Result<()> {
        self.register(TypeDescriptor::new(name, size, fields))
    }

    /// Register a prebuilt descriptor
    pub fn register(&mut self, descriptor: TypeDescriptor) -> Result<()> {
        if self.sealed {
            return Err(ReflectError::RegistryAlreadySealed(descriptor.name));
        }
        if self.by_name.contains_key(&descriptor.name) {
            return Err(ReflectError::DuplicateType(descriptor.name));
        }
        descriptor.validate()?;

        log::debug!(
            "Registered type '{}' ({} bytes, {} fields)",
            descriptor.name,
            descriptor.size,
            descriptor.fields.len()
        );
        self.by_name.insert(descriptor.name.clone(), self.types.len());
        self.types.push(descriptor);
        Ok(())
    }

    /// Close registration; later `register_type` calls fail
    pub fn seal(&mut self) {
        if !self.sealed {
            self.sealed = true;
            log::info!("Type registry sealed with {} types", self.types.len());
        }
    }

    /// Whether registration is closed
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Number of registered types
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Name of the type at `index`, in registration order
    pub fn type_name_at(&self, index: usize) -> Result<&str> {
        self.types
            .get(index)
            .map(TypeDescriptor::name)
            .ok_or(ReflectError::IndexOutOfRange {
                index,
                len: self.types.len(),
            })
    }

    /// Get a type by name
    pub fn get_type(&self, name: &str) -> Result<&TypeDescriptor> {
        self.by_name
            .get(name)
            .map(|&i| &self.types[i])
            .ok_or_else(|| ReflectError::UnknownType(name.to_string()))
    }

    /// Check if a type is registered
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Number of fields on a type
    pub fn field_count(&self, type_name: &str) -> Result<usize> {
        Ok(self.get_type(type_name)?.fields.len())
    }

    /// Field at `index` in declaration order
    pub fn field_at(&self, type_name: &str, index: usize) -> Result<&FieldDescriptor> {
        let descriptor = self.get_type(type_name)?;
        descriptor
            .fields
            .get(index)
            .ok_or(ReflectError::IndexOutOfRange {
                index,
                len: descriptor.fields.len(),
            })
    }

    /// Field by name
    pub fn field(&self, type_name: &str, field_name: &str) -> Result<&FieldDescriptor> {
        self.get_type(type_name)?
            .field(field_name)
            .ok_or_else(|| ReflectError::unknown_field(type_name, field_name))
    }

    /// Declared tag of a field
    pub fn field_type(&self, type_name: &str, field_name: &str) -> Result<PropertyType> {
        Ok(self.field(type_name, field_name)?.property_type)
    }

    /// Serializable summary of a type
    pub fn type_info(&self, type_name: &str) -> Result<TypeInfo> {
        Ok(self.get_type(type_name)?.info())
    }

    /// Iterate over all types in registration order
    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.iter()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.types.len())
            .field("sealed", &self.sealed)
            .finish()
    }
}

/// Fluent registration helper
///
/// ```
/// use drifter_reflect::{PropertyType, TypeBuilder, TypeRegistry};
///
/// let mut registry = TypeRegistry::new();
/// TypeBuilder::new("Transform", 12)
///     .field("position", PropertyType::Vector2, 0)
///     .field("rotation", PropertyType::Float, 8)
///     .register(&mut registry)
///     .unwrap();
/// assert_eq!(registry.field_count("Transform").unwrap(), 2);
/// ```
pub struct TypeBuilder {
    descriptor: TypeDescriptor,
}

impl TypeBuilder {
    /// Start describing a type of `size` bytes
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            descriptor: TypeDescriptor::new(name, size, Vec::new()),
        }
    }

    /// Add a field
    pub fn field(mut self, name: impl Into<String>, property_type: PropertyType, offset: usize) -> Self {
        self.descriptor
            .fields
            .push(FieldDescriptor::new(name, property_type, offset));
        self
    }

    /// Add a read-only field
    pub fn read_only_field(
        mut self,
        name: impl Into<String>,
        property_type: PropertyType,
        offset: usize,
    ) -> Self {
        self.descriptor
            .fields
            .push(FieldDescriptor::new(name, property_type, offset).read_only());
        self
    }

    /// Add a custom field of `width` bytes
    pub fn custom_field(mut self, name: impl Into<String>, offset: usize, width: usize) -> Self {
        self.descriptor
            .fields
            .push(FieldDescriptor::custom(name, offset, width));
        self
    }

    /// Finish without registering
    pub fn build(self) -> TypeDescriptor {
        self.descriptor
    }

    /// Register into a registry
    pub fn register(self, registry: &mut TypeRegistry) -> Result<()> {
        registry.register(self.descriptor)
    }
}
