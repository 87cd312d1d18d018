//! JSON record codec
//!
//! Walks a type's fields in declaration order and produces one JSON object per
//! instance. Output is deterministic for identical field values.
//!
//! | tag | JSON |
//! |---|---|
//! | Bool | `true` / `false` |
//! | Int | integer |
//! | Float, Double | shortest round-trip number |
//! | String | escaped string |
//! | Vector2, Vector3 | `[x, y]`, `[x, y, z]` |
//! | Color | `[r, g, b, a]` |
//! | Custom | standard base64 string |

use crate::accessor::FieldAccessor;
use crate::buffer::{copy_to_buffer, BufferWrite};
use crate::error::{ReflectError, Result};
use crate::handle::InstanceHandle;
use crate::instance::InstanceStore;
use crate::property::{PropertyMap, PropertyType, PropertyValue};
use crate::registry::{FieldDescriptor, TypeRegistry};
use base64::Engine;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// One instance's field values as JSON text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedRecord(String);

impl EncodedRecord {
    /// Wrap text read back from storage; NUL bytes are rejected
    pub(crate) fn from_text(text: String) -> std::result::Result<Self, String> {
        if text.contains('\0') {
            return Err("record contains a NUL byte".to_string());
        }
        Ok(Self(text))
    }

    /// Record text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Record bytes (UTF-8)
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Take the text
    pub fn into_string(self) -> String {
        self.0
    }

    /// Copy into a caller buffer with a NUL terminator
    pub fn write_to(&self, buffer: &mut [u8]) -> BufferWrite {
        copy_to_buffer(&self.0, buffer)
    }
}

impl fmt::Display for EncodedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EncodedRecord {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Result of decoding a record
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedRecord {
    /// Every declared field, typed per its tag
    pub values: PropertyMap,
    /// Keys present in the record but not declared on the type
    pub unknown_fields: Vec<String>,
}

impl DecodedRecord {
    /// Get a decoded value
    pub fn get(&self, field: &str) -> Option<&PropertyValue> {
        self.values.get(field)
    }
}

/// Encodes instances to records and decodes records to values
#[derive(Debug, Clone, Copy)]
pub struct Codec<'r> {
    accessor: FieldAccessor<'r>,
}

impl<'r> Codec<'r> {
    /// Create a codec over a registry
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            accessor: FieldAccessor::new(registry),
        }
    }

    /// The accessor this codec reads through
    pub fn accessor(&self) -> FieldAccessor<'r> {
        self.accessor
    }

    /// Encode an instance as compact JSON.
    ///
    /// Fails as a whole if any field cannot be read or represented.
    pub fn encode<S: InstanceStore + ?Sized>(
        &self,
        type_name: &str,
        store: &S,
        handle: InstanceHandle,
    ) -> Result<EncodedRecord> {
        let fields = self.collect(type_name, store, handle)?;
        let text = serde_json::to_string(&RecordWriter(&fields))
            .map_err(|e| ReflectError::MalformedRecord(e.to_string()))?;
        Ok(EncodedRecord(text))
    }

    /// Encode with two-space indentation, for display
    pub fn encode_pretty<S: InstanceStore + ?Sized>(
        &self,
        type_name: &str,
        store: &S,
        handle: InstanceHandle,
    ) -> Result<EncodedRecord> {
        let fields = self.collect(type_name, store, handle)?;
        let text = serde_json::to_string_pretty(&RecordWriter(&fields))
            .map_err(|e| ReflectError::MalformedRecord(e.to_string()))?;
        Ok(EncodedRecord(text))
    }

    /// Decode a record against a type's declared fields.
    ///
    /// Undeclared keys are reported in [`DecodedRecord::unknown_fields`];
    /// missing or mistyped declared fields fail.
    pub fn decode(&self, type_name: &str, record: &str) -> Result<DecodedRecord> {
        let descriptor = self.accessor.registry().get_type(type_name)?;
        let object = match serde_json::from_str::<Value>(record) {
            Ok(Value::Object(object)) => object,
            Ok(other) => {
                return Err(ReflectError::MalformedRecord(format!(
                    "expected an object, found {}",
                    json_kind(&other)
                )))
            }
            Err(e) => return Err(ReflectError::MalformedRecord(e.to_string())),
        };

        let mut values = PropertyMap::with_capacity(descriptor.fields().len());
        for field in descriptor.fields() {
            let raw = object.get(field.name()).ok_or_else(|| ReflectError::MissingField {
                type_name: type_name.to_string(),
                field: field.name().to_string(),
            })?;
            values.insert(field.name().to_string(), value_from_json(field, raw)?);
        }

        let mut unknown_fields: Vec<String> = object
            .keys()
            .filter(|key| descriptor.field(key).is_none())
            .cloned()
            .collect();
        unknown_fields.sort();
        if !unknown_fields.is_empty() {
            log::warn!(
                "Record for '{}' has undeclared fields {:?}; skipped",
                type_name,
                unknown_fields
            );
        }

        Ok(DecodedRecord {
            values,
            unknown_fields,
        })
    }

    /// Decode a record and write every field into an instance.
    ///
    /// Nothing is written unless the whole record decodes and every field
    /// fits the instance's block. Read-only fields are restored as well.
    /// Returns the undeclared keys.
    pub fn apply<S: InstanceStore + ?Sized>(
        &self,
        type_name: &str,
        store: &mut S,
        handle: InstanceHandle,
        record: &str,
    ) -> Result<Vec<String>> {
        let mut decoded = self.decode(type_name, record)?;
        self.accessor.check_layout(type_name, &*store, handle)?;
        let descriptor = self.accessor.registry().get_type(type_name)?;
        for field in descriptor.fields() {
            if let Some(value) = decoded.values.remove(field.name()) {
                self.accessor
                    .restore_value(type_name, field.name(), store, handle, value)?;
            }
        }
        Ok(decoded.unknown_fields)
    }

    fn collect<S: InstanceStore + ?Sized>(
        &self,
        type_name: &str,
        store: &S,
        handle: InstanceHandle,
    ) -> Result<Vec<(&'r str, PropertyValue)>> {
        let descriptor = self.accessor.registry().get_type(type_name)?;
        let mut fields = Vec::with_capacity(descriptor.fields().len());
        for field in descriptor.fields() {
            let value = self
                .accessor
                .read_field(type_name, field.name(), store, handle)?;
            if !value.is_finite() {
                return Err(ReflectError::NonFiniteValue(field.name().to_string()));
            }
            fields.push((field.name(), value));
        }
        Ok(fields)
    }
}

/// Serializes collected fields as one JSON object, in order
struct RecordWriter<'a, 'r>(&'a [(&'r str, PropertyValue)]);

impl Serialize for RecordWriter<'_, '_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in self.0 {
            map.serialize_entry(name, &TextValue(value))?;
        }
        map.end()
    }
}

struct TextValue<'a>(&'a PropertyValue);

impl Serialize for TextValue<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0 {
            PropertyValue::Bool(v) => serializer.serialize_bool(*v),
            PropertyValue::Int(v) => serializer.serialize_i32(*v),
            PropertyValue::Float(v) => serializer.serialize_f32(*v),
            PropertyValue::Double(v) => serializer.serialize_f64(*v),
            PropertyValue::String(v) => serializer.serialize_str(v),
            PropertyValue::Vector2(v) => v.serialize(serializer),
            PropertyValue::Vector3(v) => v.serialize(serializer),
            PropertyValue::Color(v) => v.serialize(serializer),
            PropertyValue::Custom(bytes) => {
                serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
            }
        }
    }
}

fn value_from_json(field: &FieldDescriptor, raw: &Value) -> Result<PropertyValue> {
    let mismatch = || {
        ReflectError::mismatch_described(
            field.name(),
            describe_expected(field),
            json_kind(raw),
        )
    };

    let value = match field.property_type() {
        PropertyType::Bool => PropertyValue::Bool(raw.as_bool().ok_or_else(mismatch)?),
        PropertyType::Int => {
            let wide = raw.as_i64().ok_or_else(mismatch)?;
            PropertyValue::Int(i32::try_from(wide).map_err(|_| mismatch())?)
        }
        PropertyType::Float => PropertyValue::Float(narrow(field, raw.as_f64().ok_or_else(mismatch)?)?),
        PropertyType::Double => PropertyValue::Double(raw.as_f64().ok_or_else(mismatch)?),
        PropertyType::String => PropertyValue::String(raw.as_str().ok_or_else(mismatch)?.to_string()),
        PropertyType::Vector2 => PropertyValue::Vector2(components(field, raw)?.ok_or_else(mismatch)?),
        PropertyType::Vector3 => PropertyValue::Vector3(components(field, raw)?.ok_or_else(mismatch)?),
        PropertyType::Color => PropertyValue::Color(components(field, raw)?.ok_or_else(mismatch)?),
        PropertyType::Custom => {
            let text = raw.as_str().ok_or_else(mismatch)?;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(text)
                .map_err(|_| mismatch())?;
            if bytes.len() != field.width() {
                return Err(ReflectError::mismatch_described(
                    field.name(),
                    describe_expected(field),
                    format!("{} bytes", bytes.len()),
                ));
            }
            PropertyValue::Custom(bytes)
        }
    };
    Ok(value)
}

/// Fixed-length float array; `Ok(None)` when the shape is wrong
fn components<const N: usize>(field: &FieldDescriptor, raw: &Value) -> Result<Option<[f32; N]>> {
    let items = match raw.as_array() {
        Some(items) if items.len() == N => items,
        _ => return Ok(None),
    };
    let mut out = [0.0f32; N];
    for (slot, item) in out.iter_mut().zip(items) {
        match item.as_f64() {
            Some(wide) => *slot = narrow(field, wide)?,
            None => return Ok(None),
        }
    }
    Ok(Some(out))
}

/// f64 to f32, rejecting numbers beyond the f32 range
fn narrow(field: &FieldDescriptor, wide: f64) -> Result<f32> {
    let value = wide as f32;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ReflectError::mismatch_described(
            field.name(),
            describe_expected(field),
            "out-of-range number",
        ))
    }
}

fn describe_expected(field: &FieldDescriptor) -> String {
    match field.property_type() {
        PropertyType::Custom => format!("custom ({} bytes, base64)", field.width()),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "bool".to_string(),
        Value::Number(n) if n.is_f64() => "float number".to_string(),
        Value::Number(_) => "integer number".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Array(items) => format!("array of {}", items.len()),
        Value::Object(_) => "object".to_string(),
    }
}
