//! Property tags and values
//!
//! Every reflected field carries one [`PropertyType`] tag from a closed set.
//! [`PropertyValue`] is the owned, typed form of a field's contents as it
//! crosses the accessor boundary.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Width in bytes of the layout slot a string field occupies
pub const STRING_SLOT_WIDTH: usize = 8;

/// 2D vector (x, y)
pub type Vec2 = [f32; 2];
/// 3D vector (x, y, z)
pub type Vec3 = [f32; 3];
/// RGBA color
pub type Color = [f32; 4];

/// Kind of value a field holds
///
/// Discriminants are stable and shared with embedders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum PropertyType {
    Bool = 0,
    Int = 1,
    Float = 2,
    Double = 3,
    String = 4,
    Vector2 = 5,
    Vector3 = 6,
    Color = 7,
    Custom = 8,
}

impl PropertyType {
    /// All tags in discriminant order
    pub const ALL: [PropertyType; 9] = [
        PropertyType::Bool,
        PropertyType::Int,
        PropertyType::Float,
        PropertyType::Double,
        PropertyType::String,
        PropertyType::Vector2,
        PropertyType::Vector3,
        PropertyType::Color,
        PropertyType::Custom,
    ];

    /// Width of the field in the instance layout.
    ///
    /// `None` for `Custom`, whose width is declared per field.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            PropertyType::Bool => Some(1),
            PropertyType::Int | PropertyType::Float => Some(4),
            PropertyType::Double | PropertyType::Vector2 => Some(8),
            PropertyType::Vector3 => Some(12),
            PropertyType::Color => Some(16),
            PropertyType::String => Some(STRING_SLOT_WIDTH),
            PropertyType::Custom => None,
        }
    }

    /// Get the lowercase tag name
    pub fn name(self) -> &'static str {
        match self {
            PropertyType::Bool => "bool",
            PropertyType::Int => "int",
            PropertyType::Float => "float",
            PropertyType::Double => "double",
            PropertyType::String => "string",
            PropertyType::Vector2 => "vector2",
            PropertyType::Vector3 => "vector3",
            PropertyType::Color => "color",
            PropertyType::Custom => "custom",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<i32> for PropertyType {
    type Error = i32;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        usize::try_from(raw)
            .ok()
            .and_then(|i| PropertyType::ALL.get(i).copied())
            .ok_or(raw)
    }
}

/// An owned, typed field value
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Double(f64),
    String(String),
    Vector2(Vec2),
    Vector3(Vec3),
    Color(Color),
    /// Raw bytes of a type-defined layout
    Custom(Vec<u8>),
}

impl PropertyValue {
    /// Get the tag of this value
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyValue::Bool(_) => PropertyType::Bool,
            PropertyValue::Int(_) => PropertyType::Int,
            PropertyValue::Float(_) => PropertyType::Float,
            PropertyValue::Double(_) => PropertyType::Double,
            PropertyValue::String(_) => PropertyType::String,
            PropertyValue::Vector2(_) => PropertyType::Vector2,
            PropertyValue::Vector3(_) => PropertyType::Vector3,
            PropertyValue::Color(_) => PropertyType::Color,
            PropertyValue::Custom(_) => PropertyType::Custom,
        }
    }

    /// Zero value for a tag; `width` sizes `Custom`
    pub fn zeroed(ty: PropertyType, width: usize) -> Self {
        match ty {
            PropertyType::Bool => PropertyValue::Bool(false),
            PropertyType::Int => PropertyValue::Int(0),
            PropertyType::Float => PropertyValue::Float(0.0),
            PropertyType::Double => PropertyValue::Double(0.0),
            PropertyType::String => PropertyValue::String(String::new()),
            PropertyType::Vector2 => PropertyValue::Vector2([0.0; 2]),
            PropertyType::Vector3 => PropertyValue::Vector3([0.0; 3]),
            PropertyType::Color => PropertyValue::Color([0.0; 4]),
            PropertyType::Custom => PropertyValue::Custom(vec![0; width]),
        }
    }

    /// Whether every floating point component is finite
    pub fn is_finite(&self) -> bool {
        match self {
            PropertyValue::Float(v) => v.is_finite(),
            PropertyValue::Double(v) => v.is_finite(),
            PropertyValue::Vector2(v) => v.iter().all(|c| c.is_finite()),
            PropertyValue::Vector3(v) => v.iter().all(|c| c.is_finite()),
            PropertyValue::Color(v) => v.iter().all(|c| c.is_finite()),
            _ => true,
        }
    }

    /// Decode a fixed-width value from little-endian bytes.
    ///
    /// `bytes` must be exactly the tag's width; strings are not stored inline
    /// and return `None`.
    pub(crate) fn from_le_bytes(ty: PropertyType, bytes: &[u8]) -> Option<Self> {
        if ty == PropertyType::Custom {
            return Some(PropertyValue::Custom(bytes.to_vec()));
        }
        if ty.fixed_width()? != bytes.len() {
            return None;
        }
        let value = match ty {
            PropertyType::Bool => PropertyValue::Bool(bytes[0] != 0),
            PropertyType::Int => PropertyValue::Int(i32::from_le_bytes(bytes.try_into().ok()?)),
            PropertyType::Float => PropertyValue::Float(f32::from_le_bytes(bytes.try_into().ok()?)),
            PropertyType::Double => PropertyValue::Double(f64::from_le_bytes(bytes.try_into().ok()?)),
            PropertyType::Vector2 => PropertyValue::Vector2(read_f32s(bytes)?),
            PropertyType::Vector3 => PropertyValue::Vector3(read_f32s(bytes)?),
            PropertyType::Color => PropertyValue::Color(read_f32s(bytes)?),
            PropertyType::String | PropertyType::Custom => return None,
        };
        Some(value)
    }

    /// Encode a fixed-width value as little-endian bytes
    pub(crate) fn to_le_bytes(&self) -> Option<Vec<u8>> {
        let bytes = match self {
            PropertyValue::Bool(v) => vec![u8::from(*v)],
            PropertyValue::Int(v) => v.to_le_bytes().to_vec(),
            PropertyValue::Float(v) => v.to_le_bytes().to_vec(),
            PropertyValue::Double(v) => v.to_le_bytes().to_vec(),
            PropertyValue::Vector2(v) => write_f32s(v),
            PropertyValue::Vector3(v) => write_f32s(v),
            PropertyValue::Color(v) => write_f32s(v),
            PropertyValue::Custom(v) => v.clone(),
            PropertyValue::String(_) => return None,
        };
        Some(bytes)
    }
}

fn read_f32s<const N: usize>(bytes: &[u8]) -> Option<[f32; N]> {
    if bytes.len() != N * 4 {
        return None;
    }
    let mut out = [0.0f32; N];
    for (slot, chunk) in out.iter_mut().zip(bytes.chunks_exact(4)) {
        *slot = f32::from_le_bytes(chunk.try_into().ok()?);
    }
    Some(out)
}

fn write_f32s(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Map of field name to value
pub type PropertyMap = HashMap<String, PropertyValue>;

/// Rust types that map onto exactly one [`PropertyType`]
pub trait Reflected: Sized {
    /// Tag this type reads and writes
    const TAG: PropertyType;

    /// Extract from a value carrying the same tag
    fn from_value(value: PropertyValue) -> Option<Self>;

    /// Wrap into a value
    fn into_value(self) -> PropertyValue;
}

macro_rules! impl_reflected {
    ($ty:ty, $variant:ident) => {
        impl Reflected for $ty {
            const TAG: PropertyType = PropertyType::$variant;

            fn from_value(value: PropertyValue) -> Option<Self> {
                match value {
                    PropertyValue::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn into_value(self) -> PropertyValue {
                PropertyValue::$variant(self)
            }
        }
    };
}

impl_reflected!(bool, Bool);
impl_reflected!(i32, Int);
impl_reflected!(f32, Float);
impl_reflected!(f64, Double);
impl_reflected!(String, String);
impl_reflected!(Vec2, Vector2);
impl_reflected!(Vec3, Vector3);
impl_reflected!(Color, Color);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discriminants_round_trip() {
        for ty in PropertyType::ALL {
            assert_eq!(PropertyType::try_from(ty as i32), Ok(ty));
        }
        assert_eq!(PropertyType::try_from(9), Err(9));
        assert_eq!(PropertyType::try_from(-1), Err(-1));
    }

    #[test]
    fn test_fixed_widths() {
        assert_eq!(PropertyType::Bool.fixed_width(), Some(1));
        assert_eq!(PropertyType::Int.fixed_width(), Some(4));
        assert_eq!(PropertyType::Float.fixed_width(), Some(4));
        assert_eq!(PropertyType::Double.fixed_width(), Some(8));
        assert_eq!(PropertyType::Vector2.fixed_width(), Some(8));
        assert_eq!(PropertyType::Vector3.fixed_width(), Some(12));
        assert_eq!(PropertyType::Color.fixed_width(), Some(16));
        assert_eq!(PropertyType::Custom.fixed_width(), None);
    }

    #[test]
    fn test_byte_encoding() {
        let value = PropertyValue::Vector3([1.0, -2.5, 3.25]);
        let bytes = value.to_le_bytes().unwrap();
        assert_eq!(bytes.len(), 12);
        assert_eq!(
            PropertyValue::from_le_bytes(PropertyType::Vector3, &bytes),
            Some(value)
        );

        // wrong width never reinterprets
        assert_eq!(PropertyValue::from_le_bytes(PropertyType::Double, &bytes), None);
        assert!(PropertyValue::String("x".into()).to_le_bytes().is_none());
    }

    #[test]
    fn test_reflected_tags() {
        assert_eq!(<f32 as Reflected>::TAG, PropertyType::Float);
        assert_eq!(<Color as Reflected>::TAG, PropertyType::Color);
        assert_eq!(f32::from_value(PropertyValue::Float(2.0)), Some(2.0));
        assert_eq!(f32::from_value(PropertyValue::Double(2.0)), None);
        assert_eq!(true.into_value().property_type(), PropertyType::Bool);
    }

    #[test]
    fn test_tag_serde_names() {
        let json = serde_json::to_string(&PropertyType::Vector2).unwrap();
        assert_eq!(json, "\"vector2\"");
    }
}
