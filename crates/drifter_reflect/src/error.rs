//! Error types for the reflection system

use crate::property::PropertyType;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for reflection operations
pub type Result<T> = std::result::Result<T, ReflectError>;

/// Errors that can occur while registering, accessing or persisting reflected data
#[derive(Debug, Error)]
pub enum ReflectError {
    /// Type name is not in the registry
    #[error("Type '{0}' not registered")]
    UnknownType(String),

    /// Field name is not declared on the type
    #[error("Type '{type_name}' has no field '{field}'")]
    UnknownField {
        type_name: String,
        field: String,
    },

    /// Requested or supplied tag does not match the declared one
    #[error("Type mismatch on '{field}': expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    /// Field is marked immutable
    #[error("Field '{type_name}.{field}' is read-only")]
    ReadOnlyField {
        type_name: String,
        field: String,
    },

    /// A type with this name is already registered
    #[error("Type '{0}' is already registered")]
    DuplicateType(String),

    /// Registration attempted after the registry was sealed
    #[error("Registry is sealed; cannot register '{0}'")]
    RegistryAlreadySealed(String),

    /// Index or byte range outside the valid bounds
    #[error("Index {index} out of range (len {len})")]
    IndexOutOfRange {
        index: usize,
        len: usize,
    },

    /// A declared field is absent from a record
    #[error("Record for '{type_name}' is missing field '{field}'")]
    MissingField {
        type_name: String,
        field: String,
    },

    /// Instance handle or file does not resolve
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Field layout rejected at registration
    #[error("Invalid layout for '{type_name}': {message}")]
    InvalidLayout {
        type_name: String,
        message: String,
    },

    /// Record text is not a JSON object
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// NaN or infinity cannot be written to a text record
    #[error("Field '{0}' holds a non-finite value")]
    NonFiniteValue(String),
}

impl ReflectError {
    /// Create an unknown field error
    pub fn unknown_field(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        ReflectError::UnknownField {
            type_name: type_name.into(),
            field: field.into(),
        }
    }

    /// Create a tag mismatch error
    pub fn mismatch(field: impl Into<String>, expected: PropertyType, found: PropertyType) -> Self {
        ReflectError::TypeMismatch {
            field: field.into(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Create a mismatch error with free-form descriptions
    pub fn mismatch_described(
        field: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        ReflectError::TypeMismatch {
            field: field.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create an invalid layout error
    pub fn invalid_layout(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        ReflectError::InvalidLayout {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Create a not found error for a missing file
    pub fn path_not_found(path: impl Into<PathBuf>) -> Self {
        ReflectError::NotFound(path.into().display().to_string())
    }
}
