//! Embedder-facing facade with a degraded mode
//!
//! Scripting hosts talk to the reflection backend through [`ReflectionSystem`].
//! When the backend cannot be loaded the facade still answers every call with
//! an empty or negative result instead of failing.

use crate::accessor::FieldAccessor;
use crate::buffer::{copy_to_buffer, BufferWrite};
use crate::codec::{Codec, EncodedRecord};
use crate::error::{ReflectError, Result};
use crate::handle::InstanceHandle;
use crate::instance::InstanceStore;
use crate::persist::{PersistConfig, Persistence};
use crate::property::{PropertyType, PropertyValue};
use crate::registry::{TypeInfo, TypeRegistry};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

const UNAVAILABLE: &str = "reflection backend unavailable";

/// Shared handle to a sealed registry, or nothing when the backend is missing
#[derive(Debug, Clone, Default)]
pub struct ReflectionSystem {
    registry: Option<Arc<TypeRegistry>>,
    persist: PersistConfig,
}

impl ReflectionSystem {
    /// Wrap a loaded registry
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry: Some(registry),
            persist: PersistConfig::default(),
        }
    }

    /// A facade with no backend
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Run `loader`, degrading with a warning if it fails
    pub fn load<F, E>(loader: F) -> Self
    where
        F: FnOnce() -> std::result::Result<Arc<TypeRegistry>, E>,
        E: fmt::Display,
    {
        match loader() {
            Ok(registry) => {
                log::debug!("Reflection backend loaded ({} types)", registry.type_count());
                Self::new(registry)
            }
            Err(e) => {
                log::warn!("Reflection backend not loaded, running degraded: {}", e);
                Self::unavailable()
            }
        }
    }

    /// Replace the persistence settings used by `save_to_file`
    pub fn with_persist_config(mut self, config: PersistConfig) -> Self {
        self.persist = config;
        self
    }

    pub fn is_available(&self) -> bool {
        self.registry.is_some()
    }

    pub fn registry(&self) -> Option<&Arc<TypeRegistry>> {
        self.registry.as_ref()
    }

    /// All type names in registration order; empty when degraded
    pub fn get_all_types(&self) -> Vec<String> {
        self.registry
            .as_ref()
            .map(|r| r.iter().map(|t| t.name().to_string()).collect())
            .unwrap_or_default()
    }

    pub fn get_type_info(&self, type_name: &str) -> Option<TypeInfo> {
        self.registry.as_ref()?.type_info(type_name).ok()
    }

    /// Copy the name of the type at `index` into `buffer`.
    ///
    /// `None` when degraded or when `index` is past the last type.
    pub fn type_name_into(&self, index: usize, buffer: &mut [u8]) -> Option<BufferWrite> {
        let name = self.registry.as_ref()?.type_name_at(index).ok()?;
        Some(copy_to_buffer(name, buffer))
    }

    pub fn get_value<S: InstanceStore + ?Sized>(
        &self,
        type_name: &str,
        field_name: &str,
        store: &S,
        handle: InstanceHandle,
        expected: PropertyType,
    ) -> Result<PropertyValue> {
        FieldAccessor::new(self.backend()?).get_value(type_name, field_name, store, handle, expected)
    }

    pub fn set_value<S: InstanceStore + ?Sized>(
        &self,
        type_name: &str,
        field_name: &str,
        store: &mut S,
        handle: InstanceHandle,
        value: PropertyValue,
    ) -> Result<()> {
        FieldAccessor::new(self.backend()?).set_value(type_name, field_name, store, handle, value)
    }

    /// Compact record for an instance; `None` when degraded or on failure
    pub fn to_json<S: InstanceStore + ?Sized>(
        &self,
        type_name: &str,
        store: &S,
        handle: InstanceHandle,
    ) -> Option<EncodedRecord> {
        let registry = self.registry.as_deref()?;
        match Codec::new(registry).encode(type_name, store, handle) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Failed to encode '{}': {}", type_name, e);
                None
            }
        }
    }

    /// Save an instance; `false` when degraded or on failure
    pub fn save_to_file<S: InstanceStore + ?Sized>(
        &self,
        type_name: &str,
        store: &S,
        handle: InstanceHandle,
        path: impl AsRef<Path>,
    ) -> bool {
        let Some(registry) = self.registry.as_deref() else {
            return false;
        };
        let persistence = Persistence::with_config(registry, self.persist.clone());
        match persistence.save(type_name, store, handle, path.as_ref()) {
            Ok(_) => true,
            Err(e) => {
                log::warn!(
                    "Failed to save '{}' to {}: {}",
                    type_name,
                    path.as_ref().display(),
                    e
                );
                false
            }
        }
    }

    pub fn load_from_file(&self, type_name: &str, path: impl AsRef<Path>) -> Result<EncodedRecord> {
        Persistence::with_config(self.backend()?, self.persist.clone()).load(type_name, path)
    }

    fn backend(&self) -> Result<&TypeRegistry> {
        self.registry
            .as_deref()
            .ok_or_else(|| ReflectError::NotFound(UNAVAILABLE.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::ObjectTable;
    use crate::registry::TypeBuilder;

    fn loaded() -> ReflectionSystem {
        let mut registry = TypeRegistry::new();
        TypeBuilder::new("Transform", 12)
            .field("position", PropertyType::Vector2, 0)
            .field("rotation", PropertyType::Float, 8)
            .register(&mut registry)
            .unwrap();
        registry.seal();
        ReflectionSystem::load(|| Ok::<_, String>(Arc::new(registry)))
    }

    #[test]
    fn test_loaded_backend() {
        let system = loaded();
        assert!(system.is_available());
        assert_eq!(system.get_all_types(), vec!["Transform".to_string()]);
        assert_eq!(system.get_type_info("Transform").unwrap().size, 12);
        assert!(system.get_type_info("Ghost").is_none());

        let mut table = ObjectTable::new();
        let h = table
            .create_named(system.registry().unwrap(), "Transform")
            .unwrap();
        system
            .set_value("Transform", "rotation", &mut table, h, PropertyValue::Float(90.0))
            .unwrap();
        assert_eq!(
            system.to_json("Transform", &table, h).unwrap().as_str(),
            r#"{"position":[0.0,0.0],"rotation":90.0}"#
        );
    }

    #[test]
    fn test_type_name_into() {
        let system = loaded();
        let mut buf = [0u8; 16];
        assert_eq!(system.type_name_into(0, &mut buf), Some(BufferWrite::Written(9)));
        assert_eq!(&buf[..10], b"Transform\0");

        let mut small = [0u8; 4];
        assert_eq!(
            system.type_name_into(0, &mut small),
            Some(BufferWrite::Insufficient { required: 10 })
        );
        assert_eq!(small, [0u8; 4]);
        assert!(system.type_name_into(1, &mut buf).is_none());
    }

    #[test]
    fn test_degraded_answers_everything() {
        let system = ReflectionSystem::load(|| Err::<Arc<TypeRegistry>, _>("library missing"));
        assert!(!system.is_available());
        assert!(system.get_all_types().is_empty());
        assert!(system.get_type_info("Transform").is_none());
        assert!(system.type_name_into(0, &mut [0u8; 8]).is_none());

        let mut table = ObjectTable::new();
        let h = InstanceHandle::null();
        assert!(matches!(
            system.get_value("Transform", "rotation", &table, h, PropertyType::Float),
            Err(ReflectError::NotFound(_))
        ));
        assert!(matches!(
            system.set_value("Transform", "rotation", &mut table, h, PropertyValue::Float(1.0)),
            Err(ReflectError::NotFound(_))
        ));
        assert!(system.to_json("Transform", &table, h).is_none());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.json");
        assert!(!system.save_to_file("Transform", &table, h, &path));
        assert!(!path.exists());
        assert!(matches!(
            system.load_from_file("Transform", &path),
            Err(ReflectError::NotFound(_))
        ));
    }

    #[test]
    fn test_save_to_file_reports_failure() {
        let system = loaded();
        let table = ObjectTable::new();
        let dir = tempfile::tempdir().unwrap();
        assert!(!system.save_to_file("Transform", &table, InstanceHandle::null(), dir.path().join("t.json")));
    }
}
