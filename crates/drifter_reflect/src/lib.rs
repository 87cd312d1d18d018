//! # drifter_reflect - Runtime Type Reflection
//!
//! Describes the layout of game types at runtime so tools and scripts can
//! enumerate them, read and write individual fields, and persist instances
//! as JSON records.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐   seal()   ┌──────────────────────┐
//! │  TypeRegistry   │──────────▶│ Arc<TypeRegistry>    │
//! │  (startup, &mut)│            │ (shared, read-only)  │
//! └─────────────────┘            └──────────┬───────────┘
//!                                           │
//!              ┌────────────────────────────┼──────────────────┐
//!              ▼                            ▼                  ▼
//!     ┌─────────────────┐         ┌─────────────────┐  ┌─────────────────┐
//!     │  FieldAccessor  │◀────────│      Codec      │◀─│   Persistence   │
//!     │ get/set by name │         │ encode / decode │  │ atomic save/load│
//!     └────────┬────────┘         └─────────────────┘  └─────────────────┘
//!              ▼
//!     ┌─────────────────┐
//!     │  InstanceStore  │ ◀── ObjectTable, or an engine's own storage
//!     └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use drifter_reflect::prelude::*;
//!
//! let mut registry = TypeRegistry::new();
//! TypeBuilder::new("Transform", 12)
//!     .field("position", PropertyType::Vector2, 0)
//!     .field("rotation", PropertyType::Float, 8)
//!     .register(&mut registry)?;
//! registry.seal();
//!
//! let mut objects = ObjectTable::new();
//! let transform = objects.create_named(&registry, "Transform")?;
//!
//! let accessor = FieldAccessor::new(&registry);
//! accessor.set("Transform", "position", &mut objects, transform, [1.0f32, 2.0])?;
//! accessor.set("Transform", "rotation", &mut objects, transform, 90.0f32)?;
//!
//! let record = Codec::new(&registry).encode("Transform", &objects, transform)?;
//! assert_eq!(record.as_str(), r#"{"position":[1.0,2.0],"rotation":90.0}"#);
//! # Ok::<(), drifter_reflect::ReflectError>(())
//! ```

pub mod accessor;
pub mod buffer;
pub mod codec;
pub mod error;
pub mod handle;
pub mod instance;
pub mod persist;
pub mod property;
pub mod registry;
pub mod system;

pub use accessor::FieldAccessor;
pub use buffer::{copy_to_buffer, BufferWrite};
pub use codec::{Codec, DecodedRecord, EncodedRecord};
pub use error::{ReflectError, Result};
pub use handle::InstanceHandle;
pub use instance::{InstanceBlock, InstanceStore, ObjectTable};
pub use persist::{write_atomic, PersistConfig, Persistence};
pub use property::{Color, PropertyMap, PropertyType, PropertyValue, Reflected, Vec2, Vec3};
pub use registry::{FieldDescriptor, FieldInfo, TypeBuilder, TypeDescriptor, TypeInfo, TypeRegistry};
pub use system::ReflectionSystem;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::accessor::FieldAccessor;
    pub use crate::codec::{Codec, EncodedRecord};
    pub use crate::error::{ReflectError, Result};
    pub use crate::handle::InstanceHandle;
    pub use crate::instance::{InstanceStore, ObjectTable};
    pub use crate::persist::Persistence;
    pub use crate::property::{PropertyType, PropertyValue};
    pub use crate::registry::{FieldDescriptor, TypeBuilder, TypeRegistry};
    pub use crate::system::ReflectionSystem;
}
