//! Built-in game types known to the asset tool

use drifter_reflect::{PropertyType, Result, TypeBuilder, TypeRegistry};

/// Register the demo game types into `registry`
pub fn register_demo_types(registry: &mut TypeRegistry) -> Result<()> {
    TypeBuilder::new("Transform", 12)
        .field("position", PropertyType::Vector2, 0)
        .field("rotation", PropertyType::Float, 8)
        .register(registry)?;

    TypeBuilder::new("GameObject", 16)
        .field("name", PropertyType::String, 0)
        .field("id", PropertyType::Int, 8)
        .field("active", PropertyType::Bool, 12)
        .register(registry)?;

    TypeBuilder::new("Entity", 40)
        .field("position", PropertyType::Vector2, 0)
        .field("velocity", PropertyType::Vector2, 8)
        .field("tint", PropertyType::Color, 16)
        .field("health", PropertyType::Int, 32)
        .read_only_field("id", PropertyType::Int, 36)
        .register(registry)?;

    Ok(())
}

/// A sealed registry holding the demo types
pub fn demo_registry() -> Result<TypeRegistry> {
    let mut registry = TypeRegistry::new();
    register_demo_types(&mut registry)?;
    registry.seal();
    Ok(registry)
}
