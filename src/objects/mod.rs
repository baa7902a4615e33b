pub mod entity;

// Re-export key types
pub use entity::{Entities, Entity, EntityId, EntityOptions, EntityView, STATIC_ENTITY_MASS};
