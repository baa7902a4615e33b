pub mod collision;
pub mod error;
pub mod integration;
pub mod math;
pub mod objects;
pub mod world;

// Re-export key types for easier use
pub use collision::{BoundingBox, Broadphase, NaiveBroadphase, Quadtree, QuadtreeBroadphase};
pub use error::PhysicsError;
pub use math::vec2::Vec2;
pub use objects::{EntityId, EntityOptions, EntityView, STATIC_ENTITY_MASS};
pub use world::{BroadphaseKind, IntegrationMode, World, WorldConfig};
