pub mod config;
pub mod physics_world;

pub use config::{BroadphaseKind, IntegrationMode, WorldConfig};
pub use physics_world::World;
