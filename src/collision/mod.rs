pub mod bounding_box;
pub mod broadphase;
pub mod detection;
pub mod quadtree;
pub mod resolution;

// Re-export key types
pub use bounding_box::BoundingBox;
pub use broadphase::{Broadphase, NaiveBroadphase, QuadtreeBroadphase};
pub use detection::{intersects, time_of_collision, Collision};
pub use quadtree::Quadtree;
pub use resolution::{resolve, separate};
