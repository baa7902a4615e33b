// Broadphase strategies: narrow all-pairs checks down to groups of nearby entities.

use crate::collision::bounding_box::BoundingBox;
use crate::collision::quadtree::Quadtree;
use crate::error::PhysicsError;
use crate::objects::EntityId;

/// A coarse spatial index over entity bounding boxes.
///
/// Entities that can possibly touch each other are guaranteed to share at least one
/// group; entities in different groups are never checked against each other.
pub trait Broadphase {
    /// Forgets every entity.
    fn clear(&mut self);

    fn add(&mut self, id: EntityId, bounds: &BoundingBox);

    fn remove(&mut self, id: EntityId, bounds: &BoundingBox);

    /// Tells the index that an entity's box changed from `previous` to `current`.
    fn moved(&mut self, id: EntityId, previous: &BoundingBox, current: &BoundingBox);

    /// Calls `callback` once per candidate group holding at least `threshold` entities.
    fn for_each_group_of_at_least(&self, threshold: usize, callback: &mut dyn FnMut(&[EntityId]));
}

/// No culling at all: every entity lands in one big group.
#[derive(Debug, Default, Clone)]
pub struct NaiveBroadphase {
    entities: Vec<EntityId>,
}

impl NaiveBroadphase {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Broadphase for NaiveBroadphase {
    fn clear(&mut self) {
        self.entities.clear();
    }

    fn add(&mut self, id: EntityId, _bounds: &BoundingBox) {
        if !self.entities.contains(&id) {
            self.entities.push(id);
        }
    }

    fn remove(&mut self, id: EntityId, _bounds: &BoundingBox) {
        if let Some(position) = self.entities.iter().position(|&e| e == id) {
            self.entities.remove(position);
        }
    }

    fn moved(&mut self, _id: EntityId, _previous: &BoundingBox, _current: &BoundingBox) {}

    fn for_each_group_of_at_least(&self, threshold: usize, callback: &mut dyn FnMut(&[EntityId])) {
        if self.entities.len() >= threshold {
            callback(&self.entities);
        }
    }
}

/// Groups entities by the quadtree leaves their bounding boxes overlap.
///
/// Boxes are clamped into the tree's region before filing, so entities that wander
/// outside it pile up in the border leaves instead of dropping out of every group.
#[derive(Debug, Clone)]
pub struct QuadtreeBroadphase {
    tree: Quadtree<EntityId>,
}

impl QuadtreeBroadphase {
    /// Builds an empty broadphase over `bounds` with a tree of the given depth.
    pub fn new(depth: usize, bounds: BoundingBox) -> Result<Self, PhysicsError> {
        Ok(Self {
            tree: Quadtree::new(depth, bounds)?,
        })
    }

    pub fn tree(&self) -> &Quadtree<EntityId> {
        &self.tree
    }

    fn filed_box(&self, bounds: &BoundingBox) -> BoundingBox {
        bounds.clamp_to(&self.tree.bounds())
    }
}

impl Broadphase for QuadtreeBroadphase {
    fn clear(&mut self) {
        self.tree.clear();
    }

    fn add(&mut self, id: EntityId, bounds: &BoundingBox) {
        let filed = self.filed_box(bounds);
        self.tree.add(id, &filed);
    }

    fn remove(&mut self, id: EntityId, bounds: &BoundingBox) {
        let filed = self.filed_box(bounds);
        self.tree.remove(id, &filed);
    }

    fn moved(&mut self, id: EntityId, previous: &BoundingBox, current: &BoundingBox) {
        let previous = self.filed_box(previous);
        let current = self.filed_box(current);
        if previous != current {
            self.tree.move_item(id, &previous, &current);
        }
    }

    fn for_each_group_of_at_least(&self, threshold: usize, callback: &mut dyn FnMut(&[EntityId])) {
        self.tree.for_each_leaf_with_at_least(threshold, |items| callback(items));
    }
}
