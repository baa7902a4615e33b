use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::collision::bounding_box::BoundingBox;
use crate::error::PhysicsError;
use crate::math::vec2::Vec2;

/// Identifier of an entity inside a [`World`](crate::world::World).
/// Ids are handed out in increasing order and never reused.
pub type EntityId = usize;

/// Mass given to static entities. Large enough to act as an immovable reference in the
/// impulse formulas while keeping them finite.
pub const STATIC_ENTITY_MASS: f64 = 1e14;

/// A disc-shaped rigid body.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    // Physical properties
    pub mass: f64,
    pub radius: f64,
    /// Contribution to the coefficient of restitution of a collision.
    pub elasticity: f64,
    /// Static entities never move; their velocity is kept at zero.
    pub is_static: bool,
    /// Derived from mass and radius: `0.5 * m * r²`.
    pub moment_of_inertia: f64,

    // Primary state
    pub position: Vec2,
    pub velocity: Vec2,
    pub rotation: f64,
    pub angular_velocity: f64,

    // Applied loads. These persist across steps until the caller changes them.
    pub applied_force: Vec2,
    pub applied_torque: f64,
}

impl Default for Entity {
    /// A unit disc at rest at the origin: mass 1, radius 1, elasticity 0.
    fn default() -> Self {
        let mut entity = Entity {
            mass: 1.0,
            radius: 1.0,
            elasticity: 0.0,
            is_static: false,
            moment_of_inertia: 0.0,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            rotation: 0.0,
            angular_velocity: 0.0,
            applied_force: Vec2::ZERO,
            applied_torque: 0.0,
        };
        entity.refresh_derived();
        entity
    }
}

impl Entity {
    /// Builds an entity from defaults overridden by whatever `options` supplies.
    pub fn from_options(options: &EntityOptions) -> Result<Self, PhysicsError> {
        let mut entity = Entity::default();
        entity.apply(options)?;
        Ok(entity)
    }

    /// Merges the supplied fields into this entity.
    ///
    /// Nothing is changed if the merged entity would be invalid.
    pub fn apply(&mut self, options: &EntityOptions) -> Result<(), PhysicsError> {
        let mut merged = self.clone();
        if let Some(mass) = options.mass {
            merged.mass = mass;
        }
        if let Some(radius) = options.radius {
            merged.radius = radius;
        }
        if let Some(elasticity) = options.elasticity {
            merged.elasticity = elasticity;
        }
        if let Some(is_static) = options.is_static {
            merged.is_static = is_static;
        }
        if let Some(position) = options.position {
            merged.position = position;
        }
        if let Some(velocity) = options.velocity {
            merged.velocity = velocity;
        }
        if let Some(applied_force) = options.applied_force {
            merged.applied_force = applied_force;
        }
        if let Some(rotation) = options.rotation {
            merged.rotation = rotation;
        }
        if let Some(angular_velocity) = options.angular_velocity {
            merged.angular_velocity = angular_velocity;
        }
        if let Some(applied_torque) = options.applied_torque {
            merged.applied_torque = applied_torque;
        }

        merged.refresh_derived();
        merged.validate()?;
        *self = merged;
        Ok(())
    }

    /// The box enclosing the disc at its current position.
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_center_and_radius(self.position, self.radius)
    }

    /// The box enclosing the disc if it were centered at `position`.
    pub fn bounding_box_at(&self, position: Vec2) -> BoundingBox {
        BoundingBox::from_center_and_radius(position, self.radius)
    }

    pub fn inverse_mass(&self) -> f64 {
        1.0 / self.mass
    }

    pub fn inverse_inertia(&self) -> f64 {
        1.0 / self.moment_of_inertia
    }

    /// Linear momentum `m * v`.
    pub fn momentum(&self) -> Vec2 {
        self.velocity * self.mass
    }

    /// Translational kinetic energy `0.5 * m * |v|²`.
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocity.magnitude_squared()
    }

    /// An independent copy of the entity's state.
    pub fn view(&self) -> EntityView {
        EntityView {
            mass: self.mass,
            radius: self.radius,
            elasticity: self.elasticity,
            is_static: self.is_static,
            moment_of_inertia: self.moment_of_inertia,
            position: self.position,
            velocity: self.velocity,
            rotation: self.rotation,
            angular_velocity: self.angular_velocity,
            applied_force: self.applied_force,
            applied_torque: self.applied_torque,
        }
    }

    /// Re-establishes the static and inertia invariants after fields changed.
    fn refresh_derived(&mut self) {
        if self.is_static {
            self.mass = STATIC_ENTITY_MASS;
            self.velocity = Vec2::ZERO;
            self.angular_velocity = 0.0;
        }
        self.moment_of_inertia = 0.5 * self.mass * self.radius * self.radius;
    }

    fn validate(&self) -> Result<(), PhysicsError> {
        if !(self.mass.is_finite() && self.mass > 0.0) {
            return Err(PhysicsError::InvalidEntity {
                reason: "mass must be positive and finite",
            });
        }
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(PhysicsError::InvalidEntity {
                reason: "radius must be positive and finite",
            });
        }
        if !(self.elasticity.is_finite() && self.elasticity >= 0.0) {
            return Err(PhysicsError::InvalidEntity {
                reason: "elasticity must be non-negative and finite",
            });
        }
        let vectors_finite = self.position.is_finite()
            && self.velocity.is_finite()
            && self.applied_force.is_finite();
        let scalars_finite = self.rotation.is_finite()
            && self.angular_velocity.is_finite()
            && self.applied_torque.is_finite();
        if !(vectors_finite && scalars_finite) {
            return Err(PhysicsError::InvalidEntity {
                reason: "state must be finite",
            });
        }
        // Tiny masses or radii can pass the checks above and still underflow here.
        if !self.inverse_mass().is_finite() {
            return Err(PhysicsError::InvalidEntity {
                reason: "mass is too small to invert",
            });
        }
        let inertia_usable = self.moment_of_inertia.is_finite()
            && self.moment_of_inertia > 0.0
            && self.inverse_inertia().is_finite();
        if !inertia_usable {
            return Err(PhysicsError::InvalidEntity {
                reason: "moment of inertia must be positive and finite",
            });
        }
        Ok(())
    }
}

/// A partial set of entity fields, used both to spawn entities and to update them.
/// Unset fields fall back to defaults on spawn and are left untouched on update.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityOptions {
    pub mass: Option<f64>,
    pub radius: Option<f64>,
    pub elasticity: Option<f64>,
    pub is_static: Option<bool>,
    pub position: Option<Vec2>,
    pub velocity: Option<Vec2>,
    pub applied_force: Option<Vec2>,
    pub rotation: Option<f64>,
    pub angular_velocity: Option<f64>,
    pub applied_torque: Option<f64>,
}

impl EntityOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mass(mut self, mass: f64) -> Self {
        self.mass = Some(mass);
        self
    }

    pub fn radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn elasticity(mut self, elasticity: f64) -> Self {
        self.elasticity = Some(elasticity);
        self
    }

    pub fn is_static(mut self, is_static: bool) -> Self {
        self.is_static = Some(is_static);
        self
    }

    pub fn position(mut self, position: Vec2) -> Self {
        self.position = Some(position);
        self
    }

    pub fn velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub fn applied_force(mut self, applied_force: Vec2) -> Self {
        self.applied_force = Some(applied_force);
        self
    }

    pub fn rotation(mut self, rotation: f64) -> Self {
        self.rotation = Some(rotation);
        self
    }

    pub fn angular_velocity(mut self, angular_velocity: f64) -> Self {
        self.angular_velocity = Some(angular_velocity);
        self
    }

    pub fn applied_torque(mut self, applied_torque: f64) -> Self {
        self.applied_torque = Some(applied_torque);
        self
    }

    /// True when applying these options can change the entity's bounding box.
    pub fn changes_bounds(&self) -> bool {
        self.position.is_some() || self.radius.is_some()
    }
}

/// A read-only snapshot of an entity, handed out to renderers and other callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    pub mass: f64,
    pub radius: f64,
    pub elasticity: f64,
    pub is_static: bool,
    pub moment_of_inertia: f64,
    pub position: Vec2,
    pub velocity: Vec2,
    pub rotation: f64,
    pub angular_velocity: f64,
    pub applied_force: Vec2,
    pub applied_torque: f64,
}

/// Dense storage for entities, addressed by id.
///
/// Entities sit back to back in a `Vec`; removal swaps the last entity into the freed
/// slot, so memory follows the live count rather than the number of ids ever issued.
/// Ids are handed out in increasing order and never reused.
#[derive(Debug, Default, Clone)]
pub struct Entities {
    ids: Vec<EntityId>,
    entities: Vec<Entity>,
    slots: HashMap<EntityId, usize>,
    next_id: EntityId,
}

impl Entities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the entity under the next unused id.
    pub fn insert(&mut self, entity: Entity) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        self.slots.insert(id, self.entities.len());
        self.ids.push(id);
        self.entities.push(entity);
        id
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let slot = self.slots.remove(&id)?;
        self.ids.swap_remove(slot);
        let removed = self.entities.swap_remove(slot);
        // The former last entity now lives in `slot`.
        if let Some(&moved_id) = self.ids.get(slot) {
            self.slots.insert(moved_id, slot);
        }
        Some(removed)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        let &slot = self.slots.get(&id)?;
        self.entities.get(slot)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let &slot = self.slots.get(&id)?;
        self.entities.get_mut(slot)
    }

    /// Mutable references to two distinct live entities.
    pub fn get_pair_mut(&mut self, a: EntityId, b: EntityId) -> Option<(&mut Entity, &mut Entity)> {
        let slot_a = self.slot(a)?;
        let slot_b = self.slot(b)?;
        if slot_a == slot_b {
            return None;
        }
        // split_at_mut needs the smaller index first.
        if slot_a < slot_b {
            let (left, right) = self.entities.split_at_mut(slot_b);
            Some((&mut left[slot_a], &mut right[0]))
        } else {
            let (left, right) = self.entities.split_at_mut(slot_a);
            Some((&mut right[0], &mut left[slot_b]))
        }
    }

    /// Position of a live entity in storage order. Stable until the next removal.
    pub fn slot(&self, id: EntityId) -> Option<usize> {
        self.slots.get(&id).copied()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The id the next inserted entity will get.
    pub fn next_id(&self) -> EntityId {
        self.next_id
    }

    /// Removes every entity. Ids already handed out stay retired.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.entities.clear();
        self.slots.clear();
    }

    /// Live entities in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.ids.iter().copied().zip(self.entities.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut Entity)> {
        self.ids.iter().copied().zip(self.entities.iter_mut())
    }
}
