use std::collections::hash_map::{Entry, HashMap};

use log::{debug, trace, warn};

use crate::collision::bounding_box::BoundingBox;
use crate::collision::broadphase::{Broadphase, NaiveBroadphase, QuadtreeBroadphase};
use crate::collision::detection::{self, Collision};
use crate::collision::resolution;
use crate::error::PhysicsError;
use crate::integration::integrator;
use crate::math::vec2::Vec2;
use crate::objects::{Entities, Entity, EntityId, EntityOptions, EntityView};
use crate::world::config::{BroadphaseKind, IntegrationMode, WorldConfig};

/// Sub-step remainders shorter than this are treated as consumed.
pub const MIN_TIME_STEP_SIZE: f64 = 0.001;
/// Gap left between two discs after they are pushed apart.
pub const MIN_SEPARATION_DISTANCE: f64 = 0.001;
/// Squared speed below which a moving entity is brought to rest.
pub const REST_VELOCITY_THRESHOLD: f64 = 0.001;
/// Upper bound on overlap-removal passes over one group in a single step.
pub const MAX_SEPARATION_PASSES: usize = 64;
/// Upper bound on collision events handled for one island in a single step.
pub const MAX_SUB_STEPS: usize = 10_000;

const NO_GROUP: usize = usize::MAX;

/// Owns every entity and the broadphase, and advances them through time.
pub struct World {
    config: WorldConfig,
    entities: Entities,
    broadphase: Box<dyn Broadphase>,
    scratch: StepScratch,
}

impl World {
    /// Creates an empty world.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidConfiguration`] if the size is not positive and
    /// finite, or if a quadtree depth is below 1 or above
    /// [`MAX_QUADTREE_DEPTH`](crate::collision::quadtree::MAX_QUADTREE_DEPTH).
    pub fn new(config: WorldConfig) -> Result<Self, PhysicsError> {
        config.validate()?;
        let broadphase: Box<dyn Broadphase> = match config.broadphase {
            BroadphaseKind::Naive => Box::new(NaiveBroadphase::new()),
            BroadphaseKind::Quadtree { depth } => {
                let region = BoundingBox::from_extents(0.0, config.size, 0.0, config.size);
                Box::new(QuadtreeBroadphase::new(depth, region)?)
            }
        };
        debug!(
            "world created: size {}, broadphase {:?}, integration {:?}",
            config.size, config.broadphase, config.integration
        );

        Ok(World {
            config,
            entities: Entities::new(),
            broadphase,
            scratch: StepScratch::default(),
        })
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Creates an entity from `options` (unset fields take their defaults) and returns its id.
    pub fn spawn(&mut self, options: EntityOptions) -> Result<EntityId, PhysicsError> {
        let entity = Entity::from_options(&options)?;
        let bounds = entity.bounding_box();
        let id = self.entities.insert(entity);
        self.broadphase.add(id, &bounds);
        Ok(id)
    }

    /// Removes an entity, returning its final state.
    pub fn despawn(&mut self, id: EntityId) -> Result<EntityView, PhysicsError> {
        let entity = self
            .entities
            .remove(id)
            .ok_or(PhysicsError::BadEntityId { id })?;
        self.broadphase.remove(id, &entity.bounding_box());
        Ok(entity.view())
    }

    /// Same as [`World::despawn`].
    pub fn remove(&mut self, id: EntityId) -> Result<EntityView, PhysicsError> {
        self.despawn(id)
    }

    /// Merges the supplied fields into an entity. On error the entity is left as it was.
    pub fn update(&mut self, id: EntityId, options: EntityOptions) -> Result<(), PhysicsError> {
        let entity = self
            .entities
            .get_mut(id)
            .ok_or(PhysicsError::BadEntityId { id })?;
        let previous = entity.bounding_box();
        entity.apply(&options)?;
        if options.changes_bounds() {
            let current = entity.bounding_box();
            self.broadphase.moved(id, &previous, &current);
        }
        Ok(())
    }

    /// A snapshot of an entity's current state.
    pub fn entity_view(&self, id: EntityId) -> Result<EntityView, PhysicsError> {
        self.entities
            .get(id)
            .map(Entity::view)
            .ok_or(PhysicsError::BadEntityId { id })
    }

    /// Calls `callback` with a snapshot of every entity, in storage order. Removing an
    /// entity moves the most recently stored one into its place.
    pub fn for_each_entity<F>(&self, mut callback: F)
    where
        F: FnMut(EntityId, EntityView),
    {
        for (id, entity) in self.entities.iter() {
            callback(id, entity.view());
        }
    }

    /// Calls `callback` with every group of entities the broadphase considers close enough
    /// to collide. Useful for debug drawing.
    pub fn for_each_candidate_group<F>(&self, mut callback: F)
    where
        F: FnMut(&[EntityId]),
    {
        self.broadphase.for_each_group_of_at_least(2, &mut callback);
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains(id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Removes every entity. Ids already handed out are not reused.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.broadphase.clear();
    }

    /// Advances the simulation by `dt`.
    ///
    /// Overlaps left from the previous step (or from spawning) are removed first, then
    /// entities are integrated according to the configured [`IntegrationMode`], and finally
    /// entities that have almost stopped are brought to rest. A `dt` that is NaN or not
    /// positive does nothing.
    pub fn step(&mut self, dt: f64) {
        if dt.is_nan() || dt <= 0.0 {
            warn!("ignoring step with non-positive dt {dt}");
            return;
        }

        self.separate_intersecting();
        match self.config.integration {
            IntegrationMode::WholeStep => self.integrate_whole_step(dt),
            IntegrationMode::Piecewise => self.integrate_piecewise(dt),
        }
        self.settle_resting();
    }

    /// Pushes apart and bounces every pair that currently overlaps within a broadphase group.
    fn separate_intersecting(&mut self) {
        let World {
            entities,
            broadphase,
            scratch,
            ..
        } = self;
        let StepScratch {
            groups,
            paired,
            pairs,
            moved,
            ..
        } = scratch;

        groups.snapshot(&**broadphase);
        for g in 0..groups.len() {
            let group = groups.get(g);
            let mut settled = false;
            for _ in 0..MAX_SEPARATION_PASSES {
                pairs.clear();
                detection::find_intersecting_pairs(entities, group, paired, pairs);
                if pairs.is_empty() {
                    settled = true;
                    break;
                }
                for &(id_a, id_b) in pairs.iter() {
                    let Some((a, b)) = entities.get_pair_mut(id_a, id_b) else {
                        continue;
                    };
                    moved.record(id_a, a);
                    moved.record(id_b, b);
                    resolution::separate(a, b, MIN_SEPARATION_DISTANCE);
                    resolution::resolve(a, b);
                }
            }
            if !settled {
                warn!(
                    "group of {} entities still overlapping after {} separation passes",
                    group.len(),
                    MAX_SEPARATION_PASSES
                );
            }
        }

        moved.flush(entities, &mut **broadphase);
    }

    fn integrate_whole_step(&mut self, dt: f64) {
        let World {
            entities,
            broadphase,
            scratch,
            ..
        } = self;

        for (id, entity) in entities.iter_mut() {
            if entity.is_static {
                continue;
            }
            scratch.moved.record(id, entity);
            integrator::integrate(entity, dt);
        }
        scratch.moved.flush(entities, &mut **broadphase);
    }

    /// Integrates each island of overlapping groups in sub-steps that stop at every
    /// predicted collision, so no pair within a group passes through each other.
    fn integrate_piecewise(&mut self, dt: f64) {
        let World {
            entities,
            broadphase,
            scratch,
            ..
        } = self;
        let StepScratch {
            groups,
            owner,
            parent,
            island_of_root,
            islands,
            moved,
            ..
        } = scratch;

        groups.snapshot(&**broadphase);

        // Every entity is owned by the first group it shows up in. Groups that share an
        // entity must be stepped together, so they are merged into one island.
        owner.clear();
        owner.resize(entities.len(), NO_GROUP);
        parent.clear();
        parent.extend(0..groups.len());
        for g in 0..groups.len() {
            for &id in groups.get(g) {
                let Some(slot) = entities.slot(id) else {
                    continue;
                };
                match owner[slot] {
                    NO_GROUP => owner[slot] = g,
                    first => union(parent, first, g),
                }
            }
        }

        island_of_root.clear();
        island_of_root.resize(groups.len(), NO_GROUP);
        let mut island_count = 0;
        for g in 0..groups.len() {
            let root = find(parent, g);
            if island_of_root[root] == NO_GROUP {
                island_of_root[root] = island_count;
                if islands.len() == island_count {
                    islands.push(Vec::new());
                }
                islands[island_count].clear();
                island_count += 1;
            }
            islands[island_of_root[root]].push(g);
        }

        for island in &islands[..island_count] {
            let island = Island {
                groups,
                owner,
                members: island,
            };
            step_island(entities, &island, moved, dt);
        }

        // Entities outside every group have nothing to hit this step.
        for (slot, (id, entity)) in entities.iter_mut().enumerate() {
            let grouped = owner.get(slot).is_some_and(|&g| g != NO_GROUP);
            if entity.is_static || grouped {
                continue;
            }
            moved.record(id, entity);
            integrator::integrate(entity, dt);
        }

        moved.flush(entities, &mut **broadphase);
    }

    fn settle_resting(&mut self) {
        for (_, entity) in self.entities.iter_mut() {
            if !entity.is_static && entity.velocity.magnitude_squared() < REST_VELOCITY_THRESHOLD {
                entity.velocity = Vec2::ZERO;
            }
        }
    }
}

/// A set of broadphase groups that share entities, stepped as one unit.
struct Island<'a> {
    groups: &'a Groups,
    /// First group each entity appeared in, indexed by storage slot.
    owner: &'a [usize],
    /// Indices into `groups`.
    members: &'a [usize],
}

impl Island<'_> {
    fn earliest_collision(&self, entities: &Entities, horizon: f64) -> Option<Collision> {
        let mut earliest: Option<Collision> = None;
        for &g in self.members {
            let found = detection::earliest_collision(entities, self.groups.get(g), horizon);
            if let Some(collision) = found {
                if earliest.is_none_or(|e| collision.time < e.time) {
                    earliest = Some(collision);
                }
            }
        }
        earliest
    }

    /// Integrates every movable entity of the island exactly once.
    fn advance(&self, entities: &mut Entities, moved: &mut MovedEntities, dt: f64) {
        for &g in self.members {
            for &id in self.groups.get(g) {
                let owned = entities
                    .slot(id)
                    .is_some_and(|slot| self.owner.get(slot) == Some(&g));
                if !owned {
                    continue;
                }
                let Some(entity) = entities.get_mut(id) else {
                    continue;
                };
                if entity.is_static {
                    continue;
                }
                moved.record(id, entity);
                integrator::integrate(entity, dt);
            }
        }
    }
}

fn step_island(entities: &mut Entities, island: &Island<'_>, moved: &mut MovedEntities, dt: f64) {
    let mut remaining = dt;
    let mut sub_steps = 0;
    loop {
        if sub_steps == MAX_SUB_STEPS {
            warn!(
                "island hit {} collision events in one step; integrating the last {} without collisions",
                MAX_SUB_STEPS, remaining
            );
            island.advance(entities, moved, remaining);
            break;
        }
        sub_steps += 1;

        let next = island.earliest_collision(entities, remaining);
        let step = next.map_or(remaining, |collision| collision.time.min(remaining));
        island.advance(entities, moved, step);

        if let Some(collision) = next {
            if let Some((a, b)) = entities.get_pair_mut(collision.a, collision.b) {
                moved.record(collision.a, a);
                moved.record(collision.b, b);
                resolution::separate(a, b, MIN_SEPARATION_DISTANCE);
                resolution::resolve(a, b);
                trace!(
                    "resolved collision between {} and {} at t = {}",
                    collision.a,
                    collision.b,
                    dt - remaining + step
                );
            }
        }

        remaining -= step;
        if remaining < MIN_TIME_STEP_SIZE {
            break;
        }
    }
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let root_a = find(parent, a);
    let root_b = find(parent, b);
    if root_a != root_b {
        // Lower index stays root so island order follows group order.
        let (low, high) = if root_a < root_b { (root_a, root_b) } else { (root_b, root_a) };
        parent[high] = low;
    }
}

/// Broadphase groups copied out for one step, stored back to back.
#[derive(Debug, Default)]
struct Groups {
    items: Vec<EntityId>,
    ranges: Vec<(usize, usize)>,
}

impl Groups {
    fn snapshot(&mut self, broadphase: &dyn Broadphase) {
        let Groups { items, ranges } = self;
        items.clear();
        ranges.clear();
        broadphase.for_each_group_of_at_least(2, &mut |group| {
            let start = items.len();
            items.extend_from_slice(group);
            ranges.push((start, items.len()));
        });
    }

    fn len(&self) -> usize {
        self.ranges.len()
    }

    fn get(&self, index: usize) -> &[EntityId] {
        let (start, end) = self.ranges[index];
        &self.items[start..end]
    }
}

/// Positions entities had before they first moved in the current step, so the broadphase
/// can be updated once per entity at the end of a phase.
#[derive(Debug, Default)]
struct MovedEntities {
    old_positions: HashMap<EntityId, Vec2>,
    ids: Vec<EntityId>,
}

impl MovedEntities {
    /// Remembers where a movable entity is now, unless it already moved earlier.
    fn record(&mut self, id: EntityId, entity: &Entity) {
        if entity.is_static {
            return;
        }
        if let Entry::Vacant(slot) = self.old_positions.entry(id) {
            slot.insert(entity.position);
            self.ids.push(id);
        }
    }

    fn flush(&mut self, entities: &Entities, broadphase: &mut dyn Broadphase) {
        for &id in &self.ids {
            let Some(old_position) = self.old_positions.remove(&id) else {
                continue;
            };
            let Some(entity) = entities.get(id) else {
                continue;
            };
            let previous = entity.bounding_box_at(old_position);
            let current = entity.bounding_box();
            if previous != current {
                broadphase.moved(id, &previous, &current);
            }
        }
        self.ids.clear();
    }
}

/// Buffers reused from step to step.
#[derive(Debug, Default)]
struct StepScratch {
    groups: Groups,
    paired: Vec<bool>,
    pairs: Vec<(EntityId, EntityId)>,
    /// First group each entity appears in, by storage slot.
    owner: Vec<usize>,
    /// Union-find parents over group indices.
    parent: Vec<usize>,
    island_of_root: Vec<usize>,
    islands: Vec<Vec<usize>>,
    moved: MovedEntities,
}
