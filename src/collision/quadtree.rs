// A fixed-depth region quadtree that files items by bounding box.

use log::debug;

use crate::collision::bounding_box::BoundingBox;
use crate::error::PhysicsError;
use crate::math::vec2::Vec2;

/// Deepest tree we agree to build; a depth-12 tree already has ~5.6M nodes.
pub const MAX_QUADTREE_DEPTH: usize = 12;

const ROOT: usize = 0;

// Child slots of an internal node.
const SW: usize = 0;
const SE: usize = 1;
const NW: usize = 2;
const NE: usize = 3;

#[derive(Debug, Clone)]
enum NodeKind<T> {
    Leaf { items: Vec<T> },
    Internal { children: [usize; 4] },
}

#[derive(Debug, Clone)]
struct Node<T> {
    bounds: BoundingBox,
    center: Vec2,
    /// Number of (item, leaf) associations in this subtree.
    population: usize,
    kind: NodeKind<T>,
}

/// A quadtree of fixed depth over a rectangular region.
///
/// Items are filed into every leaf their bounding box overlaps (touching counts), so an
/// item near a split line can live in several leaves at once. The tree is built fully
/// at construction time and never changes shape afterwards.
///
/// Nodes are kept in a flat arena; internal nodes refer to their children by index.
#[derive(Debug, Clone)]
pub struct Quadtree<T> {
    depth: usize,
    nodes: Vec<Node<T>>,
}

impl<T: Copy + PartialEq> Quadtree<T> {
    /// Builds a tree with `depth` levels over `bounds`. Depth 1 is a single leaf.
    ///
    /// # Errors
    /// Returns [`PhysicsError::InvalidConfiguration`] when `depth` is 0 or larger than
    /// [`MAX_QUADTREE_DEPTH`].
    pub fn new(depth: usize, bounds: BoundingBox) -> Result<Self, PhysicsError> {
        if depth < 1 {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "quadtree depth must be at least 1",
            });
        }
        if depth > MAX_QUADTREE_DEPTH {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "quadtree depth exceeds the supported maximum",
            });
        }

        // (4^depth - 1) / 3 nodes in a complete tree.
        let node_count = ((1usize << (2 * depth)) - 1) / 3;
        let mut tree = Quadtree {
            depth,
            nodes: Vec::with_capacity(node_count),
        };
        tree.build(depth, bounds);
        debug!(
            "Creating Quadtree: bounds={:?}, depth={}, nodes={}, leaves={}",
            bounds,
            depth,
            tree.nodes.len(),
            1usize << (2 * (depth - 1))
        );
        Ok(tree)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The region covered by the root node.
    pub fn bounds(&self) -> BoundingBox {
        self.nodes[ROOT].bounds
    }

    /// Total number of (item, leaf) associations in the tree.
    pub fn population_count(&self) -> usize {
        self.nodes[ROOT].population
    }

    pub fn is_empty(&self) -> bool {
        self.population_count() == 0
    }

    /// Removes every item while keeping the tree's shape and allocations.
    pub fn clear(&mut self) {
        for node in self.nodes.iter_mut() {
            node.population = 0;
            if let NodeKind::Leaf { items } = &mut node.kind {
                items.clear();
            }
        }
    }

    /// Files `item` into every leaf overlapped by `region`. Adding an item twice is a no-op.
    ///
    /// Returns false when `region` misses the tree entirely.
    pub fn add(&mut self, item: T, region: &BoundingBox) -> bool {
        if !region.overlaps(&self.bounds()) {
            return false;
        }
        self.associate(ROOT, item, region);
        true
    }

    /// Removes `item` from every leaf overlapped by `region`.
    ///
    /// Returns false when `region` misses the tree entirely.
    pub fn remove(&mut self, item: T, region: &BoundingBox) -> bool {
        if !region.overlaps(&self.bounds()) {
            return false;
        }
        self.disassociate(ROOT, item, region);
        true
    }

    /// Updates the leaves of an item whose box changed from `previous` to `current`.
    ///
    /// Subtrees lying inside both boxes are skipped, so the cost follows the area the item
    /// actually swept. Returns false when the item ends up outside the tree.
    pub fn move_item(&mut self, item: T, previous: &BoundingBox, current: &BoundingBox) -> bool {
        let bounds = self.bounds();
        if !current.overlaps(&bounds) {
            if previous.overlaps(&bounds) {
                self.disassociate(ROOT, item, previous);
            }
            return false;
        }

        let intersection = previous.intersection(current);
        if intersection.is_degenerate() {
            if previous.overlaps(&bounds) {
                self.disassociate(ROOT, item, previous);
            }
            self.associate(ROOT, item, current);
        } else {
            let union = previous.union(current);
            self.relocate(ROOT, item, previous, current, &union, &intersection);
        }
        true
    }

    /// Calls `callback` with the items of every leaf holding at least `threshold` items.
    pub fn for_each_leaf_with_at_least<F>(&self, threshold: usize, mut callback: F)
    where
        F: FnMut(&[T]),
    {
        self.visit_leaves_with_at_least(ROOT, threshold, &mut callback);
    }

    /// Calls `callback` with the bounds and items of every leaf, empty ones included.
    pub fn for_each_leaf<F>(&self, mut callback: F)
    where
        F: FnMut(&BoundingBox, &[T]),
    {
        for node in &self.nodes {
            if let NodeKind::Leaf { items } = &node.kind {
                callback(&node.bounds, items);
            }
        }
    }

    // --- Helper Methods ---

    /// Recursively pushes the subtree rooted at a new node and returns its index.
    fn build(&mut self, depth: usize, bounds: BoundingBox) -> usize {
        let index = self.nodes.len();
        let center = bounds.center();
        self.nodes.push(Node {
            bounds,
            center,
            population: 0,
            kind: NodeKind::Leaf { items: Vec::new() },
        });

        if depth > 1 {
            let child_depth = depth - 1;
            let b = bounds;
            let c = center;
            // Built from shared edges so siblings tile the parent exactly.
            let children = [
                self.build(child_depth, BoundingBox::from_extents(b.left, c.x, b.bottom, c.y)),
                self.build(child_depth, BoundingBox::from_extents(c.x, b.right, b.bottom, c.y)),
                self.build(child_depth, BoundingBox::from_extents(b.left, c.x, c.y, b.top)),
                self.build(child_depth, BoundingBox::from_extents(c.x, b.right, c.y, b.top)),
            ];
            self.nodes[index].kind = NodeKind::Internal { children };
        }
        index
    }

    /// The children of an internal node whose quadrant `region` touches.
    /// Assumes `region` overlaps the node itself.
    fn overlapping_children(&self, index: usize, region: &BoundingBox) -> [Option<usize>; 4] {
        let node = &self.nodes[index];
        let NodeKind::Internal { children } = &node.kind else {
            return [None; 4];
        };
        let Vec2 { x, y } = node.center;
        let west = region.left <= x;
        let east = region.right >= x;
        let south = region.bottom <= y;
        let north = region.top >= y;
        [
            (west && south).then_some(children[SW]),
            (east && south).then_some(children[SE]),
            (west && north).then_some(children[NW]),
            (east && north).then_some(children[NE]),
        ]
    }

    fn adjust_population(&mut self, index: usize, delta: isize) {
        let node = &mut self.nodes[index];
        node.population = node.population.wrapping_add_signed(delta);
    }

    fn associate(&mut self, index: usize, item: T, region: &BoundingBox) -> usize {
        let added = if let NodeKind::Leaf { items } = &mut self.nodes[index].kind {
            if items.contains(&item) {
                0
            } else {
                items.push(item);
                1
            }
        } else {
            self.overlapping_children(index, region)
                .into_iter()
                .flatten()
                .map(|child| self.associate(child, item, region))
                .sum()
        };
        self.nodes[index].population += added;
        added
    }

    fn disassociate(&mut self, index: usize, item: T, region: &BoundingBox) -> usize {
        let removed = if let NodeKind::Leaf { items } = &mut self.nodes[index].kind {
            match items.iter().position(|existing| *existing == item) {
                Some(position) => {
                    items.remove(position);
                    1
                }
                None => 0,
            }
        } else {
            self.overlapping_children(index, region)
                .into_iter()
                .flatten()
                .map(|child| self.disassociate(child, item, region))
                .sum()
        };
        self.nodes[index].population -= removed;
        removed
    }

    /// Returns the change in population of the subtree.
    fn relocate(
        &mut self,
        index: usize,
        item: T,
        previous: &BoundingBox,
        current: &BoundingBox,
        union: &BoundingBox,
        intersection: &BoundingBox,
    ) -> isize {
        let node_bounds = self.nodes[index].bounds;
        let delta = if let NodeKind::Leaf { items } = &mut self.nodes[index].kind {
            let in_previous = previous.overlaps(&node_bounds);
            let in_current = current.overlaps(&node_bounds);
            let position = items.iter().position(|existing| *existing == item);
            match (in_previous, in_current, position) {
                (true, false, Some(position)) => {
                    items.remove(position);
                    -1
                }
                (false, true, None) => {
                    items.push(item);
                    1
                }
                _ => 0,
            }
        } else if intersection.contains(&node_bounds) {
            // Both boxes cover the whole node: membership below cannot change.
            0
        } else {
            self.overlapping_children(index, union)
                .into_iter()
                .flatten()
                .map(|child| self.relocate(child, item, previous, current, union, intersection))
                .sum()
        };
        self.adjust_population(index, delta);
        delta
    }

    fn visit_leaves_with_at_least<F>(&self, index: usize, threshold: usize, callback: &mut F)
    where
        F: FnMut(&[T]),
    {
        let node = &self.nodes[index];
        if node.population < threshold {
            return;
        }
        match &node.kind {
            NodeKind::Leaf { items } => callback(items),
            NodeKind::Internal { children } => {
                for &child in children {
                    self.visit_leaves_with_at_least(child, threshold, callback);
                }
            }
        }
    }
}
