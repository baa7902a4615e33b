// Axis-aligned bounding boxes used by the broadphase.

use serde::{Deserialize, Serialize};

use crate::math::vec2::Vec2;

/// An axis-aligned box given by its four edges, with `right >= left` and `top >= bottom`
/// for every box built through the constructors.
///
/// Boxes returned by [`BoundingBox::intersection`] may be degenerate; check
/// [`BoundingBox::is_degenerate`] before relying on them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
}

impl BoundingBox {
    /// Creates a box from its edges, swapping them if they are given in the wrong order.
    pub fn from_extents(left: f64, right: f64, bottom: f64, top: f64) -> Self {
        BoundingBox {
            left: left.min(right),
            right: left.max(right),
            bottom: bottom.min(top),
            top: bottom.max(top),
        }
    }

    /// The box enclosing a disc.
    pub fn from_center_and_radius(center: Vec2, radius: f64) -> Self {
        let radius = radius.abs();
        BoundingBox {
            left: center.x - radius,
            right: center.x + radius,
            bottom: center.y - radius,
            top: center.y + radius,
        }
    }

    /// A box of the given width and height centered on `center`.
    pub fn from_center_and_size(center: Vec2, width: f64, height: f64) -> Self {
        let w2 = 0.5 * width.abs();
        let h2 = 0.5 * height.abs();
        BoundingBox {
            left: center.x - w2,
            right: center.x + w2,
            bottom: center.y - h2,
            top: center.y + h2,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            0.5 * (self.left + self.right),
            0.5 * (self.bottom + self.top),
        )
    }

    /// Checks if this box overlaps another. Touching edges count as overlapping.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        other.left <= self.right
            && other.right >= self.left
            && other.bottom <= self.top
            && other.top >= self.bottom
    }

    /// Checks if `other` lies entirely inside this box (edges inclusive).
    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.left >= self.left
            && other.right <= self.right
            && other.bottom >= self.bottom
            && other.top <= self.top
    }

    /// The smallest box containing both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            left: self.left.min(other.left),
            right: self.right.max(other.right),
            bottom: self.bottom.min(other.bottom),
            top: self.top.max(other.top),
        }
    }

    /// The region shared by both boxes. Degenerate when they don't really overlap.
    pub fn intersection(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            left: self.left.max(other.left),
            right: self.right.min(other.right),
            bottom: self.bottom.max(other.bottom),
            top: self.top.min(other.top),
        }
    }

    /// Squeezes the box into `region`. A box lying wholly outside collapses onto the
    /// nearest edge or corner of `region`.
    pub fn clamp_to(&self, region: &BoundingBox) -> BoundingBox {
        let min = Vec2::new(region.left, region.bottom);
        let max = Vec2::new(region.right, region.top);
        let low = Vec2::new(self.left, self.bottom).clamp(min, max);
        let high = Vec2::new(self.right, self.top).clamp(min, max);
        BoundingBox {
            left: low.x,
            right: high.x,
            bottom: low.y,
            top: high.y,
        }
    }

    /// True when the box has no interior (zero or negative width or height).
    pub fn is_degenerate(&self) -> bool {
        self.left >= self.right || self.bottom >= self.top
    }
}
