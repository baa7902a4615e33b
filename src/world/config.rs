use serde::{Deserialize, Serialize};

use crate::collision::quadtree::MAX_QUADTREE_DEPTH;
use crate::error::PhysicsError;

/// Which broadphase the world uses to find candidate collision groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BroadphaseKind {
    /// Every entity is checked against every other.
    Naive,
    /// Entities are grouped by the leaves of a fixed-depth quadtree over the world region.
    Quadtree { depth: usize },
}

/// How entities are advanced through a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationMode {
    /// One integration over the whole `dt`; collisions are only handled at step start.
    WholeStep,
    /// Sub-steps bounded by the next predicted collision, so discs never tunnel.
    Piecewise,
}

/// Construction parameters of a [`World`](crate::world::World).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Side length of the square region `[0, size] x [0, size]` covered by the broadphase.
    pub size: f64,
    pub broadphase: BroadphaseKind,
    pub integration: IntegrationMode,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            size: 1000.0,
            broadphase: BroadphaseKind::Quadtree { depth: 5 },
            integration: IntegrationMode::Piecewise,
        }
    }
}

impl WorldConfig {
    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_broadphase(mut self, broadphase: BroadphaseKind) -> Self {
        self.broadphase = broadphase;
        self
    }

    pub fn with_integration(mut self, integration: IntegrationMode) -> Self {
        self.integration = integration;
        self
    }

    pub fn validate(&self) -> Result<(), PhysicsError> {
        if !(self.size.is_finite() && self.size > 0.0) {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "world size must be positive and finite",
            });
        }
        if let BroadphaseKind::Quadtree { depth } = self.broadphase {
            if depth < 1 {
                return Err(PhysicsError::InvalidConfiguration {
                    reason: "quadtree depth must be at least 1",
                });
            }
            if depth > MAX_QUADTREE_DEPTH {
                return Err(PhysicsError::InvalidConfiguration {
                    reason: "quadtree depth is too large",
                });
            }
        }
        Ok(())
    }
}
