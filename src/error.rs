//! Error types for world configuration and entity bookkeeping.

use std::fmt;

use crate::objects::EntityId;

/// Errors reported synchronously by fallible world and broadphase operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PhysicsError {
    /// A world or quadtree was configured with unusable parameters.
    InvalidConfiguration {
        /// What was wrong with the configuration
        reason: &'static str,
    },
    /// The entity id does not refer to a live entity.
    BadEntityId {
        /// The id that was looked up
        id: EntityId,
    },
    /// Entity fields violate the mass/radius/elasticity invariants.
    InvalidEntity {
        /// Which invariant was violated
        reason: &'static str,
    },
}

impl fmt::Display for PhysicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfiguration { reason } => {
                write!(f, "invalid configuration: {reason}")
            }
            Self::BadEntityId { id } => write!(f, "bad entity id {id}"),
            Self::InvalidEntity { reason } => write!(f, "invalid entity: {reason}"),
        }
    }
}

impl std::error::Error for PhysicsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = PhysicsError::BadEntityId { id: 7 };
        assert_eq!(err.to_string(), "bad entity id 7");

        let err = PhysicsError::InvalidConfiguration {
            reason: "quadtree depth must be at least 1",
        };
        assert_eq!(
            err.to_string(),
            "invalid configuration: quadtree depth must be at least 1"
        );
    }
}
