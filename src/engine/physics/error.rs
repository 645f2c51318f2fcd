// Error types for the physics world

use crate::core::Fix64;

/// Errors returned by world, body and shape operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhysicsError {
    #[error("dynamic body mass {mass} is below the minimum of {min}")]
    MassTooSmall { mass: Fix64, min: Fix64 },

    #[error("invalid polygon: {reason}")]
    InvalidPolygon { reason: &'static str },

    #[error("invalid shape: {0}")]
    InvalidShape(&'static str),

    #[error("body handle does not refer to a live body")]
    InvalidBody,

    #[error("shape handle does not refer to a live shape")]
    InvalidShapeHandle,

    #[error("shape is already attached to another body")]
    ShapeInUse,

    #[error("body is not part of the world")]
    BodyNotInWorld,

    #[error("body is already part of the world")]
    BodyAlreadyInWorld,

    #[error("state decode failed: expected {expected} bytes, got {actual}")]
    StateDecode { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, PhysicsError>;
