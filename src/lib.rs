// Deterministic 2D physics for rollback netcode

pub mod core;
pub mod engine;

pub use crate::core::{Fix64, Transform2D, Vec2Fix};
pub use engine::config::PhysicsConfig;
pub use engine::physics::{
    BodyBuilder, BodyHandle, BodyType, PhysicsError, PhysicsWorld, ShapeBuilder, ShapeHandle,
};
