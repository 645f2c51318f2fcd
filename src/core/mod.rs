// Deterministic math primitives shared by the engine

pub mod fixed;
pub mod math;

pub use fixed::Fix64;
pub use math::{Transform2D, Vec2Fix};
