// Engine modules: configuration and physics

pub mod config;
pub mod physics;
