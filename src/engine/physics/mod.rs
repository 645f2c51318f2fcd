// Deterministic fixed-point rigid-body physics

mod aabb;
mod area;
pub mod body;
pub mod broadphase;
pub mod collision;
mod contact;
mod debug;
mod error;
mod history;
mod kinematic;
mod manifold;
mod narrowphase;
mod pool;
mod query;
mod ray;
pub mod shape;
mod snapshot;
mod world;

pub use aabb::Aabb;
pub use area::AreaState;
pub use body::{presets, Body, BodyBuilder, BodyHandle, BodyType};
pub use broadphase::{BroadPhase, NaiveBroadphase, StaticTree};
pub use collision::{
    default_move_filter, default_trigger_filter, default_world_filter, filter_dynamic,
    filter_except, filter_none, filter_static, layer, layers_interact, AreaEvent, CollisionEvent,
    CollisionEventQueue, CollisionFilter, ALL_LAYERS, DEFAULT_LAYER, LAYER_COUNT,
};
pub use contact::Contact;
pub use debug::{DebugLines, DebugVertex};
pub use error::{PhysicsError, Result};
pub use history::{HistoryBuffer, HistoryRecord};
pub use kinematic::KinematicCollisionResult;
pub use manifold::{CachedContact, ContactCache, Manifold, MAX_CONTACTS};
pub use pool::{Handle, Pool};
pub use query::{BodyCollisionResult, BodyFilter, CollisionInfo};
pub use ray::{RayCast, RayResult};
pub use shape::{Circle, Material, Polygon, ShapeBuilder, ShapeHandle, ShapeKind, ShapeRef, ShapeSet};
pub use snapshot::{BodyState, StateChecksum, WorldSnapshot};
pub use world::{PhysicsWorld, StepStats};
