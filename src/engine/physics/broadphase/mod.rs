// Coarse AABB-level collision culling

pub mod naive;
pub mod tree;

pub use naive::NaiveBroadphase;
pub use tree::StaticTree;

use super::aabb::Aabb;
use super::body::BodyHandle;
use super::ray::RayCast;
use crate::core::{Fix64, Vec2Fix};

/// Spatial index over body bounds
///
/// Queries append candidate handles to `out` in a deterministic order and
/// never clear it. Candidates are conservative: the world runs exact tests
/// afterwards.
pub trait BroadPhase: Send {
    fn add_body(&mut self, body: BodyHandle, aabb: Aabb);

    fn remove_body(&mut self, body: BodyHandle);

    /// The body moved; store its new bounds
    fn update_body(&mut self, body: BodyHandle, aabb: Aabb);

    /// Apply deferred structural changes
    fn refresh(&mut self) {}

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn query_overlap(&self, aabb: &Aabb, out: &mut Vec<BodyHandle>);

    fn query_point(&self, point: Vec2Fix, out: &mut Vec<BodyHandle>);

    fn query_circle(&self, center: Vec2Fix, radius: Fix64, out: &mut Vec<BodyHandle>);

    fn ray_cast(&self, ray: &RayCast, out: &mut Vec<BodyHandle>);

    fn circle_cast(&self, ray: &RayCast, radius: Fix64, out: &mut Vec<BodyHandle>);
}
