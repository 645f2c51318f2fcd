// Swept movement for kinematic bodies

use super::body::BodyHandle;
use super::collision::default_move_filter;
use super::error::Result;
use super::query::BodyCollisionResult;
use super::world::PhysicsWorld;
use crate::core::{Fix64, Vec2Fix};
use crate::engine::config::DEFAULT_MAX_SLIDES;

/// Outcome of a single `move_and_collide`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KinematicCollisionResult {
    /// Overlaps at the first blocked position, empty when unobstructed
    pub collision: BodyCollisionResult,
    /// Share of the requested motion that was free of collisions
    pub fraction: Fix64,
    /// Surface normal that stopped the motion (zero when unobstructed)
    pub normal: Vec2Fix,
    /// Unconsumed motion, already slid along `normal`
    pub remaining_velocity: Vec2Fix,
}

impl KinematicCollisionResult {
    pub fn has_collision(&self) -> bool {
        self.collision.has_collision()
    }

    fn unobstructed() -> Self {
        Self {
            fraction: Fix64::ONE,
            ..Self::default()
        }
    }
}

impl PhysicsWorld {
    /// Move a body by `velocity` (a displacement for this tick), stopping at
    /// the first static or kinematic obstacle.
    ///
    /// The blocked fraction is found by bisection. The body is then placed
    /// against the obstacle, backed off along the contact normal by the
    /// configured skin distance.
    pub fn move_and_collide(&mut self, handle: BodyHandle, velocity: Vec2Fix) -> Result<KinematicCollisionResult> {
        self.ensure_in_world(handle)?;
        if velocity.is_zero() {
            return Ok(KinematicCollisionResult {
                fraction: Fix64::ZERO,
                ..KinematicCollisionResult::default()
            });
        }

        let start = self.body(handle).map(|b| b.position()).unwrap_or_default();
        self.place_body(handle, start + velocity);
        let mut blocked = self.collect_collisions(handle, true, default_move_filter);
        if !blocked.has_collision() {
            self.sync_body(handle);
            return Ok(KinematicCollisionResult::unobstructed());
        }

        let mut low = Fix64::ZERO;
        let mut high = Fix64::ONE;
        for _ in 0..self.config.move_iterations {
            let mid = (low + high) * Fix64::HALF;
            self.place_body(handle, start + velocity * mid);
            let attempt = self.collect_collisions(handle, true, default_move_filter);
            if attempt.has_collision() {
                high = mid;
                blocked = attempt;
            } else {
                low = mid;
            }
        }

        let push = blocked.push;
        let normal = push.normalized();
        // Placed from the first blocked position `high`, not the last free
        // one; `push` was measured there and `fraction` still reports `low`
        let destination = if push.is_zero() {
            start + velocity * low
        } else {
            start + velocity * high + push + normal * self.config.kinematic_skin
        };
        self.place_body(handle, destination);
        self.sync_body(handle);

        log::trace!(
            "Body {:?} blocked at fraction {} by {} contacts",
            handle,
            low,
            blocked.collisions.len()
        );
        Ok(KinematicCollisionResult {
            collision: blocked,
            fraction: low,
            normal,
            remaining_velocity: (velocity * (Fix64::ONE - low)).slide(normal),
        })
    }

    /// Repeatedly move and slide along obstacles, up to `max_slides` times
    /// (the default when `None`, and at least once). Returns the motion still
    /// unconsumed, or zero if the last move was unobstructed.
    pub fn move_and_slide(
        &mut self,
        handle: BodyHandle,
        velocity: Vec2Fix,
        max_slides: Option<u32>,
    ) -> Result<Vec2Fix> {
        let mut remaining = velocity;
        let slides = max_slides.unwrap_or(DEFAULT_MAX_SLIDES).max(1);
        for _ in 0..slides {
            let result = self.move_and_collide(handle, remaining)?;
            if !result.has_collision() {
                return Ok(Vec2Fix::ZERO);
            }
            remaining = result.remaining_velocity;
        }
        Ok(remaining)
    }
}
