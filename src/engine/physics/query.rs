// Spatial, historical and per-body collision queries

use super::aabb::Aabb;
use super::body::{Body, BodyHandle};
use super::broadphase::BroadPhase;
use super::collision::{default_trigger_filter, CollisionFilter};
use super::error::{PhysicsError, Result};
use super::history::HistoryRecord;
use super::ray::{RayCast, RayResult};
use super::shape::ShapeHandle;
use super::world::{collide_pair, PhysicsWorld};
use crate::core::{Fix64, Vec2Fix};

/// Optional per-body predicate for spatial queries
pub type BodyFilter<'a> = Option<&'a dyn Fn(&Body) -> bool>;

/// One overlap found for a queried body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionInfo {
    pub other: BodyHandle,
    /// Shape of the queried body
    pub shape: ShapeHandle,
    pub other_shape: ShapeHandle,
    /// Deepest contact point
    pub position: Vec2Fix,
    /// Unit direction that moves the queried body out of the overlap
    pub normal: Vec2Fix,
    pub depth: Fix64,
}

impl CollisionInfo {
    /// Translation that separates this pair
    pub fn push(&self) -> Vec2Fix {
        self.normal * self.depth
    }
}

/// Every overlap of one body against the world
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyCollisionResult {
    pub collisions: Vec<CollisionInfo>,
    /// Sum of the per-pair push vectors
    pub push: Vec2Fix,
}

impl BodyCollisionResult {
    pub fn has_collision(&self) -> bool {
        !self.collisions.is_empty()
    }

    /// Whether `other` is among the overlapping bodies
    pub fn touches(&self, other: BodyHandle) -> bool {
        self.collisions.iter().any(|c| c.other == other)
    }
}

fn accepts(filter: BodyFilter<'_>, body: &Body) -> bool {
    filter.map_or(true, |f| f(body))
}

impl PhysicsWorld {
    /// Where a body was `ticks_behind` ticks ago, and whether that is exact
    pub fn try_get_space(&self, handle: BodyHandle, ticks_behind: usize) -> Result<(HistoryRecord, bool)> {
        self.bodies
            .get(handle)
            .map(|body| body.try_get_space(ticks_behind))
            .ok_or(PhysicsError::InvalidBody)
    }

    /// Bodies whose bounds overlap `aabb`
    pub fn query_aabb(&mut self, aabb: &Aabb, filter: BodyFilter<'_>, ticks_behind: usize) -> &[BodyHandle] {
        self.gather_query_candidates(ticks_behind, |broadphase, out| {
            broadphase.query_overlap(aabb, out)
        });
        self.query_results.clear();
        for handle in &self.candidates {
            let Some(body) = self.bodies.get(*handle) else {
                continue;
            };
            if accepts(filter, body) && body.query_aabb(aabb, ticks_behind) {
                self.query_results.push(*handle);
            }
        }
        &self.query_results
    }

    /// Bodies with a shape containing `point` (edges inclusive)
    pub fn query_point(&mut self, point: Vec2Fix, filter: BodyFilter<'_>, ticks_behind: usize) -> &[BodyHandle] {
        self.gather_query_candidates(ticks_behind, |broadphase, out| {
            broadphase.query_point(point, out)
        });
        self.query_results.clear();
        for handle in &self.candidates {
            let Some(body) = self.bodies.get(*handle) else {
                continue;
            };
            if accepts(filter, body) && body.query_point(&self.shapes, point, ticks_behind) {
                self.query_results.push(*handle);
            }
        }
        &self.query_results
    }

    /// Bodies with a shape overlapping the circle (touching counts)
    pub fn query_circle(
        &mut self,
        center: Vec2Fix,
        radius: Fix64,
        filter: BodyFilter<'_>,
        ticks_behind: usize,
    ) -> &[BodyHandle] {
        self.gather_query_candidates(ticks_behind, |broadphase, out| {
            broadphase.query_circle(center, radius, out)
        });
        self.query_results.clear();
        for handle in &self.candidates {
            let Some(body) = self.bodies.get(*handle) else {
                continue;
            };
            if accepts(filter, body) && body.query_circle(&self.shapes, center, radius, ticks_behind) {
                self.query_results.push(*handle);
            }
        }
        &self.query_results
    }

    /// Closest shape hit along `ray`
    pub fn ray_cast(&mut self, ray: &RayCast, filter: BodyFilter<'_>, ticks_behind: usize) -> RayResult {
        self.gather_query_candidates(ticks_behind, |broadphase, out| broadphase.ray_cast(ray, out));
        let mut result = RayResult::new();
        for handle in &self.candidates {
            let Some(body) = self.bodies.get(*handle) else {
                continue;
            };
            if accepts(filter, body) {
                body.ray_cast(&self.shapes, ray, ticks_behind, &mut result);
                if result.contained {
                    break;
                }
            }
        }
        result
    }

    /// Closest hit of a circle swept along `ray`
    pub fn circle_cast(
        &mut self,
        ray: &RayCast,
        radius: Fix64,
        filter: BodyFilter<'_>,
        ticks_behind: usize,
    ) -> RayResult {
        self.gather_query_candidates(ticks_behind, |broadphase, out| {
            broadphase.circle_cast(ray, radius, out)
        });
        let mut result = RayResult::new();
        for handle in &self.candidates {
            let Some(body) = self.bodies.get(*handle) else {
                continue;
            };
            if accepts(filter, body) {
                body.circle_cast(&self.shapes, ray, radius, ticks_behind, &mut result);
                if result.contained {
                    break;
                }
            }
        }
        result
    }

    /// Overlaps of a (usually trigger) body, without resolving anything
    pub fn query_trigger_collisions(
        &mut self,
        handle: BodyHandle,
        collide_dynamic: bool,
        filter: Option<CollisionFilter>,
    ) -> Result<BodyCollisionResult> {
        self.ensure_in_world(handle)?;
        Ok(self.collect_collisions(handle, collide_dynamic, filter.unwrap_or(default_trigger_filter)))
    }

    /// Overlaps of any body under the world filter (or `filter`)
    pub fn query_collisions(
        &mut self,
        handle: BodyHandle,
        collide_dynamic: bool,
        filter: Option<CollisionFilter>,
    ) -> Result<BodyCollisionResult> {
        self.ensure_in_world(handle)?;
        let filter = filter.unwrap_or(self.filter());
        Ok(self.collect_collisions(handle, collide_dynamic, filter))
    }

    /// Whether a body currently overlaps anything the filter accepts
    pub fn query_colliding(
        &mut self,
        handle: BodyHandle,
        collide_dynamic: bool,
        filter: Option<CollisionFilter>,
    ) -> Result<bool> {
        Ok(self.query_collisions(handle, collide_dynamic, filter)?.has_collision())
    }

    pub(super) fn ensure_in_world(&self, handle: BodyHandle) -> Result<()> {
        let body = self.bodies.get(handle).ok_or(PhysicsError::InvalidBody)?;
        if body.is_in_world() {
            Ok(())
        } else {
            Err(PhysicsError::BodyNotInWorld)
        }
    }

    /// Narrowphase of one body against its broadphase candidates
    ///
    /// Each manifold contributes its deepest contact, oriented so that the
    /// push moves `handle` away from the other body.
    pub(super) fn collect_collisions(
        &mut self,
        handle: BodyHandle,
        collide_dynamic: bool,
        filter: CollisionFilter,
    ) -> BodyCollisionResult {
        self.static_broadphase.refresh();
        self.gather_candidates(handle, collide_dynamic);

        let mut result = BodyCollisionResult::default();
        let Some(body) = self.bodies.get(handle) else {
            return result;
        };
        let manifolds = &mut self.query_manifolds;
        for other in &self.candidates {
            let Some(other_body) = self.bodies.get(*other) else {
                continue;
            };
            if !filter(body, other_body) {
                continue;
            }

            manifolds.clear();
            collide_pair(&self.shapes, body, other_body, manifolds);
            for manifold in manifolds.iter() {
                let Some(deepest) = manifold.deepest() else {
                    continue;
                };
                let (normal, shape, other_shape) = if manifold.body_a() == handle {
                    (-deepest.normal(), manifold.shape_a(), manifold.shape_b())
                } else {
                    (deepest.normal(), manifold.shape_b(), manifold.shape_a())
                };
                let info = CollisionInfo {
                    other: *other,
                    shape,
                    other_shape,
                    position: deepest.position(),
                    normal,
                    depth: deepest.penetration(),
                };
                result.push += info.push();
                result.collisions.push(info);
            }
        }
        result
    }

    /// Static index plus either the moving index (now) or a scan of every
    /// moving body (past ticks, since the index only knows current bounds)
    fn gather_query_candidates(
        &mut self,
        ticks_behind: usize,
        query: impl Fn(&dyn BroadPhase, &mut Vec<BodyHandle>),
    ) {
        self.candidates.clear();
        self.static_broadphase.refresh();
        query(self.static_broadphase.as_ref(), &mut self.candidates);
        if ticks_behind == 0 {
            query(self.dynamic_broadphase.as_ref(), &mut self.candidates);
        } else {
            let bodies = &self.bodies;
            self.candidates.extend(
                self.active
                    .iter()
                    .copied()
                    .filter(|h| bodies.get(*h).is_some_and(|b| !b.is_static())),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::physics::body::BodyBuilder;
    use crate::engine::physics::collision::{filter_except, filter_static, ALL_LAYERS, DEFAULT_LAYER};
    use crate::engine::physics::shape::ShapeBuilder;
    use approx::assert_relative_eq;

    fn arena() -> (PhysicsWorld, BodyHandle, BodyHandle, BodyHandle) {
        let mut world = PhysicsWorld::new(4, Fix64::ONE);
        let wall = world
            .create_shape(ShapeBuilder::box_shape(Fix64::ONE, Fix64::from_int(5)))
            .expect("wall");
        let wall = world
            .create_static_body(
                Vec2Fix::from_ints(10, 0),
                Fix64::ZERO,
                &[wall],
                DEFAULT_LAYER,
                ALL_LAYERS,
            )
            .expect("static");
        let ball = world
            .create_shape(ShapeBuilder::circle(Fix64::HALF))
            .expect("ball");
        let ball = world
            .create_dynamic_body(Vec2Fix::ZERO, Fix64::ZERO, &[ball], DEFAULT_LAYER, ALL_LAYERS)
            .expect("dynamic");
        let crate_shape = world
            .create_shape(ShapeBuilder::box_shape(Fix64::ONE, Fix64::ONE))
            .expect("crate");
        let crate_body = world
            .create_kinematic_body(
                Vec2Fix::from_ints(0, 5),
                Fix64::ZERO,
                &[crate_shape],
                DEFAULT_LAYER,
                ALL_LAYERS,
            )
            .expect("kinematic");
        (world, wall, ball, crate_body)
    }

    #[test]
    fn test_point_queries() {
        let (mut world, wall, ball, crate_body) = arena();
        assert_eq!(world.query_point(Vec2Fix::from_ints(10, 4), None, 0), &[wall]);
        assert_eq!(world.query_point(Vec2Fix::ZERO, None, 0), &[ball]);
        assert_eq!(world.query_point(Vec2Fix::from_ints(1, 6), None, 0), &[crate_body]);
        assert!(world.query_point(Vec2Fix::from_ints(5, 5), None, 0).is_empty());

        // Inside the ball's AABB corner but outside the circle
        let corner = Vec2Fix::new(Fix64::from_ratio(45, 100), Fix64::from_ratio(45, 100));
        assert!(world.query_point(corner, None, 0).is_empty());
    }

    #[test]
    fn test_filtered_queries() {
        let (mut world, wall, ball, _) = arena();
        let everything = Aabb::new(Vec2Fix::from_ints(-20, -20), Vec2Fix::from_ints(20, 20));
        assert_eq!(world.query_aabb(&everything, None, 0).len(), 3);
        assert_eq!(world.query_aabb(&everything, Some(&filter_static), 0), &[wall]);

        let not_ball = filter_except(ball);
        assert!(!world.query_aabb(&everything, Some(&not_ball), 0).contains(&ball));
        assert_eq!(world.query_aabb(&everything, Some(&not_ball), 0).len(), 2);
    }

    #[test]
    fn test_circle_query() {
        let (mut world, wall, ball, _) = arena();
        let hits = world.query_circle(Vec2Fix::from_ints(8, 0), Fix64::ONE, None, 0).to_vec();
        assert_eq!(hits, vec![wall]);
        let hits = world.query_circle(Vec2Fix::from_ints(1, 0), Fix64::HALF, None, 0).to_vec();
        assert_eq!(hits, vec![ball]);
    }

    #[test]
    fn test_ray_cast_returns_closest() {
        let (mut world, wall, ball, _) = arena();
        let ray = RayCast::new(Vec2Fix::from_ints(-5, 0), Vec2Fix::from_ints(20, 0));
        let result = world.ray_cast(&ray, None, 0);
        assert_eq!(result.body, Some(ball));
        assert_relative_eq!(result.distance.to_f64(), 4.5, epsilon = 1e-6);
        assert_relative_eq!(result.normal.x.to_f64(), -1.0, epsilon = 1e-6);

        let skip_ball = filter_except(ball);
        let result = world.ray_cast(&ray, Some(&skip_ball), 0);
        assert_eq!(result.body, Some(wall));
        assert_relative_eq!(result.distance.to_f64(), 14.0, epsilon = 1e-6);
        assert_relative_eq!(result.point(&ray).x.to_f64(), 9.0, epsilon = 1e-6);
    }

    #[test]
    fn test_ray_miss_and_containment() {
        let (mut world, _, ball, _) = arena();
        let miss = RayCast::new(Vec2Fix::from_ints(-5, -8), Vec2Fix::from_ints(20, -8));
        assert!(!world.ray_cast(&miss, None, 0).is_valid());

        let inside = RayCast::new(Vec2Fix::ZERO, Vec2Fix::from_ints(0, -3));
        let result = world.ray_cast(&inside, None, 0);
        assert_eq!(result.body, Some(ball));
        assert!(result.contained);
    }

    #[test]
    fn test_circle_cast_hits_wall_face() {
        let (mut world, wall, _, _) = arena();
        let ray = RayCast::new(Vec2Fix::from_ints(3, -2), Vec2Fix::from_ints(20, -2));
        let result = world.circle_cast(&ray, Fix64::ONE, None, 0);
        assert_eq!(result.body, Some(wall));
        // Face at x = 9, circle radius 1, start at x = 3
        assert_relative_eq!(result.distance.to_f64(), 5.0, epsilon = 1e-6);
    }

    #[test]
    fn test_history_queries() {
        let mut world = PhysicsWorld::new(4, Fix64::ONE);
        let shape = world
            .create_shape(ShapeBuilder::circle(Fix64::HALF))
            .expect("ball");
        let ball = world
            .create_body(
                BodyBuilder::new_dynamic()
                    .shape(shape)
                    .linvel(Vec2Fix::from_ints(50, 0)),
            )
            .expect("dynamic");
        for _ in 0..5 {
            world.step();
        }

        let (now, exact) = world.try_get_space(ball, 0).expect("live");
        assert!(exact);
        assert_relative_eq!(now.position.x.to_f64(), 5.0, epsilon = 1e-6);

        let (past, exact) = world.try_get_space(ball, 1).expect("live");
        assert!(exact);
        assert_relative_eq!(past.position.x.to_f64(), 4.0, epsilon = 1e-6);

        let (oldest, exact) = world.try_get_space(ball, 4).expect("live");
        assert!(exact);
        assert_relative_eq!(oldest.position.x.to_f64(), 1.0, epsilon = 1e-6);

        let (clamped, exact) = world.try_get_space(ball, 9).expect("live");
        assert!(!exact);
        assert_eq!(clamped, oldest);

        let then = Vec2Fix::from_ints(2, 0);
        assert!(world.query_point(then, None, 0).is_empty());
        assert_eq!(world.query_point(then, None, 3), &[ball]);

        let ray = RayCast::new(Vec2Fix::from_ints(2, -5), Vec2Fix::from_ints(2, 5));
        assert!(!world.ray_cast(&ray, None, 0).is_valid());
        assert_eq!(world.ray_cast(&ray, None, 3).body, Some(ball));
    }

    #[test]
    fn test_query_collisions_reports_push() {
        let (mut world, _, ball, crate_body) = arena();
        world
            .set_transform(crate_body, Vec2Fix::new(Fix64::ZERO, Fix64::from_ratio(13, 10)), Fix64::ZERO)
            .expect("live");

        let result = world.query_collisions(ball, true, None).expect("in world");
        assert!(result.touches(crate_body));
        // Crate sits above the ball, so the ball is pushed down
        assert!(result.push.y.is_negative());
        assert!(!world.query_colliding(ball, false, None).expect("in world"));
        // Scratch manifolds from earlier queries do not leak into later ones
        assert_eq!(world.query_collisions(ball, true, None), Ok(result));
    }

    #[test]
    fn test_trigger_collisions() {
        let (mut world, _, ball, crate_body) = arena();
        let zone = world
            .create_shape(ShapeBuilder::circle(Fix64::TWO))
            .expect("zone");
        let trigger = world
            .create_trigger_body(
                Vec2Fix::from_ints(1, 1),
                Fix64::ZERO,
                &[zone],
                DEFAULT_LAYER,
                ALL_LAYERS,
            )
            .expect("trigger");

        let statics_only = world
            .query_trigger_collisions(trigger, false, None)
            .expect("in world");
        assert!(!statics_only.has_collision());

        let result = world
            .query_trigger_collisions(trigger, true, None)
            .expect("in world");
        assert!(result.touches(ball));
        assert!(!result.touches(crate_body));
        for info in &result.collisions {
            assert!(info.depth.is_positive());
        }
        assert!(world.query_colliding(trigger, true, None).expect("in world"));

        world.remove_body(trigger).expect("in world");
        assert_eq!(
            world.query_trigger_collisions(trigger, true, None),
            Err(PhysicsError::BodyNotInWorld)
        );
    }
}
