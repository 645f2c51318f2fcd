// Physics world: body lifecycle and the fixed-step pipeline

use super::body::{Body, BodyBuilder, BodyHandle, BodyType};
use super::broadphase::{BroadPhase, NaiveBroadphase, StaticTree};
use super::collision::{
    default_world_filter, AreaEvent, CollisionEvent, CollisionEventQueue, CollisionFilter,
};
use super::contact::SolverParams;
use super::error::{PhysicsError, Result};
use super::history::HistoryBuffer;
use super::manifold::{CachedContact, ContactCache, Manifold};
use super::narrowphase;
use super::pool::Pool;
use super::shape::{Material, ShapeBuilder, ShapeHandle, ShapeRef, ShapeSet};
use crate::core::{Fix64, Vec2Fix};
use crate::engine::config::PhysicsConfig;

/// What a step (or single-body update) produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepStats {
    pub bodies: usize,
    pub manifolds: usize,
    pub contacts: usize,
}

/// Physics world that manages all physics simulation
///
/// Every operation is deterministic: two worlds built with the same calls in
/// the same order stay bit-identical forever.
pub struct PhysicsWorld {
    pub(super) config: PhysicsConfig,

    /// Body storage; handles stay valid until the body is destroyed
    pub(super) bodies: Pool<Body>,

    /// Bodies currently simulated; removal swaps the last entry into the gap
    pub(super) active: Vec<BodyHandle>,

    pub(super) shapes: ShapeSet,

    /// Index over static bodies
    pub(super) static_broadphase: Box<dyn BroadPhase>,

    /// Index over everything that moves
    pub(super) dynamic_broadphase: Box<dyn BroadPhase>,

    /// Manifolds of the step in progress
    manifolds: Vec<Manifold>,

    /// Solved contacts of the last step
    pub(super) contact_cache: ContactCache,

    /// History buffers of removed bodies, reused on the next insert
    spare_histories: Vec<HistoryBuffer>,

    /// Scratch list for broadphase candidates
    pub(super) candidates: Vec<BodyHandle>,

    /// Scratch list returned by queries
    pub(super) query_results: Vec<BodyHandle>,

    /// Scratch manifolds for single-body collision queries
    pub(super) query_manifolds: Vec<Manifold>,

    /// Scratch list of bodies touched by `update_body`
    involved: Vec<BodyHandle>,

    filter: CollisionFilter,

    pub(super) events: CollisionEventQueue,

    pub(super) tick: u64,
}

impl PhysicsWorld {
    /// Create a world with the given history window and velocity damping
    pub fn new(history_length: usize, damping: Fix64) -> Self {
        Self::with_config(PhysicsConfig::new(history_length, damping))
    }

    pub fn with_config(config: PhysicsConfig) -> Self {
        Self::with_broadphases(
            config,
            Box::new(StaticTree::new()),
            Box::new(NaiveBroadphase::new()),
        )
    }

    /// Create a world with custom spatial indices
    pub fn with_broadphases(
        config: PhysicsConfig,
        static_broadphase: Box<dyn BroadPhase>,
        dynamic_broadphase: Box<dyn BroadPhase>,
    ) -> Self {
        log::info!(
            "Creating physics world: history {}, damping {}, {} iterations",
            config.history_length,
            config.damping,
            config.iteration_count
        );
        Self {
            config,
            bodies: Pool::new(),
            active: Vec::new(),
            shapes: ShapeSet::new(),
            static_broadphase,
            dynamic_broadphase,
            manifolds: Vec::new(),
            contact_cache: ContactCache::new(),
            spare_histories: Vec::new(),
            candidates: Vec::new(),
            query_results: Vec::new(),
            query_manifolds: Vec::new(),
            involved: Vec::new(),
            filter: default_world_filter,
            events: CollisionEventQueue::new(),
            tick: 0,
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Number of completed steps
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn filter(&self) -> CollisionFilter {
        self.filter
    }

    /// Replace the pair filter used by `step`
    pub fn set_filter(&mut self, filter: CollisionFilter) {
        self.filter = filter;
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle)
    }

    /// Bodies in the world, in simulation order
    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.active.iter().filter_map(|h| self.bodies.get(*h))
    }

    pub fn body_count(&self) -> usize {
        self.active.len()
    }

    pub fn shapes(&self) -> &ShapeSet {
        &self.shapes
    }

    pub fn shape(&self, handle: ShapeHandle) -> Option<ShapeRef<'_>> {
        self.shapes.get(handle)
    }

    /// Contacts resolved on the last step
    pub fn contacts(&self) -> &[CachedContact] {
        self.contact_cache.entries()
    }

    /// Collision events since the start of the last step
    pub fn collision_events(&self) -> &[CollisionEvent] {
        self.events.collisions()
    }

    /// Area enter/exit events of the last step
    pub fn area_events(&self) -> &[AreaEvent] {
        self.events.area_events()
    }

    // Shapes

    pub fn create_shape(&mut self, builder: ShapeBuilder) -> Result<ShapeHandle> {
        self.shapes.create(builder)
    }

    /// Circle whose origin is relative to the body it will be attached to
    pub fn create_circle_body_space(
        &mut self,
        origin: Vec2Fix,
        radius: Fix64,
        material: Material,
    ) -> Result<ShapeHandle> {
        self.create_shape(ShapeBuilder::circle(radius).offset(origin).material(material))
    }

    /// Circle placed in world space, converted when its body is created
    pub fn create_circle_world_space(
        &mut self,
        origin: Vec2Fix,
        radius: Fix64,
        material: Material,
    ) -> Result<ShapeHandle> {
        self.create_shape(
            ShapeBuilder::circle(radius)
                .offset(origin)
                .material(material)
                .world_space(),
        )
    }

    pub fn create_polygon_body_space(
        &mut self,
        vertices: &[Vec2Fix],
        material: Material,
    ) -> Result<ShapeHandle> {
        self.create_shape(ShapeBuilder::polygon(vertices).material(material))
    }

    pub fn create_polygon_world_space(
        &mut self,
        vertices: &[Vec2Fix],
        material: Material,
    ) -> Result<ShapeHandle> {
        self.create_shape(ShapeBuilder::polygon(vertices).material(material).world_space())
    }

    /// Free a shape that is not attached to any body
    pub fn destroy_shape(&mut self, handle: ShapeHandle) -> Result<()> {
        self.shapes.destroy(handle)
    }

    // Body lifecycle

    /// Build a body from free shapes and add it to the world
    pub fn create_body(&mut self, builder: BodyBuilder) -> Result<BodyHandle> {
        let shapes = builder.shape_handles();
        for (i, shape) in shapes.iter().enumerate() {
            let data = self.shapes.get(*shape).ok_or(PhysicsError::InvalidShapeHandle)?.data();
            if data.body().is_some() || shapes[..i].contains(shape) {
                return Err(PhysicsError::ShapeInUse);
            }
        }

        let handle = self.bodies.insert_with(|handle| Body::new(handle, &builder));
        let (position, angle) = builder.transform();
        let facing = Vec2Fix::polar(angle);
        for (i, shape) in shapes.iter().enumerate() {
            let attached = self
                .shapes
                .attach(*shape, handle, position, facing, self.config.area_mass_ratio);
            if let Err(err) = attached {
                for shape in &shapes[..i] {
                    self.shapes.detach(*shape);
                }
                self.bodies.remove(handle);
                return Err(err);
            }
        }

        let min = self.config.min_dynamic_mass;
        let body = self.bodies.get_mut(handle).ok_or(PhysicsError::InvalidBody)?;
        if let Some(mass) = body.compute_mass(&self.shapes) {
            if mass < min {
                for shape in shapes {
                    self.shapes.detach(*shape);
                }
                self.bodies.remove(handle);
                log::warn!("Rejected dynamic body with mass {} (minimum {})", mass, min);
                return Err(PhysicsError::MassTooSmall { mass, min });
            }
        }
        body.apply_transform(&mut self.shapes);

        self.insert_into_world(handle);
        log::debug!(
            "Created {:?} body {:?} with {} shapes",
            builder.body_type(),
            handle,
            shapes.len()
        );
        Ok(handle)
    }

    pub fn create_static_body(
        &mut self,
        position: Vec2Fix,
        angle: Fix64,
        shapes: &[ShapeHandle],
        layer: u32,
        mask: u32,
    ) -> Result<BodyHandle> {
        self.create_body(
            BodyBuilder::new_static()
                .position_rotation(position, angle)
                .shapes(shapes)
                .layer_mask(layer, mask),
        )
    }

    pub fn create_dynamic_body(
        &mut self,
        position: Vec2Fix,
        angle: Fix64,
        shapes: &[ShapeHandle],
        layer: u32,
        mask: u32,
    ) -> Result<BodyHandle> {
        self.create_body(
            BodyBuilder::new_dynamic()
                .position_rotation(position, angle)
                .shapes(shapes)
                .layer_mask(layer, mask),
        )
    }

    pub fn create_kinematic_body(
        &mut self,
        position: Vec2Fix,
        angle: Fix64,
        shapes: &[ShapeHandle],
        layer: u32,
        mask: u32,
    ) -> Result<BodyHandle> {
        self.create_body(
            BodyBuilder::new_kinematic()
                .position_rotation(position, angle)
                .shapes(shapes)
                .layer_mask(layer, mask),
        )
    }

    pub fn create_trigger_body(
        &mut self,
        position: Vec2Fix,
        angle: Fix64,
        shapes: &[ShapeHandle],
        layer: u32,
        mask: u32,
    ) -> Result<BodyHandle> {
        self.create_body(
            BodyBuilder::new_trigger()
                .position_rotation(position, angle)
                .shapes(shapes)
                .layer_mask(layer, mask),
        )
    }

    /// Put a previously removed body back into the simulation
    pub fn add_body(&mut self, handle: BodyHandle, position: Vec2Fix, angle: Fix64) -> Result<()> {
        let body = self.bodies.get_mut(handle).ok_or(PhysicsError::InvalidBody)?;
        if body.is_in_world() {
            return Err(PhysicsError::BodyAlreadyInWorld);
        }
        body.set_transform_raw(position, angle);
        body.apply_transform(&mut self.shapes);
        self.insert_into_world(handle);
        Ok(())
    }

    /// Take a body out of the simulation, keeping it and its shapes alive
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<()> {
        let body = self.bodies.get_mut(handle).ok_or(PhysicsError::InvalidBody)?;
        if !body.is_in_world() {
            return Err(PhysicsError::BodyNotInWorld);
        }
        body.reset_dynamics();
        body.set_in_world(false);
        let is_static = body.is_static();
        if let Some(history) = body.set_history(None) {
            self.spare_histories.push(history);
        }

        if let Some(index) = self.active.iter().position(|h| *h == handle) {
            self.active.swap_remove(index);
        }
        self.broadphase_for(is_static).remove_body(handle);
        log::debug!("Removed body {:?} from the world", handle);
        Ok(())
    }

    /// Remove a body if needed, then free it together with its shapes
    pub fn destroy_body(&mut self, handle: BodyHandle) -> Result<()> {
        let in_world = self
            .bodies
            .get(handle)
            .ok_or(PhysicsError::InvalidBody)?
            .is_in_world();
        if in_world {
            self.remove_body(handle)?;
        }

        let body = self.bodies.remove(handle).ok_or(PhysicsError::InvalidBody)?;
        for shape in body.shapes() {
            self.shapes.release(*shape);
        }
        self.contact_cache.forget_shapes(body.shapes());
        for other in &self.active {
            if let Some(area) = self.bodies.get_mut(*other).and_then(|b| b.area.as_mut()) {
                area.forget(handle);
            }
        }
        log::debug!("Destroyed body {:?}", handle);
        Ok(())
    }

    fn insert_into_world(&mut self, handle: BodyHandle) {
        let Some(is_static) = self.bodies.get(handle).map(Body::is_static) else {
            return;
        };
        let history = if is_static || self.config.history_length == 0 {
            None
        } else {
            let capacity = self.config.history_length;
            Some(
                self.spare_histories
                    .pop()
                    .filter(|h| h.capacity() == capacity)
                    .unwrap_or_else(|| HistoryBuffer::new(capacity)),
            )
        };

        let Some(body) = self.bodies.get_mut(handle) else {
            return;
        };
        body.set_history(history);
        body.set_in_world(true);
        let aabb = body.aabb();

        self.active.push(handle);
        self.broadphase_for(is_static).add_body(handle, aabb);
    }

    fn broadphase_for(&mut self, is_static: bool) -> &mut dyn BroadPhase {
        if is_static {
            self.static_broadphase.as_mut()
        } else {
            self.dynamic_broadphase.as_mut()
        }
    }

    // Body control

    fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut Body> {
        self.bodies.get_mut(handle).ok_or(PhysicsError::InvalidBody)
    }

    pub fn add_force(&mut self, handle: BodyHandle, force: Vec2Fix) -> Result<()> {
        self.body_mut(handle)?.add_force(force);
        Ok(())
    }

    pub fn add_force_at(&mut self, handle: BodyHandle, force: Vec2Fix, point: Vec2Fix) -> Result<()> {
        self.body_mut(handle)?.add_force_at(force, point);
        Ok(())
    }

    pub fn add_torque(&mut self, handle: BodyHandle, torque: Fix64) -> Result<()> {
        self.body_mut(handle)?.add_torque(torque);
        Ok(())
    }

    pub fn set_velocity(&mut self, handle: BodyHandle, linear: Vec2Fix, angular: Fix64) -> Result<()> {
        self.body_mut(handle)?.set_velocity(linear, angular);
        Ok(())
    }

    pub fn set_force(
        &mut self,
        handle: BodyHandle,
        force: Vec2Fix,
        torque: Fix64,
        bias_velocity: Vec2Fix,
        bias_rotation: Fix64,
    ) -> Result<()> {
        self.body_mut(handle)?
            .set_force(force, torque, bias_velocity, bias_rotation);
        Ok(())
    }

    pub fn set_user_data(&mut self, handle: BodyHandle, user_data: u64) -> Result<()> {
        self.body_mut(handle)?.set_user_data(user_data);
        Ok(())
    }

    pub fn set_collision_events(&mut self, handle: BodyHandle, enabled: bool) -> Result<()> {
        self.body_mut(handle)?.set_collision_events(enabled);
        Ok(())
    }

    /// Teleport a body; its shapes and broadphase entry follow
    pub fn set_transform(&mut self, handle: BodyHandle, position: Vec2Fix, angle: Fix64) -> Result<()> {
        let body = self.bodies.get_mut(handle).ok_or(PhysicsError::InvalidBody)?;
        body.set_transform_raw(position, angle);
        self.sync_body(handle);
        Ok(())
    }

    /// Move a body without touching its broadphase entry
    pub(super) fn place_body(&mut self, handle: BodyHandle, position: Vec2Fix) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_position_raw(position);
            body.apply_transform(&mut self.shapes);
        }
    }

    /// Recompute shapes and bounds and push them to the broadphase
    pub(super) fn sync_body(&mut self, handle: BodyHandle) {
        let Some(body) = self.bodies.get_mut(handle) else {
            return;
        };
        body.apply_transform(&mut self.shapes);
        if body.is_in_world() {
            let (is_static, aabb) = (body.is_static(), body.aabb());
            self.broadphase_for(is_static).update_body(handle, aabb);
        }
    }

    // Simulation

    /// Advance the whole world by one fixed tick
    pub fn step(&mut self) -> StepStats {
        self.events.clear();
        self.static_broadphase.refresh();
        self.dynamic_broadphase.refresh();

        for i in 0..self.active.len() {
            let handle = self.active[i];
            self.integrate_body(handle);
        }

        self.find_manifolds();
        self.solve_manifolds();
        self.record_collisions();
        for i in 0..self.active.len() {
            let handle = self.active[i];
            self.flush_body(handle, true);
        }

        let stats = self.stats();
        self.contact_cache.rebuild(&self.manifolds);
        self.manifolds.clear();
        self.tick += 1;

        log::trace!(
            "Tick {}: {} bodies, {} manifolds, {} contacts",
            self.tick,
            stats.bodies,
            stats.manifolds,
            stats.contacts
        );
        stats
    }

    /// Advance one body and resolve only its own contacts
    ///
    /// Static bodies are ignored. Contacts against moving bodies are found
    /// only when `collide_dynamic` is set. `filter` replaces the world
    /// filter for this call.
    pub fn update_body(
        &mut self,
        handle: BodyHandle,
        collide_dynamic: bool,
        filter: Option<CollisionFilter>,
    ) -> Result<StepStats> {
        let body = self.bodies.get(handle).ok_or(PhysicsError::InvalidBody)?;
        if !body.is_in_world() {
            return Err(PhysicsError::BodyNotInWorld);
        }
        if body.is_static() {
            log::debug!("Ignoring update of static body {:?}", handle);
            return Ok(StepStats::default());
        }
        let filter = filter.unwrap_or(self.filter);

        self.events.clear();
        self.static_broadphase.refresh();
        self.integrate_body(handle);
        self.manifolds.clear();
        self.gather_candidates(handle, collide_dynamic);

        if let Some(a) = self.bodies.get(handle) {
            for other in &self.candidates {
                let Some(b) = self.bodies.get(*other) else {
                    continue;
                };
                if filter(a, b) {
                    collide_pair(&self.shapes, a, b, &mut self.manifolds);
                }
            }
        }

        self.solve_manifolds();
        self.record_collisions();

        let mut involved = std::mem::take(&mut self.involved);
        involved.clear();
        involved.push(handle);
        for manifold in &self.manifolds {
            for other in [manifold.body_a(), manifold.body_b()] {
                if !involved.contains(&other) {
                    involved.push(other);
                }
            }
        }
        for other in &involved {
            self.flush_body(*other, *other == handle);
        }
        self.involved = involved;

        let stats = StepStats {
            bodies: 1,
            ..self.stats()
        };
        self.manifolds.clear();
        Ok(stats)
    }

    /// Fill `candidates` with bodies whose bounds overlap `handle`'s
    pub(super) fn gather_candidates(&mut self, handle: BodyHandle, collide_dynamic: bool) {
        self.candidates.clear();
        let Some(aabb) = self.bodies.get(handle).map(Body::aabb) else {
            return;
        };
        self.static_broadphase.query_overlap(&aabb, &mut self.candidates);
        if collide_dynamic {
            self.dynamic_broadphase.query_overlap(&aabb, &mut self.candidates);
        }
        self.candidates.retain(|other| *other != handle);
    }

    fn integrate_body(&mut self, handle: BodyHandle) {
        let Some(body) = self.bodies.get_mut(handle) else {
            return;
        };
        if body.is_static() {
            return;
        }
        body.store_history();
        body.integrate(self.config.delta_time, self.config.damping);
        body.apply_transform(&mut self.shapes);
        self.dynamic_broadphase.update_body(handle, body.aabb());
    }

    /// Broadphase then narrowphase over every moving body
    ///
    /// Each moving body is tested against the static index and against every
    /// later moving body in simulation order.
    fn find_manifolds(&mut self) {
        self.manifolds.clear();
        for (i, handle) in self.active.iter().enumerate() {
            let Some(a) = self.bodies.get(*handle) else {
                continue;
            };
            if a.is_static() {
                continue;
            }

            self.candidates.clear();
            self.static_broadphase.query_overlap(&a.aabb(), &mut self.candidates);
            for other in &self.candidates {
                if let Some(b) = self.bodies.get(*other) {
                    if (self.filter)(a, b) {
                        collide_pair(&self.shapes, a, b, &mut self.manifolds);
                    }
                }
            }

            for other in &self.active[i + 1..] {
                let Some(b) = self.bodies.get(*other) else {
                    continue;
                };
                if !b.is_static() && (self.filter)(a, b) {
                    collide_pair(&self.shapes, a, b, &mut self.manifolds);
                }
            }
        }
    }

    fn solve_manifolds(&mut self) {
        let params = SolverParams {
            resolve_rate: self.config.resolve_rate,
            resolve_slop: self.config.resolve_slop,
        };
        let cache = self.config.warm_starting.then_some(&self.contact_cache);

        for manifold in &mut self.manifolds {
            manifold.pre_step(&mut self.bodies, &params, cache);
        }
        for _ in 0..self.config.elastic_iterations() {
            for manifold in &mut self.manifolds {
                manifold.solve(&mut self.bodies, Fix64::ONE);
            }
        }
        for manifold in &self.manifolds {
            manifold.solve_cached(&mut self.bodies);
        }
        for _ in 0..self.config.inelastic_iterations() {
            for manifold in &mut self.manifolds {
                manifold.solve(&mut self.bodies, Fix64::ZERO);
            }
        }
    }

    fn record_collisions(&mut self) {
        for manifold in &self.manifolds {
            if let Some((a, b)) = self.bodies.get2_mut(manifold.body_a(), manifold.body_b()) {
                a.record_collision(manifold.body_b());
                b.record_collision(manifold.body_a());
            }
        }
    }

    /// Turn a body's collision set into events and update its area
    fn flush_body(&mut self, handle: BodyHandle, diff_area: bool) {
        let Some(body) = self.bodies.get_mut(handle) else {
            return;
        };
        let touching = body.take_colliding();
        if body.collision_events_enabled() {
            for other in &touching {
                self.events.push(CollisionEvent {
                    body: handle,
                    other: *other,
                });
            }
        }
        if diff_area {
            if let Some(area) = body.area.as_mut() {
                area.update(handle, &touching, self.events.area_sink());
            }
        }
        body.restore_colliding(touching);
    }

    fn stats(&self) -> StepStats {
        StepStats {
            bodies: self.active.len(),
            manifolds: self.manifolds.len(),
            contacts: self.manifolds.iter().map(|m| m.contacts().len()).sum(),
        }
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::with_config(PhysicsConfig::default())
    }
}

/// Narrowphase over every shape pair of two bodies with touching bounds
pub(super) fn collide_pair(shapes: &ShapeSet, a: &Body, b: &Body, out: &mut Vec<Manifold>) {
    if !a.aabb().overlaps(&b.aabb()) {
        return;
    }
    let sensor = a.body_type() == BodyType::Trigger || b.body_type() == BodyType::Trigger;
    for shape_a in a.shapes() {
        let Some(bounds) = shapes.get(*shape_a).map(|s| s.aabb()) else {
            continue;
        };
        for shape_b in b.shapes() {
            if !shapes.get(*shape_b).is_some_and(|s| s.aabb().overlaps(&bounds)) {
                continue;
            }
            if let Some(mut manifold) =
                narrowphase::collide(shapes, (a.handle(), *shape_a), (b.handle(), *shape_b))
            {
                manifold.set_sensor(sensor);
                out.push(manifold);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::physics::collision::{ALL_LAYERS, DEFAULT_LAYER};
    use approx::assert_relative_eq;

    fn fx(value: f64) -> Fix64 {
        Fix64::from_f64(value)
    }

    fn undamped() -> PhysicsWorld {
        PhysicsWorld::new(0, Fix64::ONE)
    }

    fn ball(world: &mut PhysicsWorld, x: Fix64, y: Fix64) -> BodyHandle {
        let shape = world
            .create_shape(ShapeBuilder::circle(Fix64::ONE))
            .expect("circle");
        world
            .create_dynamic_body(
                Vec2Fix::new(x, y),
                Fix64::ZERO,
                &[shape],
                DEFAULT_LAYER,
                ALL_LAYERS,
            )
            .expect("body")
    }

    #[test]
    fn test_overlapping_circles_push_apart() {
        let mut world = undamped();
        let a = ball(&mut world, Fix64::ZERO, Fix64::ZERO);
        let b = ball(&mut world, fx(1.9), Fix64::ZERO);

        let stats = world.step();
        assert_eq!(stats.manifolds, 1);
        assert_eq!(stats.contacts, 1);

        let contact = world.contacts()[0];
        assert_relative_eq!(contact.normal.x.to_f64(), 1.0, epsilon = 1e-9);
        assert!(contact.normal_impulse.is_zero());

        let (body_a, body_b) = (world.body(a).expect("a"), world.body(b).expect("b"));
        assert!(body_a.bias_velocity().x.is_negative());
        assert!(body_b.bias_velocity().x.is_positive());
        assert_eq!(body_a.linear_velocity(), Vec2Fix::ZERO);
        assert_eq!(body_b.linear_velocity(), Vec2Fix::ZERO);

        let events = world.collision_events();
        assert!(events.contains(&CollisionEvent { body: a, other: b }));
        assert!(events.contains(&CollisionEvent { body: b, other: a }));
    }

    #[test]
    fn test_overlap_converges_to_slop() {
        let mut world = undamped();
        let a = ball(&mut world, Fix64::ZERO, Fix64::ZERO);
        let b = ball(&mut world, fx(1.9), Fix64::ZERO);
        for _ in 0..200 {
            world.step();
        }
        let distance = (world.body(b).expect("b").position() - world.body(a).expect("a").position()).length();
        let overlap = 2.0 - distance.to_f64();
        assert!(overlap < 0.02, "overlap {overlap} did not settle");
        assert!(overlap > 0.0);
    }

    #[test]
    fn test_free_body_moves_without_contacts() {
        let mut world = undamped();
        let a = ball(&mut world, Fix64::ZERO, Fix64::ZERO);
        world
            .set_velocity(a, Vec2Fix::from_ints(5, 0), Fix64::ZERO)
            .expect("live");
        for _ in 0..50 {
            let stats = world.step();
            assert_eq!(stats.manifolds, 0);
        }
        // 50 ticks of 1/50 s at 5 units/s
        assert_relative_eq!(world.body(a).expect("a").position().x.to_f64(), 5.0, epsilon = 1e-6);
    }

    #[test]
    fn test_two_worlds_stay_identical() {
        fn build() -> PhysicsWorld {
            let mut world = PhysicsWorld::new(4, Fix64::from_ratio(99, 100));
            let floor = world
                .create_shape(ShapeBuilder::box_shape(Fix64::from_int(20), Fix64::ONE))
                .expect("floor");
            world
                .create_static_body(
                    Vec2Fix::from_ints(0, -5),
                    Fix64::ZERO,
                    &[floor],
                    DEFAULT_LAYER,
                    ALL_LAYERS,
                )
                .expect("static");
            for i in 0..6 {
                let shape = if i % 2 == 0 {
                    ShapeBuilder::circle(Fix64::HALF)
                } else {
                    ShapeBuilder::box_shape(Fix64::HALF, Fix64::from_ratio(3, 4))
                };
                let shape = world.create_shape(shape).expect("shape");
                let body = world
                    .create_dynamic_body(
                        Vec2Fix::from_ints(i - 3, i),
                        Fix64::from_ratio(i as i64, 7),
                        &[shape],
                        DEFAULT_LAYER,
                        ALL_LAYERS,
                    )
                    .expect("body");
                world
                    .set_velocity(body, Vec2Fix::from_ints(3 - i, -2), Fix64::from_ratio(1, 3))
                    .expect("live");
            }
            world
        }

        let mut first = build();
        let mut second = build();
        for _ in 0..120 {
            for (i, handle) in first.active.clone().into_iter().enumerate() {
                let push = Vec2Fix::new(Fix64::ZERO, Fix64::from_int(-10) * first.body(handle).expect("live").mass());
                if i > 0 {
                    first.add_force(handle, push).expect("live");
                    second.add_force(handle, push).expect("live");
                }
            }
            assert_eq!(first.step(), second.step());
        }
        for (a, b) in first.bodies().zip(second.bodies()) {
            assert_eq!(a.state(), b.state());
        }
    }

    #[test]
    fn test_dynamic_mass_invariants() {
        let mut world = undamped();
        let light = world
            .create_shape(ShapeBuilder::circle(fx(0.01)).density(fx(0.001)))
            .expect("shape");
        let result =
            world.create_dynamic_body(Vec2Fix::ZERO, Fix64::ZERO, &[light], DEFAULT_LAYER, ALL_LAYERS);
        assert!(matches!(result, Err(PhysicsError::MassTooSmall { .. })));
        // The shape was released back and can be used again
        assert!(world
            .create_static_body(Vec2Fix::ZERO, Fix64::ZERO, &[light], DEFAULT_LAYER, ALL_LAYERS)
            .is_ok());

        let a = ball(&mut world, Fix64::from_int(10), Fix64::ZERO);
        let body = world.body(a).expect("live");
        assert!(body.mass() >= world.config().min_dynamic_mass);
        assert!(body.inv_mass().is_positive());
    }

    #[test]
    fn test_world_space_shape_reusable_after_rejected_body() {
        let mut world = undamped();
        let light = world
            .create_shape(
                ShapeBuilder::circle(fx(0.01))
                    .offset(Vec2Fix::from_ints(10, 0))
                    .density(fx(0.001))
                    .world_space(),
            )
            .expect("shape");
        let result =
            world.create_dynamic_body(Vec2Fix::ZERO, Fix64::ZERO, &[light], DEFAULT_LAYER, ALL_LAYERS);
        assert!(matches!(result, Err(PhysicsError::MassTooSmall { .. })));

        let holder = world
            .create_static_body(
                Vec2Fix::from_ints(10, 0),
                Fix64::ZERO,
                &[light],
                DEFAULT_LAYER,
                ALL_LAYERS,
            )
            .expect("static body");
        let center = world.body(holder).expect("live").aabb().center();
        assert_relative_eq!(center.x.to_f64(), 10.0, epsilon = 1e-6);
        assert_relative_eq!(center.y.to_f64(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_shape_cannot_be_shared() {
        let mut world = undamped();
        let shape = world
            .create_shape(ShapeBuilder::circle(Fix64::ONE))
            .expect("shape");
        world
            .create_kinematic_body(Vec2Fix::ZERO, Fix64::ZERO, &[shape], DEFAULT_LAYER, ALL_LAYERS)
            .expect("first owner");
        assert_eq!(
            world
                .create_kinematic_body(
                    Vec2Fix::ZERO,
                    Fix64::ZERO,
                    &[shape],
                    DEFAULT_LAYER,
                    ALL_LAYERS,
                ),
            Err(PhysicsError::ShapeInUse)
        );
        assert_eq!(world.destroy_shape(shape), Err(PhysicsError::ShapeInUse));
    }

    #[test]
    fn test_remove_add_destroy() {
        let mut world = undamped();
        let a = ball(&mut world, Fix64::ZERO, Fix64::ZERO);
        world.set_velocity(a, Vec2Fix::UNIT_X, Fix64::ZERO).expect("live");

        world.remove_body(a).expect("in world");
        assert_eq!(world.remove_body(a), Err(PhysicsError::BodyNotInWorld));
        assert_eq!(world.body_count(), 0);
        assert_eq!(world.body(a).expect("kept").linear_velocity(), Vec2Fix::ZERO);

        world
            .add_body(a, Vec2Fix::from_ints(4, 4), Fix64::ZERO)
            .expect("re-add");
        assert_eq!(
            world.add_body(a, Vec2Fix::ZERO, Fix64::ZERO),
            Err(PhysicsError::BodyAlreadyInWorld)
        );
        assert_eq!(world.body(a).expect("live").position(), Vec2Fix::from_ints(4, 4));

        let shape = world.body(a).expect("live").shapes()[0];
        world.destroy_body(a).expect("destroy");
        assert!(world.body(a).is_none());
        assert!(world.shape(shape).is_none());
        assert_eq!(world.destroy_body(a), Err(PhysicsError::InvalidBody));
    }

    #[test]
    fn test_kinematic_pairs_and_static_pairs_are_filtered() {
        let mut world = undamped();
        let s1 = world.create_shape(ShapeBuilder::circle(Fix64::ONE)).expect("shape");
        let s2 = world.create_shape(ShapeBuilder::circle(Fix64::ONE)).expect("shape");
        let k1 = world.create_shape(ShapeBuilder::circle(Fix64::ONE)).expect("shape");
        let k2 = world.create_shape(ShapeBuilder::circle(Fix64::ONE)).expect("shape");
        world
            .create_static_body(
                Vec2Fix::ZERO,
                Fix64::ZERO,
                &[s1],
                DEFAULT_LAYER,
                ALL_LAYERS,
            )
            .expect("static");
        world
            .create_static_body(
                Vec2Fix::UNIT_X,
                Fix64::ZERO,
                &[s2],
                DEFAULT_LAYER,
                ALL_LAYERS,
            )
            .expect("static");
        world
            .create_kinematic_body(
                Vec2Fix::from_ints(10, 0),
                Fix64::ZERO,
                &[k1],
                DEFAULT_LAYER,
                ALL_LAYERS,
            )
            .expect("kinematic");
        world
            .create_kinematic_body(
                Vec2Fix::from_ints(11, 0),
                Fix64::ZERO,
                &[k2],
                DEFAULT_LAYER,
                ALL_LAYERS,
            )
            .expect("kinematic");

        assert_eq!(world.step().manifolds, 0);
    }

    #[test]
    fn test_trigger_reports_without_pushing() {
        let mut world = undamped();
        let zone = world
            .create_shape(ShapeBuilder::box_shape(Fix64::TWO, Fix64::TWO))
            .expect("shape");
        let area = world
            .create_body(BodyBuilder::new_trigger().shape(zone).track_overlaps())
            .expect("trigger");
        let a = ball(&mut world, Fix64::ONE, Fix64::ZERO);

        world.step();
        let body = world.body(a).expect("live");
        assert_eq!(body.bias_velocity(), Vec2Fix::ZERO);
        assert_eq!(body.linear_velocity(), Vec2Fix::ZERO);
        assert_eq!(world.area_events(), &[AreaEvent::Entered { area, body: a }]);
        assert_eq!(world.body(area).expect("area").overlapping(), Some(&[a][..]));

        world.step();
        assert!(world.area_events().is_empty());

        world
            .set_transform(a, Vec2Fix::from_ints(10, 0), Fix64::ZERO)
            .expect("live");
        world.step();
        assert_eq!(world.area_events(), &[AreaEvent::Exited { area, body: a }]);
    }

    #[test]
    fn test_destroyed_body_leaves_area_silently() {
        let mut world = undamped();
        let zone = world
            .create_shape(ShapeBuilder::circle(Fix64::from_int(3)))
            .expect("shape");
        let area = world
            .create_body(BodyBuilder::new_trigger().shape(zone).track_overlaps())
            .expect("trigger");
        let a = ball(&mut world, Fix64::ZERO, Fix64::ZERO);
        world.step();

        world.destroy_body(a).expect("destroy");
        world.step();
        assert!(world.area_events().is_empty());
        assert_eq!(world.body(area).expect("area").overlapping(), Some(&[][..]));
    }

    #[test]
    fn test_update_body_resolves_single_body() {
        let mut world = undamped();
        let floor = world
            .create_shape(ShapeBuilder::box_shape(Fix64::from_int(10), Fix64::ONE))
            .expect("floor");
        world
            .create_static_body(Vec2Fix::ZERO, Fix64::ZERO, &[floor], DEFAULT_LAYER, ALL_LAYERS)
            .expect("static");
        let a = ball(&mut world, Fix64::ZERO, fx(1.9));
        let b = ball(&mut world, Fix64::from_int(30), Fix64::ZERO);
        world.set_velocity(b, Vec2Fix::UNIT_X, Fix64::ZERO).expect("live");

        let stats = world.update_body(a, false, None).expect("in world");
        assert_eq!(stats.manifolds, 1);
        assert!(world.body(a).expect("a").bias_velocity().y.is_positive());
        // Other bodies did not advance
        assert_eq!(world.body(b).expect("b").position(), Vec2Fix::from_ints(30, 0));
        assert!(world
            .collision_events()
            .iter()
            .any(|event| event.body == a));
    }

    #[test]
    fn test_update_body_replaces_previous_events() {
        let mut world = undamped();
        let floor = world
            .create_shape(ShapeBuilder::box_shape(Fix64::from_int(10), Fix64::ONE))
            .expect("floor");
        world
            .create_static_body(Vec2Fix::ZERO, Fix64::ZERO, &[floor], DEFAULT_LAYER, ALL_LAYERS)
            .expect("static");
        let a = ball(&mut world, Fix64::ZERO, fx(1.9));

        world.update_body(a, false, None).expect("in world");
        let first = world.collision_events().to_vec();
        assert!(!first.is_empty());

        world.update_body(a, false, None).expect("in world");
        assert_eq!(world.collision_events(), &first[..]);
    }

    #[test]
    fn test_update_body_ignores_static() {
        let mut world = undamped();
        let floor = world
            .create_shape(ShapeBuilder::box_shape(Fix64::ONE, Fix64::ONE))
            .expect("floor");
        let s = world
            .create_static_body(Vec2Fix::ZERO, Fix64::ZERO, &[floor], DEFAULT_LAYER, ALL_LAYERS)
            .expect("static");
        assert_eq!(world.update_body(s, true, None), Ok(StepStats::default()));
    }
}
