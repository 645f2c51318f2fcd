// Rigid bodies, integration and the body builder

use super::aabb::Aabb;
use super::area::AreaState;
use super::collision::{ALL_LAYERS, DEFAULT_LAYER};
use super::history::{HistoryBuffer, HistoryRecord};
use super::pool::Handle;
use super::ray::{RayCast, RayResult};
use super::shape::{ShapeHandle, ShapeSet};
use super::snapshot::BodyState;
use crate::core::{Fix64, Transform2D, Vec2Fix};

/// Handle to identify bodies
pub type BodyHandle = Handle<Body>;

/// How a body takes part in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyType {
    /// Never moves; lives in the static broadphase
    Static,
    /// Integrates forces and is pushed by contacts
    Dynamic,
    /// Moved explicitly by the host; ignores forces
    Kinematic,
    /// Detects overlaps without a physical response
    Trigger,
}

impl BodyType {
    pub fn is_static(self) -> bool {
        self == BodyType::Static
    }
}

/// A rigid body owned by a [`PhysicsWorld`](super::PhysicsWorld)
#[derive(Debug, Clone)]
pub struct Body {
    handle: BodyHandle,
    body_type: BodyType,

    position: Vec2Fix,
    angle: Fix64,
    facing: Vec2Fix,

    linear_velocity: Vec2Fix,
    angular_velocity: Fix64,
    force: Vec2Fix,
    torque: Fix64,
    bias_velocity: Vec2Fix,
    bias_rotation: Fix64,

    mass: Fix64,
    inv_mass: Fix64,
    inertia: Fix64,
    inv_inertia: Fix64,

    layer: u32,
    mask: u32,

    shapes: Vec<ShapeHandle>,
    aabb: Aabb,
    history: Option<HistoryBuffer>,
    in_world: bool,
    collision_events: bool,
    user_data: u64,

    /// Distinct bodies touched during the current tick, in discovery order
    colliding: Vec<BodyHandle>,
    pub(crate) area: Option<AreaState>,
}

impl Body {
    pub(crate) fn new(handle: BodyHandle, builder: &BodyBuilder) -> Self {
        let mut body = Self {
            handle,
            body_type: builder.body_type,
            position: builder.position,
            angle: builder.angle,
            facing: Vec2Fix::polar(builder.angle),
            linear_velocity: Vec2Fix::ZERO,
            angular_velocity: Fix64::ZERO,
            force: Vec2Fix::ZERO,
            torque: Fix64::ZERO,
            bias_velocity: Vec2Fix::ZERO,
            bias_rotation: Fix64::ZERO,
            mass: Fix64::ZERO,
            inv_mass: Fix64::ZERO,
            inertia: Fix64::ZERO,
            inv_inertia: Fix64::ZERO,
            layer: builder.layer,
            mask: builder.mask,
            shapes: builder.shapes.clone(),
            aabb: Aabb::from_point(builder.position),
            history: None,
            in_world: false,
            collision_events: builder.collision_events,
            user_data: builder.user_data,
            colliding: Vec::new(),
            area: None,
        };
        if builder.body_type == BodyType::Dynamic {
            body.linear_velocity = builder.linvel;
            body.angular_velocity = builder.angvel;
        }
        if builder.track_overlaps && builder.body_type == BodyType::Trigger {
            body.area = Some(AreaState::new());
        }
        body
    }

    pub fn handle(&self) -> BodyHandle {
        self.handle
    }

    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    pub fn is_static(&self) -> bool {
        self.body_type.is_static()
    }

    pub fn position(&self) -> Vec2Fix {
        self.position
    }

    pub fn angle(&self) -> Fix64 {
        self.angle
    }

    /// Unit vector `(cos angle, sin angle)`
    pub fn facing(&self) -> Vec2Fix {
        self.facing
    }

    pub fn transform(&self) -> Transform2D {
        Transform2D::new(self.position, self.angle)
    }

    pub fn linear_velocity(&self) -> Vec2Fix {
        self.linear_velocity
    }

    pub fn angular_velocity(&self) -> Fix64 {
        self.angular_velocity
    }

    pub fn force(&self) -> Vec2Fix {
        self.force
    }

    pub fn torque(&self) -> Fix64 {
        self.torque
    }

    pub fn bias_velocity(&self) -> Vec2Fix {
        self.bias_velocity
    }

    pub fn bias_rotation(&self) -> Fix64 {
        self.bias_rotation
    }

    pub fn mass(&self) -> Fix64 {
        self.mass
    }

    /// Zero for every non-dynamic body
    pub fn inv_mass(&self) -> Fix64 {
        self.inv_mass
    }

    pub fn inertia(&self) -> Fix64 {
        self.inertia
    }

    pub fn inv_inertia(&self) -> Fix64 {
        self.inv_inertia
    }

    pub fn layer(&self) -> u32 {
        self.layer
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    pub fn shapes(&self) -> &[ShapeHandle] {
        &self.shapes
    }

    /// Union of every shape's world-space bounds
    pub fn aabb(&self) -> Aabb {
        self.aabb
    }

    pub fn is_in_world(&self) -> bool {
        self.in_world
    }

    pub fn collision_events_enabled(&self) -> bool {
        self.collision_events
    }

    pub fn user_data(&self) -> u64 {
        self.user_data
    }

    pub fn history(&self) -> Option<&HistoryBuffer> {
        self.history.as_ref()
    }

    /// Bodies this area overlapped on the last step, if it tracks overlaps
    pub fn overlapping(&self) -> Option<&[BodyHandle]> {
        self.area.as_ref().map(|area| area.overlapping())
    }

    pub fn add_force(&mut self, force: Vec2Fix) {
        self.force += force;
    }

    /// Force applied at a world-space point, producing torque about the body origin
    pub fn add_force_at(&mut self, force: Vec2Fix, point: Vec2Fix) {
        self.force += force;
        self.torque += (self.position - point).cross(force);
    }

    pub fn add_torque(&mut self, torque: Fix64) {
        self.torque += torque;
    }

    pub fn set_velocity(&mut self, linear: Vec2Fix, angular: Fix64) {
        self.linear_velocity = linear;
        self.angular_velocity = angular;
    }

    /// Overwrite accumulated force and solver bias (used for state restore)
    pub fn set_force(&mut self, force: Vec2Fix, torque: Fix64, bias_velocity: Vec2Fix, bias_rotation: Fix64) {
        self.force = force;
        self.torque = torque;
        self.bias_velocity = bias_velocity;
        self.bias_rotation = bias_rotation;
    }

    pub fn set_user_data(&mut self, user_data: u64) {
        self.user_data = user_data;
    }

    pub fn set_collision_events(&mut self, enabled: bool) {
        self.collision_events = enabled;
    }

    /// Sum shape masses; `None` when the body is not dynamic
    pub(crate) fn compute_mass(&mut self, shapes: &ShapeSet) -> Option<Fix64> {
        if self.body_type != BodyType::Dynamic {
            self.mass = Fix64::ZERO;
            self.inv_mass = Fix64::ZERO;
            self.inertia = Fix64::ZERO;
            self.inv_inertia = Fix64::ZERO;
            return None;
        }

        let mut mass = Fix64::ZERO;
        let mut inertia = Fix64::ZERO;
        for data in self.shapes.iter().filter_map(|h| shapes.get(*h)).map(|s| s.data()) {
            if data.material().density.is_zero() {
                continue;
            }
            mass += data.mass();
            inertia += data.mass() * data.inertia();
        }

        self.mass = mass;
        self.inertia = inertia;
        self.inv_mass = Fix64::ONE / mass;
        self.inv_inertia = if inertia.is_zero() {
            Fix64::ZERO
        } else {
            Fix64::ONE / inertia
        };
        Some(mass)
    }

    pub(crate) fn set_transform_raw(&mut self, position: Vec2Fix, angle: Fix64) {
        self.position = position;
        self.angle = angle;
        self.facing = Vec2Fix::polar(angle);
    }

    pub(crate) fn set_position_raw(&mut self, position: Vec2Fix) {
        self.position = position;
    }

    /// Push the current transform into every shape and rebuild the AABB
    pub(crate) fn apply_transform(&mut self, shapes: &mut ShapeSet) {
        let mut aabb: Option<Aabb> = None;
        for handle in &self.shapes {
            if let Some(shape_aabb) = shapes.update_world(*handle, self.position, self.facing) {
                aabb = Some(aabb.map_or(shape_aabb, |merged| merged.union(&shape_aabb)));
            }
        }
        self.aabb = aabb.unwrap_or_else(|| Aabb::from_point(self.position));
    }

    pub(crate) fn set_in_world(&mut self, in_world: bool) {
        self.in_world = in_world;
    }

    pub(crate) fn set_history(&mut self, history: Option<HistoryBuffer>) -> Option<HistoryBuffer> {
        std::mem::replace(&mut self.history, history)
    }

    pub(crate) fn store_history(&mut self) {
        let record = self.current_record();
        if let Some(history) = &mut self.history {
            history.store(record);
        }
    }

    /// Advance one tick. Only dynamic bodies integrate; everything else just
    /// drops accumulated forces.
    pub(crate) fn integrate(&mut self, dt: Fix64, damping: Fix64) {
        if self.body_type == BodyType::Dynamic {
            self.linear_velocity = self.linear_velocity * damping;
            self.angular_velocity = self.angular_velocity * damping;

            let half_dt = dt * Fix64::HALF;
            self.integrate_forces(half_dt);
            self.position += self.linear_velocity * dt + self.bias_velocity;
            self.angle += self.angular_velocity * dt + self.bias_rotation;
            self.facing = Vec2Fix::polar(self.angle);
            self.integrate_forces(half_dt);
        }

        self.force = Vec2Fix::ZERO;
        self.torque = Fix64::ZERO;
        self.bias_velocity = Vec2Fix::ZERO;
        self.bias_rotation = Fix64::ZERO;
    }

    fn integrate_forces(&mut self, half_dt: Fix64) {
        self.linear_velocity += self.force * (self.inv_mass * half_dt);
        self.angular_velocity -= self.torque * self.inv_inertia * half_dt;
    }

    pub(crate) fn apply_impulse(&mut self, impulse: Vec2Fix, offset: Vec2Fix) {
        self.linear_velocity += impulse * self.inv_mass;
        self.angular_velocity -= self.inv_inertia * impulse.cross(offset);
    }

    pub(crate) fn apply_bias(&mut self, impulse: Vec2Fix, offset: Vec2Fix) {
        self.bias_velocity += impulse * self.inv_mass;
        self.bias_rotation -= self.inv_inertia * impulse.cross(offset);
    }

    /// Clear everything that should not survive removal from the world
    pub(crate) fn reset_dynamics(&mut self) {
        self.linear_velocity = Vec2Fix::ZERO;
        self.angular_velocity = Fix64::ZERO;
        self.force = Vec2Fix::ZERO;
        self.torque = Fix64::ZERO;
        self.bias_velocity = Vec2Fix::ZERO;
        self.bias_rotation = Fix64::ZERO;
        self.colliding.clear();
        if let Some(history) = &mut self.history {
            history.clear();
        }
        if let Some(area) = &mut self.area {
            area.clear();
        }
    }

    pub(crate) fn record_collision(&mut self, other: BodyHandle) {
        if !self.colliding.contains(&other) {
            self.colliding.push(other);
        }
    }

    pub(crate) fn take_colliding(&mut self) -> Vec<BodyHandle> {
        std::mem::take(&mut self.colliding)
    }

    pub(crate) fn restore_colliding(&mut self, mut buffer: Vec<BodyHandle>) {
        buffer.clear();
        self.colliding = buffer;
    }

    pub(crate) fn state(&self) -> BodyState {
        BodyState {
            position: self.position,
            angle: self.angle,
            linear_velocity: self.linear_velocity,
            angular_velocity: self.angular_velocity,
            force: self.force,
            torque: self.torque,
            bias_velocity: self.bias_velocity,
            bias_rotation: self.bias_rotation,
        }
    }

    pub(crate) fn restore_state(&mut self, state: &BodyState) {
        self.set_transform_raw(state.position, state.angle);
        self.set_velocity(state.linear_velocity, state.angular_velocity);
        self.set_force(state.force, state.torque, state.bias_velocity, state.bias_rotation);
    }

    fn current_record(&self) -> HistoryRecord {
        HistoryRecord::new(self.position, self.facing, self.aabb)
    }

    /// Position, facing and bounds `ticks_behind` ticks ago.
    ///
    /// Tick 0 is always the current state. The flag is `false` when the body
    /// keeps no history, or when the window does not reach back far enough;
    /// in the latter case the oldest retained record is returned.
    pub fn try_get_space(&self, ticks_behind: usize) -> (HistoryRecord, bool) {
        if ticks_behind == 0 {
            return (self.current_record(), true);
        }
        match self.history.as_ref().and_then(|h| h.try_get(ticks_behind - 1)) {
            Some(found) => found,
            None => (self.current_record(), false),
        }
    }

    pub(crate) fn query_aabb(&self, aabb: &Aabb, ticks_behind: usize) -> bool {
        self.try_get_space(ticks_behind).0.aabb.overlaps(aabb)
    }

    pub(crate) fn query_point(&self, shapes: &ShapeSet, point: Vec2Fix, ticks_behind: usize) -> bool {
        let (record, _) = self.try_get_space(ticks_behind);
        if !record.aabb.contains_point(point) {
            return false;
        }
        let local = (point - record.position).inv_rotate(record.facing);
        self.shapes
            .iter()
            .filter_map(|h| shapes.get(*h))
            .any(|shape| shape.query_point(local))
    }

    pub(crate) fn query_circle(
        &self,
        shapes: &ShapeSet,
        center: Vec2Fix,
        radius: Fix64,
        ticks_behind: usize,
    ) -> bool {
        let (record, _) = self.try_get_space(ticks_behind);
        if !record.aabb.overlaps_circle(center, radius) {
            return false;
        }
        let local = (center - record.position).inv_rotate(record.facing);
        self.shapes
            .iter()
            .filter_map(|h| shapes.get(*h))
            .any(|shape| shape.query_circle(local, radius))
    }

    /// Offer every shape hit to `result`; returns whether it improved
    pub(crate) fn ray_cast(
        &self,
        shapes: &ShapeSet,
        ray: &RayCast,
        ticks_behind: usize,
        result: &mut RayResult,
    ) -> bool {
        let (record, _) = self.try_get_space(ticks_behind);
        if !record.aabb.ray_cast(ray) {
            return false;
        }
        let local = ray.to_body_space(record.position, record.facing);
        self.offer_hits(shapes, record.facing, result, |shape| shape.ray_cast(&local))
    }

    pub(crate) fn circle_cast(
        &self,
        shapes: &ShapeSet,
        ray: &RayCast,
        radius: Fix64,
        ticks_behind: usize,
        result: &mut RayResult,
    ) -> bool {
        let (record, _) = self.try_get_space(ticks_behind);
        if !record.aabb.circle_cast(ray, radius) {
            return false;
        }
        let local = ray.to_body_space(record.position, record.facing);
        self.offer_hits(shapes, record.facing, result, |shape| {
            shape.circle_cast(&local, radius)
        })
    }

    fn offer_hits(
        &self,
        shapes: &ShapeSet,
        facing: Vec2Fix,
        result: &mut RayResult,
        cast: impl Fn(&super::shape::ShapeRef<'_>) -> Option<super::ray::ShapeHit>,
    ) -> bool {
        let mut improved = false;
        for handle in &self.shapes {
            let Some(shape) = shapes.get(*handle) else {
                continue;
            };
            if let Some(mut hit) = cast(&shape) {
                hit.normal = hit.normal.rotate(facing);
                improved |= result.offer(hit, self.handle, *handle);
                if result.contained {
                    break;
                }
            }
        }
        improved
    }
}

/// Builder for creating bodies with common configurations
#[derive(Debug, Clone)]
pub struct BodyBuilder {
    body_type: BodyType,
    position: Vec2Fix,
    angle: Fix64,
    linvel: Vec2Fix,
    angvel: Fix64,
    layer: u32,
    mask: u32,
    shapes: Vec<ShapeHandle>,
    collision_events: bool,
    track_overlaps: bool,
    user_data: u64,
}

impl BodyBuilder {
    fn new(body_type: BodyType) -> Self {
        Self {
            body_type,
            position: Vec2Fix::ZERO,
            angle: Fix64::ZERO,
            linvel: Vec2Fix::ZERO,
            angvel: Fix64::ZERO,
            layer: DEFAULT_LAYER,
            mask: ALL_LAYERS,
            shapes: Vec::new(),
            collision_events: true,
            track_overlaps: false,
            user_data: 0,
        }
    }

    /// Create a new dynamic body (affected by forces and collisions)
    pub fn new_dynamic() -> Self {
        Self::new(BodyType::Dynamic)
    }

    /// Create a new kinematic body (moved by `move_and_collide`)
    pub fn new_kinematic() -> Self {
        Self::new(BodyType::Kinematic)
    }

    /// Create a new static body (completely immovable)
    pub fn new_static() -> Self {
        Self::new(BodyType::Static)
    }

    /// Create a new trigger body (detects overlaps, no response)
    pub fn new_trigger() -> Self {
        Self::new(BodyType::Trigger)
    }

    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    /// Set the initial position of the body
    pub fn position(mut self, position: Vec2Fix) -> Self {
        self.position = position;
        self
    }

    /// Set the initial position and rotation
    pub fn position_rotation(mut self, position: Vec2Fix, angle: Fix64) -> Self {
        self.position = position;
        self.angle = angle;
        self
    }

    /// Set the initial linear velocity (dynamic bodies only)
    pub fn linvel(mut self, velocity: Vec2Fix) -> Self {
        self.linvel = velocity;
        self
    }

    /// Set the initial angular velocity in radians per second (dynamic bodies only)
    pub fn angvel(mut self, angvel: Fix64) -> Self {
        self.angvel = angvel;
        self
    }

    /// Attach a shape; the body takes ownership when built
    pub fn shape(mut self, shape: ShapeHandle) -> Self {
        self.shapes.push(shape);
        self
    }

    pub fn shapes(mut self, shapes: &[ShapeHandle]) -> Self {
        self.shapes.extend_from_slice(shapes);
        self
    }

    /// Raw layer and mask bits
    pub fn layer_mask(mut self, layer: u32, mask: u32) -> Self {
        self.layer = layer;
        self.mask = mask;
        self
    }

    /// Report "collided with" events for this body (default: on)
    pub fn collision_events(mut self, enabled: bool) -> Self {
        self.collision_events = enabled;
        self
    }

    /// Keep entered/exited overlap sets (trigger bodies only)
    pub fn track_overlaps(mut self) -> Self {
        self.track_overlaps = true;
        self
    }

    pub fn user_data(mut self, user_data: u64) -> Self {
        self.user_data = user_data;
        self
    }

    pub(crate) fn shape_handles(&self) -> &[ShapeHandle] {
        &self.shapes
    }

    pub(crate) fn transform(&self) -> (Vec2Fix, Fix64) {
        (self.position, self.angle)
    }
}

/// Builders for the usual body roles
///
/// Each body builder comes with a matching shape builder; create the shape
/// first and pass its handle with `.shape(..)`.
pub mod presets {
    use super::*;
    use crate::engine::physics::shape::ShapeBuilder;

    /// Immovable ground or wall
    pub fn static_ground(position: Vec2Fix) -> BodyBuilder {
        BodyBuilder::new_static().position(position)
    }

    pub fn ground_shape(half_width: Fix64, half_height: Fix64) -> ShapeBuilder {
        ShapeBuilder::box_shape(half_width, half_height)
            .friction(Fix64::from_ratio(3, 10))
            .restitution(Fix64::ZERO)
    }

    /// Simulated box launched with an initial velocity
    pub fn dynamic_box(position: Vec2Fix, velocity: Vec2Fix) -> BodyBuilder {
        BodyBuilder::new_dynamic().position(position).linvel(velocity)
    }

    pub fn dynamic_box_shape(half_width: Fix64, half_height: Fix64) -> ShapeBuilder {
        ShapeBuilder::box_shape(half_width, half_height)
            .friction(Fix64::from_ratio(1, 2))
            .restitution(Fix64::from_ratio(1, 5))
    }

    /// Script-driven body moved with `move_and_collide` / `move_and_slide`
    pub fn kinematic_mover(position: Vec2Fix) -> BodyBuilder {
        BodyBuilder::new_kinematic().position(position)
    }

    /// Frictionless box so movers slide along walls
    pub fn mover_shape(half_width: Fix64, half_height: Fix64) -> ShapeBuilder {
        ShapeBuilder::box_shape(half_width, half_height)
            .friction(Fix64::ZERO)
            .restitution(Fix64::ZERO)
    }

    /// Non-solid region reporting entered/exited bodies
    pub fn trigger_area(position: Vec2Fix) -> BodyBuilder {
        BodyBuilder::new_trigger()
            .position(position)
            .track_overlaps()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::AREA_MASS_RATIO;
    use crate::engine::physics::shape::ShapeBuilder;

    fn fx(value: f64) -> Fix64 {
        Fix64::from_f64(value)
    }

    fn build(builder: BodyBuilder, shapes: &mut ShapeSet) -> Body {
        let mut body = Body::new(BodyHandle::new(0, 0), &builder);
        let (position, angle) = builder.transform();
        for shape in builder.shape_handles() {
            shapes
                .attach(*shape, body.handle(), position, Vec2Fix::polar(angle), AREA_MASS_RATIO)
                .expect("attach");
        }
        body.compute_mass(shapes);
        body.apply_transform(shapes);
        body
    }

    #[test]
    fn test_body_builder_dynamic() {
        let mut shapes = ShapeSet::new();
        let circle = shapes.create(ShapeBuilder::circle(Fix64::ONE)).expect("shape");
        let body = build(
            BodyBuilder::new_dynamic()
                .position(Vec2Fix::from_ints(10, 20))
                .linvel(Vec2Fix::from_ints(5, 0))
                .shape(circle),
            &mut shapes,
        );

        assert_eq!(body.body_type(), BodyType::Dynamic);
        assert_eq!(body.position(), Vec2Fix::from_ints(10, 20));
        assert_eq!(body.linear_velocity(), Vec2Fix::from_ints(5, 0));
        assert!(body.mass().is_positive());
        let product = body.mass() * body.inv_mass();
        assert!((product - Fix64::ONE).abs() < fx(1e-6));
    }

    #[test]
    fn test_non_dynamic_bodies_have_no_inverse_mass() {
        let mut shapes = ShapeSet::new();
        for builder in [
            BodyBuilder::new_static(),
            BodyBuilder::new_kinematic(),
            BodyBuilder::new_trigger(),
        ] {
            let circle = shapes.create(ShapeBuilder::circle(Fix64::ONE)).expect("shape");
            let body = build(builder.linvel(Vec2Fix::from_ints(1, 0)).shape(circle), &mut shapes);
            assert_eq!(body.inv_mass(), Fix64::ZERO);
            assert_eq!(body.inv_inertia(), Fix64::ZERO);
            assert_eq!(body.linear_velocity(), Vec2Fix::ZERO);
        }
    }

    #[test]
    fn test_integrate_applies_force_and_clears_it() {
        let mut shapes = ShapeSet::new();
        let circle = shapes.create(ShapeBuilder::circle(Fix64::ONE)).expect("shape");
        let mut body = build(BodyBuilder::new_dynamic().shape(circle), &mut shapes);

        body.add_force(Vec2Fix::new(body.mass(), Fix64::ZERO));
        body.integrate(Fix64::ONE, Fix64::ONE);

        // Unit acceleration over one second: v = 1, x = 0.5
        assert!((body.linear_velocity().x - Fix64::ONE).abs() < fx(1e-6));
        assert!((body.position().x - Fix64::HALF).abs() < fx(1e-6));
        assert_eq!(body.force(), Vec2Fix::ZERO);
    }

    #[test]
    fn test_kinematic_ignores_forces() {
        let mut shapes = ShapeSet::new();
        let circle = shapes.create(ShapeBuilder::circle(Fix64::ONE)).expect("shape");
        let mut body = build(BodyBuilder::new_kinematic().shape(circle), &mut shapes);
        body.add_force(Vec2Fix::from_ints(100, 0));
        body.integrate(Fix64::ONE, Fix64::ONE);
        assert_eq!(body.position(), Vec2Fix::ZERO);
        assert_eq!(body.force(), Vec2Fix::ZERO);
    }

    #[test]
    fn test_force_at_point_produces_torque() {
        let mut shapes = ShapeSet::new();
        let square = shapes
            .create(ShapeBuilder::box_shape(Fix64::ONE, Fix64::ONE))
            .expect("shape");
        let mut body = build(BodyBuilder::new_dynamic().shape(square), &mut shapes);
        body.add_force_at(Vec2Fix::from_ints(0, 1), Vec2Fix::from_ints(1, 0));
        body.integrate(Fix64::ONE, Fix64::ONE);
        // Pushing up on the right edge spins counter-clockwise
        assert!(body.angular_velocity().is_positive());
        assert!(body.angle().is_positive());
    }

    #[test]
    fn test_aabb_contains_every_shape() {
        let mut shapes = ShapeSet::new();
        let left = shapes
            .create(ShapeBuilder::circle(Fix64::ONE).offset(Vec2Fix::from_ints(-3, 0)))
            .expect("shape");
        let right = shapes
            .create(ShapeBuilder::box_shape(Fix64::ONE, Fix64::TWO).offset(Vec2Fix::from_ints(3, 1)))
            .expect("shape");
        let mut body = build(
            BodyBuilder::new_dynamic()
                .position_rotation(Vec2Fix::from_ints(2, 2), fx(0.6))
                .shapes(&[left, right]),
            &mut shapes,
        );
        body.set_transform_raw(Vec2Fix::from_ints(-7, 4), fx(2.1));
        body.apply_transform(&mut shapes);

        for handle in body.shapes() {
            let shape_aabb = shapes.get(*handle).expect("live").aabb();
            assert!(body.aabb().contains(&shape_aabb));
        }
    }

    #[test]
    fn test_try_get_space_without_history() {
        let mut shapes = ShapeSet::new();
        let circle = shapes.create(ShapeBuilder::circle(Fix64::ONE)).expect("shape");
        let body = build(BodyBuilder::new_kinematic().shape(circle), &mut shapes);
        let (current, exact) = body.try_get_space(0);
        assert!(exact);
        assert_eq!(current.position, Vec2Fix::ZERO);
        let (fallback, exact) = body.try_get_space(3);
        assert!(!exact);
        assert_eq!(fallback, current);
    }

    #[test]
    fn test_record_collision_deduplicates() {
        let mut shapes = ShapeSet::new();
        let circle = shapes.create(ShapeBuilder::circle(Fix64::ONE)).expect("shape");
        let mut body = build(BodyBuilder::new_kinematic().shape(circle), &mut shapes);
        let other = BodyHandle::new(4, 0);
        body.record_collision(other);
        body.record_collision(other);
        assert_eq!(body.take_colliding(), vec![other]);
    }

    #[test]
    fn test_presets() {
        assert_eq!(presets::static_ground(Vec2Fix::ZERO).body_type(), BodyType::Static);
        assert_eq!(
            presets::dynamic_box(Vec2Fix::ZERO, Vec2Fix::UNIT_X).body_type(),
            BodyType::Dynamic
        );
        assert_eq!(presets::kinematic_mover(Vec2Fix::ZERO).body_type(), BodyType::Kinematic);

        let mut shapes = ShapeSet::new();
        let zone = shapes
            .create(presets::ground_shape(Fix64::TWO, Fix64::TWO))
            .expect("shape");
        let area = build(presets::trigger_area(Vec2Fix::ZERO).shape(zone), &mut shapes);
        assert_eq!(area.body_type(), BodyType::Trigger);
        assert!(area.overlapping().is_some());
        assert_eq!((area.layer(), area.mask()), (DEFAULT_LAYER, ALL_LAYERS));
    }
}
