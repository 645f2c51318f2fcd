// Circle and convex polygon shapes, pooled by concrete type

use super::aabb::Aabb;
use super::body::BodyHandle;
use super::error::{PhysicsError, Result};
use super::pool::{Handle, Pool};
use super::ray::{RayCast, ShapeHit};
use crate::core::{Fix64, Vec2Fix};
use crate::engine::config::{DEFAULT_DENSITY, DEFAULT_FRICTION, DEFAULT_RESTITUTION};

pub type CircleHandle = Handle<Circle>;
pub type PolygonHandle = Handle<Polygon>;

/// Handle to a shape in either typed pool
///
/// Variant order is the canonical narrowphase order: circles sort before
/// polygons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShapeHandle {
    Circle(CircleHandle),
    Polygon(PolygonHandle),
}

impl ShapeHandle {
    pub fn kind(&self) -> ShapeKind {
        match self {
            ShapeHandle::Circle(_) => ShapeKind::Circle,
            ShapeHandle::Polygon(_) => ShapeKind::Polygon,
        }
    }

    pub(crate) fn to_bits(&self) -> u64 {
        match self {
            ShapeHandle::Circle(h) => h.to_bits() << 1,
            ShapeHandle::Polygon(h) => (h.to_bits() << 1) | 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShapeKind {
    Circle,
    Polygon,
}

/// Surface and mass properties of a shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Material {
    /// Zero density makes the shape massless
    pub density: Fix64,
    pub friction: Fix64,
    pub restitution: Fix64,
}

impl Material {
    pub fn new(density: Fix64, friction: Fix64, restitution: Fix64) -> Self {
        Self {
            density,
            friction,
            restitution,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new(DEFAULT_DENSITY, DEFAULT_FRICTION, DEFAULT_RESTITUTION)
    }
}

/// State shared by every shape type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeData {
    body: Option<BodyHandle>,
    material: Material,
    area: Fix64,
    mass: Fix64,
    /// Moment of inertia per unit mass, about the body origin
    inertia: Fix64,
    aabb: Aabb,
    /// Geometry was given in world space and is converted when attached
    world_space_input: bool,
}

impl ShapeData {
    fn new(material: Material, world_space_input: bool) -> Self {
        Self {
            body: None,
            material,
            area: Fix64::ZERO,
            mass: Fix64::ZERO,
            inertia: Fix64::ZERO,
            aabb: Aabb::default(),
            world_space_input,
        }
    }

    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    pub fn material(&self) -> Material {
        self.material
    }

    pub fn area(&self) -> Fix64 {
        self.area
    }

    pub fn mass(&self) -> Fix64 {
        self.mass
    }

    pub fn inertia(&self) -> Fix64 {
        self.inertia
    }

    /// World-space bounds as of the last transform update
    pub fn aabb(&self) -> Aabb {
        self.aabb
    }

    fn set_mass_properties(&mut self, area: Fix64, inertia: Fix64, area_mass_ratio: Fix64) {
        self.area = area;
        self.inertia = inertia;
        self.mass = area * self.material.density * area_mass_ratio;
    }
}

/// Circle with an offset origin
#[derive(Debug, Clone)]
pub struct Circle {
    data: ShapeData,
    body_origin: Vec2Fix,
    radius: Fix64,
    world_origin: Vec2Fix,
    /// World-space origin as given, kept until the owning body is accepted
    world_input: Option<Vec2Fix>,
}

impl Circle {
    fn new(origin: Vec2Fix, radius: Fix64, material: Material, world_space: bool) -> Result<Self> {
        if !radius.is_positive() {
            return Err(PhysicsError::InvalidShape("circle radius must be positive"));
        }
        let mut circle = Self {
            data: ShapeData::new(material, world_space),
            body_origin: origin,
            radius,
            world_origin: origin,
            world_input: None,
        };
        circle.data.aabb = Aabb::from_circle(origin, radius);
        Ok(circle)
    }

    pub fn data(&self) -> &ShapeData {
        &self.data
    }

    pub fn radius(&self) -> Fix64 {
        self.radius
    }

    pub fn body_origin(&self) -> Vec2Fix {
        self.body_origin
    }

    pub fn world_origin(&self) -> Vec2Fix {
        self.world_origin
    }

    fn attach(&mut self, position: Vec2Fix, facing: Vec2Fix, area_mass_ratio: Fix64) {
        if self.data.world_space_input {
            self.world_input = Some(self.body_origin);
            self.body_origin = (self.body_origin - position).inv_rotate(facing);
            self.data.world_space_input = false;
        }
        let r2 = self.radius.square();
        let area = Fix64::PI * r2;
        let inertia = r2 * Fix64::HALF + self.body_origin.length_squared();
        self.data.set_mass_properties(area, inertia, area_mass_ratio);
    }

    fn detach(&mut self) {
        if let Some(origin) = self.world_input.take() {
            self.body_origin = origin;
            self.world_origin = origin;
            self.data.aabb = Aabb::from_circle(origin, self.radius);
            self.data.world_space_input = true;
        }
    }

    fn update_world(&mut self, position: Vec2Fix, facing: Vec2Fix) -> Aabb {
        self.world_origin = position + self.body_origin.rotate(facing);
        self.data.aabb = Aabb::from_circle(self.world_origin, self.radius);
        self.data.aabb
    }

    fn query_point(&self, point: Vec2Fix) -> bool {
        (point - self.body_origin).length_squared() <= self.radius.square()
    }

    fn query_circle(&self, center: Vec2Fix, radius: Fix64) -> bool {
        (center - self.body_origin).length_squared() <= (self.radius + radius).square()
    }

    fn ray_cast(&self, ray: &RayCast) -> Option<ShapeHit> {
        ray_circle(ray, self.body_origin, self.radius)
    }

    fn circle_cast(&self, ray: &RayCast, radius: Fix64) -> Option<ShapeHit> {
        ray_circle(ray, self.body_origin, self.radius + radius)
    }
}

/// Outward edge normal and its offset from the origin
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Axis {
    pub normal: Vec2Fix,
    pub width: Fix64,
}

/// Convex polygon with counter-clockwise vertices
#[derive(Debug, Clone)]
pub struct Polygon {
    data: ShapeData,
    body_vertices: Vec<Vec2Fix>,
    body_axes: Vec<Axis>,
    world_vertices: Vec<Vec2Fix>,
    world_axes: Vec<Axis>,
    world_input: Option<Vec<Vec2Fix>>,
}

impl Polygon {
    fn new(vertices: &[Vec2Fix], material: Material, world_space: bool) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(PhysicsError::InvalidPolygon {
                reason: "a polygon needs at least three vertices",
            });
        }

        let mut body_vertices = vertices.to_vec();
        let twice_area = signed_twice_area(&body_vertices);
        if twice_area.is_zero() {
            return Err(PhysicsError::InvalidPolygon {
                reason: "vertices enclose no area",
            });
        }
        if twice_area.is_negative() {
            body_vertices.reverse();
        }

        let count = body_vertices.len();
        for i in 0..count {
            let a = body_vertices[i];
            let b = body_vertices[(i + 1) % count];
            let c = body_vertices[(i + 2) % count];
            if (b - a).cross(c - b).is_negative() {
                return Err(PhysicsError::InvalidPolygon {
                    reason: "vertices are not convex",
                });
            }
        }

        let body_axes = compute_axes(&body_vertices);
        let mut polygon = Self {
            data: ShapeData::new(material, world_space),
            world_vertices: body_vertices.clone(),
            world_axes: body_axes.clone(),
            body_vertices,
            body_axes,
            world_input: None,
        };
        polygon.data.aabb = Aabb::from_points(&polygon.world_vertices).unwrap_or_default();
        Ok(polygon)
    }

    pub fn data(&self) -> &ShapeData {
        &self.data
    }

    pub fn body_vertices(&self) -> &[Vec2Fix] {
        &self.body_vertices
    }

    pub fn world_vertices(&self) -> &[Vec2Fix] {
        &self.world_vertices
    }

    pub fn world_axes(&self) -> &[Axis] {
        &self.world_axes
    }

    /// Area-weighted centre in body space
    pub fn centroid(&self) -> Vec2Fix {
        let count = self.body_vertices.len();
        let mut sum = Vec2Fix::ZERO;
        let mut twice_area = Fix64::ZERO;
        for i in 0..count {
            let v = self.body_vertices[i];
            let u = self.body_vertices[(i + 1) % count];
            let cross = v.cross(u);
            sum += (v + u) * cross;
            twice_area += cross;
        }
        sum / twice_area.mul_int(3)
    }

    fn attach(&mut self, position: Vec2Fix, facing: Vec2Fix, area_mass_ratio: Fix64) {
        if self.data.world_space_input {
            self.world_input = Some(self.body_vertices.clone());
            for vertex in &mut self.body_vertices {
                *vertex = (*vertex - position).inv_rotate(facing);
            }
            self.body_axes = compute_axes(&self.body_vertices);
            self.data.world_space_input = false;
        }

        let count = self.body_vertices.len();
        let mut twice_area = Fix64::ZERO;
        let mut numerator = Fix64::ZERO;
        for i in 0..count {
            let v = self.body_vertices[i];
            let u = self.body_vertices[(i + 1) % count];
            let cross = v.cross(u);
            twice_area += cross;
            numerator += cross * (v.dot(v) + v.dot(u) + u.dot(u));
        }
        let inertia = numerator / twice_area.mul_int(6);
        self.data
            .set_mass_properties(twice_area * Fix64::HALF, inertia, area_mass_ratio);
    }

    fn detach(&mut self) {
        if let Some(vertices) = self.world_input.take() {
            self.body_axes = compute_axes(&vertices);
            self.world_axes.clone_from(&self.body_axes);
            self.world_vertices.clone_from(&vertices);
            self.data.aabb = Aabb::from_points(&vertices).unwrap_or_default();
            self.body_vertices = vertices;
            self.data.world_space_input = true;
        }
    }

    fn update_world(&mut self, position: Vec2Fix, facing: Vec2Fix) -> Aabb {
        for (world, body) in self.world_vertices.iter_mut().zip(&self.body_vertices) {
            *world = position + body.rotate(facing);
        }
        for ((world, body), vertex) in self
            .world_axes
            .iter_mut()
            .zip(&self.body_axes)
            .zip(&self.world_vertices)
        {
            world.normal = body.normal.rotate(facing);
            world.width = world.normal.dot(*vertex);
        }
        self.data.aabb = Aabb::from_points(&self.world_vertices).unwrap_or(self.data.aabb);
        self.data.aabb
    }

    /// World-space containment, edges inclusive
    pub(crate) fn contains_point(&self, point: Vec2Fix) -> bool {
        self.world_axes
            .iter()
            .all(|axis| axis.normal.dot(point) <= axis.width)
    }

    /// Containment ignoring edges that face away from `normal`
    pub(crate) fn contains_point_partial(&self, point: Vec2Fix, normal: Vec2Fix) -> bool {
        self.world_axes.iter().all(|axis| {
            axis.normal.dot(normal).is_negative() || axis.normal.dot(point) <= axis.width
        })
    }

    fn body_contains_point(&self, point: Vec2Fix) -> bool {
        self.body_axes
            .iter()
            .all(|axis| axis.normal.dot(point) <= axis.width)
    }

    fn body_edges(&self) -> impl Iterator<Item = (Vec2Fix, Vec2Fix, &Axis)> {
        let count = self.body_vertices.len();
        (0..count).map(move |i| {
            (
                self.body_vertices[i],
                self.body_vertices[(i + 1) % count],
                &self.body_axes[i],
            )
        })
    }

    fn query_point(&self, point: Vec2Fix) -> bool {
        self.body_contains_point(point)
    }

    fn query_circle(&self, center: Vec2Fix, radius: Fix64) -> bool {
        if self.body_contains_point(center) {
            return true;
        }
        let r2 = radius.square();
        self.body_edges()
            .any(|(a, b, _)| (center - closest_on_segment(center, a, b)).length_squared() <= r2)
    }

    fn ray_cast(&self, ray: &RayCast) -> Option<ShapeHit> {
        if self.body_contains_point(ray.origin) {
            return Some(ShapeHit::inside());
        }

        let mut enter = Fix64::ZERO;
        let mut exit = ray.distance;
        let mut normal = Vec2Fix::ZERO;
        for axis in &self.body_axes {
            let numerator = axis.width - axis.normal.dot(ray.origin);
            let denominator = axis.normal.dot(ray.direction);
            if denominator.is_zero() {
                if numerator.is_negative() {
                    return None;
                }
                continue;
            }

            let t = numerator / denominator;
            if denominator.is_negative() {
                if t > enter {
                    enter = t;
                    normal = axis.normal;
                }
            } else if t < exit {
                exit = t;
            }
            if enter > exit {
                return None;
            }
        }

        if normal.is_zero() {
            return None;
        }
        Some(ShapeHit::at(enter, normal))
    }

    fn circle_cast(&self, ray: &RayCast, radius: Fix64) -> Option<ShapeHit> {
        if self.query_circle(ray.origin, radius) {
            return Some(ShapeHit::inside());
        }

        let mut best: Option<ShapeHit> = None;
        let mut offer = |hit: ShapeHit| {
            if best.map_or(true, |b| hit.distance < b.distance) {
                best = Some(hit);
            }
        };

        for (a, b, axis) in self.body_edges() {
            let denominator = axis.normal.dot(ray.direction);
            if !denominator.is_negative() {
                continue;
            }
            let t = (axis.width + radius - axis.normal.dot(ray.origin)) / denominator;
            if t.is_negative() || t > ray.distance {
                continue;
            }
            let along = axis.normal.left();
            let projected = along.dot(ray.point_at(t));
            if projected >= along.dot(a) && projected <= along.dot(b) {
                offer(ShapeHit::at(t, axis.normal));
            }
        }

        for vertex in &self.body_vertices {
            if let Some(hit) = ray_circle(ray, *vertex, radius) {
                offer(hit);
            }
        }

        best
    }
}

fn signed_twice_area(vertices: &[Vec2Fix]) -> Fix64 {
    let count = vertices.len();
    (0..count).fold(Fix64::ZERO, |acc, i| {
        acc + vertices[i].cross(vertices[(i + 1) % count])
    })
}

fn compute_axes(vertices: &[Vec2Fix]) -> Vec<Axis> {
    let count = vertices.len();
    (0..count)
        .map(|i| {
            let edge = vertices[(i + 1) % count] - vertices[i];
            let normal = edge.right().normalized();
            Axis {
                normal,
                width: normal.dot(vertices[i]),
            }
        })
        .collect()
}

fn closest_on_segment(point: Vec2Fix, a: Vec2Fix, b: Vec2Fix) -> Vec2Fix {
    let edge = b - a;
    let length_sq = edge.length_squared();
    if length_sq.is_zero() {
        return a;
    }
    let t = ((point - a).dot(edge) / length_sq).clamp(Fix64::ZERO, Fix64::ONE);
    a + edge * t
}

/// Ray against a circle; the origin inside counts as contained
fn ray_circle(ray: &RayCast, center: Vec2Fix, radius: Fix64) -> Option<ShapeHit> {
    let offset = ray.origin - center;
    let r2 = radius.square();
    let c = offset.length_squared() - r2;
    if c.is_negative() {
        return Some(ShapeHit::inside());
    }

    let b = offset.dot(ray.direction);
    let discriminant = b.square() - c;
    if discriminant.is_negative() {
        return None;
    }

    let t = -b - discriminant.sqrt();
    if t.is_negative() || t > ray.distance {
        return None;
    }
    let normal = (ray.point_at(t) - center).normalized();
    Some(ShapeHit::at(t, normal))
}

/// Borrowed view of a shape of either type
#[derive(Debug, Clone, Copy)]
pub enum ShapeRef<'a> {
    Circle(&'a Circle),
    Polygon(&'a Polygon),
}

impl<'a> ShapeRef<'a> {
    pub fn data(&self) -> &'a ShapeData {
        match self {
            ShapeRef::Circle(c) => &c.data,
            ShapeRef::Polygon(p) => &p.data,
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            ShapeRef::Circle(_) => ShapeKind::Circle,
            ShapeRef::Polygon(_) => ShapeKind::Polygon,
        }
    }

    pub fn aabb(&self) -> Aabb {
        self.data().aabb
    }

    /// Point test in body space
    pub fn query_point(&self, point: Vec2Fix) -> bool {
        match self {
            ShapeRef::Circle(c) => c.query_point(point),
            ShapeRef::Polygon(p) => p.query_point(point),
        }
    }

    /// Circle overlap test in body space
    pub fn query_circle(&self, center: Vec2Fix, radius: Fix64) -> bool {
        match self {
            ShapeRef::Circle(c) => c.query_circle(center, radius),
            ShapeRef::Polygon(p) => p.query_circle(center, radius),
        }
    }

    pub(crate) fn ray_cast(&self, ray: &RayCast) -> Option<ShapeHit> {
        match self {
            ShapeRef::Circle(c) => c.ray_cast(ray),
            ShapeRef::Polygon(p) => p.ray_cast(ray),
        }
    }

    pub(crate) fn circle_cast(&self, ray: &RayCast, radius: Fix64) -> Option<ShapeHit> {
        match self {
            ShapeRef::Circle(c) => c.circle_cast(ray, radius),
            ShapeRef::Polygon(p) => p.circle_cast(ray, radius),
        }
    }
}

/// Builder for shapes with common configurations
#[derive(Debug, Clone)]
pub struct ShapeBuilder {
    geometry: Geometry,
    material: Material,
    world_space: bool,
}

#[derive(Debug, Clone)]
enum Geometry {
    Circle { origin: Vec2Fix, radius: Fix64 },
    Polygon { vertices: Vec<Vec2Fix> },
}

impl ShapeBuilder {
    /// Circle centred on the body origin
    pub fn circle(radius: Fix64) -> Self {
        Self::with_geometry(Geometry::Circle {
            origin: Vec2Fix::ZERO,
            radius,
        })
    }

    /// Box centred on the body origin
    pub fn box_shape(half_width: Fix64, half_height: Fix64) -> Self {
        Self::polygon(&[
            Vec2Fix::new(-half_width, -half_height),
            Vec2Fix::new(half_width, -half_height),
            Vec2Fix::new(half_width, half_height),
            Vec2Fix::new(-half_width, half_height),
        ])
    }

    /// Convex polygon; winding is corrected to counter-clockwise
    pub fn polygon(vertices: &[Vec2Fix]) -> Self {
        Self::with_geometry(Geometry::Polygon {
            vertices: vertices.to_vec(),
        })
    }

    fn with_geometry(geometry: Geometry) -> Self {
        Self {
            geometry,
            material: Material::default(),
            world_space: false,
        }
    }

    /// Shift the shape away from the body origin
    pub fn offset(mut self, offset: Vec2Fix) -> Self {
        match &mut self.geometry {
            Geometry::Circle { origin, .. } => *origin += offset,
            Geometry::Polygon { vertices } => {
                for vertex in vertices {
                    *vertex += offset;
                }
            }
        }
        self
    }

    /// Geometry is in world space and is converted into the body's frame
    /// when the body is created
    pub fn world_space(mut self) -> Self {
        self.world_space = true;
        self
    }

    pub fn density(mut self, density: Fix64) -> Self {
        self.material.density = density;
        self
    }

    pub fn friction(mut self, friction: Fix64) -> Self {
        self.material.friction = friction;
        self
    }

    pub fn restitution(mut self, restitution: Fix64) -> Self {
        self.material.restitution = restitution;
        self
    }

    pub fn material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }
}

/// Typed shape pools
#[derive(Debug, Default)]
pub struct ShapeSet {
    circles: Pool<Circle>,
    polygons: Pool<Polygon>,
}

impl ShapeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, builder: ShapeBuilder) -> Result<ShapeHandle> {
        match builder.geometry {
            Geometry::Circle { origin, radius } => {
                let circle = Circle::new(origin, radius, builder.material, builder.world_space)?;
                Ok(ShapeHandle::Circle(self.circles.insert(circle)))
            }
            Geometry::Polygon { vertices } => {
                let polygon = Polygon::new(&vertices, builder.material, builder.world_space)?;
                Ok(ShapeHandle::Polygon(self.polygons.insert(polygon)))
            }
        }
    }

    /// Return a shape to its pool; attached shapes are refused
    pub fn destroy(&mut self, handle: ShapeHandle) -> Result<()> {
        let data = self.get(handle).ok_or(PhysicsError::InvalidShapeHandle)?.data();
        if data.body.is_some() {
            return Err(PhysicsError::ShapeInUse);
        }
        self.release(handle);
        Ok(())
    }

    /// Return a shape to its pool regardless of ownership
    pub(crate) fn release(&mut self, handle: ShapeHandle) {
        match handle {
            ShapeHandle::Circle(h) => {
                self.circles.remove(h);
            }
            ShapeHandle::Polygon(h) => {
                self.polygons.remove(h);
            }
        }
    }

    pub fn get(&self, handle: ShapeHandle) -> Option<ShapeRef<'_>> {
        match handle {
            ShapeHandle::Circle(h) => self.circles.get(h).map(ShapeRef::Circle),
            ShapeHandle::Polygon(h) => self.polygons.get(h).map(ShapeRef::Polygon),
        }
    }

    pub fn len(&self) -> usize {
        self.circles.len() + self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn data_mut(&mut self, handle: ShapeHandle) -> Option<&mut ShapeData> {
        match handle {
            ShapeHandle::Circle(h) => self.circles.get_mut(h).map(|c| &mut c.data),
            ShapeHandle::Polygon(h) => self.polygons.get_mut(h).map(|p| &mut p.data),
        }
    }

    /// Bind a free shape to a body and compute its mass properties
    pub(crate) fn attach(
        &mut self,
        handle: ShapeHandle,
        body: BodyHandle,
        position: Vec2Fix,
        facing: Vec2Fix,
        area_mass_ratio: Fix64,
    ) -> Result<()> {
        let data = self.data_mut(handle).ok_or(PhysicsError::InvalidShapeHandle)?;
        if data.body.is_some() {
            return Err(PhysicsError::ShapeInUse);
        }
        data.body = Some(body);

        match handle {
            ShapeHandle::Circle(h) => {
                if let Some(circle) = self.circles.get_mut(h) {
                    circle.attach(position, facing, area_mass_ratio);
                    circle.update_world(position, facing);
                }
            }
            ShapeHandle::Polygon(h) => {
                if let Some(polygon) = self.polygons.get_mut(h) {
                    polygon.attach(position, facing, area_mass_ratio);
                    polygon.update_world(position, facing);
                }
            }
        }
        Ok(())
    }

    /// Undo an attach after a failed body construction, restoring any
    /// world-space geometry the shape was created with
    pub(crate) fn detach(&mut self, handle: ShapeHandle) {
        match handle {
            ShapeHandle::Circle(h) => {
                if let Some(circle) = self.circles.get_mut(h) {
                    circle.detach();
                }
            }
            ShapeHandle::Polygon(h) => {
                if let Some(polygon) = self.polygons.get_mut(h) {
                    polygon.detach();
                }
            }
        }
        if let Some(data) = self.data_mut(handle) {
            data.body = None;
        }
    }

    /// Recompute world geometry for a new body transform
    pub(crate) fn update_world(
        &mut self,
        handle: ShapeHandle,
        position: Vec2Fix,
        facing: Vec2Fix,
    ) -> Option<Aabb> {
        match handle {
            ShapeHandle::Circle(h) => self
                .circles
                .get_mut(h)
                .map(|c| c.update_world(position, facing)),
            ShapeHandle::Polygon(h) => self
                .polygons
                .get_mut(h)
                .map(|p| p.update_world(position, facing)),
        }
    }
}
