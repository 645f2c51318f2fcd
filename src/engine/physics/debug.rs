// Debug line geometry for physics objects

use super::body::BodyType;
use super::shape::ShapeRef;
use super::world::PhysicsWorld;
use crate::core::Vec2Fix;
use glam::Vec2;

/// One end of a debug line, laid out for a vertex buffer
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DebugVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

const AABB_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 0.3];
const CONTACT_COLOR: [f32; 4] = [1.0, 0.2, 0.2, 1.0];
const CONTACT_NORMAL_LENGTH: f32 = 0.5;
const CONTACT_MARK_SIZE: f32 = 0.1;

/// Indexed line list describing the world
///
/// Renderer-agnostic: upload `vertices` and `indices` with line-list topology
/// (two indices per segment). Coordinates are converted to floats here and
/// nothing flows back into the simulation.
#[derive(Debug, Clone, Default)]
pub struct DebugLines {
    vertices: Vec<DebugVertex>,
    indices: Vec<u32>,
    enabled: bool,
    draw_aabbs: bool,
    draw_contacts: bool,
}

impl DebugLines {
    pub fn new() -> Self {
        Self {
            draw_contacts: true,
            ..Self::default()
        }
    }

    /// Enable or disable debug geometry
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_draw_aabbs(&mut self, draw: bool) {
        self.draw_aabbs = draw;
    }

    pub fn set_draw_contacts(&mut self, draw: bool) {
        self.draw_contacts = draw;
    }

    pub fn vertices(&self) -> &[DebugVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Vertex data as bytes, ready for a GPU buffer
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn line_count(&self) -> usize {
        self.indices.len() / 2
    }

    /// Rebuild the geometry from the current state of `world`
    pub fn prepare(&mut self, world: &PhysicsWorld) {
        self.vertices.clear();
        self.indices.clear();
        if !self.enabled {
            return;
        }

        for body in world.bodies() {
            let color = body_color(body.body_type());
            let facing = body.facing().to_glam();
            for shape in body.shapes() {
                match world.shape(*shape) {
                    Some(ShapeRef::Circle(circle)) => {
                        self.draw_circle(circle.world_origin().to_glam(), circle.radius().to_f32(), facing, color)
                    }
                    Some(ShapeRef::Polygon(polygon)) => self.draw_polygon(polygon.world_vertices(), color),
                    None => {}
                }
            }
            if self.draw_aabbs {
                let aabb = body.aabb();
                self.draw_box(aabb.min.to_glam(), aabb.max.to_glam(), AABB_COLOR);
            }
        }

        if self.draw_contacts {
            for contact in world.contacts() {
                let position = contact.position.to_glam();
                self.draw_cross(position, CONTACT_MARK_SIZE, CONTACT_COLOR);
                let tip = position + contact.normal.to_glam() * CONTACT_NORMAL_LENGTH;
                self.draw_line(position, tip, CONTACT_COLOR);
            }
        }
    }

    fn push_vertex(&mut self, position: Vec2, color: [f32; 4]) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(DebugVertex {
            position: position.to_array(),
            color,
        });
        index
    }

    fn draw_line(&mut self, from: Vec2, to: Vec2, color: [f32; 4]) {
        let a = self.push_vertex(from, color);
        let b = self.push_vertex(to, color);
        self.indices.extend_from_slice(&[a, b]);
    }

    /// Close a loop over `points`
    fn draw_loop(&mut self, points: impl Iterator<Item = Vec2>, color: [f32; 4]) {
        let start = self.vertices.len() as u32;
        let mut count = 0;
        for point in points {
            self.push_vertex(point, color);
            count += 1;
        }
        for i in 0..count {
            self.indices.push(start + i);
            self.indices.push(start + (i + 1) % count);
        }
    }

    fn draw_circle(&mut self, center: Vec2, radius: f32, facing: Vec2, color: [f32; 4]) {
        const SEGMENTS: u32 = 16;
        let points = (0..SEGMENTS).map(|i| {
            let angle = (i as f32 / SEGMENTS as f32) * std::f32::consts::TAU;
            center + Vec2::from_angle(angle) * radius
        });
        self.draw_loop(points, color);
        // Radius marker along the body's facing
        self.draw_line(center, center + facing * radius, color);
    }

    fn draw_polygon(&mut self, vertices: &[Vec2Fix], color: [f32; 4]) {
        self.draw_loop(vertices.iter().map(|v| v.to_glam()), color);
    }

    fn draw_box(&mut self, min: Vec2, max: Vec2, color: [f32; 4]) {
        let corners = [min, Vec2::new(max.x, min.y), max, Vec2::new(min.x, max.y)];
        self.draw_loop(corners.into_iter(), color);
    }

    fn draw_cross(&mut self, center: Vec2, size: f32, color: [f32; 4]) {
        self.draw_line(center - Vec2::X * size, center + Vec2::X * size, color);
        self.draw_line(center - Vec2::Y * size, center + Vec2::Y * size, color);
    }
}

fn body_color(body_type: BodyType) -> [f32; 4] {
    match body_type {
        BodyType::Dynamic => [0.0, 1.0, 0.0, 0.8],   // Green for dynamic
        BodyType::Static => [0.5, 0.5, 0.5, 0.8],    // Gray for static
        BodyType::Kinematic => [0.0, 0.5, 1.0, 0.8], // Blue for kinematic
        BodyType::Trigger => [1.0, 0.8, 0.0, 0.5],   // Yellow for triggers
    }
}
