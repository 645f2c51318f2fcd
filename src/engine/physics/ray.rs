// Ray description and cast results

use super::body::BodyHandle;
use super::shape::ShapeHandle;
use crate::core::{Fix64, Vec2Fix};

/// A finite ray segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RayCast {
    pub origin: Vec2Fix,
    /// Unit direction
    pub direction: Vec2Fix,
    pub distance: Fix64,
}

impl RayCast {
    /// Ray from `origin` to `destination`
    pub fn new(origin: Vec2Fix, destination: Vec2Fix) -> Self {
        let delta = destination - origin;
        Self {
            origin,
            direction: delta.normalized(),
            distance: delta.length(),
        }
    }

    pub fn from_direction(origin: Vec2Fix, direction: Vec2Fix, distance: Fix64) -> Self {
        Self {
            origin,
            direction: direction.normalized(),
            distance,
        }
    }

    pub fn point_at(&self, distance: Fix64) -> Vec2Fix {
        self.origin + self.direction * distance
    }

    /// Express this ray in the body space of a transform
    pub(crate) fn to_body_space(&self, position: Vec2Fix, facing: Vec2Fix) -> RayCast {
        RayCast {
            origin: (self.origin - position).inv_rotate(facing),
            direction: self.direction.inv_rotate(facing),
            distance: self.distance,
        }
    }
}

/// Closest hit found by a ray or circle cast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RayResult {
    pub body: Option<BodyHandle>,
    pub shape: Option<ShapeHandle>,
    pub distance: Fix64,
    /// Surface normal at the hit, in world space
    pub normal: Vec2Fix,
    /// The ray started inside the shape
    pub contained: bool,
}

impl RayResult {
    pub fn new() -> Self {
        Self {
            body: None,
            shape: None,
            distance: Fix64::MAX,
            normal: Vec2Fix::ZERO,
            contained: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.shape.is_some()
    }

    pub fn point(&self, ray: &RayCast) -> Vec2Fix {
        ray.point_at(self.distance)
    }

    /// Keep the hit if it is closer than the current one
    pub(crate) fn offer(&mut self, hit: ShapeHit, body: BodyHandle, shape: ShapeHandle) -> bool {
        if self.contained || hit.distance >= self.distance {
            return false;
        }
        self.body = Some(body);
        self.shape = Some(shape);
        self.distance = hit.distance;
        self.normal = hit.normal;
        self.contained = hit.contained;
        true
    }
}

impl Default for RayResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw hit reported by a single shape test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ShapeHit {
    pub distance: Fix64,
    pub normal: Vec2Fix,
    pub contained: bool,
}

impl ShapeHit {
    pub fn at(distance: Fix64, normal: Vec2Fix) -> Self {
        Self {
            distance,
            normal,
            contained: false,
        }
    }

    pub fn inside() -> Self {
        Self {
            distance: Fix64::ZERO,
            normal: Vec2Fix::ZERO,
            contained: true,
        }
    }
}
