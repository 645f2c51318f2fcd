// Fixed-point vector and transform types

use super::fixed::Fix64;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// 2D vector of [`Fix64`] components
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable,
)]
pub struct Vec2Fix {
    pub x: Fix64,
    pub y: Fix64,
}

impl Vec2Fix {
    pub const ZERO: Vec2Fix = Vec2Fix::new(Fix64::ZERO, Fix64::ZERO);
    pub const UNIT_X: Vec2Fix = Vec2Fix::new(Fix64::ONE, Fix64::ZERO);
    pub const UNIT_Y: Vec2Fix = Vec2Fix::new(Fix64::ZERO, Fix64::ONE);

    #[inline]
    pub const fn new(x: Fix64, y: Fix64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fix64::from_int(x), Fix64::from_int(y))
    }

    /// Host-side conversion
    pub fn from_f32(x: f32, y: f32) -> Self {
        Self::new(Fix64::from_f32(x), Fix64::from_f32(y))
    }

    /// Convert for display; never feed the result back into the simulation
    pub fn to_glam(self) -> glam::Vec2 {
        glam::Vec2::new(self.x.to_f32(), self.y.to_f32())
    }

    #[inline]
    pub fn dot(self, other: Vec2Fix) -> Fix64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product
    #[inline]
    pub fn cross(self, other: Vec2Fix) -> Fix64 {
        self.x * other.y - self.y * other.x
    }

    #[inline]
    pub fn length_squared(self) -> Fix64 {
        self.dot(self)
    }

    pub fn length(self) -> Fix64 {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction, or zero for the zero vector
    pub fn normalized(self) -> Vec2Fix {
        let length = self.length();
        if length.is_zero() {
            return Vec2Fix::ZERO;
        }
        self / length
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.x.is_zero() && self.y.is_zero()
    }

    /// Counter-clockwise perpendicular `(-y, x)`
    #[inline]
    pub fn left(self) -> Vec2Fix {
        Vec2Fix::new(-self.y, self.x)
    }

    /// Clockwise perpendicular `(y, -x)`
    #[inline]
    pub fn right(self) -> Vec2Fix {
        Vec2Fix::new(self.y, -self.x)
    }

    /// Rotate by a unit facing vector `(cos, sin)`
    #[inline]
    pub fn rotate(self, facing: Vec2Fix) -> Vec2Fix {
        Vec2Fix::new(
            self.x * facing.x - self.y * facing.y,
            self.x * facing.y + self.y * facing.x,
        )
    }

    /// Inverse of [`Vec2Fix::rotate`]
    #[inline]
    pub fn inv_rotate(self, facing: Vec2Fix) -> Vec2Fix {
        Vec2Fix::new(
            self.x * facing.x + self.y * facing.y,
            self.y * facing.x - self.x * facing.y,
        )
    }

    /// Unit vector for an angle in radians
    pub fn polar(angle: Fix64) -> Vec2Fix {
        Vec2Fix::new(angle.cos(), angle.sin())
    }

    /// Remove the component along `normal`, leaving motion tangent to the surface
    pub fn slide(self, normal: Vec2Fix) -> Vec2Fix {
        self - normal * self.dot(normal)
    }

    pub fn lerp(self, other: Vec2Fix, weight: Fix64) -> Vec2Fix {
        Vec2Fix::new(self.x.lerp(other.x, weight), self.y.lerp(other.y, weight))
    }

    pub fn min(self, other: Vec2Fix) -> Vec2Fix {
        Vec2Fix::new(self.x.min(other.x), self.y.min(other.y))
    }

    pub fn max(self, other: Vec2Fix) -> Vec2Fix {
        Vec2Fix::new(self.x.max(other.x), self.y.max(other.y))
    }
}

impl Add for Vec2Fix {
    type Output = Vec2Fix;
    #[inline]
    fn add(self, rhs: Vec2Fix) -> Vec2Fix {
        Vec2Fix::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2Fix {
    type Output = Vec2Fix;
    #[inline]
    fn sub(self, rhs: Vec2Fix) -> Vec2Fix {
        Vec2Fix::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Vec2Fix {
    type Output = Vec2Fix;
    #[inline]
    fn neg(self) -> Vec2Fix {
        Vec2Fix::new(-self.x, -self.y)
    }
}

impl Mul<Fix64> for Vec2Fix {
    type Output = Vec2Fix;
    #[inline]
    fn mul(self, rhs: Fix64) -> Vec2Fix {
        Vec2Fix::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<Fix64> for Vec2Fix {
    type Output = Vec2Fix;
    #[inline]
    fn div(self, rhs: Fix64) -> Vec2Fix {
        Vec2Fix::new(self.x / rhs, self.y / rhs)
    }
}

impl AddAssign for Vec2Fix {
    #[inline]
    fn add_assign(&mut self, rhs: Vec2Fix) {
        *self = *self + rhs;
    }
}

impl SubAssign for Vec2Fix {
    #[inline]
    fn sub_assign(&mut self, rhs: Vec2Fix) {
        *self = *self - rhs;
    }
}

/// Position and rotation of a body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transform2D {
    pub position: Vec2Fix,
    pub angle: Fix64,
}

impl Transform2D {
    pub fn new(position: Vec2Fix, angle: Fix64) -> Self {
        Self { position, angle }
    }

    pub fn facing(&self) -> Vec2Fix {
        Vec2Fix::polar(self.angle)
    }

    /// Map a body-space point into world space
    pub fn apply(&self, point: Vec2Fix) -> Vec2Fix {
        self.position + point.rotate(self.facing())
    }

    /// Map a world-space point into body space
    pub fn inverse_apply(&self, point: Vec2Fix) -> Vec2Fix {
        (point - self.position).inv_rotate(self.facing())
    }

    /// Blend toward `other` for display between two saved ticks
    pub fn interpolate_with(&self, other: &Transform2D, weight: Fix64) -> Transform2D {
        Transform2D {
            position: self.position.lerp(other.position, weight),
            angle: self.angle.lerp(other.angle, weight),
        }
    }

    /// Position and angle as floats for a renderer
    pub fn to_glam(&self) -> (glam::Vec2, f32) {
        (self.position.to_glam(), self.angle.to_f32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn fx(value: f64) -> Fix64 {
        Fix64::from_f64(value)
    }

    #[test]
    fn test_dot_and_cross() {
        let a = Vec2Fix::from_ints(1, 2);
        let b = Vec2Fix::from_ints(3, 4);
        assert_eq!(a.dot(b), Fix64::from_int(11));
        assert_eq!(a.cross(b), Fix64::from_int(-2));
    }

    #[test]
    fn test_perpendiculars() {
        let v = Vec2Fix::from_ints(1, 0);
        assert_eq!(v.left(), Vec2Fix::from_ints(0, 1));
        assert_eq!(v.right(), Vec2Fix::from_ints(0, -1));
    }

    #[test]
    fn test_rotate_roundtrip() {
        let facing = Vec2Fix::polar(fx(0.7));
        let v = Vec2Fix::from_ints(3, -2);
        let back = v.rotate(facing).inv_rotate(facing);
        assert!((back - v).length() < fx(1e-6));
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let facing = Vec2Fix::polar(Fix64::HALF_PI);
        let rotated = Vec2Fix::UNIT_X.rotate(facing);
        assert!((rotated - Vec2Fix::UNIT_Y).length() < fx(1e-8));
    }

    #[test]
    fn test_normalized() {
        let v = Vec2Fix::from_ints(3, 4).normalized();
        assert_relative_eq!(v.x.to_f32(), 0.6, epsilon = 1e-6);
        assert_relative_eq!(v.y.to_f32(), 0.8, epsilon = 1e-6);
        assert_eq!(Vec2Fix::ZERO.normalized(), Vec2Fix::ZERO);
    }

    #[test]
    fn test_slide_removes_normal_component() {
        let v = Vec2Fix::from_ints(3, -4);
        let slid = v.slide(Vec2Fix::UNIT_Y);
        assert_eq!(slid, Vec2Fix::from_ints(3, 0));
    }

    #[test]
    fn test_transform_apply_inverse() {
        let t = Transform2D::new(Vec2Fix::from_ints(5, 1), fx(1.2));
        let p = Vec2Fix::from_ints(-2, 7);
        let back = t.inverse_apply(t.apply(p));
        assert!((back - p).length() < fx(1e-6));
    }

    #[test]
    fn test_interpolate_with() {
        let a = Transform2D::new(Vec2Fix::ZERO, Fix64::ZERO);
        let b = Transform2D::new(Vec2Fix::from_ints(4, -2), Fix64::ONE);
        let mid = a.interpolate_with(&b, Fix64::HALF);
        assert_eq!(mid.position, Vec2Fix::from_ints(2, -1));
        assert_eq!(mid.angle, Fix64::HALF);

        let (position, angle) = mid.to_glam();
        assert_relative_eq!(position.x, 2.0);
        assert_relative_eq!(angle, 0.5);
    }
}
