// Axis-aligned bounding boxes

use super::ray::RayCast;
use crate::core::{Fix64, Vec2Fix};

/// Axis-aligned bounding box in world space
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Aabb {
    pub min: Vec2Fix,
    pub max: Vec2Fix,
}

impl Aabb {
    pub fn new(min: Vec2Fix, max: Vec2Fix) -> Self {
        Self { min, max }
    }

    /// Degenerate box containing one point
    pub fn from_point(point: Vec2Fix) -> Self {
        Self::new(point, point)
    }

    pub fn from_circle(center: Vec2Fix, radius: Fix64) -> Self {
        let extent = Vec2Fix::new(radius, radius);
        Self::new(center - extent, center + extent)
    }

    /// Tight box around a point set; `None` when empty
    pub fn from_points(points: &[Vec2Fix]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut aabb = Self::from_point(*first);
        for point in rest {
            aabb.min = aabb.min.min(*point);
            aabb.max = aabb.max.max(*point);
        }
        Some(aabb)
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb::new(self.min.min(other.min), self.max.max(other.max))
    }

    /// Boxes that share an edge count as overlapping
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn contains_point(&self, point: Vec2Fix) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    pub fn contains(&self, other: &Aabb) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    /// Overlap test against a circle (closest-point distance)
    pub fn overlaps_circle(&self, center: Vec2Fix, radius: Fix64) -> bool {
        let closest = center.max(self.min).min(self.max);
        (center - closest).length_squared() <= radius * radius
    }

    pub fn inflate(&self, amount: Fix64) -> Aabb {
        let extent = Vec2Fix::new(amount, amount);
        Aabb::new(self.min - extent, self.max + extent)
    }

    pub fn translate(&self, offset: Vec2Fix) -> Aabb {
        Aabb::new(self.min + offset, self.max + offset)
    }

    pub fn center(&self) -> Vec2Fix {
        (self.min + self.max) * Fix64::HALF
    }

    pub fn extent(&self) -> Vec2Fix {
        self.max - self.min
    }

    /// Slab test: does the ray segment touch this box?
    pub fn ray_cast(&self, ray: &RayCast) -> bool {
        let mut t_min = Fix64::ZERO;
        let mut t_max = ray.distance;

        for (origin, direction, low, high) in [
            (ray.origin.x, ray.direction.x, self.min.x, self.max.x),
            (ray.origin.y, ray.direction.y, self.min.y, self.max.y),
        ] {
            if direction.is_zero() {
                if origin < low || origin > high {
                    return false;
                }
                continue;
            }

            let mut t1 = (low - origin) / direction;
            let mut t2 = (high - origin) / direction;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return false;
            }
        }
        true
    }

    /// Ray test against this box grown by `radius`
    pub fn circle_cast(&self, ray: &RayCast, radius: Fix64) -> bool {
        self.inflate(radius).ray_cast(ray)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb {
        Aabb::new(Vec2Fix::ZERO, Vec2Fix::from_ints(1, 1))
    }

    #[test]
    fn test_overlap_includes_touching() {
        let a = unit_box();
        let b = a.translate(Vec2Fix::from_ints(1, 0));
        let c = a.translate(Vec2Fix::from_ints(2, 0));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_union_contains_both() {
        let a = unit_box();
        let b = a.translate(Vec2Fix::from_ints(3, -2));
        let merged = a.union(&b);
        assert!(merged.contains(&a));
        assert!(merged.contains(&b));
    }

    #[test]
    fn test_from_points() {
        let points = [
            Vec2Fix::from_ints(1, 5),
            Vec2Fix::from_ints(-2, 0),
            Vec2Fix::from_ints(3, 1),
        ];
        let aabb = Aabb::from_points(&points).expect("non-empty");
        assert_eq!(aabb.min, Vec2Fix::from_ints(-2, 0));
        assert_eq!(aabb.max, Vec2Fix::from_ints(3, 5));
        assert!(Aabb::from_points(&[]).is_none());
    }

    #[test]
    fn test_ray_cast() {
        let aabb = unit_box().translate(Vec2Fix::from_ints(5, 0));
        let hit = RayCast::new(Vec2Fix::from_ints(0, 0), Vec2Fix::from_ints(10, 1));
        let short = RayCast::new(Vec2Fix::from_ints(0, 0), Vec2Fix::from_ints(4, 0));
        let above = RayCast::new(Vec2Fix::from_ints(0, 3), Vec2Fix::from_ints(10, 3));
        assert!(aabb.ray_cast(&hit));
        assert!(!aabb.ray_cast(&short));
        assert!(!aabb.ray_cast(&above));
    }

    #[test]
    fn test_circle_cast_uses_radius() {
        let aabb = unit_box().translate(Vec2Fix::from_ints(5, 0));
        let ray = RayCast::new(Vec2Fix::from_ints(0, 2), Vec2Fix::from_ints(10, 2));
        assert!(!aabb.ray_cast(&ray));
        assert!(aabb.circle_cast(&ray, Fix64::from_int(2)));
    }

    #[test]
    fn test_overlaps_circle() {
        let aabb = unit_box();
        assert!(aabb.overlaps_circle(Vec2Fix::from_ints(2, 0), Fix64::ONE));
        assert!(!aabb.overlaps_circle(Vec2Fix::from_ints(3, 3), Fix64::ONE));
    }
}
