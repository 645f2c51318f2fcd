// Exact shape-pair tests producing manifolds
//
// Pairs are put into canonical order first (circle before polygon). Every
// test is strict: shapes that only touch do not collide.

use super::body::BodyHandle;
use super::manifold::Manifold;
use super::shape::{Circle, Polygon, ShapeData, ShapeHandle, ShapeRef, ShapeSet};
use crate::core::{Fix64, Vec2Fix};

/// Feature ids from the second polygon of a pair
const FEATURE_B: u32 = 0x100;
/// Feature ids of polygon vertices hit by a circle
const FEATURE_VERTEX: u32 = 0x200;

type Side = (BodyHandle, ShapeHandle);

/// Test one shape pair; `None` when the shapes do not overlap
pub(crate) fn collide(shapes: &ShapeSet, first: Side, second: Side) -> Option<Manifold> {
    let (first, second) = if first.1.kind() > second.1.kind() {
        (second, first)
    } else {
        (first, second)
    };
    let shape_a = shapes.get(first.1)?;
    let shape_b = shapes.get(second.1)?;

    match (shape_a, shape_b) {
        (ShapeRef::Circle(a), ShapeRef::Circle(b)) => collide_circles(a, b, first, second),
        (ShapeRef::Circle(a), ShapeRef::Polygon(b)) => collide_circle_polygon(a, b, first, second),
        (ShapeRef::Polygon(a), ShapeRef::Polygon(b)) => collide_polygons(a, b, first, second),
        // Canonical order rules this out
        (ShapeRef::Polygon(_), ShapeRef::Circle(_)) => None,
    }
}

fn new_manifold(a: Side, data_a: &ShapeData, b: Side, data_b: &ShapeData) -> Manifold {
    Manifold::new((a.0, a.1, data_a.material()), (b.0, b.1, data_b.material()))
}

/// Contact between two discs: position, normal (A to B) and depth
fn disc_contact(
    center_a: Vec2Fix,
    radius_a: Fix64,
    center_b: Vec2Fix,
    radius_b: Fix64,
) -> Option<(Vec2Fix, Vec2Fix, Fix64)> {
    let offset = center_b - center_a;
    let reach = radius_a + radius_b;
    let dist_sq = offset.length_squared();
    if dist_sq >= reach * reach {
        return None;
    }

    let dist = dist_sq.sqrt();
    if dist.is_zero() {
        return Some((center_a, Vec2Fix::UNIT_X, reach));
    }

    let normal = offset / dist;
    let along = Fix64::HALF + (radius_a - radius_b) / (dist * Fix64::TWO);
    Some((center_a + offset * along, normal, reach - dist))
}

fn collide_circles(a: &Circle, b: &Circle, side_a: Side, side_b: Side) -> Option<Manifold> {
    let (position, normal, depth) =
        disc_contact(a.world_origin(), a.radius(), b.world_origin(), b.radius())?;
    let mut manifold = new_manifold(side_a, a.data(), side_b, b.data());
    manifold.add_contact(position, normal, depth, 0);
    Some(manifold)
}

fn collide_circle_polygon(
    circle: &Circle,
    polygon: &Polygon,
    side_a: Side,
    side_b: Side,
) -> Option<Manifold> {
    let center = circle.world_origin();
    let radius = circle.radius();
    let axes = polygon.world_axes();
    let vertices = polygon.world_vertices();

    // Axis of greatest separation
    let mut index = 0;
    let mut max = Fix64::MIN;
    for (i, axis) in axes.iter().enumerate() {
        let separation = axis.normal.dot(center) - axis.width - radius;
        if separation >= Fix64::ZERO {
            return None;
        }
        if separation > max {
            max = separation;
            index = i;
        }
    }

    let normal = axes[index].normal;
    let next = (index + 1) % vertices.len();
    let (start, end) = (vertices[index], vertices[next]);
    let edge = normal.left();
    let along = edge.dot(center);

    let (position, normal, depth, feature) = if along < edge.dot(start) {
        let (position, normal, depth) = disc_contact(center, radius, start, Fix64::ZERO)?;
        (position, normal, depth, FEATURE_VERTEX | index as u32)
    } else if along > edge.dot(end) {
        let (position, normal, depth) = disc_contact(center, radius, end, Fix64::ZERO)?;
        (position, normal, depth, FEATURE_VERTEX | next as u32)
    } else {
        let depth = -max;
        let position = center - normal * (radius - depth * Fix64::HALF);
        (position, -normal, depth, FEATURE_B | index as u32)
    };

    let mut manifold = new_manifold(side_a, circle.data(), side_b, polygon.data());
    manifold.add_contact(position, normal, depth, feature);
    Some(manifold)
}

/// Smallest-penetration axis of `reference` against `incident`
///
/// Returns the axis normal and its (negative) separation, or `None` when some
/// axis separates the polygons.
fn min_separation(reference: &Polygon, incident: &Polygon) -> Option<(Vec2Fix, Fix64)> {
    let mut best: Option<(Vec2Fix, Fix64)> = None;
    for axis in reference.world_axes() {
        let closest = incident
            .world_vertices()
            .iter()
            .map(|v| axis.normal.dot(*v))
            .min()?;
        let separation = closest - axis.width;
        if separation >= Fix64::ZERO {
            return None;
        }
        if best.map_or(true, |(_, s)| separation > s) {
            best = Some((axis.normal, separation));
        }
    }
    best
}

fn collide_polygons(a: &Polygon, b: &Polygon, side_a: Side, side_b: Side) -> Option<Manifold> {
    let (normal_a, separation_a) = min_separation(a, b)?;
    let (normal_b, separation_b) = min_separation(b, a)?;

    // The polygon with the shallower face becomes A
    let (reference, incident, side_ref, side_inc, normal, separation) = if separation_b > separation_a {
        (b, a, side_b, side_a, normal_b, separation_b)
    } else {
        (a, b, side_a, side_b, normal_a, separation_a)
    };

    let mut manifold = new_manifold(side_ref, reference.data(), side_inc, incident.data());
    find_vertices(reference, incident, normal, -separation, &mut manifold);
    if manifold.is_empty() {
        None
    } else {
        Some(manifold)
    }
}

fn find_vertices(reference: &Polygon, incident: &Polygon, normal: Vec2Fix, depth: Fix64, manifold: &mut Manifold) {
    for (i, vertex) in reference.world_vertices().iter().enumerate() {
        if incident.contains_point(*vertex) && !manifold.add_contact(*vertex, normal, depth, i as u32) {
            return;
        }
    }
    for (i, vertex) in incident.world_vertices().iter().enumerate() {
        if reference.contains_point(*vertex)
            && !manifold.add_contact(*vertex, normal, depth, FEATURE_B | i as u32)
        {
            return;
        }
    }
    if !manifold.is_empty() {
        return;
    }

    // Rounding can leave every vertex a hair outside; relax the test
    for (i, vertex) in reference.world_vertices().iter().enumerate() {
        if incident.contains_point_partial(*vertex, normal)
            && !manifold.add_contact(*vertex, normal, depth, i as u32)
        {
            return;
        }
    }
    for (i, vertex) in incident.world_vertices().iter().enumerate() {
        if reference.contains_point_partial(*vertex, -normal)
            && !manifold.add_contact(*vertex, normal, depth, FEATURE_B | i as u32)
        {
            return;
        }
    }
}
