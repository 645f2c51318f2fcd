// Contact manifolds and the warm-start cache

use super::body::{Body, BodyHandle};
use super::contact::{Contact, SolverParams};
use super::pool::Pool;
use super::shape::{Material, ShapeHandle};
use crate::core::{Fix64, Vec2Fix};

/// Most contact points a manifold keeps
pub const MAX_CONTACTS: usize = 3;

/// Contacts between one pair of shapes for a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Manifold {
    body_a: BodyHandle,
    body_b: BodyHandle,
    shape_a: ShapeHandle,
    shape_b: ShapeHandle,
    friction: Fix64,
    restitution: Fix64,
    /// Reported but never resolved (a trigger is involved)
    sensor: bool,
    contacts: [Contact; MAX_CONTACTS],
    count: usize,
}

impl Manifold {
    pub(crate) fn new(
        (body_a, shape_a, material_a): (BodyHandle, ShapeHandle, Material),
        (body_b, shape_b, material_b): (BodyHandle, ShapeHandle, Material),
    ) -> Self {
        Self {
            body_a,
            body_b,
            shape_a,
            shape_b,
            friction: (material_a.friction * material_b.friction).sqrt(),
            restitution: (material_a.restitution * material_b.restitution).sqrt(),
            sensor: false,
            contacts: [Contact::default(); MAX_CONTACTS],
            count: 0,
        }
    }

    pub fn body_a(&self) -> BodyHandle {
        self.body_a
    }

    pub fn body_b(&self) -> BodyHandle {
        self.body_b
    }

    pub fn shape_a(&self) -> ShapeHandle {
        self.shape_a
    }

    pub fn shape_b(&self) -> ShapeHandle {
        self.shape_b
    }

    pub fn friction(&self) -> Fix64 {
        self.friction
    }

    pub fn restitution(&self) -> Fix64 {
        self.restitution
    }

    pub fn is_sensor(&self) -> bool {
        self.sensor
    }

    pub(crate) fn set_sensor(&mut self, sensor: bool) {
        self.sensor = sensor;
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts[..self.count]
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == MAX_CONTACTS
    }

    /// Contact with the largest penetration, first one wins ties
    pub fn deepest(&self) -> Option<&Contact> {
        self.contacts()
            .iter()
            .fold(None, |best: Option<&Contact>, contact| match best {
                Some(b) if b.penetration() >= contact.penetration() => Some(b),
                _ => Some(contact),
            })
    }

    /// Returns `false` once the manifold is full
    pub(crate) fn add_contact(&mut self, position: Vec2Fix, normal: Vec2Fix, penetration: Fix64, feature: u32) -> bool {
        if self.is_full() {
            return false;
        }
        self.contacts[self.count] = Contact::new(position, normal, penetration, feature);
        self.count += 1;
        true
    }

    pub(crate) fn pre_step(&mut self, bodies: &mut Pool<Body>, params: &SolverParams, cache: Option<&ContactCache>) {
        if self.sensor {
            return;
        }
        let Some((a, b)) = bodies.get2_mut(self.body_a, self.body_b) else {
            return;
        };
        for contact in &mut self.contacts[..self.count] {
            contact.pre_step(a, b, self.restitution, params);
            if let Some(cached) = cache.and_then(|c| c.find(self.shape_a, self.shape_b, contact.feature())) {
                contact.warm_start(a, b, cached.normal_impulse, cached.tangent_impulse);
            }
        }
    }

    pub(crate) fn solve(&mut self, bodies: &mut Pool<Body>, elasticity: Fix64) {
        if self.sensor {
            return;
        }
        let Some((a, b)) = bodies.get2_mut(self.body_a, self.body_b) else {
            return;
        };
        for contact in &mut self.contacts[..self.count] {
            contact.solve(a, b, self.friction, elasticity);
        }
    }

    pub(crate) fn solve_cached(&self, bodies: &mut Pool<Body>) {
        if self.sensor {
            return;
        }
        let Some((a, b)) = bodies.get2_mut(self.body_a, self.body_b) else {
            return;
        };
        for contact in self.contacts() {
            contact.solve_cached(a, b);
        }
    }
}

/// Solved impulses of one contact, kept for the next tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedContact {
    pub shape_a: ShapeHandle,
    pub shape_b: ShapeHandle,
    pub feature: u32,
    pub normal_impulse: Fix64,
    pub tangent_impulse: Fix64,
    pub position: Vec2Fix,
    pub normal: Vec2Fix,
}

impl CachedContact {
    fn key(&self) -> (ShapeHandle, ShapeHandle, u32) {
        (self.shape_a, self.shape_b, self.feature)
    }
}

/// Contacts of the previous tick sorted by shape pair and feature
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactCache {
    entries: Vec<CachedContact>,
}

impl ContactCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[CachedContact] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn find(&self, shape_a: ShapeHandle, shape_b: ShapeHandle, feature: u32) -> Option<&CachedContact> {
        let key = (shape_a, shape_b, feature);
        self.entries
            .binary_search_by(|entry| entry.key().cmp(&key))
            .ok()
            .map(|index| &self.entries[index])
    }

    /// Replace the cache with the resolved contacts of `manifolds`
    pub(crate) fn rebuild(&mut self, manifolds: &[Manifold]) {
        self.entries.clear();
        for manifold in manifolds.iter().filter(|m| !m.is_sensor()) {
            for contact in manifold.contacts() {
                self.entries.push(CachedContact {
                    shape_a: manifold.shape_a,
                    shape_b: manifold.shape_b,
                    feature: contact.feature(),
                    normal_impulse: contact.normal_impulse(),
                    tangent_impulse: contact.tangent_impulse(),
                    position: contact.position(),
                    normal: contact.normal(),
                });
            }
        }
        self.entries.sort_by_key(CachedContact::key);
        self.entries.dedup_by_key(|entry| entry.key());
    }

    /// Drop every entry that references one of `shapes`
    pub(crate) fn forget_shapes(&mut self, shapes: &[ShapeHandle]) {
        self.entries
            .retain(|entry| !shapes.contains(&entry.shape_a) && !shapes.contains(&entry.shape_b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::physics::pool::Handle;

    fn circle(index: u32) -> ShapeHandle {
        ShapeHandle::Circle(Handle::new(index, 0))
    }

    fn manifold() -> Manifold {
        let material = Material::new(Fix64::ONE, Fix64::from_ratio(1, 4), Fix64::ONE);
        let other = Material::new(Fix64::ONE, Fix64::ONE, Fix64::from_ratio(1, 4));
        Manifold::new(
            (BodyHandle::new(0, 0), circle(0), material),
            (BodyHandle::new(1, 0), circle(1), other),
        )
    }

    #[test]
    fn test_material_mixing_uses_geometric_mean() {
        let m = manifold();
        assert_eq!(m.friction(), Fix64::HALF);
        assert_eq!(m.restitution(), Fix64::HALF);
    }

    #[test]
    fn test_contact_limit() {
        let mut m = manifold();
        for feature in 0..MAX_CONTACTS as u32 {
            assert!(m.add_contact(Vec2Fix::ZERO, Vec2Fix::UNIT_X, Fix64::ONE, feature));
        }
        assert!(m.is_full());
        assert!(!m.add_contact(Vec2Fix::ZERO, Vec2Fix::UNIT_X, Fix64::ONE, 9));
        assert_eq!(m.contacts().len(), MAX_CONTACTS);
    }

    #[test]
    fn test_deepest_contact() {
        let mut m = manifold();
        m.add_contact(Vec2Fix::ZERO, Vec2Fix::UNIT_X, Fix64::from_ratio(1, 10), 0);
        m.add_contact(Vec2Fix::ZERO, Vec2Fix::UNIT_X, Fix64::from_ratio(3, 10), 1);
        m.add_contact(Vec2Fix::ZERO, Vec2Fix::UNIT_X, Fix64::from_ratio(3, 10), 2);
        assert_eq!(m.deepest().map(|c| c.feature()), Some(1));
    }

    #[test]
    fn test_cache_lookup_and_forget() {
        let mut first = manifold();
        first.add_contact(Vec2Fix::ZERO, Vec2Fix::UNIT_X, Fix64::ONE, 7);
        let mut sensor = manifold();
        sensor.set_sensor(true);
        sensor.add_contact(Vec2Fix::ZERO, Vec2Fix::UNIT_X, Fix64::ONE, 8);

        let mut cache = ContactCache::new();
        cache.rebuild(&[sensor, first]);
        assert_eq!(cache.len(), 1);
        assert!(cache.find(circle(0), circle(1), 7).is_some());
        assert!(cache.find(circle(0), circle(1), 8).is_none());

        cache.forget_shapes(&[circle(1)]);
        assert!(cache.is_empty());
    }
}
