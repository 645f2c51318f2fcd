// Flat list broadphase for moving bodies

use super::BroadPhase;
use crate::core::{Fix64, Vec2Fix};
use crate::engine::physics::aabb::Aabb;
use crate::engine::physics::body::BodyHandle;
use crate::engine::physics::ray::RayCast;

/// Linear scan over every entry; cheap to update, fine for small sets
#[derive(Debug, Default)]
pub struct NaiveBroadphase {
    entries: Vec<(BodyHandle, Aabb)>,
    /// Entry position by handle index
    slots: Vec<Option<usize>>,
}

impl NaiveBroadphase {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, body: BodyHandle) -> Option<usize> {
        let index = self.slots.get(body.index() as usize).copied().flatten()?;
        (self.entries[index].0 == body).then_some(index)
    }

    fn collect(&self, out: &mut Vec<BodyHandle>, hit: impl Fn(&Aabb) -> bool) {
        out.extend(
            self.entries
                .iter()
                .filter(|(_, aabb)| hit(aabb))
                .map(|(handle, _)| *handle),
        );
    }
}

impl BroadPhase for NaiveBroadphase {
    fn add_body(&mut self, body: BodyHandle, aabb: Aabb) {
        if let Some(index) = self.slot(body) {
            self.entries[index].1 = aabb;
            return;
        }
        let slot = body.index() as usize;
        if self.slots.len() <= slot {
            self.slots.resize(slot + 1, None);
        }
        self.slots[slot] = Some(self.entries.len());
        self.entries.push((body, aabb));
    }

    fn remove_body(&mut self, body: BodyHandle) {
        let Some(index) = self.slot(body) else {
            return;
        };
        self.slots[body.index() as usize] = None;
        self.entries.swap_remove(index);
        if let Some((moved, _)) = self.entries.get(index) {
            self.slots[moved.index() as usize] = Some(index);
        }
    }

    fn update_body(&mut self, body: BodyHandle, aabb: Aabb) {
        if let Some(index) = self.slot(body) {
            self.entries[index].1 = aabb;
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn query_overlap(&self, aabb: &Aabb, out: &mut Vec<BodyHandle>) {
        self.collect(out, |bounds| bounds.overlaps(aabb));
    }

    fn query_point(&self, point: Vec2Fix, out: &mut Vec<BodyHandle>) {
        self.collect(out, |bounds| bounds.contains_point(point));
    }

    fn query_circle(&self, center: Vec2Fix, radius: Fix64, out: &mut Vec<BodyHandle>) {
        self.collect(out, |bounds| bounds.overlaps_circle(center, radius));
    }

    fn ray_cast(&self, ray: &RayCast, out: &mut Vec<BodyHandle>) {
        self.collect(out, |bounds| bounds.ray_cast(ray));
    }

    fn circle_cast(&self, ray: &RayCast, radius: Fix64, out: &mut Vec<BodyHandle>) {
        self.collect(out, |bounds| bounds.circle_cast(ray, radius));
    }
}
