// Bounding volume hierarchy for static bodies

use super::BroadPhase;
use crate::core::{Fix64, Vec2Fix};
use crate::engine::physics::aabb::Aabb;
use crate::engine::physics::body::BodyHandle;
use crate::engine::physics::ray::RayCast;

/// Entries per leaf before splitting
const LEAF_SIZE: usize = 4;

/// Traversal stack capacity; median splits keep depth under `usize::BITS`
const STACK_SIZE: usize = 2 * usize::BITS as usize;

#[derive(Debug, Clone, Copy)]
enum NodeKind {
    Leaf { start: usize, count: usize },
    Branch { left: usize, right: usize },
}

#[derive(Debug, Clone, Copy)]
struct Node {
    aabb: Aabb,
    kind: NodeKind,
}

/// Median-split tree over static bodies
///
/// Optimized for queries: any add, remove or move marks the tree dirty and
/// it is rebuilt on the next `refresh`. Queries made while dirty fall back
/// to a linear scan so results stay correct.
#[derive(Debug, Default)]
pub struct StaticTree {
    entries: Vec<(BodyHandle, Aabb)>,
    /// Entry indices in leaf order
    order: Vec<usize>,
    nodes: Vec<Node>,
    dirty: bool,
}

impl StaticTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of tree nodes (zero until the first rebuild)
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn position(&self, body: BodyHandle) -> Option<usize> {
        self.entries.iter().position(|(handle, _)| *handle == body)
    }

    fn rebuild(&mut self) {
        self.nodes.clear();
        self.order.clear();
        self.order.extend(0..self.entries.len());
        if !self.entries.is_empty() {
            let count = self.order.len();
            self.build(0, count);
        }
        self.dirty = false;
        log::trace!(
            "Rebuilt static tree: {} entries, {} nodes",
            self.entries.len(),
            self.nodes.len()
        );
    }

    /// Build the subtree over `order[start..start + count]`, returning its node index
    fn build(&mut self, start: usize, count: usize) -> usize {
        let range = start..start + count;
        let mut bounds = self.entries[self.order[start]].1;
        for &entry in &self.order[range.clone()] {
            bounds = bounds.union(&self.entries[entry].1);
        }

        let node = self.nodes.len();
        self.nodes.push(Node {
            aabb: bounds,
            kind: NodeKind::Leaf { start, count },
        });
        if count <= LEAF_SIZE {
            return node;
        }

        // Split along the longest axis of the centres
        let extent = bounds.extent();
        let split_x = extent.x >= extent.y;
        let entries = &self.entries;
        self.order[range].sort_by(|&a, &b| {
            let (ca, cb) = (entries[a].1.center(), entries[b].1.center());
            let (ka, kb) = if split_x { (ca.x, cb.x) } else { (ca.y, cb.y) };
            ka.cmp(&kb).then_with(|| entries[a].0.cmp(&entries[b].0))
        });

        let half = count / 2;
        let left = self.build(start, half);
        let right = self.build(start + half, count - half);
        self.nodes[node].kind = NodeKind::Branch { left, right };
        node
    }

    fn collect(&self, out: &mut Vec<BodyHandle>, hit: impl Fn(&Aabb) -> bool) {
        if self.dirty {
            out.extend(
                self.entries
                    .iter()
                    .filter(|(_, aabb)| hit(aabb))
                    .map(|(handle, _)| *handle),
            );
            return;
        }
        if self.nodes.is_empty() {
            return;
        }

        let mut stack = [0usize; STACK_SIZE];
        let mut len = 1;
        while len > 0 {
            len -= 1;
            let node = &self.nodes[stack[len]];
            if !hit(&node.aabb) {
                continue;
            }
            match node.kind {
                NodeKind::Leaf { start, count } => {
                    for &entry in &self.order[start..start + count] {
                        let (handle, aabb) = &self.entries[entry];
                        if hit(aabb) {
                            out.push(*handle);
                        }
                    }
                }
                NodeKind::Branch { left, right } => {
                    // Right first so the left subtree is visited first
                    stack[len] = right;
                    stack[len + 1] = left;
                    len += 2;
                }
            }
        }
    }
}

impl BroadPhase for StaticTree {
    fn add_body(&mut self, body: BodyHandle, aabb: Aabb) {
        match self.position(body) {
            Some(index) => self.entries[index].1 = aabb,
            None => self.entries.push((body, aabb)),
        }
        self.dirty = true;
    }

    fn remove_body(&mut self, body: BodyHandle) {
        if let Some(index) = self.position(body) {
            self.entries.remove(index);
            self.dirty = true;
        }
    }

    fn update_body(&mut self, body: BodyHandle, aabb: Aabb) {
        if let Some(index) = self.position(body) {
            self.entries[index].1 = aabb;
            self.dirty = true;
        }
    }

    fn refresh(&mut self) {
        if self.dirty {
            self.rebuild();
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
