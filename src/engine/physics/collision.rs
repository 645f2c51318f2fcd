// Collision layers, pair filters and event types

use super::body::{Body, BodyHandle, BodyType};

/// Number of distinct collision layers
pub const LAYER_COUNT: u32 = u32::BITS;

/// Layer bit for layer `index`; indices past the last layer map to no layer
pub const fn layer(index: u32) -> u32 {
    if index < LAYER_COUNT {
        1 << index
    } else {
        0
    }
}

/// Layer of bodies built without explicit layer bits
pub const DEFAULT_LAYER: u32 = layer(0);

/// Mask that accepts every layer
pub const ALL_LAYERS: u32 = u32::MAX;

/// Two bodies interact when either one's mask covers the other's layer
pub fn layers_interact(layer_a: u32, mask_a: u32, layer_b: u32, mask_b: u32) -> bool {
    (mask_a & layer_b) != 0 || (mask_b & layer_a) != 0
}

/// Pair filter deciding whether two bodies may collide
pub type CollisionFilter = fn(&Body, &Body) -> bool;

fn layers_match(a: &Body, b: &Body) -> bool {
    layers_interact(a.layer(), a.mask(), b.layer(), b.mask())
}

/// Filter used by `step`: no self pairs, no static/static or
/// kinematic/kinematic pairs, and the layers must match
pub fn default_world_filter(a: &Body, b: &Body) -> bool {
    if a.handle() == b.handle() {
        return false;
    }
    match (a.body_type(), b.body_type()) {
        (BodyType::Static, BodyType::Static) | (BodyType::Kinematic, BodyType::Kinematic) => false,
        _ => layers_match(a, b),
    }
}

/// Filter used by kinematic moves: only static and kinematic bodies block
pub fn default_move_filter(mover: &Body, other: &Body) -> bool {
    mover.handle() != other.handle()
        && matches!(other.body_type(), BodyType::Static | BodyType::Kinematic)
        && layers_match(mover, other)
}

/// Filter used by trigger queries: anything solid on a matching layer
pub fn default_trigger_filter(trigger: &Body, other: &Body) -> bool {
    trigger.handle() != other.handle()
        && other.body_type() != BodyType::Trigger
        && layers_match(trigger, other)
}

/// Body filter accepting everything
pub fn filter_none(_body: &Body) -> bool {
    true
}

/// Body filter accepting only static bodies
pub fn filter_static(body: &Body) -> bool {
    body.body_type() == BodyType::Static
}

/// Body filter accepting only dynamic bodies
pub fn filter_dynamic(body: &Body) -> bool {
    body.body_type() == BodyType::Dynamic
}

/// Body filter rejecting one specific body
pub fn filter_except(excluded: BodyHandle) -> impl Fn(&Body) -> bool {
    move |body| body.handle() != excluded
}

/// A body touched another body during a tick
///
/// Emitted once per distinct pair member per tick, from the point of view of
/// `body`, and only for bodies with collision events enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionEvent {
    pub body: BodyHandle,
    pub other: BodyHandle,
}

/// Overlap changes reported by trigger bodies that track overlaps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaEvent {
    /// A body started overlapping the area
    Entered { area: BodyHandle, body: BodyHandle },

    /// A body stopped overlapping the area
    Exited { area: BodyHandle, body: BodyHandle },
}

impl AreaEvent {
    pub fn area(&self) -> BodyHandle {
        match self {
            AreaEvent::Entered { area, .. } | AreaEvent::Exited { area, .. } => *area,
        }
    }

    pub fn body(&self) -> BodyHandle {
        match self {
            AreaEvent::Entered { body, .. } | AreaEvent::Exited { body, .. } => *body,
        }
    }
}

/// Queue for storing events produced during a physics step
#[derive(Debug)]
pub struct CollisionEventQueue {
    collisions: Vec<CollisionEvent>,
    areas: Vec<AreaEvent>,
}

impl CollisionEventQueue {
    pub fn new() -> Self {
        Self {
            collisions: Vec::with_capacity(32),
            areas: Vec::with_capacity(8),
        }
    }

    /// Clear all events (called at the start of every step)
    pub fn clear(&mut self) {
        self.collisions.clear();
        self.areas.clear();
    }

    pub fn collisions(&self) -> &[CollisionEvent] {
        &self.collisions
    }

    pub fn area_events(&self) -> &[AreaEvent] {
        &self.areas
    }

    pub(crate) fn push(&mut self, event: CollisionEvent) {
        self.collisions.push(event);
    }

    pub(crate) fn area_sink(&mut self) -> &mut Vec<AreaEvent> {
        &mut self.areas
    }
}

impl Default for CollisionEventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_bits() {
        assert_eq!(DEFAULT_LAYER, 1);
        assert_eq!(layer(5), 0b10_0000);
        assert_eq!(layer(31), 1 << 31);
        assert_eq!(layer(32), 0);
        for i in 0..LAYER_COUNT {
            assert_eq!(layer(i).count_ones(), 1);
            assert_eq!(ALL_LAYERS & layer(i), layer(i));
        }
    }

    #[test]
    fn test_layers_interact_one_way_is_enough() {
        let (terrain, debris) = (layer(0), layer(1));
        // Debris only looks for terrain; terrain looks for nothing
        assert!(layers_interact(debris, terrain, terrain, 0));
        assert!(layers_interact(terrain, 0, debris, terrain));
        // Two debris bodies ignore each other
        assert!(!layers_interact(debris, terrain, debris, terrain));
        // A body on no layer is only reached through its own mask
        assert!(!layers_interact(layer(40), 0, debris, ALL_LAYERS));
    }

    #[test]
    fn test_area_event_accessors() {
        let area = BodyHandle::new(1, 0);
        let body = BodyHandle::new(2, 0);
        let event = AreaEvent::Exited { area, body };
        assert_eq!(event.area(), area);
        assert_eq!(event.body(), body);
    }

    #[test]
    fn test_event_queue_clear() {
        let mut queue = CollisionEventQueue::new();
        queue.push(CollisionEvent {
            body: BodyHandle::new(0, 0),
            other: BodyHandle::new(1, 0),
        });
        queue.area_sink().push(AreaEvent::Entered {
            area: BodyHandle::new(0, 0),
            body: BodyHandle::new(1, 0),
        });
        assert_eq!(queue.collisions().len(), 1);
        assert_eq!(queue.area_events().len(), 1);
        queue.clear();
        assert!(queue.collisions().is_empty());
        assert!(queue.area_events().is_empty());
    }
}
