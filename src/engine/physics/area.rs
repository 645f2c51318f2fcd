// Overlap tracking for trigger areas

use super::body::BodyHandle;
use super::collision::AreaEvent;

/// Bodies overlapping an area, diffed once per step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AreaState {
    /// Sorted set from the last completed step
    previous: Vec<BodyHandle>,
    /// Scratch set reused between steps
    current: Vec<BodyHandle>,
}

impl AreaState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn overlapping(&self) -> &[BodyHandle] {
        &self.previous
    }

    pub fn contains(&self, body: BodyHandle) -> bool {
        self.previous.binary_search(&body).is_ok()
    }

    /// Replace the overlap set (state restore)
    pub(crate) fn set_overlapping(&mut self, bodies: &[BodyHandle]) {
        self.previous.clear();
        self.previous.extend_from_slice(bodies);
        self.previous.sort_unstable();
        self.previous.dedup();
    }

    /// Diff this tick's contacts against the last set.
    ///
    /// Entered events follow `touching` order; exited events follow handle
    /// order.
    pub(crate) fn update(&mut self, area: BodyHandle, touching: &[BodyHandle], events: &mut Vec<AreaEvent>) {
        self.current.clear();
        self.current.extend_from_slice(touching);
        self.current.sort_unstable();
        self.current.dedup();

        for body in touching {
            if self.previous.binary_search(body).is_err() {
                events.push(AreaEvent::Entered { area, body: *body });
            }
        }
        for body in &self.previous {
            if self.current.binary_search(body).is_err() {
                events.push(AreaEvent::Exited { area, body: *body });
            }
        }

        std::mem::swap(&mut self.previous, &mut self.current);
    }

    /// Drop a destroyed body without emitting an event
    pub(crate) fn forget(&mut self, body: BodyHandle) {
        self.previous.retain(|b| *b != body);
    }

    pub(crate) fn clear(&mut self) {
        self.previous.clear();
        self.current.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(index: u32) -> BodyHandle {
        BodyHandle::new(index, 0)
    }

    #[test]
    fn test_enter_stay_exit() {
        let area = handle(0);
        let mut state = AreaState::new();
        let mut events = Vec::new();

        state.update(area, &[handle(1)], &mut events);
        assert_eq!(events, vec![AreaEvent::Entered { area, body: handle(1) }]);

        events.clear();
        state.update(area, &[handle(1)], &mut events);
        assert!(events.is_empty());
        assert!(state.contains(handle(1)));

        state.update(area, &[], &mut events);
        assert_eq!(events, vec![AreaEvent::Exited { area, body: handle(1) }]);
        assert!(state.overlapping().is_empty());
    }

    #[test]
    fn test_simultaneous_enter_and_exit() {
        let area = handle(0);
        let mut state = AreaState::new();
        let mut events = Vec::new();
        state.update(area, &[handle(2), handle(1)], &mut events);
        events.clear();

        state.update(area, &[handle(3), handle(2)], &mut events);
        assert_eq!(
            events,
            vec![
                AreaEvent::Entered { area, body: handle(3) },
                AreaEvent::Exited { area, body: handle(1) },
            ]
        );
        assert_eq!(state.overlapping(), &[handle(2), handle(3)]);
    }

    #[test]
    fn test_forget_removes_silently() {
        let area = handle(0);
        let mut state = AreaState::new();
        let mut events = Vec::new();
        state.update(area, &[handle(5)], &mut events);
        events.clear();

        state.forget(handle(5));
        state.update(area, &[], &mut events);
        assert!(events.is_empty());
    }
}
