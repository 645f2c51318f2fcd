// Fixed-capacity ring buffer of past body spaces

use super::aabb::Aabb;
use crate::core::Vec2Fix;

/// Where a body was on a past tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryRecord {
    pub position: Vec2Fix,
    pub facing: Vec2Fix,
    pub aabb: Aabb,
}

impl HistoryRecord {
    pub fn new(position: Vec2Fix, facing: Vec2Fix, aabb: Aabb) -> Self {
        Self {
            position,
            facing,
            aabb,
        }
    }
}

/// Ring buffer of the most recent records, newest first
///
/// Index 0 is the latest stored record. Capacity is fixed at construction so
/// storing never allocates.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    data: Vec<HistoryRecord>,
    start: usize,
    count: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![HistoryRecord::default(); capacity.max(1)],
            start: 0,
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Push a record, overwriting the oldest once full
    pub fn store(&mut self, record: HistoryRecord) {
        let capacity = self.capacity();
        self.start = (self.start + capacity - 1) % capacity;
        self.data[self.start] = record;
        if self.count < capacity {
            self.count += 1;
        }
    }

    /// Record `ticks_behind` entries back, or the oldest one with `false`
    /// when the buffer does not reach that far. `None` when empty.
    pub fn try_get(&self, ticks_behind: usize) -> Option<(HistoryRecord, bool)> {
        if self.count == 0 {
            return None;
        }
        let (index, exact) = if ticks_behind >= self.count {
            (self.count - 1, false)
        } else {
            (ticks_behind, true)
        };
        Some((self.data[(self.start + index) % self.capacity()], exact))
    }

    /// Newest first
    pub fn iter(&self) -> impl Iterator<Item = &HistoryRecord> {
        (0..self.count).map(move |i| &self.data[(self.start + i) % self.capacity()])
    }

    /// Forget every record, keeping the allocation for reuse
    pub fn clear(&mut self) {
        self.start = 0;
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(x: i32) -> HistoryRecord {
        let position = Vec2Fix::from_ints(x, 0);
        HistoryRecord::new(position, Vec2Fix::UNIT_X, Aabb::from_point(position))
    }

    #[test]
    fn test_roundtrip_within_window() {
        let mut buffer = HistoryBuffer::new(5);
        for x in 0..5 {
            buffer.store(record(x));
        }
        for k in 0..5 {
            let (found, exact) = buffer.try_get(k).expect("stored");
            assert!(exact);
            assert_eq!(found, record(4 - k as i32));
        }
    }

    #[test]
    fn test_beyond_window_returns_oldest() {
        let mut buffer = HistoryBuffer::new(3);
        for x in 0..3 {
            buffer.store(record(x));
        }
        let (oldest, exact) = buffer.try_get(3).expect("stored");
        assert!(!exact);
        assert_eq!(oldest, record(0));
        assert_eq!(buffer.try_get(100), Some((record(0), false)));
    }

    #[test]
    fn test_overwrites_oldest_when_full() {
        let mut buffer = HistoryBuffer::new(3);
        for x in 0..7 {
            buffer.store(record(x));
        }
        assert_eq!(buffer.len(), 3);
        let positions: Vec<_> = buffer.iter().map(|r| r.position).collect();
        assert_eq!(
            positions,
            vec![
                Vec2Fix::from_ints(6, 0),
                Vec2Fix::from_ints(5, 0),
                Vec2Fix::from_ints(4, 0)
            ]
        );
    }

    #[test]
    fn test_partial_fill_and_clear() {
        let mut buffer = HistoryBuffer::new(4);
        assert!(buffer.try_get(0).is_none());
        buffer.store(record(1));
        buffer.store(record(2));
        assert_eq!(buffer.try_get(1), Some((record(1), true)));
        assert_eq!(buffer.try_get(2), Some((record(1), false)));

        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 4);
    }
}
