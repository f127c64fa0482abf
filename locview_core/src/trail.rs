//! Bounded motion-trail history.

use crate::error::SceneError;
use crate::geo::LocalPosition;
use std::collections::VecDeque;

/// Default number of smoothed positions kept per entity.
pub const DEFAULT_TRAIL_CAPACITY: usize = 5000;

/// Trail line color (orange), linear RGB.
pub const TRAIL_COLOR_RGB: [f32; 3] = [1.0, 0.5, 0.0];

/// Fixed-capacity FIFO of an entity's smoothed positions.
///
/// Appending at capacity evicts the oldest point. Only [`clear`](Self::clear)
/// empties the buffer; hiding the trail is a render-time decision.
#[derive(Debug, Clone)]
pub struct TrailRecorder {
    points: VecDeque<LocalPosition>,
    capacity: usize,
}

impl TrailRecorder {
    pub fn new(capacity: usize) -> Result<Self, SceneError> {
        if capacity == 0 {
            return Err(SceneError::InvalidTrailCapacity);
        }
        Ok(Self {
            points: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        })
    }

    /// Append one sample, evicting the oldest at capacity.
    pub fn record(&mut self, position: LocalPosition) {
        if self.points.len() >= self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(position);
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LocalPosition> {
        self.points.iter()
    }

    pub fn latest(&self) -> Option<&LocalPosition> {
        self.points.back()
    }

    /// Polyline vertices for rendering, or `None` when hidden or too short
    /// to draw a segment.
    pub fn visible_polyline(&self, visible: bool) -> Option<Vec<[f32; 3]>> {
        if !visible || self.points.len() < 2 {
            return None;
        }
        Some(self.points.iter().map(LocalPosition::as_f32).collect())
    }
}

impl Default for TrailRecorder {
    fn default() -> Self {
        Self {
            points: VecDeque::new(),
            capacity: DEFAULT_TRAIL_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p(i: usize) -> LocalPosition {
        LocalPosition::new(i as f64, 0.0, 0.0)
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            TrailRecorder::new(0),
            Err(SceneError::InvalidTrailCapacity)
        ));
    }

    #[test]
    fn test_default_capacity() {
        assert_eq!(TrailRecorder::default().capacity(), 5000);
    }

    #[test]
    fn test_fifo_eviction_keeps_newest_in_order() {
        let mut trail = TrailRecorder::new(3).unwrap();
        for i in 0..5 {
            trail.record(p(i));
        }

        let kept: Vec<f64> = trail.iter().map(|p| p.east).collect();
        assert_eq!(kept, vec![2.0, 3.0, 4.0]);
        assert_eq!(trail.latest(), Some(&p(4)));
    }

    #[test]
    fn test_clear_empties() {
        let mut trail = TrailRecorder::new(4).unwrap();
        trail.record(p(1));
        trail.record(p(2));
        trail.clear();

        assert!(trail.is_empty());
        assert_eq!(trail.capacity(), 4);
    }

    #[test]
    fn test_visible_polyline_rules() {
        let mut trail = TrailRecorder::new(10).unwrap();
        trail.record(p(1));
        assert!(trail.visible_polyline(true).is_none());

        trail.record(p(2));
        assert_eq!(trail.visible_polyline(true).unwrap().len(), 2);

        // hiding does not touch the data
        assert!(trail.visible_polyline(false).is_none());
        assert_eq!(trail.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_length_never_exceeds_capacity(capacity in 1usize..64, inserts in 0usize..256) {
            let mut trail = TrailRecorder::new(capacity).unwrap();
            for i in 0..inserts {
                trail.record(p(i));
                prop_assert!(trail.len() <= capacity);
            }

            // the newest min(inserts, capacity) survive, in original order
            let expected: Vec<f64> = (inserts.saturating_sub(capacity)..inserts)
                .map(|i| i as f64)
                .collect();
            let kept: Vec<f64> = trail.iter().map(|p| p.east).collect();
            prop_assert_eq!(kept, expected);
        }
    }
}
