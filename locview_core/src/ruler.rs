//! Distance readout between the two measurement points.

use crate::geo::LocalPosition;
use crate::measure::MeasurementPointSet;
use serde::{Deserialize, Serialize};

/// Height of the label above the segment midpoint.
pub const LABEL_OFFSET: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulerReading {
    pub start: LocalPosition,
    pub end: LocalPosition,
    pub distance: f64,
    pub midpoint: LocalPosition,
    pub label_anchor: LocalPosition,
    pub label: String,
}

/// Measures the segment from `a` to `b`.
pub fn compute(a: &LocalPosition, b: &LocalPosition) -> RulerReading {
    let distance = a.distance_to(b);
    let midpoint = a.midpoint(b);
    RulerReading {
        start: *a,
        end: *b,
        distance,
        midpoint,
        label_anchor: midpoint.raised(LABEL_OFFSET),
        label: format!("{:.2} units", distance),
    }
}

/// Reading for a full point set; `None` with fewer than two points.
pub fn from_points(points: &MeasurementPointSet) -> Option<RulerReading> {
    points.pair().map(|(a, b)| compute(&a, &b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_compute_distance_and_label() {
        let reading = compute(&LocalPosition::new(0.0, 0.0, 0.0), &LocalPosition::new(3.0, 0.0, 4.0));

        assert_relative_eq!(reading.distance, 5.0);
        assert_eq!(reading.midpoint, LocalPosition::new(1.5, 0.0, 2.0));
        assert_relative_eq!(reading.label_anchor.up, 0.2);
        assert_eq!(reading.label, "5.00 units");
    }

    #[test]
    fn test_needs_two_points() {
        let mut points = MeasurementPointSet::new();
        assert!(from_points(&points).is_none());

        points.push(LocalPosition::new(1.0, 0.0, 0.0));
        assert!(from_points(&points).is_none());

        points.push(LocalPosition::new(1.0, 2.0, 0.0));
        assert_relative_eq!(from_points(&points).unwrap().distance, 2.0);
    }
}
