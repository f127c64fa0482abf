//! Simulated telemetry feeds.
//!
//! The random walk reproduces the demo robot: every poll nudges position by
//! up to ±1 m north and east and ±15 cm vertically, and each angle by up to
//! ±1°, clamped to [-180, 180].

use locview_core::{GeoCoordinate, TelemetrySample, TelemetrySource};
use locview_env::EntityId;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Uniform};
use std::time::Duration;

/// Per-entity state of the walk.
#[derive(Debug, Clone, Copy)]
struct Walker {
    entity: EntityId,
    position: GeoCoordinate,
    pitch_deg: f64,
    roll_deg: f64,
    heading_deg: f64,
}

impl Walker {
    fn sample(&self) -> TelemetrySample {
        TelemetrySample {
            entity: self.entity,
            position: self.position,
            pitch_deg: self.pitch_deg,
            roll_deg: self.roll_deg,
            heading_deg: self.heading_deg,
        }
    }
}

/// Seeded random-walk telemetry for any number of entities.
pub struct RandomWalkFeed {
    rng: ChaCha8Rng,
    walkers: Vec<Walker>,
    horizontal: Uniform<f64>,
    vertical: Uniform<f64>,
    angular: Uniform<f64>,
}

impl RandomWalkFeed {
    pub fn new(rng: ChaCha8Rng) -> Self {
        Self {
            rng,
            walkers: Vec::new(),
            horizontal: Uniform::new_inclusive(-1.0, 1.0),
            vertical: Uniform::new_inclusive(-0.15, 0.15),
            angular: Uniform::new_inclusive(-1.0, 1.0),
        }
    }

    /// Adds an entity starting at `start` with level attitude.
    pub fn add_entity(&mut self, entity: EntityId, start: GeoCoordinate) {
        self.walkers.push(Walker {
            entity,
            position: start,
            pitch_deg: 0.0,
            roll_deg: 0.0,
            heading_deg: 0.0,
        });
    }

    pub fn len(&self) -> usize {
        self.walkers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.walkers.is_empty()
    }
}

fn clamp_deg(v: f64) -> f64 {
    v.clamp(-180.0, 180.0)
}

impl TelemetrySource for RandomWalkFeed {
    fn sample(&mut self, _now: Duration) -> Vec<TelemetrySample> {
        let rng = &mut self.rng;
        self.walkers
            .iter_mut()
            .map(|w| {
                let north = self.horizontal.sample(rng);
                let east = self.horizontal.sample(rng);
                let up = self.vertical.sample(rng);
                w.position = w.position.offset_by(north, east, up);

                w.pitch_deg = clamp_deg(w.pitch_deg + self.angular.sample(rng));
                w.roll_deg = clamp_deg(w.roll_deg + self.angular.sample(rng));
                w.heading_deg = clamp_deg(w.heading_deg + self.angular.sample(rng));
                w.sample()
            })
            .collect()
    }
}

/// Heading that sweeps steadily and wraps from +180 to -180.
///
/// Position stays at `position`; only the heading moves.
pub struct SpinFeed {
    entity: EntityId,
    position: GeoCoordinate,
    heading_deg: f64,
    step_deg: f64,
}

impl SpinFeed {
    pub fn new(entity: EntityId, position: GeoCoordinate, start_deg: f64, step_deg: f64) -> Self {
        Self {
            entity,
            position,
            heading_deg: start_deg,
            step_deg,
        }
    }
}

impl TelemetrySource for SpinFeed {
    fn sample(&mut self, _now: Duration) -> Vec<TelemetrySample> {
        let sample = TelemetrySample {
            entity: self.entity,
            position: self.position,
            pitch_deg: 0.0,
            roll_deg: 0.0,
            heading_deg: self.heading_deg,
        };
        self.heading_deg = locview_core::smoothing::wrap_degrees(self.heading_deg + self.step_deg);
        vec![sample]
    }
}
