//! Geographic telemetry samples and the feed abstraction.

use crate::geo::{to_local, GeoCoordinate};
use crate::pose::Pose;
use locview_env::EntityId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One reported pose of an entity, in geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub entity: EntityId,
    pub position: GeoCoordinate,
    pub pitch_deg: f64,
    pub roll_deg: f64,
    pub heading_deg: f64,
}

impl TelemetrySample {
    /// Target pose in the local frame of `root`.
    pub fn to_pose(&self, root: &GeoCoordinate) -> Pose {
        Pose::new(
            to_local(root, &self.position),
            self.pitch_deg,
            self.roll_deg,
            self.heading_deg,
        )
    }
}

/// A periodic source of telemetry.
///
/// Called once per telemetry interval; may return any number of samples,
/// including none.
pub trait TelemetrySource: Send {
    fn sample(&mut self, now: Duration) -> Vec<TelemetrySample>;
}

/// Replays a fixed script of `(time, sample)` pairs.
///
/// Samples become due once `now` reaches their time.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFeed {
    script: Vec<(Duration, TelemetrySample)>,
    cursor: usize,
}

impl ScriptedFeed {
    pub fn new(mut script: Vec<(Duration, TelemetrySample)>) -> Self {
        script.sort_by_key(|(at, _)| *at);
        Self { script, cursor: 0 }
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.script.len()
    }
}

impl TelemetrySource for ScriptedFeed {
    fn sample(&mut self, now: Duration) -> Vec<TelemetrySample> {
        let start = self.cursor;
        while self.cursor < self.script.len() && self.script[self.cursor].0 <= now {
            self.cursor += 1;
        }
        self.script[start..self.cursor].iter().map(|(_, s)| *s).collect()
    }
}
