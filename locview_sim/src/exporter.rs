//! JSON exporter for simulation runs.
//!
//! Exports rendered frames and scene events so a run can be inspected or
//! replayed outside the simulator.

use locview_core::{Frame, SceneEvent};
use locview_core::waypoint::WaypointMarker;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// Simulation event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimEvent {
    pub frame: u64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl SimEvent {
    /// Summarizes a scene event.
    pub fn from_scene(frame: u64, event: &SceneEvent) -> Self {
        let (message, level) = match event {
            SceneEvent::MeasurementChanged(points) => {
                (format!("measurement points: {}", points.len()), None)
            }
            SceneEvent::AssetResolved(resolved) if resolved.placeholder => (
                format!("{} -> placeholder ({})", resolved.entity, resolved.url),
                Some("warn".to_string()),
            ),
            SceneEvent::AssetResolved(resolved) => {
                (format!("{} -> model ({})", resolved.entity, resolved.url), None)
            }
        };
        Self { frame, message, level }
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Duration in seconds
    pub duration_sec: f64,

    /// Waypoint markers at the end of the run
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub waypoints: Vec<WaypointMarker>,

    /// Exported frames
    pub frames: Vec<Frame>,

    /// Scene events (picks, model resolutions)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SimEvent>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            waypoints: Vec::new(),
            frames: Vec::new(),
            events: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: Frame) {
        self.duration_sec = frame.time_secs;
        self.frames.push(frame);
    }

    /// Records scene events observed at `frame`.
    pub fn add_events(&mut self, frame: u64, events: &[SceneEvent]) {
        self.events
            .extend(events.iter().map(|e| SimEvent::from_scene(frame, e)));
    }

    /// Records the waypoint markers shown by the scene.
    pub fn set_waypoints(&mut self, markers: &[WaypointMarker]) {
        self.waypoints = markers.to_vec();
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
