//! Rerun visualization for simulation runs.
//!
//! Visualization is optional and only available with the `visualization`
//! feature. Without it every method is a no-op.
//!
//! # What Gets Logged
//!
//! - Smoothed entity poses with heading arrows
//! - Trails while recording is enabled
//! - Waypoint markers and the ground grid
//! - The measurement ruler

use locview_core::runtime::EntityFrame;
use locview_core::waypoint::WaypointMarker;
use locview_core::Frame;

#[cfg(feature = "visualization")]
use locview_core::visualization::RerunVisualizer;

/// Rerun logger for simulation visualization.
pub struct RerunLogger {
    #[cfg(feature = "visualization")]
    viz: Option<RerunVisualizer>,

    /// Whether visualization is enabled
    enabled: bool,
}

impl RerunLogger {
    /// Creates a new logger with visualization disabled.
    pub fn disabled() -> Self {
        Self {
            #[cfg(feature = "visualization")]
            viz: None,
            enabled: false,
        }
    }

    /// Creates a new logger with visualization enabled.
    #[cfg(feature = "visualization")]
    pub fn new(name: &str) -> Self {
        match RerunVisualizer::new(name) {
            Ok(viz) => {
                tracing::info!("Rerun visualization enabled - open Rerun Viewer to see the scene");
                if let Err(e) = viz.log_ground_plane(40.0, 40) {
                    tracing::warn!("Failed to log ground plane: {:?}", e);
                }
                Self {
                    viz: Some(viz),
                    enabled: true,
                }
            }
            Err(e) => {
                tracing::warn!("Failed to initialize Rerun: {:?}", e);
                Self::disabled()
            }
        }
    }

    /// Creates a logger - returns disabled if visualization feature not enabled.
    #[cfg(not(feature = "visualization"))]
    pub fn new(_name: &str) -> Self {
        tracing::info!("Rerun visualization not available (compile with --features visualization)");
        Self::disabled()
    }

    /// Returns whether visualization is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Logs one frame; `trails` yields each entity's visible polyline.
    #[cfg(feature = "visualization")]
    pub fn log_frame<F>(&self, frame: &Frame, trails: F)
    where
        F: FnMut(&EntityFrame) -> Option<Vec<[f32; 3]>>,
    {
        if let Some(ref viz) = self.viz {
            if let Err(e) = viz.log_frame(frame, trails) {
                tracing::debug!("Rerun frame log failed: {:?}", e);
            }
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_frame<F>(&self, _frame: &Frame, _trails: F)
    where
        F: FnMut(&EntityFrame) -> Option<Vec<[f32; 3]>>,
    {
    }

    /// Logs the waypoint markers.
    #[cfg(feature = "visualization")]
    pub fn log_waypoints(&self, markers: &[WaypointMarker]) {
        if let Some(ref viz) = self.viz {
            if let Err(e) = viz.log_waypoints(markers) {
                tracing::debug!("Rerun waypoint log failed: {:?}", e);
            }
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_waypoints(&self, _markers: &[WaypointMarker]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_logger() {
        let logger = RerunLogger::disabled();
        assert!(!logger.is_enabled());

        // These should be no-ops
        let frame = Frame {
            index: 1,
            time_secs: 0.0,
            entities: Vec::new(),
            ruler: None,
        };
        logger.log_frame(&frame, |_| None);
        logger.log_waypoints(&[]);
    }
}
