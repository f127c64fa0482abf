//! Visualization module for LocView using Rerun.io
//!
//! Streams what a renderer would draw:
//! - Entity poses (point + heading arrow, placeholder box when the model failed)
//! - Motion trails as line strips
//! - Waypoint markers with labels
//! - The measurement ruler and its distance label
//!
//! Enable with the `visualization` feature flag.

use crate::assets::{PLACEHOLDER_COLOR_RGB, PLACEHOLDER_SIZE};
use crate::runtime::{EntityFrame, Frame, ModelState};
use crate::ruler::RulerReading;
use crate::trail::TRAIL_COLOR_RGB;
use crate::waypoint::{MarkerShape, WaypointMarker};
use rerun::{RecordingStream, RecordingStreamBuilder};

fn rgba(rgb: [f32; 3], alpha: u8) -> [u8; 4] {
    [
        (rgb[0] * 255.0).round() as u8,
        (rgb[1] * 255.0).round() as u8,
        (rgb[2] * 255.0).round() as u8,
        alpha,
    ]
}

/// Rerun-based visualizer for LocView scenes
pub struct RerunVisualizer {
    rec: RecordingStream,
}

impl RerunVisualizer {
    /// Create a new visualizer that spawns the Rerun viewer
    pub fn new(app_id: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let rec = RecordingStreamBuilder::new(app_id).spawn()?;
        rec.log_static("world", &rerun::ViewCoordinates::RIGHT_HAND_Y_UP())?;
        Ok(Self { rec })
    }

    /// Log the ground plane grid (up = 0) around the root
    pub fn log_ground_plane(&self, size: f32, divisions: usize) -> Result<(), Box<dyn std::error::Error>> {
        let half = size / 2.0;
        let step = size / divisions.max(1) as f32;

        let mut lines = Vec::with_capacity((divisions + 1) * 2);
        for i in 0..=divisions {
            let coord = -half + i as f32 * step;
            lines.push(vec![[coord, 0.0, -half], [coord, 0.0, half]]);
            lines.push(vec![[-half, 0.0, coord], [half, 0.0, coord]]);
        }

        self.rec.log_static(
            "world/ground/grid",
            &rerun::LineStrips3D::new(lines).with_colors([[60, 60, 60, 100]]),
        )?;
        Ok(())
    }

    /// Log one entity's smoothed pose
    pub fn log_entity(&self, entity: &EntityFrame) -> Result<(), Box<dyn std::error::Error>> {
        let path = format!("world/entities/{}", entity.entity);
        let position = entity.pose.position.as_f32();
        let forward = entity.pose.forward();

        self.rec.log(
            format!("{}/center", path),
            &rerun::Points3D::new([position])
                .with_colors([[255, 255, 255, 255]])
                .with_radii([0.1])
                .with_labels([entity.entity.to_string()]),
        )?;

        self.rec.log(
            format!("{}/heading", path),
            &rerun::Arrows3D::from_vectors([[forward.x as f32, forward.y as f32, forward.z as f32]])
                .with_origins([position])
                .with_colors([[255, 200, 0, 255]]),
        )?;

        if entity.model == ModelState::Placeholder {
            let edge = PLACEHOLDER_SIZE as f32;
            self.rec.log(
                format!("{}/placeholder", path),
                &rerun::Boxes3D::from_centers_and_sizes([position], [[edge, edge, edge]])
                    .with_colors([rgba(PLACEHOLDER_COLOR_RGB, 255)]),
            )?;
        }

        Ok(())
    }

    /// Log an entity's trail polyline
    pub fn log_trail(&self, entity: &EntityFrame, polyline: Vec<[f32; 3]>) -> Result<(), Box<dyn std::error::Error>> {
        self.rec.log(
            format!("world/entities/{}/trail", entity.entity),
            &rerun::LineStrips3D::new([polyline])
                .with_colors([rgba(TRAIL_COLOR_RGB, 255)])
                .with_radii([0.02]),
        )?;
        Ok(())
    }

    /// Log waypoint markers (static; re-log after a root change)
    pub fn log_waypoints(&self, markers: &[WaypointMarker]) -> Result<(), Box<dyn std::error::Error>> {
        for (i, marker) in markers.iter().enumerate() {
            let path = format!("world/waypoints/{}", i);
            let center = marker.local_position.as_f32();
            let color = rgba(marker.color, 255);

            match marker.shape {
                MarkerShape::Sphere { radius } => {
                    self.rec.log_static(
                        format!("{}/marker", path),
                        &rerun::Points3D::new([center])
                            .with_colors([color])
                            .with_radii([radius as f32]),
                    )?;
                }
                MarkerShape::Cube { edge } => {
                    let edge = edge as f32;
                    self.rec.log_static(
                        format!("{}/marker", path),
                        &rerun::Boxes3D::from_centers_and_sizes([center], [[edge, edge, edge]])
                            .with_colors([color]),
                    )?;
                }
            }

            self.rec.log_static(
                format!("{}/label", path),
                &rerun::Points3D::new([marker.label_anchor.as_f32()])
                    .with_radii([0.01])
                    .with_labels([marker.label.as_str()]),
            )?;
        }
        Ok(())
    }

    /// Log the measurement segment and its label, or clear it
    pub fn log_ruler(&self, reading: Option<&RulerReading>) -> Result<(), Box<dyn std::error::Error>> {
        match reading {
            Some(reading) => {
                self.rec.log(
                    "world/ruler/segment",
                    &rerun::LineStrips3D::new([[reading.start.as_f32(), reading.end.as_f32()]])
                        .with_colors([[255, 255, 0, 255]]),
                )?;
                self.rec.log(
                    "world/ruler/label",
                    &rerun::Points3D::new([reading.label_anchor.as_f32()])
                        .with_radii([0.01])
                        .with_labels([reading.label.as_str()]),
                )?;
            }
            None => {
                self.rec.log("world/ruler", &rerun::Clear::recursive())?;
            }
        }
        Ok(())
    }

    /// Log a whole frame; `trails` yields each entity's visible polyline
    pub fn log_frame<F>(&self, frame: &Frame, mut trails: F) -> Result<(), Box<dyn std::error::Error>>
    where
        F: FnMut(&EntityFrame) -> Option<Vec<[f32; 3]>>,
    {
        self.set_time("frame", frame.index);
        for entity in &frame.entities {
            self.log_entity(entity)?;
            if let Some(polyline) = trails(entity) {
                self.log_trail(entity, polyline)?;
            }
        }
        self.log_ruler(frame.ruler.as_ref())
    }

    /// Set the current sequence index for timeline scrubbing
    pub fn set_time(&self, name: &str, value: u64) {
        self.rec.set_time_sequence(name, value as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_scaling() {
        assert_eq!(rgba([1.0, 0.5, 0.0], 255), [255, 128, 0, 255]);
    }

    #[test]
    #[ignore] // Requires Rerun viewer
    fn test_visualizer_creation() {
        let viz = RerunVisualizer::new("test_app");
        assert!(viz.is_ok());
    }
}
