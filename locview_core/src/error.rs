//! Error types for the LocView scene core.

use locview_env::{EntityId, EnvError};
use thiserror::Error;

/// Errors raised while configuring or driving a scene.
///
/// Degenerate pick rays and failed model loads are not errors: they yield
/// `None` and a placeholder respectively.
#[derive(Debug, Error)]
pub enum SceneError {
    /// Waypoint kind outside the closed set ("object", "structure")
    #[error("Invalid waypoint kind: {0:?}")]
    InvalidWaypointKind(String),

    /// Marker color is not a `#rrggbb` string
    #[error("Invalid marker color: {0:?}")]
    InvalidMarkerColor(String),

    /// Blend factor outside (0, 1]
    #[error("Blend factor must be in (0, 1], got {0}")]
    InvalidBlendFactor(f64),

    /// Trail buffer with no room for a single point
    #[error("Trail capacity must be at least 1")]
    InvalidTrailCapacity,

    /// Render cadence of zero frames per second
    #[error("Frame rate must be at least 1 Hz")]
    InvalidFrameRate,

    /// Telemetry poll interval of zero
    #[error("Telemetry interval must be non-zero")]
    InvalidTelemetryInterval,

    /// Viewport with a non-positive dimension
    #[error("Invalid viewport {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },

    /// Operation on an entity that is not tracked
    #[error("Unknown entity: {0}")]
    UnknownEntity(EntityId),

    /// Waypoint list could not be parsed
    #[error("Waypoint parse error: {0}")]
    Waypoints(#[from] serde_json::Error),

    #[error(transparent)]
    Env(#[from] EnvError),
}
