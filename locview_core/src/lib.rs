//! LocView Core - Geo-anchored pose smoothing and scene measurement
//!
//! This library turns periodic geographic telemetry into continuous motion
//! inside a local 3D scene:
//! 1. **Local Frame**: geographic coordinates to east/up/north offsets around a root
//! 2. **Smoothing**: per-entity constant first-order filter with a bootstrap frame
//! 3. **Trails**: bounded FIFO history of smoothed positions
//! 4. **Measurement**: ray picking with a ground-plane fallback and a two-point ruler

pub mod assets;
pub mod driver;
pub mod environment;
pub mod error;
pub mod geo;
pub mod measure;
pub mod pose;
pub mod ruler;
pub mod runtime;
pub mod smoothing;
pub mod telemetry;
pub mod trail;
pub mod waypoint;

#[cfg(feature = "visualization")]
pub mod visualization;

// Re-export key types for convenience
pub use assets::{AssetManager, Renderable};
pub use driver::{run_scene, RunSummary};
pub use error::SceneError;
pub use geo::{to_local, GeoCoordinate, LocalPosition};
pub use measure::{MeasurementPointSet, MeasurementSession, Ray};
pub use pose::Pose;
pub use runtime::{Frame, SceneConfig, SceneEvent, SceneRuntime};
pub use smoothing::{AngleBlend, PoseSmoother};
pub use telemetry::{TelemetrySample, TelemetrySource};
pub use trail::TrailRecorder;
pub use waypoint::{Waypoint, WaypointKind};
