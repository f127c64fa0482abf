//! Scene Runtime - Orchestrates the LocView engines with environment context.
//!
//! Integration layer between the pure engines (geo, smoothing, trail,
//! measure, waypoint, ruler) and the environment abstraction
//! (`LocViewContext` + `ModelLoader`).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        SceneRuntime                           │
//! │  ┌────────────────────────────────────────────────────────┐   │
//! │  │            Context: LocViewContext + ModelLoader        │   │
//! │  │  • now() → frame timestamps                             │   │
//! │  │  • spawn() → background model loads                     │   │
//! │  └────────────────────────────────────────────────────────┘   │
//! │                               │                                │
//! │  ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │
//! │  │ SMOOTHING│ │  TRAIL   │ │ MEASURE  │ │ ASSETS/WAYPOINTS │  │
//! │  └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! `ingest` only replaces an entity's target; all smoothing and trail
//! sampling happens in `tick`, once per render frame.
//!
//! # Usage
//!
//! ```ignore
//! use locview_core::runtime::{SceneConfig, SceneRuntime};
//! use locview_env::{FsModelLoader, TokioContext};
//!
//! let ctx = TokioContext::shared();
//! let loader = Arc::new(FsModelLoader::new("public"));
//! let mut scene = SceneRuntime::new(ctx, loader, SceneConfig::default())?;
//!
//! scene.track_entity(robot_id, "/robot.glb");
//! scene.ingest(sample);
//! let frame = scene.tick();
//! ```

use crate::assets::{AssetManager, AssetResolved, Renderable};
use crate::error::SceneError;
use crate::geo::GeoCoordinate;
use crate::measure::{
    MeasurementPicker, MeasurementPointSet, MeasurementSession, PickCamera, SceneIntersector, ScreenPoint, Viewport,
};
use crate::pose::Pose;
use crate::ruler::{self, RulerReading};
use crate::smoothing::{AngleBlend, BlendFactor, PoseSmoother, DEFAULT_BLEND_FACTOR};
use crate::telemetry::TelemetrySample;
use crate::trail::{TrailRecorder, DEFAULT_TRAIL_CAPACITY};
use crate::waypoint::{self, Waypoint, WaypointMarker};
use locview_env::{EntityId, LocViewContext, ModelLoader};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for a LocView scene.
#[derive(Debug, Clone)]
pub struct SceneConfig {
    /// Scene's logical name (for logging)
    pub name: String,

    /// Geographic origin of the local frame
    pub root: GeoCoordinate,

    /// Render rate in Hz (default: 60)
    pub frame_rate_hz: u32,

    /// Telemetry polling interval (default: 250 ms)
    pub telemetry_interval: Duration,

    /// Trail points kept per entity (default: 5000)
    pub trail_capacity: usize,

    /// Per-frame smoothing blend factor (default: 0.004)
    pub blend_factor: f64,

    /// Angle blending mode (default: Linear)
    pub angle_blend: AngleBlend,

    /// Render surface size in pixels (default: 800x600)
    pub viewport: (f64, f64),

    /// Initial trail flag (default: off)
    pub trail_enabled: bool,

    /// Initial measurement mode (default: off)
    pub measurement_enabled: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            name: "locview-scene".to_string(),
            root: GeoCoordinate::new(37.7749, -122.4194, 0.0),
            frame_rate_hz: 60,
            telemetry_interval: Duration::from_millis(250),
            trail_capacity: DEFAULT_TRAIL_CAPACITY,
            blend_factor: DEFAULT_BLEND_FACTOR,
            angle_blend: AngleBlend::Linear,
            viewport: (800.0, 600.0),
            trail_enabled: false,
            measurement_enabled: false,
        }
    }
}

impl SceneConfig {
    /// Duration of one render frame.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frame_rate_hz.max(1)))
    }
}

/// Something the collaborators should react to.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    /// Emitted on every successful pick
    MeasurementChanged(MeasurementPointSet),

    /// A model request settled (model or placeholder)
    AssetResolved(AssetResolved),
}

/// Load state of an entity's model as seen by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelState {
    Loading,
    Model,
    Placeholder,
}

/// One entity's state in a rendered frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityFrame {
    pub entity: EntityId,
    pub pose: Pose,
    pub trail_len: usize,
    pub model: ModelState,
}

/// Output of one render tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub index: u64,
    pub time_secs: f64,
    pub entities: Vec<EntityFrame>,
    pub ruler: Option<RulerReading>,
}

struct TrackedEntity {
    target: Option<TelemetrySample>,
    trail: TrailRecorder,
}

/// A LocView scene that owns every piece of per-frame state.
///
/// Generic over the context and loader implementations, so the same scene
/// runs in production (tokio) or simulation (virtual clock).
pub struct SceneRuntime<Ctx, L>
where
    Ctx: LocViewContext,
    L: ModelLoader,
{
    /// Environment context
    context: Arc<Ctx>,

    /// Configuration
    config: SceneConfig,

    /// Current root
    root: GeoCoordinate,

    /// Tracked entities, ordered for deterministic frames
    entities: BTreeMap<EntityId, TrackedEntity>,

    /// Smoothing Engine
    smoother: PoseSmoother,

    /// Measurement mode and selection
    measurement: MeasurementSession,

    /// Model loads
    assets: AssetManager<Ctx, L>,

    waypoints: Vec<Waypoint>,
    markers: Vec<WaypointMarker>,

    trail_enabled: bool,
    events: Vec<SceneEvent>,
    frame_count: u64,
}

impl<Ctx, L> SceneRuntime<Ctx, L>
where
    Ctx: LocViewContext,
    L: ModelLoader,
{
    /// Creates a scene, validating the numeric configuration.
    pub fn new(context: Arc<Ctx>, loader: Arc<L>, config: SceneConfig) -> Result<Self, SceneError> {
        if config.frame_rate_hz == 0 {
            return Err(SceneError::InvalidFrameRate);
        }
        if config.telemetry_interval.is_zero() {
            return Err(SceneError::InvalidTelemetryInterval);
        }
        let alpha = BlendFactor::new(config.blend_factor)?;
        // validated once here; every per-entity trail reuses the capacity
        TrailRecorder::new(config.trail_capacity)?;
        let viewport = Viewport::new(config.viewport.0, config.viewport.1)?;

        let mut measurement = MeasurementSession::new(MeasurementPicker::new(viewport));
        measurement.set_enabled(config.measurement_enabled);

        info!(
            "Scene '{}' rooted at ({:.6}, {:.6}, {:.1})",
            config.name, config.root.latitude_deg, config.root.longitude_deg, config.root.altitude_m
        );

        Ok(Self {
            assets: AssetManager::new(Arc::clone(&context), loader),
            context,
            root: config.root,
            entities: BTreeMap::new(),
            smoother: PoseSmoother::new(alpha, config.angle_blend),
            measurement,
            waypoints: Vec::new(),
            markers: Vec::new(),
            trail_enabled: config.trail_enabled,
            events: Vec::new(),
            frame_count: 0,
            config,
        })
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn root(&self) -> &GeoCoordinate {
        &self.root
    }

    pub fn context(&self) -> &Arc<Ctx> {
        &self.context
    }

    /// Returns the current time from the context in seconds.
    pub fn now_secs(&self) -> f64 {
        self.context.now().as_secs_f64()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Starts tracking an entity and requests its model.
    ///
    /// Tracking an already tracked entity only updates the model URL.
    pub fn track_entity(&mut self, entity: EntityId, model_url: &str) {
        self.entities.entry(entity).or_insert_with(|| {
            info!("Tracking entity {}", entity);
            TrackedEntity {
                target: None,
                trail: new_trail(self.config.trail_capacity),
            }
        });
        self.assets.request(entity, model_url);
    }

    /// URL of the entity's current model request.
    pub fn model_url(&self, entity: &EntityId) -> Option<&str> {
        self.assets.url(entity)
    }

    /// Stops tracking: drops smoothing state, trail and any in-flight load.
    pub fn untrack_entity(&mut self, entity: &EntityId) -> Result<(), SceneError> {
        self.entities
            .remove(entity)
            .ok_or(SceneError::UnknownEntity(*entity))?;
        self.smoother.remove(entity);
        self.assets.remove(entity);
        info!("Untracked entity {}", entity);
        Ok(())
    }

    pub fn tracked(&self) -> impl Iterator<Item = &EntityId> {
        self.entities.keys()
    }

    /// Replaces the entity's target. Samples for untracked entities are
    /// dropped.
    pub fn ingest(&mut self, sample: TelemetrySample) {
        match self.entities.get_mut(&sample.entity) {
            Some(tracked) => tracked.target = Some(sample),
            None => debug!("Dropping telemetry for untracked entity {}", sample.entity),
        }
    }

    /// Moves the origin; targets and markers are recomputed against it.
    pub fn set_root(&mut self, root: GeoCoordinate) {
        self.root = root;
        self.markers = place_all(&self.waypoints, &self.root);
    }

    /// Replaces the waypoint list and recomputes markers.
    pub fn set_waypoints(&mut self, waypoints: Vec<Waypoint>) {
        self.markers = place_all(&waypoints, &self.root);
        self.waypoints = waypoints;
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn markers(&self) -> &[WaypointMarker] {
        &self.markers
    }

    /// Gates trail sampling. History is retained while disabled.
    pub fn set_trail_enabled(&mut self, enabled: bool) {
        self.trail_enabled = enabled;
    }

    pub fn trail_enabled(&self) -> bool {
        self.trail_enabled
    }

    pub fn trail(&self, entity: &EntityId) -> Option<&TrailRecorder> {
        self.entities.get(entity).map(|t| &t.trail)
    }

    /// Polyline for rendering; `None` when hidden or too short.
    pub fn trail_polyline(&self, entity: &EntityId) -> Option<Vec<[f32; 3]>> {
        self.trail(entity)?.visible_polyline(self.trail_enabled)
    }

    /// Clears an entity's trail history.
    pub fn reset_trail(&mut self, entity: &EntityId) -> Result<(), SceneError> {
        let tracked = self
            .entities
            .get_mut(entity)
            .ok_or(SceneError::UnknownEntity(*entity))?;
        tracked.trail.clear();
        Ok(())
    }

    pub fn set_measurement_mode(&mut self, enabled: bool) {
        self.measurement.set_enabled(enabled);
    }

    pub fn measurement_mode(&self) -> bool {
        self.measurement.is_enabled()
    }

    pub fn measurement_points(&self) -> &MeasurementPointSet {
        self.measurement.points()
    }

    pub fn clear_measurements(&mut self) {
        self.measurement.clear();
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.measurement.picker_mut().set_viewport(viewport);
    }

    /// Routes a pointer click to the measurement session.
    ///
    /// Returns `true` when a point was picked; a `MeasurementChanged` event
    /// is queued in that case.
    pub fn handle_click<C, S>(&mut self, screen: ScreenPoint, camera: &C, scene: &S) -> bool
    where
        C: PickCamera + ?Sized,
        S: SceneIntersector + ?Sized,
    {
        match self.measurement.handle_click(screen, camera, scene) {
            Some(points) => {
                debug!("Measurement points: {}", points.len());
                self.events.push(SceneEvent::MeasurementChanged(points));
                true
            }
            None => false,
        }
    }

    /// Distance readout, present only with two points.
    pub fn ruler(&self) -> Option<RulerReading> {
        ruler::from_points(self.measurement.points())
    }

    pub fn renderable(&self, entity: &EntityId) -> Option<&Renderable> {
        self.assets.renderable(entity)
    }

    /// Runs one render frame.
    ///
    /// Applies finished loads, then advances every entity that has a target
    /// by exactly one smoothing step, sampling trails when enabled.
    pub fn tick(&mut self) -> Frame {
        for resolved in self.assets.poll() {
            self.events.push(SceneEvent::AssetResolved(resolved));
        }

        self.frame_count += 1;
        let mut entities = Vec::with_capacity(self.entities.len());

        for (id, tracked) in self.entities.iter_mut() {
            let Some(sample) = tracked.target else {
                continue;
            };
            let target = sample.to_pose(&self.root);
            let trail = if self.trail_enabled {
                Some(&mut tracked.trail)
            } else {
                None
            };
            let pose = self.smoother.update(*id, &target, trail);

            let model = match self.assets.renderable(id) {
                None => ModelState::Loading,
                Some(Renderable::Model(_)) => ModelState::Model,
                Some(Renderable::Placeholder) => ModelState::Placeholder,
            };

            entities.push(EntityFrame {
                entity: *id,
                pose,
                trail_len: tracked.trail.len(),
                model,
            });
        }

        Frame {
            index: self.frame_count,
            time_secs: self.now_secs(),
            entities,
            ruler: self.ruler(),
        }
    }

    /// Current smoothed pose of an entity.
    pub fn pose(&self, entity: &EntityId) -> Option<Pose> {
        self.smoother.current(entity)
    }

    /// Takes the queued events.
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    /// Stops background work. Scene state stays readable.
    pub fn shutdown(&mut self) {
        self.assets.shutdown();
        info!("Scene '{}' shut down after {} frames", self.config.name, self.frame_count);
    }
}

fn new_trail(capacity: usize) -> TrailRecorder {
    // capacity was validated in `SceneRuntime::new`
    TrailRecorder::new(capacity).unwrap_or_default()
}

fn place_all(waypoints: &[Waypoint], root: &GeoCoordinate) -> Vec<WaypointMarker> {
    waypoints
        .iter()
        .filter_map(|w| match waypoint::place(w, root) {
            Ok(marker) => Some(marker),
            Err(e) => {
                warn!("Skipping waypoint '{}': {}", w.name, e);
                None
            }
        })
        .collect()
}
