//! Scenario runner - executes deterministic scene scenarios.
//!
//! Every scenario runs on a fresh current-thread tokio runtime with a
//! `SimContext` virtual clock, so a seed fully determines the run.

use crate::context::SimContext;
use crate::exporter::SimExport;
use crate::feed::{RandomWalkFeed, SpinFeed};
use crate::loader::SimModelLoader;
use crate::scenarios::{demo_waypoints, ScenarioId};
use crate::visualizer::RerunLogger;

use locview_core::driver::{frames_for, run_scene};
use locview_core::environment::Aabb;
use locview_core::measure::{OrthographicCamera, PerspectiveCamera, PickCamera, ScreenPoint};
use locview_core::runtime::{ModelState, SceneConfig, SceneEvent, SceneRuntime};
use locview_core::smoothing::{wrap_degrees, AngleBlend};
use locview_core::{Frame, GeoCoordinate, Renderable, SceneError, TelemetrySource, Waypoint};
use locview_env::{EntityId, LocViewContext};
use nalgebra::Vector3;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

type SimScene = SceneRuntime<SimContext, SimModelLoader>;

/// Configuration for simulation runs.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed
    pub seed: u64,

    /// Entities driven by the random walk (default: 3)
    pub num_entities: usize,

    /// Scenario duration (default: 10 s)
    pub duration: Duration,

    /// Render rate in Hz (default: 60)
    pub frame_rate_hz: u32,

    /// Telemetry interval (default: 250 ms)
    pub telemetry_interval: Duration,

    /// Model requested for every entity (default: "/robot.glb")
    pub model_url: String,

    /// Virtual load time of a model (default: 200 ms)
    pub load_delay: Duration,

    /// Scene origin (default: San Francisco)
    pub root: GeoCoordinate,

    /// Waypoints; `None` uses the demo set
    pub waypoints: Option<Vec<Waypoint>>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_entities: 3,
            duration: Duration::from_secs(10),
            frame_rate_hz: 60,
            telemetry_interval: Duration::from_millis(250),
            model_url: "/robot.glb".to_string(),
            load_delay: Duration::from_millis(200),
            root: GeoCoordinate::new(37.7749, -122.4194, 0.0),
            waypoints: None,
        }
    }
}

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total frames rendered
    pub total_frames: u64,

    /// Final virtual time in seconds
    pub final_time_secs: f64,

    /// Number of tracked entities at end
    pub final_entity_count: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default)]
pub struct ScenarioMetrics {
    /// Telemetry samples ingested
    pub telemetry_samples: u64,

    /// Longest trail observed
    pub max_trail_len: usize,

    /// Clicks that produced a point
    pub picks: u64,

    /// Clicks in measurement mode that hit nothing
    pub missed_picks: u64,

    /// Clicks outside measurement mode
    pub ignored_clicks: u64,

    /// Model requests that resolved to a model
    pub models_loaded: u64,

    /// Model requests that resolved to a placeholder
    pub placeholders: u64,

    /// Frames where a linearly blended heading moved against the spin
    pub heading_unwinds: u64,
}

/// Assertion failures collected during a run.
#[derive(Debug, Default)]
struct Checks(Vec<String>);

impl Checks {
    fn require(&mut self, ok: bool, message: impl FnOnce() -> String) {
        if !ok {
            let message = message();
            debug!("check failed: {}", message);
            self.0.push(message);
        }
    }

    fn into_reason(self) -> Option<String> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.join("; "))
        }
    }
}

/// Runs simulation scenarios.
pub struct ScenarioRunner {
    config: SimConfig,
    logger: RerunLogger,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64, num_entities: usize) -> Self {
        Self::from_config(SimConfig {
            seed,
            num_entities,
            ..SimConfig::default()
        })
    }

    pub fn from_config(config: SimConfig) -> Self {
        Self {
            config,
            logger: RerunLogger::disabled(),
        }
    }

    /// Sets the duration in seconds.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.config.duration = Duration::from_secs_f64(secs.max(0.0));
        self
    }

    /// Sets the frame rate.
    pub fn with_frame_rate(mut self, hz: u32) -> Self {
        self.config.frame_rate_hz = hz;
        self
    }

    /// Replaces the demo waypoints.
    pub fn with_waypoints(mut self, waypoints: Vec<Waypoint>) -> Self {
        self.config.waypoints = Some(waypoints);
        self
    }

    /// Streams runs to a Rerun viewer.
    pub fn with_visualization(mut self, enabled: bool) -> Self {
        self.logger = if enabled {
            RerunLogger::new("locview-sim")
        } else {
            RerunLogger::disabled()
        };
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.run_with_export(scenario).0
    }

    /// Runs a scenario and also returns its frame export.
    pub fn run_with_export(&self, scenario: ScenarioId) -> (ScenarioResult, SimExport) {
        info!(
            "Starting scenario: {} (seed={}): {}",
            scenario.name(),
            self.config.seed,
            scenario.description()
        );

        let mut export = SimExport::new(scenario.name(), self.config.seed);

        let result = match tokio::runtime::Builder::new_current_thread().enable_time().build() {
            Ok(rt) => rt.block_on(async {
                match scenario {
                    ScenarioId::RandomWalk => self.run_random_walk(&mut export).await,
                    ScenarioId::HeadingWrap => self.run_heading_wrap(&mut export).await,
                    ScenarioId::Measurement => self.run_measurement(&mut export).await,
                    ScenarioId::AssetSwap => self.run_asset_swap(&mut export).await,
                    ScenarioId::TrailToggle => self.run_trail_toggle(&mut export).await,
                }
            }),
            Err(e) => Err(SceneError::Env(locview_env::EnvError::ContextError(e.to_string()))),
        };

        let result = result.unwrap_or_else(|e| {
            error!("Scenario {} aborted: {}", scenario.name(), e);
            ScenarioResult {
                scenario,
                seed: self.config.seed,
                passed: false,
                total_frames: 0,
                final_time_secs: 0.0,
                final_entity_count: 0,
                failure_reason: Some(e.to_string()),
                metrics: ScenarioMetrics::default(),
            }
        });

        export.finalize(result.passed, result.failure_reason.clone());
        (result, export)
    }

    fn scene_config(&self, name: &str) -> SceneConfig {
        SceneConfig {
            name: format!("{}-{}", name, self.config.seed),
            root: self.config.root,
            frame_rate_hz: self.config.frame_rate_hz,
            telemetry_interval: self.config.telemetry_interval,
            ..SceneConfig::default()
        }
    }

    fn scene(&self, ctx: &Arc<SimContext>, loader: SimModelLoader, config: SceneConfig) -> Result<SimScene, SceneError> {
        let mut scene = SceneRuntime::new(Arc::clone(ctx), Arc::new(loader), config)?;
        let waypoints = self
            .config
            .waypoints
            .clone()
            .unwrap_or_else(|| demo_waypoints(&self.config.root));
        scene.set_waypoints(waypoints);
        self.logger.log_waypoints(scene.markers());
        Ok(scene)
    }

    /// Advances one frame on the virtual clock and records it.
    async fn step(&self, ctx: &SimContext, scene: &mut SimScene, export: &mut SimExport) -> (Frame, Vec<SceneEvent>) {
        ctx.sleep(scene.config().frame_interval()).await;
        let frame = scene.tick();
        let events = scene.drain_events();

        export.add_events(frame.index, &events);
        self.logger
            .log_frame(&frame, |e| scene.trail_polyline(&e.entity));
        export.add_frame(frame.clone());
        (frame, events)
    }

    fn finish(
        &self,
        scenario: ScenarioId,
        ctx: &SimContext,
        scene: &SimScene,
        export: &mut SimExport,
        checks: Checks,
        metrics: ScenarioMetrics,
    ) -> ScenarioResult {
        export.set_waypoints(scene.markers());
        let failure_reason = checks.into_reason();
        ScenarioResult {
            scenario,
            seed: self.config.seed,
            passed: failure_reason.is_none(),
            total_frames: scene.frame_count(),
            final_time_secs: ctx.now().as_secs_f64(),
            final_entity_count: scene.tracked().count(),
            failure_reason,
            metrics,
        }
    }

    /// LV-001: RandomWalk - entities on the demo random walk, driven by
    /// the real two-cadence scene loop.
    ///
    /// **Assertion**: every frame renders every entity, first-frame poses
    /// are the first samples, and trails fill one point per frame up to
    /// their capacity.
    async fn run_random_walk(&self, export: &mut SimExport) -> Result<ScenarioResult, SceneError> {
        info!("LV-001: RandomWalk - {} entities", self.config.num_entities);

        let ctx = SimContext::shared(self.config.seed);
        let loader = SimModelLoader::new(Arc::clone(&ctx), self.config.load_delay);
        let trail_capacity = 120;
        let config = SceneConfig {
            trail_capacity,
            trail_enabled: true,
            ..self.scene_config("random_walk")
        };
        let mut scene = self.scene(&ctx, loader, config)?;

        let start = GeoCoordinate {
            altitude_m: self.config.root.altitude_m + 5.0,
            ..self.config.root
        };
        let mut feed = RandomWalkFeed::new(ctx.rng_for(1));
        for i in 0..self.config.num_entities {
            let id = EntityId::from_seed(i as u64 + 1);
            feed.add_entity(id, start);
            scene.track_entity(id, &self.config.model_url);
        }

        let frames = frames_for(self.config.duration, self.config.frame_rate_hz);
        let expected = self.config.num_entities;
        let mut checks = Checks::default();
        let mut metrics = ScenarioMetrics::default();

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let summary = run_scene(&mut scene, &mut feed, shutdown_rx, Some(frames), |frame, rt| {
            checks.require(frame.entities.len() == expected, || {
                format!("frame {} rendered {} of {} entities", frame.index, frame.entities.len(), expected)
            });

            for entity in &frame.entities {
                let want = (frame.index as usize).min(trail_capacity);
                checks.require(entity.trail_len == want, || {
                    format!("frame {}: trail {} != {}", frame.index, entity.trail_len, want)
                });
                metrics.max_trail_len = metrics.max_trail_len.max(entity.trail_len);

                if frame.index == 1 {
                    // bootstrap copies the first sample: 5 m ± one vertical step
                    let up = entity.pose.position.up;
                    checks.require((up - 5.0).abs() <= 0.15 + 1e-9, || {
                        format!("bootstrap altitude {:.3} is not the first sample", up)
                    });
                }
            }

            self.logger.log_frame(frame, |e| rt.trail_polyline(&e.entity));
            export.add_frame(frame.clone());

            if frame.index % 60 == 0 {
                debug!("  t={:.1}s | entities={}", frame.time_secs, frame.entities.len());
            }
        })
        .await;

        let events = scene.drain_events();
        export.add_events(summary.frames, &events);
        count_assets(&events, &mut metrics);
        metrics.telemetry_samples = summary.samples;

        checks.require(summary.frames == frames, || format!("ran {} of {} frames", summary.frames, frames));
        checks.require(
            summary.samples == summary.telemetry_polls * expected as u64,
            || format!("{} samples from {} polls", summary.samples, summary.telemetry_polls),
        );
        if ctx.now() > self.config.load_delay + Duration::from_millis(100) {
            checks.require(metrics.models_loaded == expected as u64, || {
                format!("{} of {} models loaded", metrics.models_loaded, expected)
            });
        }

        info!(
            "✓ RandomWalk complete: {} frames, {} samples, max trail {}",
            summary.frames, summary.samples, metrics.max_trail_len
        );

        Ok(self.finish(ScenarioId::RandomWalk, &ctx, &scene, export, checks, metrics))
    }

    /// LV-002: HeadingWrap - a heading target spinning through ±180°.
    ///
    /// **Assertion**: linear blending unwinds the long way at the seam,
    /// shortest-path blending never moves against the spin.
    async fn run_heading_wrap(&self, export: &mut SimExport) -> Result<ScenarioResult, SceneError> {
        info!("LV-002: HeadingWrap - linear vs shortest path");

        let mut checks = Checks::default();
        let mut metrics = ScenarioMetrics::default();

        let (_, _, linear) = self.spin_headings(AngleBlend::Linear, Some(&mut *export)).await?;
        metrics.heading_unwinds = linear
            .windows(2)
            .filter(|w| w[1] - w[0] < -1e-9)
            .count() as u64;
        checks.require(metrics.heading_unwinds > 0, || {
            "linear heading never unwound across the seam".to_string()
        });

        let (ctx, scene, shortest) = self.spin_headings(AngleBlend::ShortestPath, None).await?;
        let backsteps = shortest
            .windows(2)
            .filter(|w| wrap_degrees(w[1] - w[0]) < -1e-9)
            .count();
        checks.require(backsteps == 0, || {
            format!("shortest-path heading moved backwards {} times", backsteps)
        });
        checks.require(
            shortest.iter().all(|h| (-180.0..180.0).contains(h)),
            || "shortest-path heading left [-180, 180)".to_string(),
        );

        info!("✓ HeadingWrap complete: {} linear unwind frames", metrics.heading_unwinds);

        Ok(self.finish(ScenarioId::HeadingWrap, &ctx, &scene, export, checks, metrics))
    }

    /// Spins one entity from 170° in 5° steps and returns its per-frame
    /// smoothed headings.
    async fn spin_headings(
        &self,
        mode: AngleBlend,
        mut export: Option<&mut SimExport>,
    ) -> Result<(Arc<SimContext>, SimScene, Vec<f64>), SceneError> {
        let ctx = SimContext::shared(self.config.seed);
        let loader = SimModelLoader::new(Arc::clone(&ctx), self.config.load_delay);
        let config = SceneConfig {
            blend_factor: 0.1,
            angle_blend: mode,
            ..self.scene_config("heading_wrap")
        };
        let mut scene = self.scene(&ctx, loader, config)?;

        let id = EntityId::from_seed(1);
        scene.track_entity(id, &self.config.model_url);
        let mut feed = SpinFeed::new(id, self.config.root, 170.0, 5.0);

        let duration = self.config.duration.max(Duration::from_secs(2));
        let frames = frames_for(duration, self.config.frame_rate_hz);
        let mut headings = Vec::with_capacity(frames as usize);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        run_scene(&mut scene, &mut feed, shutdown_rx, Some(frames), |frame, _| {
            if let Some(entity) = frame.entities.first() {
                headings.push(entity.pose.heading_deg);
            }
            if let Some(export) = export.as_deref_mut() {
                export.add_frame(frame.clone());
            }
        })
        .await;

        debug!("{:?} blending: {} headings", mode, headings.len());
        Ok((ctx, scene, headings))
    }

    /// LV-003: Measurement - seeded clicks from a top-down and a
    /// horizon-level camera against two boxes and the ground.
    ///
    /// **Assertion**: clicks outside measurement mode change nothing, the
    /// point set keeps the newest two in order, every pick emits exactly
    /// one change event, and the ruler exists exactly with two points.
    async fn run_measurement(&self, export: &mut SimExport) -> Result<ScenarioResult, SceneError> {
        info!("LV-003: Measurement - ray picking");

        let ctx = SimContext::shared(self.config.seed);
        let loader = SimModelLoader::new(Arc::clone(&ctx), self.config.load_delay);
        let mut scene = self.scene(&ctx, loader, self.scene_config("measurement"))?;

        // environment model grounded at the root, plus a shed to the east
        let raw = Aabb::new(Vector3::new(10.0, -4.0, 10.0), Vector3::new(14.0, -1.0, 14.0));
        let environment = raw.translated(&raw.grounding_offset());
        let shed = Aabb::new(Vector3::new(6.0, 0.0, -1.0), Vector3::new(8.0, 2.0, 1.0));
        let boxes = [environment, shed];

        let (width, height) = scene.config().viewport;
        let top_down = OrthographicCamera::top_down(10.0, 10.0 * height / width);
        let horizon = PerspectiveCamera::new(
            Vector3::new(0.0, 2.0, 20.0),
            Vector3::new(0.0, 2.0, 0.0),
            50.0,
            width / height,
        );
        let cameras: [&dyn PickCamera; 2] = [&top_down, &horizon];

        let mut rng = ctx.rng_for(3);
        let mut checks = Checks::default();
        let mut metrics = ScenarioMetrics::default();
        let mut change_events = 0u64;

        let clicks = 48;
        for i in 0..clicks {
            if i == clicks / 4 {
                scene.set_measurement_mode(true);
            }

            let camera = cameras[i % 2];
            // one guaranteed sky click from the horizon camera
            let screen = if i == clicks / 2 + 1 {
                ScreenPoint::new(width / 2.0, 0.0)
            } else {
                ScreenPoint::new(rng.gen_range(0.0..width), rng.gen_range(0.0..height))
            };

            let before = *scene.measurement_points();
            let picked = scene.handle_click(screen, camera, &boxes[..]);
            let after = *scene.measurement_points();

            if !scene.measurement_mode() {
                metrics.ignored_clicks += 1;
                checks.require(!picked && after == before, || format!("click {} mutated state outside measurement mode", i));
            } else if picked {
                metrics.picks += 1;
                checks.require(after.len() == (before.len() + 1).min(2), || {
                    format!("click {}: {} points after {}", i, after.len(), before.len())
                });
                if let (Some((_, newer)), Some((older, _))) = (before.pair(), after.pair()) {
                    checks.require(older == newer, || format!("click {}: FIFO order broken", i));
                }
            } else {
                metrics.missed_picks += 1;
                checks.require(after == before, || format!("click {}: missed pick mutated state", i));
            }

            match (scene.ruler(), after.pair()) {
                (Some(reading), Some((a, b))) => {
                    let distance = a.distance_to(&b);
                    checks.require((reading.distance - distance).abs() <= 1e-9 * distance.max(1.0), || {
                        format!("ruler {} != {}", reading.distance, distance)
                    });
                }
                (None, None) => {}
                _ => checks.require(false, || format!("click {}: ruler without two points", i)),
            }

            let (_, events) = self.step(&ctx, &mut scene, export).await;
            change_events += events
                .iter()
                .filter(|e| matches!(e, SceneEvent::MeasurementChanged(_)))
                .count() as u64;
        }

        checks.require(metrics.picks > 0, || "no click produced a point".to_string());
        checks.require(metrics.missed_picks > 0, || "sky click produced a point".to_string());
        checks.require(change_events == metrics.picks, || {
            format!("{} change events for {} picks", change_events, metrics.picks)
        });

        scene.clear_measurements();
        checks.require(scene.ruler().is_none(), || "ruler survived clear".to_string());

        info!(
            "✓ Measurement complete: {} picks, {} misses, {} ignored",
            metrics.picks, metrics.missed_picks, metrics.ignored_clicks
        );

        Ok(self.finish(ScenarioId::Measurement, &ctx, &scene, export, checks, metrics))
    }

    /// LV-004: AssetSwap - a slow model superseded mid-load, a missing
    /// model and an unsupported format.
    ///
    /// **Assertion**: the superseded load never resolves, the replacement
    /// does, and both failures degrade to placeholders.
    async fn run_asset_swap(&self, export: &mut SimExport) -> Result<ScenarioResult, SceneError> {
        info!("LV-004: AssetSwap - superseded and failed loads");

        let ctx = SimContext::shared(self.config.seed);
        let loader = SimModelLoader::new(Arc::clone(&ctx), Duration::from_millis(100))
            .with_delay("/slow.glb", Duration::from_secs(2))
            .with_missing("/missing.fbx");
        let mut scene = self.scene(&ctx, loader, self.scene_config("asset_swap"))?;

        let swapped = EntityId::from_seed(1);
        let missing = EntityId::from_seed(2);
        let unsupported = EntityId::from_seed(3);

        scene.track_entity(swapped, "/slow.glb");
        scene.track_entity(missing, "/missing.fbx");
        scene.track_entity(unsupported, "/robot.ply");

        let mut feed = RandomWalkFeed::new(ctx.rng_for(4));
        for (i, id) in [swapped, missing, unsupported].into_iter().enumerate() {
            feed.add_entity(id, self.config.root.offset_by(0.0, 3.0 * i as f64, 0.0));
        }
        for sample in feed.sample(ctx.now()) {
            scene.ingest(sample);
        }

        let swap_at = frames_for(Duration::from_millis(500), self.config.frame_rate_hz);
        let frames = frames_for(self.config.duration.max(Duration::from_secs(3)), self.config.frame_rate_hz);

        let mut checks = Checks::default();
        let mut metrics = ScenarioMetrics::default();
        let mut resolved_urls = Vec::new();

        for i in 1..=frames {
            if i == swap_at {
                debug!("Swapping model at t={:.2}s", ctx.now().as_secs_f64());
                scene.track_entity(swapped, "/fast.obj");
            }

            let (frame, events) = self.step(&ctx, &mut scene, export).await;

            if i == 1 {
                let state = frame.entities.iter().find(|e| e.entity == swapped).map(|e| e.model);
                checks.require(state == Some(ModelState::Loading), || {
                    format!("first frame model state {:?}", state)
                });
                checks.require(
                    events.iter().any(|e| matches!(e, SceneEvent::AssetResolved(r) if r.entity == unsupported && r.placeholder)),
                    || "unsupported format did not resolve on the first frame".to_string(),
                );
            }

            count_assets(&events, &mut metrics);
            resolved_urls.extend(events.iter().filter_map(|e| match e {
                SceneEvent::AssetResolved(r) => Some(r.url.clone()),
                _ => None,
            }));
        }
        scene.shutdown();

        checks.require(!resolved_urls.iter().any(|u| u == "/slow.glb"), || {
            "superseded load was applied".to_string()
        });
        checks.require(scene.model_url(&swapped) == Some("/fast.obj"), || {
            "swap did not replace the request".to_string()
        });
        checks.require(
            matches!(scene.renderable(&swapped), Some(Renderable::Model(m)) if m.url == "/fast.obj"),
            || "replacement model missing".to_string(),
        );
        checks.require(scene.renderable(&missing) == Some(&Renderable::Placeholder), || {
            "missing model is not a placeholder".to_string()
        });
        checks.require(scene.renderable(&unsupported) == Some(&Renderable::Placeholder), || {
            "unsupported model is not a placeholder".to_string()
        });

        info!(
            "✓ AssetSwap complete: {} models, {} placeholders",
            metrics.models_loaded, metrics.placeholders
        );

        Ok(self.finish(ScenarioId::AssetSwap, &ctx, &scene, export, checks, metrics))
    }

    /// LV-005: TrailToggle - recording on, off, on, then reset.
    ///
    /// **Assertion**: disabling keeps history and hides the polyline,
    /// re-enabling appends to it, only reset clears it.
    async fn run_trail_toggle(&self, export: &mut SimExport) -> Result<ScenarioResult, SceneError> {
        info!("LV-005: TrailToggle");

        let ctx = SimContext::shared(self.config.seed);
        let loader = SimModelLoader::new(Arc::clone(&ctx), self.config.load_delay);
        let config = SceneConfig {
            trail_enabled: true,
            ..self.scene_config("trail_toggle")
        };
        let capacity = config.trail_capacity;
        let mut scene = self.scene(&ctx, loader, config)?;

        let id = EntityId::from_seed(1);
        scene.track_entity(id, &self.config.model_url);
        let mut feed = RandomWalkFeed::new(ctx.rng_for(5));
        feed.add_entity(id, self.config.root);

        let frame_interval = scene.config().frame_interval();
        let poll_every = ((self.config.telemetry_interval.as_secs_f64() / frame_interval.as_secs_f64()).round() as u64).max(1);
        let phase = frames_for(self.config.duration, self.config.frame_rate_hz).max(30) / 3;

        let mut checks = Checks::default();
        let mut metrics = ScenarioMetrics::default();
        let mut frame_no = 0u64;
        let trail_len = |scene: &SimScene| scene.trail(&id).map_or(0, |t| t.len());

        for (enabled, name) in [(true, "on"), (false, "off"), (true, "on again")] {
            scene.set_trail_enabled(enabled);
            let before = trail_len(&scene);

            for _ in 0..phase {
                if frame_no % poll_every == 0 {
                    let samples = feed.sample(ctx.now());
                    metrics.telemetry_samples += samples.len() as u64;
                    for sample in samples {
                        scene.ingest(sample);
                    }
                }
                self.step(&ctx, &mut scene, export).await;
                frame_no += 1;
            }

            let after = trail_len(&scene);
            metrics.max_trail_len = metrics.max_trail_len.max(after);
            let want = if enabled {
                (before + phase as usize).min(capacity)
            } else {
                before
            };
            checks.require(after == want, || format!("phase '{}': trail {} != {}", name, after, want));
            checks.require(scene.trail_polyline(&id).is_some() == enabled, || {
                format!("phase '{}': polyline visibility wrong", name)
            });
        }

        scene.reset_trail(&id)?;
        checks.require(trail_len(&scene) == 0, || "reset left points behind".to_string());

        info!("✓ TrailToggle complete: peak trail {}", metrics.max_trail_len);

        Ok(self.finish(ScenarioId::TrailToggle, &ctx, &scene, export, checks, metrics))
    }
}

fn count_assets(events: &[SceneEvent], metrics: &mut ScenarioMetrics) {
    for event in events {
        if let SceneEvent::AssetResolved(resolved) = event {
            if resolved.placeholder {
                metrics.placeholders += 1;
            } else {
                metrics.models_loaded += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_walk_scenario() {
        let runner = ScenarioRunner::new(42, 3).with_duration(1.0);

        let result = runner.run(ScenarioId::RandomWalk);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.total_frames, 60);
        assert_eq!(result.final_entity_count, 3);
        assert_eq!(result.metrics.models_loaded, 3);
        assert!(result.metrics.telemetry_samples > 0);
    }

    #[test]
    fn test_heading_wrap_scenario() {
        let runner = ScenarioRunner::new(42, 1).with_duration(1.0);

        let result = runner.run(ScenarioId::HeadingWrap);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.metrics.heading_unwinds > 0);
    }

    #[test]
    fn test_measurement_scenario() {
        let runner = ScenarioRunner::new(42, 1);

        let result = runner.run(ScenarioId::Measurement);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.ignored_clicks, 12);
    }

    #[test]
    fn test_asset_swap_scenario() {
        let runner = ScenarioRunner::new(42, 1).with_duration(1.0);

        let result = runner.run(ScenarioId::AssetSwap);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.models_loaded, 1);
        assert_eq!(result.metrics.placeholders, 2);
    }

    #[test]
    fn test_trail_toggle_scenario() {
        let runner = ScenarioRunner::new(42, 1).with_duration(1.5);

        let result = runner.run(ScenarioId::TrailToggle);

        assert!(result.passed, "{:?}", result.failure_reason);
    }

    #[test]
    fn test_runs_are_deterministic() {
        let runner1 = ScenarioRunner::new(7, 2).with_duration(1.0);
        let runner2 = ScenarioRunner::new(7, 2).with_duration(1.0);

        let (_, export1) = runner1.run_with_export(ScenarioId::RandomWalk);
        let (_, export2) = runner2.run_with_export(ScenarioId::RandomWalk);

        assert_eq!(export1.frames, export2.frames);
    }

    #[test]
    fn test_export_carries_waypoint_markers() {
        let runner = ScenarioRunner::new(42, 1).with_duration(0.5);

        let (result, export) = runner.run_with_export(ScenarioId::RandomWalk);

        assert!(result.passed, "{:?}", result.failure_reason);
        let expected = demo_waypoints(&runner.config().root).len();
        assert!(expected > 0);
        assert_eq!(export.waypoints.len(), expected);

        let json = serde_json::to_string(&export).unwrap();
        assert!(json.contains("\"waypoints\""));
    }

    #[test]
    fn test_zero_frame_rate_fails_scenario() {
        let runner = ScenarioRunner::new(42, 1).with_frame_rate(0);

        let result = runner.run(ScenarioId::RandomWalk);

        assert!(!result.passed);
        assert_eq!(result.total_frames, 0);
        assert!(result.failure_reason.unwrap().contains("Frame rate"));
    }
}
