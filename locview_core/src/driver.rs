//! Drives a scene on its two cadences from a single task.
//!
//! ```text
//!  t ─────┬──────┬──────┬──────┬──────┬──────┬─────▶
//!  frame  │tick  │tick  │tick  │tick  │tick  │          every 1/frame_rate_hz
//!  feed   │ingest              │ingest                 every telemetry_interval
//! ```
//!
//! Telemetry only replaces targets; motion happens in the next tick. The
//! loop ends on the shutdown signal or the frame limit and always shuts the
//! runtime down before returning.

use crate::runtime::{Frame, SceneRuntime};
use crate::telemetry::TelemetrySource;
use locview_env::{LocViewContext, ModelLoader};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Counters from a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub telemetry_polls: u64,
    pub samples: u64,
}

/// Runs the render and telemetry loops until shutdown.
///
/// `shutdown` set to `true` (or its sender dropped) stops the loop.
/// `max_frames` bounds headless runs. `on_frame` sees every frame together
/// with the runtime for trail and marker access.
pub async fn run_scene<Ctx, L, S, F>(
    runtime: &mut SceneRuntime<Ctx, L>,
    feed: &mut S,
    mut shutdown: watch::Receiver<bool>,
    max_frames: Option<u64>,
    mut on_frame: F,
) -> RunSummary
where
    Ctx: LocViewContext,
    L: ModelLoader,
    S: TelemetrySource + ?Sized,
    F: FnMut(&Frame, &SceneRuntime<Ctx, L>),
{
    let context: Arc<Ctx> = Arc::clone(runtime.context());
    let frame_interval = runtime.config().frame_interval();
    let telemetry_interval = runtime.config().telemetry_interval;

    let mut summary = RunSummary::default();
    let start = context.now();
    let mut next_frame = start;
    let mut next_telemetry = start;

    info!(
        "Scene loop started: frame every {:?}, telemetry every {:?}",
        frame_interval, telemetry_interval
    );

    loop {
        if *shutdown.borrow() {
            break;
        }

        let now = context.now();

        if now >= next_telemetry {
            let samples = feed.sample(now);
            summary.telemetry_polls += 1;
            summary.samples += samples.len() as u64;
            for sample in samples {
                runtime.ingest(sample);
            }
            next_telemetry += telemetry_interval;
        }

        if now >= next_frame {
            let frame = runtime.tick();
            on_frame(&frame, &*runtime);
            summary.frames += 1;
            next_frame += frame_interval;

            // a stalled loop resumes the cadence instead of bursting ticks
            let late = context.now();
            if next_frame <= late {
                debug!("Frame schedule {:?} behind, skipping ahead", late - next_frame);
                next_frame = late + frame_interval;
            }

            if max_frames.is_some_and(|limit| summary.frames >= limit) {
                debug!("Frame limit reached");
                break;
            }
        }

        let wait = next_frame.min(next_telemetry).saturating_sub(context.now());
        if wait.is_zero() {
            continue;
        }

        tokio::select! {
            _ = context.sleep(wait) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    debug!("Shutdown sender dropped");
                    break;
                }
            }
        }
    }

    runtime.shutdown();
    info!(
        "Scene loop stopped: {} frames, {} samples",
        summary.frames, summary.samples
    );
    summary
}

/// Frame count covering `duration` at the configured rate, at least one.
pub fn frames_for(duration: Duration, frame_rate_hz: u32) -> u64 {
    ((duration.as_secs_f64() * f64::from(frame_rate_hz)).round() as u64).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoCoordinate;
    use crate::runtime::SceneConfig;
    use crate::telemetry::{ScriptedFeed, TelemetrySample};
    use async_trait::async_trait;
    use locview_env::{AssetFormat, EntityId, EnvError, LoadedModel, TokioContext};
    use std::future::Future;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::SystemTime;
    use tokio::task::JoinHandle;

    struct InstantLoader;

    #[async_trait]
    impl ModelLoader for InstantLoader {
        async fn load(&self, url: &str, format: AssetFormat) -> Result<LoadedModel, EnvError> {
            Ok(LoadedModel::new(url, format, vec![0]))
        }
    }

    /// Clock that only moves on `sleep` or an explicit stall.
    #[derive(Default)]
    struct StallClock {
        nanos: AtomicU64,
    }

    impl StallClock {
        fn stall(&self, duration: Duration) {
            self.nanos.fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl LocViewContext for StallClock {
        fn now(&self) -> Duration {
            Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
        }

        fn system_time(&self) -> SystemTime {
            SystemTime::UNIX_EPOCH + self.now()
        }

        async fn sleep(&self, duration: Duration) {
            self.stall(duration);
            tokio::task::yield_now().await;
        }

        fn spawn<F>(&self, _name: &str, future: F) -> JoinHandle<()>
        where
            F: Future<Output = ()> + Send + 'static,
        {
            tokio::spawn(future)
        }

        fn seed(&self) -> u64 {
            0
        }
    }

    fn sample(entity: EntityId, root: &GeoCoordinate, east: f64) -> TelemetrySample {
        TelemetrySample {
            entity,
            position: root.offset_by(0.0, east, 0.0),
            pitch_deg: 0.0,
            roll_deg: 0.0,
            heading_deg: 0.0,
        }
    }

    fn scene() -> SceneRuntime<TokioContext, InstantLoader> {
        SceneRuntime::new(TokioContext::shared(), Arc::new(InstantLoader), SceneConfig::default()).unwrap()
    }

    #[test]
    fn test_frames_for() {
        assert_eq!(frames_for(Duration::from_secs(2), 60), 120);
        assert_eq!(frames_for(Duration::ZERO, 60), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_second_runs_both_cadences() {
        let mut scene = scene();
        let id = EntityId::from_seed(1);
        let root = *scene.root();
        scene.track_entity(id, "/robot.glb");

        let mut feed = ScriptedFeed::new(vec![
            (Duration::ZERO, sample(id, &root, 0.0)),
            (Duration::from_millis(500), sample(id, &root, 10.0)),
        ]);
        let (_tx, rx) = watch::channel(false);

        let mut seen = 0;
        let summary = run_scene(&mut scene, &mut feed, rx, Some(60), |frame, _| {
            seen += 1;
            assert_eq!(frame.index, seen);
        })
        .await;

        assert_eq!(summary.frames, 60);
        assert_eq!(summary.samples, 2);
        // 250 ms polls across one second of frames
        assert!((4..=5).contains(&summary.telemetry_polls));

        let east = scene.pose(&id).unwrap().position.east;
        assert!(east > 0.0 && east < 10.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_signal_stops_loop() {
        let mut scene = scene();
        let mut feed = ScriptedFeed::default();
        let (tx, rx) = watch::channel(false);

        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = tx.send(true);
        });

        let summary = run_scene(&mut scene, &mut feed, rx, None, |_, _| {}).await;
        stopper.await.unwrap();

        // ~6 frames at 60 Hz within 100 ms
        assert!(summary.frames >= 5 && summary.frames <= 8, "frames = {}", summary.frames);
    }

    #[tokio::test]
    async fn test_stall_does_not_burst_ticks() {
        let clock = Arc::new(StallClock::default());
        let config = SceneConfig::default();
        let frame_interval = config.frame_interval();
        let mut scene = SceneRuntime::new(Arc::clone(&clock), Arc::new(InstantLoader), config).unwrap();
        let mut feed = ScriptedFeed::default();
        let (_tx, rx) = watch::channel(false);

        let mut ticked_at = Vec::new();
        let summary = run_scene(&mut scene, &mut feed, rx, Some(4), |_, _| {
            ticked_at.push(clock.now());
            if ticked_at.len() == 1 {
                clock.stall(Duration::from_secs(1));
            }
        })
        .await;

        assert_eq!(summary.frames, 4);
        assert_eq!(ticked_at[0], Duration::ZERO);
        assert!(ticked_at[1] >= Duration::from_secs(1) + frame_interval);
        for pair in ticked_at.windows(2) {
            assert!(pair[1] - pair[0] >= frame_interval, "ticks at {:?}", ticked_at);
        }
    }
}
