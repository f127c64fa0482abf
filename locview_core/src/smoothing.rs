//! The "SMOOTHING" Engine - per-entity pose filter
//!
//! Turns discrete, possibly jittery telemetry targets into continuous motion
//! sampled once per render frame. Each axis follows a constant first-order
//! low-pass filter:
//!
//! ```text
//! current += (target - current) * alpha
//! ```
//!
//! applied per frame regardless of the wall-clock time since the previous
//! frame. For a held target the error shrinks geometrically with ratio
//! `1 - alpha`.
//!
//! Each entity moves through a one-way state machine:
//!
//! ```text
//! Uninitialized --first update (copy target)--> Tracking --update (blend)--> Tracking
//! ```

use crate::error::SceneError;
use crate::pose::Pose;
use crate::trail::TrailRecorder;
use locview_env::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default per-frame blend factor (0.004).
///
/// Equal to the cubic ease-in-out curve evaluated at 0.1, which is where the
/// visual tuning of the viewer came from. It is used as a plain constant.
pub const DEFAULT_BLEND_FACTOR: f64 = 0.004;

/// Fraction of the remaining distance-to-target applied each frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendFactor(f64);

impl BlendFactor {
    /// Creates a blend factor; must lie in (0, 1].
    pub fn new(alpha: f64) -> Result<Self, SceneError> {
        if alpha > 0.0 && alpha <= 1.0 {
            Ok(Self(alpha))
        } else {
            Err(SceneError::InvalidBlendFactor(alpha))
        }
    }

    pub fn get(&self) -> f64 {
        self.0
    }
}

impl Default for BlendFactor {
    fn default() -> Self {
        Self(DEFAULT_BLEND_FACTOR)
    }
}

/// How orientation angles approach their targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AngleBlend {
    /// Blend the raw degree values. A target across the ±180° seam takes
    /// the long way round through 0.
    #[default]
    Linear,

    /// Blend along the shorter arc and keep the result in [-180, 180).
    ShortestPath,
}

impl AngleBlend {
    fn step(self, current: f64, target: f64, alpha: f64) -> f64 {
        match self {
            AngleBlend::Linear => current + (target - current) * alpha,
            AngleBlend::ShortestPath => {
                let delta = wrap_degrees(target - current);
                wrap_degrees(current + delta * alpha)
            }
        }
    }
}

/// Wraps an angle in degrees into [-180, 180).
pub fn wrap_degrees(angle: f64) -> f64 {
    (angle + 180.0).rem_euclid(360.0) - 180.0
}

/// Smoothing state owned by the smoother for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SmoothedEntityState {
    current: Pose,
    initialized: bool,
}

impl SmoothedEntityState {
    /// State before the bootstrap frame.
    pub fn uninitialized() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &Pose {
        &self.current
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Advances one frame toward `target` and returns the new current pose.
    ///
    /// The first call copies the target verbatim so the entity does not
    /// animate in from the origin.
    pub fn step(&mut self, target: &Pose, alpha: BlendFactor, angles: AngleBlend) -> Pose {
        if !self.initialized {
            self.current = *target;
            self.initialized = true;
            return self.current;
        }

        let a = alpha.get();
        let cur = &mut self.current;

        cur.pitch_deg = angles.step(cur.pitch_deg, target.pitch_deg, a);
        cur.roll_deg = angles.step(cur.roll_deg, target.roll_deg, a);
        cur.heading_deg = angles.step(cur.heading_deg, target.heading_deg, a);

        cur.position.east += (target.position.east - cur.position.east) * a;
        cur.position.up += (target.position.up - cur.position.up) * a;
        cur.position.north += (target.position.north - cur.position.north) * a;

        *cur
    }
}

/// Per-entity temporal pose filter.
#[derive(Debug, Clone, Default)]
pub struct PoseSmoother {
    alpha: BlendFactor,
    angles: AngleBlend,
    entities: HashMap<EntityId, SmoothedEntityState>,
}

impl PoseSmoother {
    pub fn new(alpha: BlendFactor, angles: AngleBlend) -> Self {
        Self {
            alpha,
            angles,
            entities: HashMap::new(),
        }
    }

    pub fn blend_factor(&self) -> BlendFactor {
        self.alpha
    }

    pub fn angle_blend(&self) -> AngleBlend {
        self.angles
    }

    /// Runs the once-per-frame update for `entity`.
    ///
    /// State is created on the first call for an unseen id. When `trail` is
    /// given (trail recording enabled) the resulting position is appended to
    /// it; this is the only place trails are sampled.
    pub fn update(
        &mut self,
        entity: EntityId,
        target: &Pose,
        trail: Option<&mut TrailRecorder>,
    ) -> Pose {
        let state = self
            .entities
            .entry(entity)
            .or_insert_with(SmoothedEntityState::uninitialized);
        let pose = state.step(target, self.alpha, self.angles);

        if let Some(trail) = trail {
            trail.record(pose.position);
        }

        pose
    }

    /// Current smoothed pose, if the entity has had its bootstrap frame.
    pub fn current(&self, entity: &EntityId) -> Option<Pose> {
        self.entities
            .get(entity)
            .filter(|s| s.is_initialized())
            .map(|s| *s.current())
    }

    pub fn state(&self, entity: &EntityId) -> Option<&SmoothedEntityState> {
        self.entities.get(entity)
    }

    /// Destroys the state of an entity that is no longer tracked.
    pub fn remove(&mut self, entity: &EntityId) -> Option<SmoothedEntityState> {
        self.entities.remove(entity)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
