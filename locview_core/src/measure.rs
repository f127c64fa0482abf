//! The "MEASURE" Engine - ray picking and the two-point selection
//!
//! Turns a pointer click into a point in the local frame:
//!
//! ```text
//!   screen px ──Viewport──▶ NDC ──PickCamera──▶ Ray
//!                                                │
//!                      ┌─────────────────────────┴──────────┐
//!                      ▼                                    ▼
//!            scene nearest hit?  ──none──▶  ground plane (up = 0), t > 0?
//!                      │                                    │
//!                      └────────────▶ LocalPosition ◀───────┘
//!                                          │
//!                                          ▼
//!                          MeasurementPointSet (2 slots, FIFO)
//! ```
//!
//! Degenerate rays (parallel to the ground, or pointing away from it) yield
//! no point. That is not an error.

use crate::error::SceneError;
use crate::geo::LocalPosition;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A half-line in renderer space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vector3<f64>,
    pub direction: Vector3<f64>,
}

impl Ray {
    pub fn new(origin: Vector3<f64>, direction: Vector3<f64>) -> Self {
        Self { origin, direction }
    }

    /// Point at parameter `t` along the ray.
    pub fn at(&self, t: f64) -> Vector3<f64> {
        self.origin + self.direction * t
    }

    /// Intersection with the horizontal plane `up = 0`.
    ///
    /// `None` when the ray is exactly parallel to the plane or the plane is
    /// not strictly ahead of the origin (`t <= 0`).
    pub fn intersect_ground_plane(&self) -> Option<LocalPosition> {
        if self.direction.y == 0.0 {
            return None;
        }
        let t = -self.origin.y / self.direction.y;
        if t > 0.0 {
            Some(LocalPosition::from_vector(&self.at(t)))
        } else {
            None
        }
    }
}

/// Pointer position in viewport pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Normalized device coordinates, both axes in [-1, 1], y up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ndc {
    pub x: f64,
    pub y: f64,
}

/// Size of the render surface in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    width: f64,
    height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Result<Self, SceneError> {
        if width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite() {
            Ok(Self { width, height })
        } else {
            Err(SceneError::InvalidViewport { width, height })
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }

    pub fn to_ndc(&self, screen: ScreenPoint) -> Ndc {
        Ndc {
            x: 2.0 * screen.x / self.width - 1.0,
            y: 1.0 - 2.0 * screen.y / self.height,
        }
    }
}

/// Anything that can produce a pick ray through a point in NDC.
pub trait PickCamera {
    fn ray_through(&self, ndc: Ndc) -> Ray;
}

/// Orthonormal (forward, right, up) basis looking from `position` at `target`.
///
/// A straight-down view uses renderer -z (north) as screen up.
fn look_at_basis(position: &Vector3<f64>, target: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
    let forward = (target - position)
        .try_normalize(f64::EPSILON)
        .unwrap_or_else(|| -Vector3::z());

    let right = forward
        .cross(&Vector3::y())
        .try_normalize(1e-9)
        .or_else(|| forward.cross(&-Vector3::z()).try_normalize(1e-9))
        .unwrap_or_else(Vector3::x);

    let up = right.cross(&forward);
    (forward, right, up)
}

/// Perspective camera, the default 3D view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub position: Vector3<f64>,
    pub target: Vector3<f64>,
    pub fov_y_deg: f64,
    pub aspect: f64,
}

impl PerspectiveCamera {
    pub fn new(position: Vector3<f64>, target: Vector3<f64>, fov_y_deg: f64, aspect: f64) -> Self {
        Self {
            position,
            target,
            fov_y_deg,
            aspect,
        }
    }

    /// View from (10, 15, 10) toward the root with a 50° vertical FOV.
    pub fn default_view(aspect: f64) -> Self {
        Self::new(Vector3::new(10.0, 15.0, 10.0), Vector3::zeros(), 50.0, aspect)
    }
}

impl PickCamera for PerspectiveCamera {
    fn ray_through(&self, ndc: Ndc) -> Ray {
        let (forward, right, up) = look_at_basis(&self.position, &self.target);
        let tan_half = (self.fov_y_deg.to_radians() * 0.5).tan();

        let direction = forward + right * (ndc.x * tan_half * self.aspect) + up * (ndc.y * tan_half);
        Ray::new(self.position, direction.normalize())
    }
}

/// Orthographic camera, the top-down 2D view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthographicCamera {
    pub position: Vector3<f64>,
    pub target: Vector3<f64>,
    /// Half the visible width in meters
    pub half_width: f64,
    /// Half the visible height in meters
    pub half_height: f64,
}

impl OrthographicCamera {
    pub fn new(position: Vector3<f64>, target: Vector3<f64>, half_width: f64, half_height: f64) -> Self {
        Self {
            position,
            target,
            half_width,
            half_height,
        }
    }

    /// Straight-down view from (0, 15, 0).
    pub fn top_down(half_width: f64, half_height: f64) -> Self {
        Self::new(Vector3::new(0.0, 15.0, 0.0), Vector3::zeros(), half_width, half_height)
    }
}

impl PickCamera for OrthographicCamera {
    fn ray_through(&self, ndc: Ndc) -> Ray {
        let (forward, right, up) = look_at_basis(&self.position, &self.target);
        let origin = self.position + right * (ndc.x * self.half_width) + up * (ndc.y * self.half_height);
        Ray::new(origin, forward)
    }
}

/// Nearest-intersection query supplied by whatever holds scene geometry.
pub trait SceneIntersector {
    fn nearest_hit(&self, ray: &Ray) -> Option<LocalPosition>;
}

impl<F> SceneIntersector for F
where
    F: Fn(&Ray) -> Option<LocalPosition>,
{
    fn nearest_hit(&self, ray: &Ray) -> Option<LocalPosition> {
        self(ray)
    }
}

/// A scene with no pickable geometry; every pick falls back to the ground.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyScene;

impl SceneIntersector for EmptyScene {
    fn nearest_hit(&self, _ray: &Ray) -> Option<LocalPosition> {
        None
    }
}

/// Up to two measurement points, oldest first.
///
/// Two fixed slots; a third push evicts the oldest.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MeasurementPointSet {
    slots: [Option<LocalPosition>; 2],
}

impl MeasurementPointSet {
    pub const CAPACITY: usize = 2;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, point: LocalPosition) {
        match self.slots {
            [None, _] => self.slots[0] = Some(point),
            [Some(_), None] => self.slots[1] = Some(point),
            [Some(_), Some(newer)] => self.slots = [Some(newer), Some(point)],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots[0].is_none()
    }

    /// Both points, when the set is full.
    pub fn pair(&self) -> Option<(LocalPosition, LocalPosition)> {
        match self.slots {
            [Some(a), Some(b)] => Some((a, b)),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocalPosition> {
        self.slots.iter().flatten()
    }

    pub fn clear(&mut self) {
        self.slots = [None, None];
    }
}

/// Converts pointer positions into picked points.
#[derive(Debug, Clone, Copy)]
pub struct MeasurementPicker {
    viewport: Viewport,
}

impl MeasurementPicker {
    pub fn new(viewport: Viewport) -> Self {
        Self { viewport }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Picks the scene's nearest hit along the pointer ray, falling back to
    /// the ground plane.
    pub fn pick<C, S>(&self, screen: ScreenPoint, camera: &C, scene: &S) -> Option<LocalPosition>
    where
        C: PickCamera + ?Sized,
        S: SceneIntersector + ?Sized,
    {
        let ray = camera.ray_through(self.viewport.to_ndc(screen));

        if let Some(hit) = scene.nearest_hit(&ray) {
            return Some(hit);
        }

        let fallback = ray.intersect_ground_plane();
        if fallback.is_none() {
            debug!("Pick ray never reaches the ground plane: {:?}", ray);
        }
        fallback
    }
}

/// Measurement mode plus the current selection.
///
/// Clicks are ignored entirely while the mode is off.
#[derive(Debug, Clone)]
pub struct MeasurementSession {
    enabled: bool,
    points: MeasurementPointSet,
    picker: MeasurementPicker,
}

impl MeasurementSession {
    pub fn new(picker: MeasurementPicker) -> Self {
        Self {
            enabled: false,
            points: MeasurementPointSet::new(),
            picker,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turning the mode off keeps the current points.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn points(&self) -> &MeasurementPointSet {
        &self.points
    }

    pub fn picker_mut(&mut self) -> &mut MeasurementPicker {
        &mut self.picker
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Handles one click and returns the new point set if a point was picked.
    pub fn handle_click<C, S>(&mut self, screen: ScreenPoint, camera: &C, scene: &S) -> Option<MeasurementPointSet>
    where
        C: PickCamera + ?Sized,
        S: SceneIntersector + ?Sized,
    {
        if !self.enabled {
            return None;
        }
        let point = self.picker.pick(screen, camera, scene)?;
        self.points.push(point);
        Some(self.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use std::cell::Cell;

    fn viewport() -> Viewport {
        Viewport::new(800.0, 600.0).unwrap()
    }

    fn p(e: f64) -> LocalPosition {
        LocalPosition::new(e, 0.0, 0.0)
    }

    #[test]
    fn test_straight_down_ray_hits_origin() {
        let ray = Ray::new(Vector3::new(0.0, 10.0, 0.0), Vector3::new(0.0, -1.0, 0.0));
        assert_eq!(ray.intersect_ground_plane(), Some(LocalPosition::ORIGIN));
    }

    #[test]
    fn test_upward_ray_misses_ground() {
        let ray = Ray::new(Vector3::new(0.0, 10.0, 0.0), Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(ray.intersect_ground_plane(), None);
    }

    #[test]
    fn test_parallel_ray_misses_ground() {
        let ray = Ray::new(Vector3::new(0.0, 10.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(ray.intersect_ground_plane(), None);
    }

    #[test]
    fn test_origin_on_plane_is_not_ahead() {
        let ray = Ray::new(Vector3::zeros(), Vector3::new(0.0, -1.0, 0.0));
        assert_eq!(ray.intersect_ground_plane(), None);
    }

    #[test]
    fn test_viewport_rejects_degenerate_size() {
        assert!(Viewport::new(0.0, 600.0).is_err());
        assert!(Viewport::new(800.0, -1.0).is_err());
    }

    #[test]
    fn test_to_ndc_corners() {
        let vp = viewport();
        let center = vp.to_ndc(ScreenPoint::new(400.0, 300.0));
        let top_left = vp.to_ndc(ScreenPoint::new(0.0, 0.0));
        let bottom_right = vp.to_ndc(ScreenPoint::new(800.0, 600.0));

        assert_relative_eq!(center.x, 0.0);
        assert_relative_eq!(center.y, 0.0);
        assert_relative_eq!(top_left.x, -1.0);
        assert_relative_eq!(top_left.y, 1.0);
        assert_relative_eq!(bottom_right.x, 1.0);
        assert_relative_eq!(bottom_right.y, -1.0);
    }

    #[test]
    fn test_top_down_center_click_picks_root() {
        let picker = MeasurementPicker::new(viewport());
        let camera = OrthographicCamera::top_down(10.0, 7.5);

        let point = picker
            .pick(ScreenPoint::new(400.0, 300.0), &camera, &EmptyScene)
            .unwrap();

        assert_relative_eq!(point.east, 0.0, epsilon = 1e-9);
        assert_relative_eq!(point.up, 0.0, epsilon = 1e-9);
        assert_relative_eq!(point.north, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_top_down_screen_up_is_north() {
        let picker = MeasurementPicker::new(viewport());
        let camera = OrthographicCamera::top_down(10.0, 7.5);

        // upper edge center of the screen
        let point = picker
            .pick(ScreenPoint::new(400.0, 0.0), &camera, &EmptyScene)
            .unwrap();

        assert_relative_eq!(point.east, 0.0, epsilon = 1e-9);
        assert_relative_eq!(point.north, -7.5, epsilon = 1e-9);
    }

    #[test]
    fn test_perspective_center_ray_reaches_target() {
        let picker = MeasurementPicker::new(viewport());
        let camera = PerspectiveCamera::default_view(viewport().aspect());

        let point = picker
            .pick(ScreenPoint::new(400.0, 300.0), &camera, &EmptyScene)
            .unwrap();

        assert_relative_eq!(point.east, 0.0, epsilon = 1e-9);
        assert_relative_eq!(point.north, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_scene_hit_wins_over_ground() {
        let picker = MeasurementPicker::new(viewport());
        let camera = OrthographicCamera::top_down(10.0, 7.5);
        let roof = |_: &Ray| -> Option<LocalPosition> { Some(LocalPosition::new(0.0, 3.0, 0.0)) };

        let point = picker.pick(ScreenPoint::new(400.0, 300.0), &camera, &roof);

        assert_eq!(point, Some(LocalPosition::new(0.0, 3.0, 0.0)));
    }

    #[test]
    fn test_three_pushes_keep_last_two() {
        let mut set = MeasurementPointSet::new();
        assert!(set.is_empty());

        set.push(p(1.0));
        assert_eq!(set.len(), 1);
        assert!(set.pair().is_none());

        set.push(p(2.0));
        set.push(p(3.0));

        assert_eq!(set.pair(), Some((p(2.0), p(3.0))));
        let order: Vec<f64> = set.iter().map(|p| p.east).collect();
        assert_eq!(order, vec![2.0, 3.0]);
    }

    #[test]
    fn test_disabled_session_ignores_clicks() {
        let mut session = MeasurementSession::new(MeasurementPicker::new(viewport()));
        let calls = Cell::new(0);
        let counting = |_: &Ray| -> Option<LocalPosition> {
            calls.set(calls.get() + 1);
            None
        };
        let camera = OrthographicCamera::top_down(10.0, 7.5);

        let changed = session.handle_click(ScreenPoint::new(400.0, 300.0), &camera, &counting);

        assert!(changed.is_none());
        assert!(session.points().is_empty());
        // no picking computation either
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_enabled_session_notifies_on_pick() {
        let mut session = MeasurementSession::new(MeasurementPicker::new(viewport()));
        session.set_enabled(true);
        let camera = OrthographicCamera::top_down(10.0, 7.5);

        let changed = session.handle_click(ScreenPoint::new(400.0, 300.0), &camera, &EmptyScene);
        assert_eq!(changed.map(|s| s.len()), Some(1));

        session.set_enabled(false);
        assert_eq!(session.points().len(), 1);

        session.clear();
        assert!(session.points().is_empty());
    }

    #[test]
    fn test_missed_pick_does_not_notify() {
        let mut session = MeasurementSession::new(MeasurementPicker::new(viewport()));
        session.set_enabled(true);
        // camera below the ground looking down never reaches it
        let camera = OrthographicCamera::new(Vector3::new(0.0, -5.0, 0.0), Vector3::new(0.0, -10.0, 0.0), 1.0, 1.0);

        assert!(session
            .handle_click(ScreenPoint::new(400.0, 300.0), &camera, &EmptyScene)
            .is_none());
        assert!(session.points().is_empty());
    }

    proptest! {
        #[test]
        fn prop_point_set_keeps_newest_two(count in 0usize..32) {
            let mut set = MeasurementPointSet::new();
            for i in 0..count {
                set.push(p(i as f64));
                prop_assert!(set.len() <= MeasurementPointSet::CAPACITY);
            }

            let expected: Vec<f64> = (count.saturating_sub(2)..count).map(|i| i as f64).collect();
            let kept: Vec<f64> = set.iter().map(|p| p.east).collect();
            prop_assert_eq!(kept, expected);
        }
    }
}
