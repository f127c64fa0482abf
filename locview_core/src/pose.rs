//! Entity pose in the local frame.

use crate::geo::LocalPosition;
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Position plus orientation of a rendered entity.
///
/// Angles are in degrees. Orientation is independent of position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: LocalPosition,
    pub pitch_deg: f64,
    pub roll_deg: f64,
    pub heading_deg: f64,
}

impl Pose {
    pub const fn new(position: LocalPosition, pitch_deg: f64, roll_deg: f64, heading_deg: f64) -> Self {
        Self {
            position,
            pitch_deg,
            roll_deg,
            heading_deg,
        }
    }

    /// Rotation in renderer space.
    ///
    /// Applied in XYZ Euler order with pitch about x (east), heading about
    /// y (up) and roll about z (the negated-north axis).
    pub fn rotation(&self) -> UnitQuaternion<f64> {
        let pitch = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), self.pitch_deg.to_radians());
        let heading = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), self.heading_deg.to_radians());
        let roll = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.roll_deg.to_radians());
        pitch * heading * roll
    }

    /// Unit vector the entity's nose points along (renderer -z rotated).
    pub fn forward(&self) -> Vector3<f64> {
        self.rotation() * -Vector3::z()
    }

    /// Largest per-axis deviation from `other`, position in meters and angles in degrees.
    pub fn max_axis_error(&self, other: &Pose) -> f64 {
        [
            self.position.east - other.position.east,
            self.position.up - other.position.up,
            self.position.north - other.position.north,
            self.pitch_deg - other.pitch_deg,
            self.roll_deg - other.roll_deg,
            self.heading_deg - other.heading_deg,
        ]
        .iter()
        .fold(0.0_f64, |acc, d| acc.max(d.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_pose_faces_forward() {
        let pose = Pose::default();
        let forward = pose.forward();

        assert_relative_eq!(forward.z, -1.0, epsilon = 1e-12);
        assert_relative_eq!(forward.x, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_heading_rotates_about_up_axis() {
        let pose = Pose::new(LocalPosition::ORIGIN, 0.0, 0.0, 90.0);
        let forward = pose.forward();

        // +90 about y turns -z into -x
        assert_relative_eq!(forward.x, -1.0, epsilon = 1e-12);
        assert_relative_eq!(forward.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_max_axis_error() {
        let a = Pose::new(LocalPosition::new(1.0, 0.0, 0.0), 0.0, 0.0, 10.0);
        let b = Pose::new(LocalPosition::new(0.0, 0.0, 0.0), 0.0, 0.0, 4.0);

        assert_relative_eq!(a.max_axis_error(&b), 6.0);
    }
}
