//! Geographic to local-frame conversion.
//!
//! Uses an equirectangular local-tangent-plane approximation around a root
//! coordinate. Good for offsets up to a few kilometers; east scale becomes
//! ill-conditioned near the poles and flat-earth error grows with the square
//! of the distance from the root. Neither is corrected here.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Earth radius used by the local projection, in meters.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// A WGS84-style geographic position in degrees and meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

impl GeoCoordinate {
    pub const fn new(latitude_deg: f64, longitude_deg: f64, altitude_m: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
            altitude_m,
        }
    }

    /// Returns the coordinate displaced by the given metric offsets.
    ///
    /// This is the exact inverse of [`to_local`] with `self` as the root, so
    /// `to_local(root, root.offset_by(n, e, u))` yields `(e, u, -n)`.
    pub fn offset_by(&self, north_m: f64, east_m: f64, up_m: f64) -> Self {
        let lat0 = self.latitude_deg.to_radians();
        let d_lat = north_m / EARTH_RADIUS_M;
        let d_lon = east_m / (EARTH_RADIUS_M * lat0.cos());

        Self {
            latitude_deg: self.latitude_deg + d_lat.to_degrees(),
            longitude_deg: self.longitude_deg + d_lon.to_degrees(),
            altitude_m: self.altitude_m + up_m,
        }
    }
}

/// A position in the scene's local Cartesian frame, in meters.
///
/// Right-handed with `up` as the vertical axis. `north` holds the *negated*
/// geographic northing because the renderer's forward axis points south.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LocalPosition {
    pub east: f64,
    pub up: f64,
    pub north: f64,
}

impl LocalPosition {
    pub const ORIGIN: Self = Self {
        east: 0.0,
        up: 0.0,
        north: 0.0,
    };

    pub const fn new(east: f64, up: f64, north: f64) -> Self {
        Self { east, up, north }
    }

    /// Renderer-space vector `(x, y, z) = (east, up, north)`.
    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.east, self.up, self.north)
    }

    pub fn from_vector(v: &Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }

    /// Euclidean distance in meters.
    pub fn distance_to(&self, other: &LocalPosition) -> f64 {
        (other.to_vector() - self.to_vector()).norm()
    }

    pub fn midpoint(&self, other: &LocalPosition) -> LocalPosition {
        LocalPosition::from_vector(&((self.to_vector() + other.to_vector()) * 0.5))
    }

    /// The same position raised by `meters` along the up axis.
    pub fn raised(&self, meters: f64) -> LocalPosition {
        LocalPosition::new(self.east, self.up + meters, self.north)
    }

    pub fn as_f32(&self) -> [f32; 3] {
        [self.east as f32, self.up as f32, self.north as f32]
    }
}

/// Converts `point` into the local frame anchored at `root`.
///
/// Pure and total for finite inputs.
pub fn to_local(root: &GeoCoordinate, point: &GeoCoordinate) -> LocalPosition {
    let d_lat = (point.latitude_deg - root.latitude_deg).to_radians();
    let d_lon = (point.longitude_deg - root.longitude_deg).to_radians();
    let lat0 = root.latitude_deg.to_radians();

    let east = d_lon * lat0.cos() * EARTH_RADIUS_M;
    let north = d_lat * EARTH_RADIUS_M;
    let up = point.altitude_m - root.altitude_m;

    LocalPosition {
        east,
        up,
        north: -north,
    }
}
