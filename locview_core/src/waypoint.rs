//! Static geographic waypoints and their scene markers.

use crate::error::SceneError;
use crate::geo::{to_local, GeoCoordinate, LocalPosition};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sphere marker radius for `Object` waypoints.
pub const SPHERE_RADIUS: f64 = 0.2;

/// Cube marker edge length for `Structure` waypoints.
pub const CUBE_EDGE: f64 = 0.3;

/// Height of the label above the marker center.
pub const LABEL_OFFSET: f64 = 0.4;

/// Kind of a waypoint. Closed set; parsing anything else fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaypointKind {
    Object,
    Structure,
}

impl FromStr for WaypointKind {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "object" => Ok(Self::Object),
            "structure" => Ok(Self::Structure),
            other => Err(SceneError::InvalidWaypointKind(other.to_string())),
        }
    }
}

impl fmt::Display for WaypointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object => write!(f, "object"),
            Self::Structure => write!(f, "structure"),
        }
    }
}

/// An externally supplied point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub name: String,
    pub kind: WaypointKind,
    /// `#rrggbb`
    pub marker_color: String,
    pub position: GeoCoordinate,
}

impl Waypoint {
    /// Builds a waypoint from raw fields, validating kind and color.
    pub fn new(
        name: impl Into<String>,
        kind: &str,
        marker_color: impl Into<String>,
        position: GeoCoordinate,
    ) -> Result<Self, SceneError> {
        let marker_color = marker_color.into();
        parse_hex_color(&marker_color)?;
        Ok(Self {
            name: name.into(),
            kind: kind.parse()?,
            marker_color,
            position,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum MarkerShape {
    Sphere { radius: f64 },
    Cube { edge: f64 },
}

impl From<WaypointKind> for MarkerShape {
    fn from(kind: WaypointKind) -> Self {
        match kind {
            WaypointKind::Object => MarkerShape::Sphere { radius: SPHERE_RADIUS },
            WaypointKind::Structure => MarkerShape::Cube { edge: CUBE_EDGE },
        }
    }
}

/// Renderable marker derived from a waypoint and the current root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointMarker {
    pub shape: MarkerShape,
    pub local_position: LocalPosition,
    pub label: String,
    pub color: [f32; 3],
    pub label_anchor: LocalPosition,
}

/// Places a waypoint in the local frame anchored at `root`.
///
/// Stateless. Fails only when the marker color is malformed.
pub fn place(waypoint: &Waypoint, root: &GeoCoordinate) -> Result<WaypointMarker, SceneError> {
    let local_position = to_local(root, &waypoint.position);
    Ok(WaypointMarker {
        shape: waypoint.kind.into(),
        local_position,
        label: waypoint.name.clone(),
        color: parse_hex_color(&waypoint.marker_color)?,
        label_anchor: local_position.raised(LABEL_OFFSET),
    })
}

/// Parses `#rrggbb` into linear [0, 1] RGB.
pub fn parse_hex_color(color: &str) -> Result<[f32; 3], SceneError> {
    let invalid = || SceneError::InvalidMarkerColor(color.to_string());

    let hex = color.strip_prefix('#').ok_or_else(invalid)?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let mut rgb = [0.0f32; 3];
    for (i, channel) in rgb.iter_mut().enumerate() {
        let byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        *channel = f32::from(byte) / 255.0;
    }
    Ok(rgb)
}

/// Parses a JSON array of waypoints.
///
/// Unknown kinds are rejected by deserialization; colors are checked after.
pub fn waypoints_from_json(json: &str) -> Result<Vec<Waypoint>, SceneError> {
    let waypoints: Vec<Waypoint> = serde_json::from_str(json)?;
    for waypoint in &waypoints {
        parse_hex_color(&waypoint.marker_color)?;
    }
    Ok(waypoints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const ROOT: GeoCoordinate = GeoCoordinate::new(37.7749, -122.4194, 0.0);

    #[test]
    fn test_kind_parse_is_closed() {
        assert_eq!("object".parse::<WaypointKind>().unwrap(), WaypointKind::Object);
        assert_eq!("structure".parse::<WaypointKind>().unwrap(), WaypointKind::Structure);
        assert!(matches!(
            "tree".parse::<WaypointKind>(),
            Err(SceneError::InvalidWaypointKind(k)) if k == "tree"
        ));
    }

    #[test]
    fn test_shape_per_kind() {
        assert_eq!(MarkerShape::from(WaypointKind::Object), MarkerShape::Sphere { radius: 0.2 });
        assert_eq!(MarkerShape::from(WaypointKind::Structure), MarkerShape::Cube { edge: 0.3 });
    }

    #[test]
    fn test_place_at_root_offset() {
        let waypoint = Waypoint::new("Tower", "structure", "#00ff00", ROOT.offset_by(10.0, 0.0, 2.0)).unwrap();
        let marker = place(&waypoint, &ROOT).unwrap();

        assert_eq!(marker.label, "Tower");
        assert_relative_eq!(marker.local_position.north, -10.0, epsilon = 1e-6);
        assert_relative_eq!(marker.local_position.up, 2.0, epsilon = 1e-9);
        assert_relative_eq!(marker.label_anchor.up, 2.4, epsilon = 1e-9);
        assert_eq!(marker.color, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_hex_color_validation() {
        assert_eq!(parse_hex_color("#ff0000").unwrap(), [1.0, 0.0, 0.0]);
        assert!(parse_hex_color("ff0000").is_err());
        assert!(parse_hex_color("#ff00").is_err());
        assert!(parse_hex_color("#gg0000").is_err());
    }

    #[test]
    fn test_waypoints_from_json() {
        let json = r##"[
            {"name": "Crate", "kind": "object", "marker_color": "#ff8800",
             "position": {"latitude_deg": 37.7749, "longitude_deg": -122.4194, "altitude_m": 0.0}}
        ]"##;
        let waypoints = waypoints_from_json(json).unwrap();

        assert_eq!(waypoints.len(), 1);
        assert_eq!(waypoints[0].kind, WaypointKind::Object);
    }

    #[test]
    fn test_waypoints_from_json_rejects_unknown_kind() {
        let json = r##"[
            {"name": "Lamp", "kind": "light", "marker_color": "#ffffff",
             "position": {"latitude_deg": 0.0, "longitude_deg": 0.0, "altitude_m": 0.0}}
        ]"##;

        assert!(matches!(waypoints_from_json(json), Err(SceneError::Waypoints(_))));
    }
}
