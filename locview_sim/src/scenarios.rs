//! Simulation scenarios for the LocView scene core.

use locview_core::{GeoCoordinate, Waypoint, WaypointKind};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// LV-001: Random-walk telemetry through the full driver
    RandomWalk,

    /// LV-002: Heading target crossing the ±180° seam
    HeadingWrap,

    /// LV-003: Click picking against boxes and the ground plane
    Measurement,

    /// LV-004: Superseded, failed and unsupported model loads
    AssetSwap,

    /// LV-005: Trail toggling keeps history
    TrailToggle,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::RandomWalk,
            ScenarioId::HeadingWrap,
            ScenarioId::Measurement,
            ScenarioId::AssetSwap,
            ScenarioId::TrailToggle,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::RandomWalk => "random_walk",
            ScenarioId::HeadingWrap => "heading_wrap",
            ScenarioId::Measurement => "measurement",
            ScenarioId::AssetSwap => "asset_swap",
            ScenarioId::TrailToggle => "trail_toggle",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::RandomWalk => "Entities on a 250ms random walk, smoothed at 60 Hz with trails",
            ScenarioId::HeadingWrap => "Heading spins across ±180°, linear vs shortest-path blending",
            ScenarioId::Measurement => "Seeded clicks against boxes, ground and sky; 2-point FIFO and ruler",
            ScenarioId::AssetSwap => "Model URL swapped mid-load, plus failed and unsupported models",
            ScenarioId::TrailToggle => "Trail recording on, off, on again, then reset",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "random_walk" | "randomwalk" | "lv-001" => Ok(ScenarioId::RandomWalk),
            "heading_wrap" | "headingwrap" | "lv-002" => Ok(ScenarioId::HeadingWrap),
            "measurement" | "measure" | "lv-003" => Ok(ScenarioId::Measurement),
            "asset_swap" | "assetswap" | "lv-004" => Ok(ScenarioId::AssetSwap),
            "trail_toggle" | "trailtoggle" | "lv-005" => Ok(ScenarioId::TrailToggle),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

/// The demo waypoints, given as metric offsets from `root`.
pub fn demo_waypoints(root: &GeoCoordinate) -> Vec<Waypoint> {
    let at = |north: f64, east: f64| GeoCoordinate {
        altitude_m: 0.0,
        ..root.offset_by(north, east, 0.0)
    };

    vec![
        Waypoint {
            name: "Start".to_string(),
            kind: WaypointKind::Object,
            marker_color: "#00ff00".to_string(),
            position: at(5.0, 0.0),
        },
        Waypoint {
            name: "Target".to_string(),
            kind: WaypointKind::Structure,
            marker_color: "#ff0000".to_string(),
            position: at(-3.0, 6.0),
        },
        Waypoint {
            name: "Checkpoint".to_string(),
            kind: WaypointKind::Object,
            marker_color: "#0000ff".to_string(),
            position: at(10.0, 10.0),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
        }
        assert!("split_brain".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn test_every_scenario_is_described() {
        let all = ScenarioId::all();
        for scenario in &all {
            assert!(!scenario.description().is_empty(), "{} has no description", scenario);
        }
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.description(), b.description());
            }
        }
    }

    #[test]
    fn test_demo_waypoints_place_cleanly() {
        let root = GeoCoordinate::new(37.7749, -122.4194, 0.0);
        let waypoints = demo_waypoints(&root);

        assert_eq!(waypoints.len(), 3);
        for waypoint in &waypoints {
            assert!(locview_core::waypoint::place(waypoint, &root).is_ok());
        }
    }
}
