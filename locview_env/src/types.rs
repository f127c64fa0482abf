//! Common types for the LocView environment abstraction.

use crate::error::EnvError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a tracked entity (robot, vehicle, drone).
///
/// Uses UUID v4 for global uniqueness without coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Creates a new random EntityId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an EntityId from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Creates a deterministic EntityId from a seed (for simulation).
    pub fn from_seed(seed: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[0..8].copy_from_slice(&seed.to_le_bytes());
        bytes[8..16].copy_from_slice(&seed.wrapping_mul(0x517cc1b727220a95).to_le_bytes());
        Self(Uuid::from_bytes(bytes))
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show first 8 chars for readability
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// 3D model file formats the loaders understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetFormat {
    /// `.glb` / `.gltf`
    Gltf,
    /// `.stl` (geometry only, gets a neutral grey material)
    Stl,
    /// `.obj`
    Obj,
    /// `.fbx`
    Fbx,
}

impl AssetFormat {
    /// Resolves the format from the extension after the last `.` of the URL.
    ///
    /// Matching is case-insensitive. Returns `None` for anything else,
    /// including URLs without an extension.
    pub fn from_url(url: &str) -> Option<Self> {
        let (_, ext) = url.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "glb" | "gltf" => Some(Self::Gltf),
            "stl" => Some(Self::Stl),
            "obj" => Some(Self::Obj),
            "fbx" => Some(Self::Fbx),
            _ => None,
        }
    }

    /// Like [`AssetFormat::from_url`], failing with
    /// [`EnvError::UnsupportedFormat`] for unrecognized URLs.
    pub fn resolve(url: &str) -> Result<Self, EnvError> {
        Self::from_url(url).ok_or_else(|| EnvError::unsupported(url))
    }

    /// Returns the canonical extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gltf => "glb",
            Self::Stl => "stl",
            Self::Obj => "obj",
            Self::Fbx => "fbx",
        }
    }
}

impl std::fmt::Display for AssetFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// A model that a loader retrieved successfully.
///
/// The payload is opaque to the scene core; the renderer owns parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModel {
    /// URL the model was loaded from
    pub url: String,

    /// Resolved file format
    pub format: AssetFormat,

    /// Raw model bytes
    pub payload: Vec<u8>,
}

impl LoadedModel {
    /// Creates a new loaded model.
    pub fn new(url: impl Into<String>, format: AssetFormat, payload: Vec<u8>) -> Self {
        Self {
            url: url.into(),
            format,
            payload,
        }
    }

    /// Returns the payload size in bytes.
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_format_from_url() {
        assert_eq!(AssetFormat::from_url("/robot.glb"), Some(AssetFormat::Gltf));
        assert_eq!(AssetFormat::from_url("scene.GLTF"), Some(AssetFormat::Gltf));
        assert_eq!(AssetFormat::from_url("parts/arm.stl"), Some(AssetFormat::Stl));
        assert_eq!(AssetFormat::from_url("a.b.Obj"), Some(AssetFormat::Obj));
        assert_eq!(AssetFormat::from_url("rig.fbx"), Some(AssetFormat::Fbx));
        assert_eq!(AssetFormat::from_url("model.ply"), None);
        assert_eq!(AssetFormat::from_url("no_extension"), None);
    }

    #[test]
    fn test_resolve_reports_unsupported_url() {
        assert_eq!(AssetFormat::resolve("/robot.glb").unwrap(), AssetFormat::Gltf);

        let err = AssetFormat::resolve("/robot.ply").unwrap_err();
        assert!(matches!(&err, EnvError::UnsupportedFormat(url) if url == "/robot.ply"));
        assert_eq!(err.to_string(), "Unsupported asset format: /robot.ply");
    }

    #[test]
    fn test_entity_id_from_seed_is_deterministic() {
        assert_eq!(EntityId::from_seed(7), EntityId::from_seed(7));
        assert_ne!(EntityId::from_seed(7), EntityId::from_seed(8));
    }

    #[test]
    fn test_entity_id_display_is_short() {
        let id = EntityId::from_seed(1);
        assert_eq!(id.to_string().len(), 8);
    }
}
