//! Model loading abstraction for LocView scenes.

use async_trait::async_trait;
use crate::error::EnvError;
use crate::types::{AssetFormat, LoadedModel};
use std::path::PathBuf;

/// Abstraction for retrieving 3D model assets.
///
/// # Implementations
///
/// - **Production**: `FsModelLoader` reads from a local asset directory
/// - **Simulation**: resolves after a virtual delay, with scripted failures
///
/// # Contract
///
/// ```text
/// Runtime                    Loader
///   |-- load(url, format) ---->|
///   |                          |-- [fetch + parse]
///   |<---- Ok(LoadedModel) ----|   or Err(EnvError) -> placeholder
/// ```
#[async_trait]
pub trait ModelLoader: Send + Sync + 'static {
    /// Loads the model at `url`, already resolved to `format`.
    ///
    /// # Returns
    /// * `Ok(LoadedModel)` - The model is ready to render
    /// * `Err(EnvError)` - Retrieval or parsing failed; the caller substitutes a placeholder
    async fn load(&self, url: &str, format: AssetFormat) -> Result<LoadedModel, EnvError>;
}

/// Loads models from a directory on the local filesystem.
///
/// URLs are interpreted as paths relative to `root`; a leading `/` is ignored.
pub struct FsModelLoader {
    root: PathBuf,
}

impl FsModelLoader {
    /// Creates a loader rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, url: &str) -> PathBuf {
        self.root.join(url.trim_start_matches('/'))
    }
}

#[async_trait]
impl ModelLoader for FsModelLoader {
    async fn load(&self, url: &str, format: AssetFormat) -> Result<LoadedModel, EnvError> {
        let path = self.resolve(url);
        let payload = tokio::fs::read(&path)
            .await
            .map_err(|e| EnvError::load_failed(url, e))?;

        if payload.is_empty() {
            return Err(EnvError::load_failed(url, "empty file"));
        }

        Ok(LoadedModel::new(url, format, payload))
    }
}
