//! Simulated model loader on the virtual clock.

use async_trait::async_trait;
use locview_env::{AssetFormat, EnvError, LoadedModel, LocViewContext, ModelLoader};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::context::SimContext;

/// Resolves model URLs after a virtual delay.
///
/// The loader never advances the clock itself; it yields until the driver
/// has moved virtual time past its deadline. URLs marked missing fail.
pub struct SimModelLoader {
    context: Arc<SimContext>,
    default_delay: Duration,
    delays: HashMap<String, Duration>,
    missing: HashSet<String>,
}

impl SimModelLoader {
    pub fn new(context: Arc<SimContext>, default_delay: Duration) -> Self {
        Self {
            context,
            default_delay,
            delays: HashMap::new(),
            missing: HashSet::new(),
        }
    }

    /// Overrides the delay for one URL.
    pub fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    /// Makes loads of `url` fail.
    pub fn with_missing(mut self, url: &str) -> Self {
        self.missing.insert(url.to_string());
        self
    }
}

#[async_trait]
impl ModelLoader for SimModelLoader {
    async fn load(&self, url: &str, format: AssetFormat) -> Result<LoadedModel, EnvError> {
        let delay = self.delays.get(url).copied().unwrap_or(self.default_delay);
        let deadline = self.context.now() + delay;

        while self.context.now() < deadline {
            tokio::task::yield_now().await;
        }

        if self.missing.contains(url) {
            return Err(EnvError::load_failed(url, "not found"));
        }

        // payload stands in for the file bytes
        Ok(LoadedModel::new(url, format, url.as_bytes().to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_waits_for_virtual_time() {
        let ctx = SimContext::shared(1);
        let loader = Arc::new(SimModelLoader::new(Arc::clone(&ctx), Duration::from_millis(100)));

        let task = {
            let loader = Arc::clone(&loader);
            tokio::spawn(async move { loader.load("/robot.glb", AssetFormat::Gltf).await })
        };

        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert!(!task.is_finished());

        ctx.advance_time(Duration::from_millis(100));
        let model = task.await.unwrap().unwrap();
        assert_eq!(model.url, "/robot.glb");
    }

    #[tokio::test]
    async fn test_missing_url_fails() {
        let ctx = SimContext::shared(1);
        let loader = SimModelLoader::new(ctx, Duration::ZERO).with_missing("/gone.stl");

        assert!(loader.load("/gone.stl", AssetFormat::Stl).await.is_err());
        assert!(loader.load("/here.stl", AssetFormat::Stl).await.is_ok());
    }
}
