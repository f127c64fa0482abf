//! Asynchronous model loading with stale-result suppression.
//!
//! Loads run as background tasks spawned through the context. Each request
//! gets a fresh generation number; completions travel back over a channel
//! and are applied only if their generation is still the entity's current
//! one.
//!
//! ```text
//! request(e, url_a) ──▶ gen 1 ──spawn──▶ load(url_a) ···············┐
//! request(e, url_b) ──▶ gen 2 ──spawn──▶ load(url_b) ──┐   (aborted  │
//!                        (gen 1 task aborted)          │   or late)  │
//! poll()  ◀── completion(gen 2) ◀──────────────────────┘             │
//!         ◀── completion(gen 1) ◀── discarded as stale ◀─────────────┘
//! ```
//!
//! Failures never propagate: unsupported extensions and failed loads both
//! resolve to [`Renderable::Placeholder`].

use locview_env::{AssetFormat, EntityId, EnvError, LoadedModel, LocViewContext, ModelLoader};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Edge length of the placeholder box, in meters.
pub const PLACEHOLDER_SIZE: f64 = 1.0;

/// Placeholder wireframe color (red), linear RGB.
pub const PLACEHOLDER_COLOR_RGB: [f32; 3] = [1.0, 0.0, 0.0];

/// What the renderer should draw for an entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Renderable {
    Model(LoadedModel),
    /// 1x1x1 red wireframe box
    Placeholder,
}

impl Renderable {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Renderable::Placeholder)
    }
}

/// Notification that an entity's model request settled.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetResolved {
    pub entity: EntityId,
    pub url: String,
    pub placeholder: bool,
}

struct Completion {
    entity: EntityId,
    generation: u64,
    result: Result<LoadedModel, EnvError>,
}

struct AssetSlot {
    url: String,
    generation: u64,
    task: Option<JoinHandle<()>>,
    renderable: Option<Renderable>,
}

impl AssetSlot {
    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Owns the current model request of every entity.
pub struct AssetManager<Ctx, L>
where
    Ctx: LocViewContext,
    L: ModelLoader,
{
    context: Arc<Ctx>,
    loader: Arc<L>,
    slots: HashMap<EntityId, AssetSlot>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    /// Resolutions not yet returned by `poll`
    ready: Vec<AssetResolved>,
    next_generation: u64,
}

impl<Ctx, L> AssetManager<Ctx, L>
where
    Ctx: LocViewContext,
    L: ModelLoader,
{
    pub fn new(context: Arc<Ctx>, loader: Arc<L>) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            context,
            loader,
            slots: HashMap::new(),
            completions_tx,
            completions_rx,
            ready: Vec::new(),
            next_generation: 0,
        }
    }

    /// Requests `url` as the model for `entity`.
    ///
    /// Re-requesting the current URL is a no-op. A different URL supersedes
    /// the previous request: its task is aborted and any late result is
    /// ignored. The entity renders nothing until the new request settles.
    pub fn request(&mut self, entity: EntityId, url: &str) {
        if let Some(slot) = self.slots.get_mut(&entity) {
            if slot.url == url {
                return;
            }
            slot.abort();
        }

        self.next_generation += 1;
        let generation = self.next_generation;

        let format = match AssetFormat::resolve(url) {
            Ok(format) => format,
            Err(e) => {
                warn!("{} for {}, using placeholder", e, entity);
                self.slots.insert(
                    entity,
                    AssetSlot {
                        url: url.to_string(),
                        generation,
                        task: None,
                        renderable: Some(Renderable::Placeholder),
                    },
                );
                self.ready.push(AssetResolved {
                    entity,
                    url: url.to_string(),
                    placeholder: true,
                });
                return;
            }
        };

        debug!("Loading {} model for {}: {}", format, entity, url);

        let loader = Arc::clone(&self.loader);
        let tx = self.completions_tx.clone();
        let load_url = url.to_string();
        let task = self.context.spawn(&format!("load-{}", entity), async move {
            let result = loader.load(&load_url, format).await;
            // receiver lives as long as the manager
            let _ = tx.send(Completion {
                entity,
                generation,
                result,
            });
        });

        self.slots.insert(
            entity,
            AssetSlot {
                url: url.to_string(),
                generation,
                task: Some(task),
                renderable: None,
            },
        );
    }

    /// Applies finished loads and returns everything that resolved since
    /// the previous call.
    pub fn poll(&mut self) -> Vec<AssetResolved> {
        while let Ok(completion) = self.completions_rx.try_recv() {
            let Some(slot) = self
                .slots
                .get_mut(&completion.entity)
                .filter(|slot| slot.generation == completion.generation)
            else {
                debug!(
                    "Discarding stale load for {} (generation {})",
                    completion.entity, completion.generation
                );
                continue;
            };

            slot.task = None;
            let renderable = match completion.result {
                Ok(model) => {
                    info!("Loaded {} ({} bytes) for {}", model.url, model.size(), completion.entity);
                    Renderable::Model(model)
                }
                Err(e) => {
                    warn!("Model load failed for {}, using placeholder: {}", completion.entity, e);
                    Renderable::Placeholder
                }
            };

            self.ready.push(AssetResolved {
                entity: completion.entity,
                url: slot.url.clone(),
                placeholder: renderable.is_placeholder(),
            });
            slot.renderable = Some(renderable);
        }

        std::mem::take(&mut self.ready)
    }

    /// Current renderable, `None` while loading or when never requested.
    pub fn renderable(&self, entity: &EntityId) -> Option<&Renderable> {
        self.slots.get(entity).and_then(|s| s.renderable.as_ref())
    }

    pub fn url(&self, entity: &EntityId) -> Option<&str> {
        self.slots.get(entity).map(|s| s.url.as_str())
    }

    /// Number of loads still running.
    pub fn in_flight(&self) -> usize {
        self.slots.values().filter(|s| s.task.is_some()).count()
    }

    /// Forgets the entity and aborts its load.
    pub fn remove(&mut self, entity: &EntityId) {
        if let Some(mut slot) = self.slots.remove(entity) {
            slot.abort();
        }
    }

    /// Aborts every in-flight load. Resolved renderables are kept.
    pub fn shutdown(&mut self) {
        for slot in self.slots.values_mut() {
            slot.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use locview_env::TokioContext;
    use std::time::Duration;

    /// Serves every URL after a per-URL delay; URLs containing "broken" fail.
    struct MockLoader;

    fn delay_for(url: &str) -> Duration {
        if url.contains("slow") {
            Duration::from_millis(500)
        } else {
            Duration::from_millis(10)
        }
    }

    #[async_trait]
    impl ModelLoader for MockLoader {
        async fn load(&self, url: &str, format: AssetFormat) -> Result<LoadedModel, EnvError> {
            tokio::time::sleep(delay_for(url)).await;
            if url.contains("broken") {
                return Err(EnvError::load_failed(url, "corrupt"));
            }
            Ok(LoadedModel::new(url, format, vec![1, 2, 3]))
        }
    }

    fn manager() -> AssetManager<TokioContext, MockLoader> {
        AssetManager::new(TokioContext::shared(), Arc::new(MockLoader))
    }

    async fn settle(manager: &mut AssetManager<TokioContext, MockLoader>) -> Vec<AssetResolved> {
        let mut resolved = Vec::new();
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            resolved.extend(manager.poll());
            if manager.in_flight() == 0 {
                break;
            }
        }
        resolved
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_resolves_to_model() {
        let mut manager = manager();
        let id = EntityId::from_seed(1);

        manager.request(id, "/robot.glb");
        assert!(manager.renderable(&id).is_none());

        let resolved = settle(&mut manager).await;

        assert_eq!(resolved.len(), 1);
        assert!(!resolved[0].placeholder);
        assert!(matches!(manager.renderable(&id), Some(Renderable::Model(m)) if m.format == AssetFormat::Gltf));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_extension_is_placeholder_immediately() {
        let mut manager = manager();
        let id = EntityId::from_seed(2);

        manager.request(id, "/robot.ply");

        assert_eq!(manager.in_flight(), 0);
        assert_eq!(manager.renderable(&id), Some(&Renderable::Placeholder));
        let resolved = manager.poll();
        assert_eq!(resolved.len(), 1);
        assert!(resolved[0].placeholder);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_load_falls_back_to_placeholder() {
        let mut manager = manager();
        let id = EntityId::from_seed(3);

        manager.request(id, "/broken.stl");
        let resolved = settle(&mut manager).await;

        assert!(resolved[0].placeholder);
        assert_eq!(manager.renderable(&id), Some(&Renderable::Placeholder));
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_load_is_never_applied() {
        let mut manager = manager();
        let id = EntityId::from_seed(4);

        manager.request(id, "/slow.glb");
        manager.request(id, "/fast.obj");
        let resolved = settle(&mut manager).await;

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].url, "/fast.obj");

        // well past the slow load's delay
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(manager.poll().is_empty());
        assert!(matches!(manager.renderable(&id), Some(Renderable::Model(m)) if m.url == "/fast.obj"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_but_unpolled_result_is_stale() {
        let mut manager = manager();
        let id = EntityId::from_seed(5);

        manager.request(id, "/first.glb");
        // first load finishes and queues its completion
        tokio::time::sleep(Duration::from_millis(50)).await;

        manager.request(id, "/second.glb");
        let resolved = settle(&mut manager).await;

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].url, "/second.glb");
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_url_is_noop() {
        let mut manager = manager();
        let id = EntityId::from_seed(6);

        manager.request(id, "/robot.glb");
        manager.request(id, "/robot.glb");

        assert_eq!(manager.in_flight(), 1);
        assert_eq!(settle(&mut manager).await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_aborts_loads() {
        let mut manager = manager();
        let id = EntityId::from_seed(7);

        manager.request(id, "/slow.glb");
        manager.shutdown();

        assert_eq!(manager.in_flight(), 0);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(manager.poll().is_empty());
        assert!(manager.renderable(&id).is_none());
    }
}
