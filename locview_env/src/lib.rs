//! LocView Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" abstraction allowing the LocView scene
//! runtime to run against a **Production** (tokio) environment or a
//! **Simulation** (virtual clock) environment.
//!
//! # Core Concept
//!
//! Everything that suspends or depends on the outside world is intercepted:
//! - Time (`now()`, `sleep()`)
//! - Background work (`spawn()`), used for asynchronous model loading
//! - Model retrieval (`ModelLoader::load()`)
//!
//! The scene runtime itself is single-threaded and cooperative: a render tick
//! never blocks on a load, it only observes completed ones.
//!
//! # Example
//!
//! ```ignore
//! use locview_env::{LocViewContext, TokioContext};
//!
//! async fn frame_loop<Ctx: LocViewContext>(ctx: &Ctx) {
//!     loop {
//!         render_tick();
//!         ctx.sleep(Duration::from_millis(16)).await;
//!     }
//! }
//! ```

mod context;
mod error;
mod loader;
mod tokio_impl;
mod types;

pub use context::LocViewContext;
pub use error::EnvError;
pub use loader::{FsModelLoader, ModelLoader};
pub use tokio_impl::TokioContext;
pub use types::{AssetFormat, EntityId, LoadedModel};
