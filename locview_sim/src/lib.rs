//! LocView Deterministic Simulation Harness
//!
//! Runs the scene runtime headless against a virtual clock so a single
//! seed reproduces every frame.
//!
//! # Core Principle
//!
//! All sources of non-determinism are intercepted and controlled:
//! - **Time**: `SimContext` advances a virtual clock whenever the scene
//!   loop sleeps
//! - **Model loads**: `SimModelLoader` resolves after a virtual delay, or
//!   fails on demand
//! - **Telemetry**: feeds draw from ChaCha streams derived from the seed
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   ScenarioRunner                     │
//! │  ┌────────────┐   samples   ┌──────────────────────┐ │
//! │  │ Telemetry  │────────────►│     SceneRuntime     │ │
//! │  │   feeds    │   250 ms    │ smoothing · trails   │ │
//! │  └────────────┘             │ measurement · assets │ │
//! │                             └──────────┬───────────┘ │
//! │  ┌────────────┐  completions           │ frames      │
//! │  │ SimModel-  │──────────────┘         ▼             │
//! │  │  Loader    │              SimExport / RerunLogger │
//! │  └────────────┘                                      │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use locview_sim::ScenarioRunner;
//! use locview_sim::scenarios::ScenarioId;
//!
//! let runner = ScenarioRunner::new(42, 3).with_duration(5.0);
//! let result = runner.run(ScenarioId::RandomWalk);
//! assert!(result.passed);
//! ```

mod context;
mod exporter;
mod feed;
mod loader;
mod runner;
pub mod scenarios;
mod visualizer;

pub use context::SimContext;
pub use exporter::{SimEvent, SimExport};
pub use feed::{RandomWalkFeed, SpinFeed};
pub use loader::SimModelLoader;
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner, SimConfig};
pub use visualizer::RerunLogger;
