//! flow-playground
//!
//! A small physics playground on native and the web. It loads a glTF scene,
//! lays a static ground under it, drops a box and a sphere from above and
//! lights everything with a single shadow-casting directional light.
//! Clicking the box gives it a random colour.
//!
//! High-level modules
//! - `bootstrap`: the [`Playground`] and its startup sequence
//! - `config`: every tunable constant, see [`PlaygroundConfig`]
//! - `data_structures`: the scene and what lives in it
//! - `physics`: the pluggable rigid body backend and its rapier implementation
//! - `actions` and `pick`: pointer picking and per-mesh actions
//! - `resources`: asset sources and the glTF scene loader
//! - `camera`, `context`, `pipelines`, `render`: GPU side
//! - `flow`: the winit event loop, see [`run`]
//!

pub mod actions;
pub mod bootstrap;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod physics;
pub mod pick;
pub mod pipelines;
pub mod render;
pub mod resources;

pub use bootstrap::{AppPhase, BodyKind, LightingReport, Placement, Playground, RenderSurface};
pub use config::PlaygroundConfig;
pub use error::BootstrapError;
pub use flow::run;
