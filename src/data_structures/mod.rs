//! Engine data structures: the scene and what lives in it.
//!
//! - `scene_graph` holds the [`Scene`](scene_graph::Scene) container and mesh nodes
//! - `geometry` contains vertices, indices and bounds for primitives and imported meshes
//! - `instance` holds per-mesh transformation data and its GPU layout
//! - `material` contains colours and flat diffuse materials
//! - `light` contains directional lights and shadow generators
//! - `texture` contains depth and shadow map textures

pub mod geometry;
pub mod instance;
pub mod light;
pub mod material;
pub mod scene_graph;
pub mod texture;
