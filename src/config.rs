//! Startup configuration.
//!
//! Every constant the playground uses lives here so tests and embedders can
//! change them without touching the bootstrap code.

use std::path::PathBuf;

use cgmath::Vector3;
use instant::Duration;

use crate::{data_structures::material::Colour3, physics::PhysicsConfig};

/// Overrides [`PlaygroundConfig::asset_dir`] when set.
pub const ASSET_DIR_ENV: &str = "FLOW_PLAYGROUND_ASSETS";

#[derive(Clone, Debug, PartialEq)]
pub struct PlaygroundConfig {
    /// Id of the canvas element the surface binds to on the web.
    pub canvas_id: String,
    pub window_title: String,
    /// Directory native builds read assets from.
    pub asset_dir: PathBuf,
    /// Folder of the scene file, relative to the asset root.
    pub root_url: String,
    pub scene_file: String,
    pub physics: PhysicsConfig,
    pub light_name: String,
    pub light_direction: Vector3<f32>,
    pub light_position: Vector3<f32>,
    pub light_intensity: f32,
    pub shadow_map_size: u32,
    /// Half size of the volume rendered into the shadow map.
    pub shadow_extent: f32,
    /// Meshes besides the ground expected to cast shadows.
    pub shadow_casters: Vec<String>,
    pub ground_width: f32,
    pub ground_depth: f32,
    pub ground_colour: Colour3,
    pub clear_colour: wgpu::Color,
    pub load_timeout: Duration,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            canvas_id: "renderCanvas".to_string(),
            window_title: "flow-playground".to_string(),
            asset_dir: PathBuf::from("assets"),
            root_url: "scenes/".to_string(),
            scene_file: "scene.gltf".to_string(),
            physics: PhysicsConfig::default(),
            light_name: "directionalLight".to_string(),
            light_direction: Vector3::new(0.0, -1.0, -1.0),
            light_position: Vector3::new(0.0, 10.0, 0.0),
            light_intensity: 1.0,
            shadow_map_size: 1024,
            shadow_extent: 20.0,
            shadow_casters: vec!["cube1".to_string(), "cube2".to_string()],
            ground_width: 10.0,
            ground_depth: 10.0,
            ground_colour: Colour3::grey(0.5),
            clear_colour: wgpu::Color {
                r: 0.8,
                g: 0.8,
                b: 0.8,
                a: 1.0,
            },
            load_timeout: Duration::from_secs(30),
        }
    }
}

impl PlaygroundConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(std::env::var(ASSET_DIR_ENV).ok())
    }

    /// Applies the value of [`ASSET_DIR_ENV`], if any. Empty values are ignored.
    pub fn with_env_overrides(mut self, asset_dir: Option<String>) -> Self {
        if let Some(dir) = asset_dir.filter(|dir| !dir.trim().is_empty()) {
            log::info!("using asset directory {} from {}", dir, ASSET_DIR_ENV);
            self.asset_dir = PathBuf::from(dir);
        }
        self
    }

    pub fn with_canvas_id(mut self, id: impl Into<String>) -> Self {
        self.canvas_id = id.into();
        self
    }

    pub fn with_asset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.asset_dir = dir.into();
        self
    }

    pub fn with_scene(mut self, root_url: impl Into<String>, scene_file: impl Into<String>) -> Self {
        self.root_url = root_url.into();
        self.scene_file = scene_file.into();
        self
    }

    pub fn with_physics(mut self, physics: PhysicsConfig) -> Self {
        self.physics = physics;
        self
    }

    pub fn with_shadow_casters<I, N>(mut self, casters: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.shadow_casters = casters.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_shadow_map_size(mut self, size: u32) -> Self {
        self.shadow_map_size = size;
        self
    }

    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }

    /// Scene path relative to the asset root, as used in error messages.
    pub fn scene_path(&self) -> String {
        join_url(&self.root_url, &self.scene_file)
    }
}

/// Joins two relative url paths, resolving `.` and `..` segments. A `..`
/// that would climb above the asset root is dropped.
pub fn join_url(base: &str, file: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(file.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}
