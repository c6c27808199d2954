//! Application bootstrap.
//!
//! [`Playground`] owns the rendering surface and the scene and walks them
//! through startup: ground first, then the scene file, then the two dynamic
//! bodies, then lighting. Only the scene load suspends.
//!
//! ```text
//! new → setup_ground ─ bind_events ─ load_scene ─ spawn cube1/sphere1 ─ setup_lighting
//!       (Initializing)                             (Running)
//! ```

use std::{collections::HashMap, future::Future};

use cgmath::Vector3;
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    actions::{RecolorOnPick, Trigger},
    config::{PlaygroundConfig, join_url},
    data_structures::{
        geometry::GeometryKind,
        instance::Instance,
        light::{DirectionalLight, ShadowGenerator},
        material::{Colour3, StandardMaterial},
        scene_graph::{MeshId, MeshNode, Scene},
    },
    error::BootstrapError,
    physics::{ImpostorKind, PhysicsPlugin, RigidBodyParams},
    resources::{
        AssetSource,
        scene_loader::{SceneImport, stage_scene},
    },
};

pub const GROUND_NAME: &str = "ground";
pub const GROUND_MATERIAL: &str = "groundMaterial";
const SPHERE_SEGMENTS: u32 = 16;

/// Resolves the element the rendering surface binds to.
pub trait CanvasLookup {
    type Canvas;

    /// `Ok(None)` when nothing has that id, `Err` when something does but
    /// cannot be rendered into.
    fn lookup(&self, id: &str) -> Result<Option<Self::Canvas>, String>;
}

pub fn find_canvas<L: CanvasLookup>(lookup: &L, id: &str) -> Result<L::Canvas, BootstrapError> {
    match lookup.lookup(id) {
        Ok(Some(canvas)) => Ok(canvas),
        Ok(None) => Err(BootstrapError::Configuration(format!(
            "no canvas element with id `{}`",
            id
        ))),
        Err(reason) => Err(BootstrapError::Configuration(format!(
            "element `{}` is not usable as a canvas: {}",
            id, reason
        ))),
    }
}

#[cfg(target_arch = "wasm32")]
impl CanvasLookup for web_sys::Document {
    type Canvas = web_sys::HtmlCanvasElement;

    fn lookup(&self, id: &str) -> Result<Option<Self::Canvas>, String> {
        use wasm_bindgen::JsCast;

        match self.get_element_by_id(id) {
            Some(element) => element
                .dyn_into::<web_sys::HtmlCanvasElement>()
                .map(Some)
                .map_err(|element| format!("found a <{}>", element.tag_name().to_lowercase())),
            None => Ok(None),
        }
    }
}

/// What the scene renders into. Only resizing is driven from here.
pub trait RenderSurface {
    /// Re-reads the viewport size and resizes the backing buffers to match.
    fn resize(&mut self);
}

/// Lifecycle of the playground. Moves forward only, and only through a
/// successful [`Playground::load_scene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppPhase {
    Initializing,
    Running,
}

/// Height and horizontal offset of a spawned body. Depth is always zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
}

impl Placement {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyKind {
    Box,
    Sphere,
}

impl From<BodyKind> for ImpostorKind {
    fn from(kind: BodyKind) -> Self {
        match kind {
            BodyKind::Box => ImpostorKind::Box,
            BodyKind::Sphere => ImpostorKind::Sphere,
        }
    }
}

/// Meshes created in code that play a role later in startup, keyed by the
/// name they were created with.
#[derive(Clone, Debug, Default)]
pub struct CasterRoles {
    roles: HashMap<String, MeshId>,
}

impl CasterRoles {
    pub fn record(&mut self, name: impl Into<String>, mesh: MeshId) {
        self.roles.insert(name.into(), mesh);
    }

    pub fn get(&self, name: &str) -> Option<MeshId> {
        self.roles.get(name).copied()
    }

    /// Role table first, then the scene for meshes that came from the file.
    pub fn resolve(&self, scene: &Scene, name: &str) -> Option<MeshId> {
        self.get(name).or_else(|| scene.get_mesh_by_name(name))
    }
}

/// Outcome of [`Playground::setup_lighting`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LightingReport {
    /// Every mesh registered with the shadow generator, ground first.
    pub casters: Vec<MeshId>,
    /// Expected casters that were not found.
    pub missing: Vec<String>,
}

/// A resize subscription. Each notification dispatched through an active
/// binding resizes the surface exactly once.
#[derive(Debug)]
pub struct ResizeBinding {
    active: bool,
    dispatched: u64,
}

impl ResizeBinding {
    pub fn dispatch<S: RenderSurface>(&mut self, surface: &mut S) -> bool {
        if !self.active {
            log::trace!("resize ignored, binding released");
            return false;
        }
        surface.resize();
        self.dispatched += 1;
        true
    }

    pub fn release(&mut self) {
        if self.active {
            log::debug!("resize binding released after {} resizes", self.dispatched);
        }
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }
}

impl Drop for ResizeBinding {
    fn drop(&mut self) {
        self.release();
    }
}

pub struct Playground<S> {
    surface: S,
    scene: Scene,
    config: PlaygroundConfig,
    phase: AppPhase,
    roles: CasterRoles,
    ground: Option<MeshId>,
    pick_seed: Option<u64>,
}

impl<S: RenderSurface> Playground<S> {
    /// Creates the scene with physics enabled and the ground in place.
    pub fn new(
        surface: S,
        physics: Box<dyn PhysicsPlugin>,
        config: PlaygroundConfig,
    ) -> Result<Self, BootstrapError> {
        let mut scene = Scene::new();
        scene.enable_physics(config.physics.clone(), physics);
        let mut playground = Self {
            surface,
            scene,
            config,
            phase: AppPhase::Initializing,
            roles: CasterRoles::default(),
            ground: None,
            pick_seed: None,
        };
        playground.setup_ground()?;
        Ok(playground)
    }

    /// Seeds the recolour actions of spawned boxes, for reproducible picks.
    pub fn with_pick_seed(mut self, seed: u64) -> Self {
        self.pick_seed = Some(seed);
        self
    }

    /// Adds the static ground and sets the background colour. Called by
    /// [`Playground::new`]; calling it again returns the existing ground.
    pub fn setup_ground(&mut self) -> Result<MeshId, BootstrapError> {
        if let Some(ground) = self.ground {
            log::warn!("ground already set up");
            return Ok(ground);
        }
        self.scene.clear_colour = self.config.clear_colour;
        let material = self.scene.add_material(StandardMaterial::new(
            GROUND_MATERIAL,
            self.config.ground_colour,
        ));
        let geometry = GeometryKind::Ground {
            width: self.config.ground_width,
            depth: self.config.ground_depth,
        };
        let ground = self
            .scene
            .add_mesh(MeshNode::new(GROUND_NAME, geometry).with_material(material));
        self.scene
            .set_impostor(ground, ImpostorKind::Box, RigidBodyParams::fixed())?;
        self.roles.record(GROUND_NAME, ground);
        self.ground = Some(ground);
        log::debug!(
            "ground {}x{} ready",
            self.config.ground_width,
            self.config.ground_depth
        );
        Ok(ground)
    }

    /// Subscribes the surface to viewport resizes.
    pub fn bind_events(&self) -> ResizeBinding {
        log::debug!("resize binding active");
        ResizeBinding {
            active: true,
            dispatched: 0,
        }
    }

    /// Appends the scene file, then brings the playground to
    /// [`AppPhase::Running`]: controls go to the active camera and the
    /// dynamic bodies are spawned.
    pub async fn load_scene<A: AssetSource>(
        &mut self,
        assets: &A,
        root_url: &str,
        file_name: &str,
    ) -> Result<SceneImport, BootstrapError> {
        let path = join_url(root_url, file_name);
        if self.phase == AppPhase::Running {
            return Err(BootstrapError::Configuration(format!(
                "cannot load `{}`, a scene is already running",
                path
            )));
        }
        log::info!("loading scene {}", path);

        let timeout = self.config.load_timeout;
        let load = stage_scene(assets, root_url, file_name);
        let staged = match with_timeout(timeout, load).await {
            Some(result) => result.map_err(|err| BootstrapError::scene_load(path.clone(), err))?,
            None => {
                return Err(BootstrapError::LoadTimedOut {
                    path,
                    after: timeout,
                });
            }
        };
        // Nothing reaches the scene unless the load can complete.
        if staged.camera_count() == 0 && self.scene.active_camera().is_none() {
            return Err(BootstrapError::MissingCamera { path });
        }
        let import = staged.commit(&mut self.scene);

        let Some(camera) = self.scene.active_camera_mut() else {
            return Err(BootstrapError::MissingCamera { path });
        };
        camera.attach_control();
        log::debug!("controls attached to camera `{}`", camera.name);

        self.spawn_dynamic_body(
            BodyKind::Box,
            "cube1",
            Placement::new(0.0, 5.0),
            RigidBodyParams::new(1.0, 0.8)?,
        )?;
        self.spawn_dynamic_body(
            BodyKind::Sphere,
            "sphere1",
            Placement::new(2.0, 5.0),
            RigidBodyParams::new(1.0, 3.0)?,
        )?;

        self.phase = AppPhase::Running;
        log::info!("scene {} running", path);
        Ok(import)
    }

    /// Loads the configured scene file and sets up lighting once it is running.
    pub async fn start<A: AssetSource>(
        &mut self,
        assets: &A,
    ) -> Result<LightingReport, BootstrapError> {
        let root_url = self.config.root_url.clone();
        let scene_file = self.config.scene_file.clone();
        self.load_scene(assets, &root_url, &scene_file).await?;
        Ok(self.setup_lighting())
    }

    /// Creates a unit box or sphere at `(x, y, 0)` with a matching impostor.
    /// Boxes recolour themselves when picked.
    pub fn spawn_dynamic_body(
        &mut self,
        kind: BodyKind,
        name: &str,
        placement: Placement,
        params: RigidBodyParams,
    ) -> Result<MeshId, BootstrapError> {
        if !placement.x.is_finite() || !placement.y.is_finite() {
            return Err(BootstrapError::InvalidBodyParams(format!(
                "placement of `{}` must be finite, got {:?}",
                name, placement
            )));
        }
        let (geometry, colour) = match kind {
            BodyKind::Box => (GeometryKind::Box { size: 1.0 }, Colour3::RED),
            BodyKind::Sphere => (
                GeometryKind::Sphere {
                    diameter: 1.0,
                    segments: SPHERE_SEGMENTS,
                },
                Colour3::BLUE,
            ),
        };
        let material = self
            .scene
            .add_material(StandardMaterial::new(format!("{}Material", name), colour));
        let transform = Instance::at(Vector3::new(placement.x, placement.y, 0.0));
        let mesh = self.scene.add_mesh(
            MeshNode::new(name, geometry)
                .with_transform(transform)
                .with_material(material),
        );
        self.scene.set_impostor(mesh, kind.into(), params)?;

        if kind == BodyKind::Box {
            let action = match self.pick_seed {
                Some(seed) => RecolorOnPick::with_rng(
                    material,
                    StdRng::seed_from_u64(seed.wrapping_add(mesh.0 as u64)),
                ),
                None => RecolorOnPick::new(material),
            };
            self.scene
                .register_action(mesh, Trigger::OnPick, Box::new(action));
        }
        if self.config.shadow_casters.iter().any(|caster| caster == name) {
            self.roles.record(name, mesh);
        }
        log::info!("spawned {:?} `{}` at {:?}", kind, name, placement);
        Ok(mesh)
    }

    /// Adds the directional light and its shadow generator. The ground
    /// receives shadows; it and the configured casters cast them.
    pub fn setup_lighting(&mut self) -> LightingReport {
        let mut light = DirectionalLight::new(
            self.config.light_name.clone(),
            self.config.light_direction,
        );
        light.position = self.config.light_position;
        light.intensity = self.config.light_intensity;
        let light = self.scene.add_directional_light(light);
        let generator = self
            .scene
            .add_shadow_generator(ShadowGenerator::new(self.config.shadow_map_size, light));

        let mut report = LightingReport::default();
        let mut casters = Vec::new();
        if let Some(ground) = self.ground {
            if let Some(mesh) = self.scene.mesh_mut(ground) {
                mesh.receive_shadows = true;
            }
            casters.push(ground);
        }
        for name in &self.config.shadow_casters {
            match self.roles.resolve(&self.scene, name) {
                Some(mesh) => casters.push(mesh),
                None => {
                    log::warn!("shadow caster `{}` not found in the scene", name);
                    report.missing.push(name.clone());
                }
            }
        }
        if let Some(generator) = self.scene.shadow_generator_mut(generator) {
            for mesh in casters {
                if generator.add_shadow_caster(mesh) {
                    report.casters.push(mesh);
                }
            }
        }
        log::info!(
            "lighting ready: {} caster(s), {} missing",
            report.casters.len(),
            report.missing.len()
        );
        report
    }

    pub fn phase(&self) -> AppPhase {
        self.phase
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Surface and scene together, for rendering.
    pub fn parts_mut(&mut self) -> (&mut S, &mut Scene) {
        (&mut self.surface, &mut self.scene)
    }

    pub fn config(&self) -> &PlaygroundConfig {
        &self.config
    }

    pub fn ground(&self) -> Option<MeshId> {
        self.ground
    }

    pub fn roles(&self) -> &CasterRoles {
        &self.roles
    }
}

#[cfg(not(target_arch = "wasm32"))]
async fn with_timeout<F: Future>(after: instant::Duration, future: F) -> Option<F::Output> {
    tokio::time::timeout(after, future).await.ok()
}

// No timer is available on the web without a runtime; the browser's own
// fetch timeouts apply there.
#[cfg(target_arch = "wasm32")]
async fn with_timeout<F: Future>(_after: instant::Duration, future: F) -> Option<F::Output> {
    Some(future.await)
}
