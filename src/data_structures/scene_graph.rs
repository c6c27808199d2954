//! The scene: the mutable container for everything that gets rendered or
//! simulated.
//!
//! Meshes, materials, cameras and lights live in flat arenas and are referred
//! to by copyable ids. Imported node hierarchies are flattened into world
//! transforms at load time. Nothing is ever removed from a scene.

use std::collections::HashMap;

use cgmath::{ElementWise, Vector3};

use crate::{
    actions::{Action, ActionManager, Trigger},
    camera::{Camera, CameraId},
    data_structures::{
        geometry::{Aabb, GeometryKind},
        instance::Instance,
        light::{DirectionalLight, LightId, ShadowGenerator},
        material::{MaterialId, StandardMaterial},
    },
    error::BootstrapError,
    physics::{
        BodyDescriptor, BodyHandle, ColliderShape, Impostor, ImpostorKind, PhysicsConfig,
        PhysicsPlugin, PhysicsWorld, RigidBodyParams,
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub(crate) usize);

#[derive(Debug)]
pub struct MeshNode {
    pub name: String,
    pub geometry: GeometryKind,
    pub transform: Instance,
    pub material: Option<MaterialId>,
    pub receive_shadows: bool,
    pub pickable: bool,
    bounds: Aabb,
    impostor: Option<Impostor>,
}

impl MeshNode {
    pub fn new(name: impl Into<String>, geometry: GeometryKind) -> Self {
        let bounds = geometry.local_bounds();
        Self {
            name: name.into(),
            geometry,
            transform: Instance::new(),
            material: None,
            receive_shadows: false,
            pickable: true,
            bounds,
            impostor: None,
        }
    }

    pub fn with_transform(mut self, transform: Instance) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = Some(material);
        self
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn impostor(&self) -> Option<&Impostor> {
        self.impostor.as_ref()
    }
}

#[derive(Debug)]
pub struct Scene {
    pub clear_colour: wgpu::Color,
    meshes: Vec<MeshNode>,
    materials: Vec<StandardMaterial>,
    cameras: Vec<Camera>,
    active_camera: Option<CameraId>,
    lights: Vec<DirectionalLight>,
    shadow_generators: Vec<ShadowGenerator>,
    physics: Option<PhysicsWorld>,
    action_managers: HashMap<MeshId, ActionManager>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            clear_colour: wgpu::Color {
                r: 0.2,
                g: 0.2,
                b: 0.3,
                a: 1.0,
            },
            meshes: Vec::new(),
            materials: Vec::new(),
            cameras: Vec::new(),
            active_camera: None,
            lights: Vec::new(),
            shadow_generators: Vec::new(),
            physics: None,
            action_managers: HashMap::new(),
        }
    }

    pub fn add_mesh(&mut self, mesh: MeshNode) -> MeshId {
        if self.get_mesh_by_name(&mesh.name).is_some() {
            log::warn!(
                "a mesh named `{}` already exists, lookups by name will return the first one",
                mesh.name
            );
        }
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&MeshNode> {
        self.meshes.get(id.0)
    }

    pub fn mesh_mut(&mut self, id: MeshId) -> Option<&mut MeshNode> {
        self.meshes.get_mut(id.0)
    }

    /// First mesh with the given name.
    pub fn get_mesh_by_name(&self, name: &str) -> Option<MeshId> {
        self.meshes
            .iter()
            .position(|mesh| mesh.name == name)
            .map(MeshId)
    }

    pub fn meshes(&self) -> impl Iterator<Item = (MeshId, &MeshNode)> {
        self.meshes
            .iter()
            .enumerate()
            .map(|(idx, mesh)| (MeshId(idx), mesh))
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn add_material(&mut self, material: StandardMaterial) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    pub fn material(&self, id: MaterialId) -> Option<&StandardMaterial> {
        self.materials.get(id.0)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut StandardMaterial> {
        self.materials.get_mut(id.0)
    }

    /// Material of a mesh, if it has one.
    pub fn mesh_material(&self, id: MeshId) -> Option<&StandardMaterial> {
        self.mesh(id)
            .and_then(|mesh| mesh.material)
            .and_then(|material| self.material(material))
    }

    /// The first camera added to a scene without an active camera becomes active.
    pub fn add_camera(&mut self, camera: Camera) -> CameraId {
        self.cameras.push(camera);
        let id = CameraId(self.cameras.len() - 1);
        if self.active_camera.is_none() {
            self.active_camera = Some(id);
        }
        id
    }

    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    pub fn active_camera(&self) -> Option<&Camera> {
        self.active_camera.and_then(|id| self.cameras.get(id.0))
    }

    pub fn active_camera_mut(&mut self) -> Option<&mut Camera> {
        self.active_camera.and_then(|id| self.cameras.get_mut(id.0))
    }

    pub fn add_directional_light(&mut self, light: DirectionalLight) -> LightId {
        self.lights.push(light);
        LightId(self.lights.len() - 1)
    }

    pub fn light(&self, id: LightId) -> Option<&DirectionalLight> {
        self.lights.get(id.0)
    }

    pub fn lights(&self) -> &[DirectionalLight] {
        &self.lights
    }

    pub fn add_shadow_generator(&mut self, generator: ShadowGenerator) -> usize {
        self.shadow_generators.push(generator);
        self.shadow_generators.len() - 1
    }

    pub fn shadow_generators(&self) -> &[ShadowGenerator] {
        &self.shadow_generators
    }

    pub fn shadow_generator_mut(&mut self, idx: usize) -> Option<&mut ShadowGenerator> {
        self.shadow_generators.get_mut(idx)
    }

    pub fn casts_shadow(&self, mesh: MeshId) -> bool {
        self.shadow_generators.iter().any(|g| g.casts(mesh))
    }

    pub fn enable_physics(&mut self, config: PhysicsConfig, plugin: Box<dyn PhysicsPlugin>) {
        if self.physics.is_some() {
            log::warn!("physics was already enabled, replacing the previous world");
        }
        self.physics = Some(PhysicsWorld::new(config, plugin));
    }

    pub fn physics(&self) -> Option<&PhysicsWorld> {
        self.physics.as_ref()
    }

    pub fn is_physics_enabled(&self) -> bool {
        self.physics.is_some()
    }

    /// Attaches a rigid body whose collider matches the mesh's shape.
    pub fn set_impostor(
        &mut self,
        id: MeshId,
        kind: ImpostorKind,
        params: RigidBodyParams,
    ) -> Result<BodyHandle, BootstrapError> {
        let physics = self
            .physics
            .as_mut()
            .ok_or(BootstrapError::PhysicsDisabled)?;
        let mesh = self.meshes.get_mut(id.0).ok_or_else(|| {
            BootstrapError::InvalidBodyParams(format!("no mesh with id {:?}", id))
        })?;
        if mesh.impostor.is_some() {
            return Err(BootstrapError::InvalidBodyParams(format!(
                "mesh `{}` already has an impostor",
                mesh.name
            )));
        }

        let scale = mesh.transform.scale;
        let shape = ColliderShape::from_bounds(kind, mesh.bounds.extents(), scale);
        let descriptor = BodyDescriptor {
            shape,
            params,
            position: mesh.transform.position,
            rotation: mesh.transform.rotation,
            offset: mesh.bounds.centre().mul_element_wise(scale),
        };
        let handle = physics.add_body(&descriptor);
        log::debug!(
            "impostor {:?} for `{}`: {:?}, mass {}",
            handle,
            mesh.name,
            shape,
            params.mass()
        );
        mesh.impostor = Some(Impostor {
            kind,
            shape,
            params,
            handle,
        });
        Ok(handle)
    }

    pub fn register_action(&mut self, mesh: MeshId, trigger: Trigger, action: Box<dyn Action>) {
        self.action_managers
            .entry(mesh)
            .or_default()
            .register_action(trigger, action);
    }

    pub fn action_manager(&self, mesh: MeshId) -> Option<&ActionManager> {
        self.action_managers.get(&mesh)
    }

    /// Runs the actions registered on `mesh` for `trigger` and returns how many ran.
    pub fn dispatch(&mut self, mesh: MeshId, trigger: Trigger) -> usize {
        // Actions get `&mut Scene`, so the manager leaves the map while they run.
        if !self
            .action_managers
            .get(&mesh)
            .is_some_and(|manager| manager.has_trigger(trigger))
        {
            return 0;
        }
        let Some(mut manager) = self.action_managers.remove(&mesh) else {
            return 0;
        };
        let executed = manager.process(trigger, self, mesh);
        // Keep anything an action registered on this mesh while it ran.
        if let Some(added) = self.action_managers.remove(&mesh) {
            manager.append(added);
        }
        self.action_managers.insert(mesh, manager);
        executed
    }

    /// Current linear velocity of the mesh's rigid body.
    pub fn linear_velocity(&self, mesh: MeshId) -> Option<Vector3<f32>> {
        let handle = self.mesh(mesh)?.impostor()?.handle;
        self.physics.as_ref()?.plugin().linear_velocity(handle)
    }

    /// One render tick: steps physics and moves every dynamic mesh to its body.
    /// Returns the physics step used, zero without physics.
    pub fn advance(&mut self, frame_dt: f32) -> f32 {
        let Some(physics) = self.physics.as_mut() else {
            return 0.0;
        };
        let step = physics.step(frame_dt);
        for mesh in self.meshes.iter_mut() {
            let Some(impostor) = &mesh.impostor else {
                continue;
            };
            if impostor.params.is_static() {
                continue;
            }
            if let Some((position, rotation)) = physics.plugin().body_pose(impostor.handle) {
                mesh.transform.position = position;
                mesh.transform.rotation = rotation;
            }
        }
        step
    }
}
