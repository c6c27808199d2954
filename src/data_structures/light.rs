//! Directional lights and shadow generators.

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Vector3};

use crate::data_structures::{material::Colour3, scene_graph::MeshId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LightId(pub(crate) usize);

#[derive(Clone, Debug, PartialEq)]
pub struct DirectionalLight {
    pub name: String,
    pub direction: Vector3<f32>,
    /// Where shadows are rendered from. A directional light has no position
    /// for shading purposes.
    pub position: Vector3<f32>,
    pub intensity: f32,
    pub colour: Colour3,
}

impl DirectionalLight {
    pub fn new(name: impl Into<String>, direction: Vector3<f32>) -> Self {
        Self {
            name: name.into(),
            direction,
            position: Vector3::new(0.0, 0.0, 0.0),
            intensity: 1.0,
            colour: Colour3::WHITE,
        }
    }

    /// Orthographic light-space matrix that covers a cube of `extent` around
    /// the light position, looking along the light direction.
    pub fn view_projection(&self, extent: f32) -> Matrix4<f32> {
        let eye = Point3::from_vec(self.position);
        let dir = self.direction.normalize();
        // look_to with an up vector parallel to the direction is degenerate
        let up = if dir.y.abs() > 0.99 {
            Vector3::unit_z()
        } else {
            Vector3::unit_y()
        };
        let view = Matrix4::look_to_rh(eye, dir, up);
        let proj = cgmath::ortho(-extent, extent, -extent, extent, 0.1, extent * 4.0);
        crate::camera::OPENGL_TO_WGPU_MATRIX * proj * view
    }
}

/// Renders a depth map from one light and lets receiving meshes test against it.
#[derive(Clone, Debug, PartialEq)]
pub struct ShadowGenerator {
    pub map_size: u32,
    pub light: LightId,
    casters: Vec<MeshId>,
}

impl ShadowGenerator {
    pub fn new(map_size: u32, light: LightId) -> Self {
        Self {
            map_size,
            light,
            casters: Vec::new(),
        }
    }

    /// Returns `false` if the mesh was already registered.
    pub fn add_shadow_caster(&mut self, mesh: MeshId) -> bool {
        if self.casters.contains(&mesh) {
            return false;
        }
        self.casters.push(mesh);
        true
    }

    pub fn casters(&self) -> &[MeshId] {
        &self.casters
    }

    pub fn casts(&self, mesh: MeshId) -> bool {
        self.casters.contains(&mesh)
    }
}
