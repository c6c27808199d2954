//! Mesh transforms and their GPU representation.
//!
//! Every mesh carries one [`Instance`]. The renderer packs instances into
//! [`InstanceRaw`] vertex buffers, together with the colour and shadow flags
//! a draw needs, so one draw call per geometry covers all of its meshes.

use std::ops::Mul;

use cgmath::{Matrix, One, SquareMatrix};

/// Position, rotation (as quaternion) and scale of a mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    /// Identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            // `Quaternion::one()` is the identity quaternion (no rotation)
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn at(position: cgmath::Vector3<f32>) -> Self {
        Self {
            position,
            ..Self::new()
        }
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn to_raw(&self, colour: [f32; 3], receive_shadows: bool) -> InstanceRaw {
        let world_matrix = self.to_matrix();
        // Normals need the inverse transpose once the scale is non-uniform.
        let normal = world_matrix
            .invert()
            .map(|inv| {
                let t = inv.transpose();
                cgmath::Matrix3::from_cols(t.x.truncate(), t.y.truncate(), t.z.truncate())
            })
            .unwrap_or_else(|| cgmath::Matrix3::from(self.rotation));
        InstanceRaw {
            model: world_matrix.into(),
            normal: normal.into(),
            colour,
            receive_shadows: if receive_shadows { 1.0 } else { 0.0 },
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

/// Parent * child composition, used when flattening imported node hierarchies.
impl<'a, 'b> Mul<&'b Instance> for &'a Instance {
    type Output = Instance;

    fn mul(self, rhs: &'b Instance) -> Self::Output {
        let new_rotation = self.rotation * rhs.rotation;

        let new_scale = cgmath::Vector3::new(
            self.scale.x * rhs.scale.x,
            self.scale.y * rhs.scale.y,
            self.scale.z * rhs.scale.z,
        );
        let scaled_rhs_pos = cgmath::Vector3::new(
            self.scale.x * rhs.position.x,
            self.scale.y * rhs.position.y,
            self.scale.z * rhs.position.z,
        );
        let new_position = self.position + (self.rotation * scaled_rhs_pos);

        Instance {
            position: new_position,
            rotation: new_rotation,
            scale: new_scale,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 3]; 3],
    pub colour: [f32; 3],
    pub receive_shadows: f32,
}

impl InstanceRaw {
    const ATTRIBUTES: [wgpu::VertexAttribute; 9] = wgpu::vertex_attr_array![
        // model matrix
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
        8 => Float32x4,
        // normal matrix
        9 => Float32x3,
        10 => Float32x3,
        11 => Float32x3,
        // colour and shadow flag
        12 => Float32x3,
        13 => Float32,
    ];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            // Switch from one instance to the next only after a whole mesh was drawn
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}
