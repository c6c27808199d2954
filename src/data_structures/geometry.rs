//! CPU-side geometry: vertices, indices and bounds for the built-in
//! primitives and for meshes imported from scene files.

use cgmath::{InnerSpace, Vector3};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl ModelVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Axis-aligned bounds in mesh-local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    pub fn centred(extents: Vector3<f32>) -> Self {
        Self {
            min: -extents / 2.0,
            max: extents / 2.0,
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a [f32; 3]>) -> Option<Self> {
        let mut points = points.into_iter();
        let first: Vector3<f32> = (*points.next()?).into();
        Some(points.fold(Self::new(first, first), |bounds, p| bounds.including((*p).into())))
    }

    pub fn including(self, p: Vector3<f32>) -> Self {
        Self {
            min: Vector3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z)),
            max: Vector3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z)),
        }
    }

    pub fn union(self, other: Aabb) -> Self {
        self.including(other.min).including(other.max)
    }

    pub fn extents(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn centre(&self) -> Vector3<f32> {
        (self.min + self.max) / 2.0
    }
}

#[derive(Clone, Debug, Default)]
pub struct MeshGeometry {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl MeshGeometry {
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.vertices.iter().map(|v| &v.position))
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Axis-aligned cube centred on the origin.
    pub fn cube(size: f32) -> Self {
        let h = size / 2.0;
        let x = Vector3::unit_x();
        let y = Vector3::unit_y();
        let z = Vector3::unit_z();
        // (u, v) pairs where u x v is the outward normal
        let faces = [(y, z), (z, y), (z, x), (x, z), (x, y), (y, x)];

        let mut geometry = Self::default();
        for (u, v) in faces {
            let normal = u.cross(v);
            let base = geometry.vertices.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let p = (normal + u * su + v * sv) * h;
                geometry.vertices.push(ModelVertex {
                    position: p.into(),
                    normal: normal.into(),
                });
            }
            geometry
                .indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        geometry
    }

    /// UV sphere centred on the origin.
    pub fn sphere(diameter: f32, stacks: u32, slices: u32) -> Self {
        let stacks = stacks.max(2);
        let slices = slices.max(3);
        let radius = diameter / 2.0;

        let mut geometry = Self::default();
        for stack in 0..=stacks {
            let phi = std::f32::consts::PI * stack as f32 / stacks as f32;
            for slice in 0..=slices {
                let theta = std::f32::consts::TAU * slice as f32 / slices as f32;
                let n = Vector3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
                geometry.vertices.push(ModelVertex {
                    position: (n * radius).into(),
                    normal: n.normalize().into(),
                });
            }
        }
        let row = slices + 1;
        for stack in 0..stacks {
            for slice in 0..slices {
                let a = stack * row + slice;
                let b = a + row;
                geometry
                    .indices
                    .extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
            }
        }
        geometry
    }

    /// Flat plane at y = 0 facing up.
    pub fn ground(width: f32, depth: f32) -> Self {
        let (w, d) = (width / 2.0, depth / 2.0);
        let up = [0.0, 1.0, 0.0];
        let vertices = [[-w, 0.0, -d], [-w, 0.0, d], [w, 0.0, d], [w, 0.0, -d]]
            .into_iter()
            .map(|position| ModelVertex {
                position,
                normal: up,
            })
            .collect();
        Self {
            vertices,
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }
}

/// What a mesh is made of. Built-in primitives share one GPU buffer per
/// shape and size; imported meshes own theirs.
#[derive(Clone, Debug)]
pub enum GeometryKind {
    Box { size: f32 },
    Sphere { diameter: f32, segments: u32 },
    Ground { width: f32, depth: f32 },
    Imported(MeshGeometry),
}

impl GeometryKind {
    pub fn build(&self) -> MeshGeometry {
        match self {
            GeometryKind::Box { size } => MeshGeometry::cube(*size),
            GeometryKind::Sphere { diameter, segments } => {
                MeshGeometry::sphere(*diameter, *segments, *segments * 2)
            }
            GeometryKind::Ground { width, depth } => MeshGeometry::ground(*width, *depth),
            GeometryKind::Imported(geometry) => geometry.clone(),
        }
    }

    pub fn local_bounds(&self) -> Aabb {
        match self {
            GeometryKind::Box { size } => Aabb::centred(Vector3::new(*size, *size, *size)),
            GeometryKind::Sphere { diameter, .. } => {
                Aabb::centred(Vector3::new(*diameter, *diameter, *diameter))
            }
            GeometryKind::Ground { width, depth } => {
                Aabb::centred(Vector3::new(*width, 0.0, *depth))
            }
            GeometryKind::Imported(geometry) => geometry
                .bounds()
                .unwrap_or_else(|| Aabb::centred(Vector3::new(0.0, 0.0, 0.0))),
        }
    }

    /// Key under which meshes can share GPU buffers, `None` for imported ones.
    pub fn share_key(&self) -> Option<String> {
        match self {
            GeometryKind::Box { size } => Some(format!("box:{}", size)),
            GeometryKind::Sphere { diameter, segments } => {
                Some(format!("sphere:{}:{}", diameter, segments))
            }
            GeometryKind::Ground { width, depth } => Some(format!("ground:{}x{}", width, depth)),
            GeometryKind::Imported(_) => None,
        }
    }
}
