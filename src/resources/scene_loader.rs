//! Appends the contents of a glTF file to a [`Scene`].
//!
//! Node hierarchies are flattened: every node with a mesh becomes one
//! [`MeshNode`] per primitive carrying its accumulated world transform, and
//! every node with a camera becomes a [`Camera`]. Only the data the playground
//! renders is read: positions, normals, indices and the base colour factor.

use std::collections::HashMap;

use anyhow::{Context, anyhow};
use cgmath::{Quaternion, Rad, Vector3};

use crate::{
    camera::{Camera, CameraProjection},
    config::join_url,
    data_structures::{
        geometry::{GeometryKind, MeshGeometry, ModelVertex},
        instance::Instance,
        material::{Colour3, MaterialId, StandardMaterial},
        scene_graph::{MeshId, MeshNode, Scene},
    },
    resources::AssetSource,
};

/// What [`append_scene`] added.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneImport {
    pub meshes: Vec<MeshId>,
    pub cameras: usize,
    pub materials: usize,
}

struct StagedMesh {
    name: String,
    geometry: MeshGeometry,
    transform: Instance,
    /// Index into [`StagedScene::materials`].
    material: usize,
}

/// A parsed scene file that has not touched any [`Scene`] yet. Nodes are kept
/// in document order.
pub struct StagedScene {
    path: String,
    meshes: Vec<StagedMesh>,
    materials: Vec<StandardMaterial>,
    cameras: Vec<Camera>,
}

impl StagedScene {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn camera_count(&self) -> usize {
        self.cameras.len()
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Moves everything into `scene`. The first camera becomes active if the
    /// scene has none yet.
    pub fn commit(self, scene: &mut Scene) -> SceneImport {
        let material_ids: Vec<MaterialId> = self
            .materials
            .into_iter()
            .map(|material| scene.add_material(material))
            .collect();
        let mut import = SceneImport {
            meshes: Vec::with_capacity(self.meshes.len()),
            cameras: self.cameras.len(),
            materials: material_ids.len(),
        };
        for camera in self.cameras {
            scene.add_camera(camera);
        }
        for mesh in self.meshes {
            let node = MeshNode::new(mesh.name, GeometryKind::Imported(mesh.geometry))
                .with_transform(mesh.transform)
                .with_material(material_ids[mesh.material]);
            import.meshes.push(scene.add_mesh(node));
        }
        log::info!(
            "appended {}: {} meshes, {} cameras, {} materials",
            self.path,
            import.meshes.len(),
            import.cameras,
            import.materials
        );
        import
    }
}

/// Fetches and parses a scene file, then commits it to `scene`. On error the
/// scene is left untouched.
pub async fn append_scene<A: AssetSource>(
    scene: &mut Scene,
    assets: &A,
    root_url: &str,
    file_name: &str,
) -> anyhow::Result<SceneImport> {
    let staged = stage_scene(assets, root_url, file_name).await?;
    Ok(staged.commit(scene))
}

pub async fn stage_scene<A: AssetSource>(
    assets: &A,
    root_url: &str,
    file_name: &str,
) -> anyhow::Result<StagedScene> {
    let path = join_url(root_url, file_name);
    let bytes = assets.fetch(&path).await?;
    let gltf = gltf::Gltf::from_slice(&bytes).with_context(|| format!("parsing {}", path))?;

    // Buffer uris are relative to the scene file itself.
    let folder = path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    let mut buffer_data: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                let blob = gltf
                    .blob
                    .as_deref()
                    .ok_or_else(|| anyhow!("{} references a binary chunk it does not have", path))?;
                buffer_data.push(blob.to_vec());
            }
            gltf::buffer::Source::Uri(uri) => {
                if uri.starts_with("data:") {
                    return Err(anyhow!("embedded data uris are not supported ({})", path));
                }
                let bin = assets.fetch(&join_url(folder, uri)).await?;
                if bin.len() < buffer.length() {
                    return Err(anyhow!(
                        "buffer {} is {} bytes, expected at least {}",
                        uri,
                        bin.len(),
                        buffer.length()
                    ));
                }
                buffer_data.push(bin);
            }
        }
    }

    let mut staged = StagedScene {
        path: path.clone(),
        meshes: Vec::new(),
        materials: Vec::new(),
        cameras: Vec::new(),
    };
    let mut materials: HashMap<Option<usize>, usize> = HashMap::new();
    let Some(gltf_scene) = gltf.default_scene().or_else(|| gltf.scenes().next()) else {
        log::warn!("{} contains no scenes", path);
        return Ok(staged);
    };

    // Depth first in document order: pushed reversed, popped from the back.
    let mut stack: Vec<(gltf::Node, Instance)> =
        gltf_scene.nodes().map(|node| (node, Instance::new())).collect();
    stack.reverse();
    while let Some((node, parent)) = stack.pop() {
        let world = &parent * &node_transform(&node);

        if let Some(camera) = node.camera() {
            let name = node
                .name()
                .or(camera.name())
                .map(str::to_string)
                .unwrap_or_else(|| format!("camera{}", camera.index()));
            staged.cameras.push(Camera::from_orientation(
                name,
                world.position,
                world.rotation,
                projection(&camera),
            ));
        }

        if let Some(mesh) = node.mesh() {
            let base_name = node
                .name()
                .or(mesh.name())
                .map(str::to_string)
                .unwrap_or_else(|| format!("mesh{}", mesh.index()));
            let primitive_count = mesh.primitives().len();
            for primitive in mesh.primitives() {
                let geometry = read_primitive(&primitive, &buffer_data)
                    .with_context(|| format!("mesh `{}` in {}", base_name, path))?;
                if geometry.is_empty() {
                    log::warn!("skipping empty primitive in mesh `{}`", base_name);
                    continue;
                }
                let material = primitive.material();
                let material_idx = *materials.entry(material.index()).or_insert_with(|| {
                    let [r, g, b, _] = material.pbr_metallic_roughness().base_color_factor();
                    let name = material.name().unwrap_or("default").to_string();
                    staged
                        .materials
                        .push(StandardMaterial::new(name, Colour3::new(r, g, b)));
                    staged.materials.len() - 1
                });

                let name = if primitive_count > 1 {
                    format!("{}.{}", base_name, primitive.index())
                } else {
                    base_name.clone()
                };
                staged.meshes.push(StagedMesh {
                    name,
                    geometry,
                    transform: world.clone(),
                    material: material_idx,
                });
            }
        }

        let children: Vec<gltf::Node> = node.children().collect();
        stack.extend(children.into_iter().rev().map(|child| (child, world.clone())));
    }

    Ok(staged)
}

fn node_transform(node: &gltf::Node) -> Instance {
    let (translation, rotation, scale) = node.transform().decomposed();
    Instance {
        position: translation.into(),
        // glTF stores quaternions as [x, y, z, w]
        rotation: Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
        scale: scale.into(),
    }
}

fn projection(camera: &gltf::Camera) -> CameraProjection {
    match camera.projection() {
        gltf::camera::Projection::Perspective(p) => CameraProjection::Perspective {
            yfov: Rad(p.yfov()),
            znear: p.znear(),
            // Infinite projections get a generous far plane instead.
            zfar: p.zfar().unwrap_or(1000.0),
        },
        gltf::camera::Projection::Orthographic(o) => CameraProjection::Orthographic {
            xmag: o.xmag(),
            ymag: o.ymag(),
            znear: o.znear(),
            zfar: o.zfar(),
        },
    }
}

fn read_primitive(
    primitive: &gltf::Primitive,
    buffer_data: &[Vec<u8>],
) -> anyhow::Result<MeshGeometry> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        return Err(anyhow!("only triangle lists are supported, got {:?}", primitive.mode()));
    }
    let reader = primitive.reader(|buffer| buffer_data.get(buffer.index()).map(Vec::as_slice));
    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or_else(|| anyhow!("primitive has no positions"))?
        .collect();
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    if let Some(bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
        return Err(anyhow!("index {} out of range for {} vertices", bad, positions.len()));
    }
    let normals: Vec<[f32; 3]> = match reader.read_normals() {
        Some(normals) => normals.collect(),
        None => flat_normals(&positions, &indices),
    };

    let vertices = positions
        .iter()
        .zip(normals.iter().chain(std::iter::repeat(&[0.0, 1.0, 0.0])))
        .map(|(position, normal)| ModelVertex {
            position: *position,
            normal: *normal,
        })
        .collect();
    Ok(MeshGeometry { vertices, indices })
}

/// Area weighted vertex normals for primitives that ship without any.
fn flat_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    use cgmath::InnerSpace;

    let mut acc = vec![Vector3::new(0.0f32, 0.0, 0.0); positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let pa = Vector3::from(positions[a]);
        let face = (Vector3::from(positions[b]) - pa).cross(Vector3::from(positions[c]) - pa);
        for i in [a, b, c] {
            acc[i] += face;
        }
    }
    acc.into_iter()
        .map(|n| {
            if n.magnitude2() > f32::EPSILON {
                n.normalize().into()
            } else {
                [0.0, 1.0, 0.0]
            }
        })
        .collect()
}
