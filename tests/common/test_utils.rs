#![allow(dead_code)]

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use cgmath::{Quaternion, Vector3};
use flow_playground::{
    bootstrap::{CanvasLookup, RenderSurface},
    data_structures::geometry::MeshGeometry,
    physics::{BodyDescriptor, BodyHandle, PhysicsConfig, PhysicsPlugin},
    resources::{AssetSource, InMemoryAssets},
};

/// Counts how often the playground asked it to resize.
#[derive(Debug, Default)]
pub struct CountingSurface {
    pub resizes: u32,
}

impl RenderSurface for CountingSurface {
    fn resize(&mut self) {
        self.resizes += 1;
    }
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub config: Option<PhysicsConfig>,
    pub bodies: Vec<BodyDescriptor>,
    pub steps: Vec<f32>,
}

/// Physics backend that only remembers what it was asked to do. Bodies stay
/// where they were created.
#[derive(Clone, Default)]
pub struct RecordingPhysics {
    pub log: Rc<RefCell<Recorded>>,
}

impl RecordingPhysics {
    pub fn new() -> (Self, Rc<RefCell<Recorded>>) {
        let physics = Self::default();
        let log = physics.log.clone();
        (physics, log)
    }
}

impl PhysicsPlugin for RecordingPhysics {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn init(&mut self, config: &PhysicsConfig) {
        self.log.borrow_mut().config = Some(config.clone());
    }

    fn add_body(&mut self, body: &BodyDescriptor) -> BodyHandle {
        let mut log = self.log.borrow_mut();
        log.bodies.push(body.clone());
        BodyHandle(log.bodies.len() as u64 - 1)
    }

    fn step(&mut self, dt: f32) {
        self.log.borrow_mut().steps.push(dt);
    }

    fn body_pose(&self, handle: BodyHandle) -> Option<(Vector3<f32>, Quaternion<f32>)> {
        let log = self.log.borrow();
        let body = log.bodies.get(handle.0 as usize)?;
        Some((body.position, body.rotation))
    }

    fn linear_velocity(&self, handle: BodyHandle) -> Option<Vector3<f32>> {
        let log = self.log.borrow();
        log.bodies
            .get(handle.0 as usize)
            .map(|_| Vector3::new(0.0, 0.0, 0.0))
    }
}

/// Canvas lookup over a fixed set of element ids. `true` marks a canvas.
#[derive(Debug, Default)]
pub struct MapLookup {
    pub elements: HashMap<String, bool>,
}

impl MapLookup {
    pub fn with(mut self, id: &str, is_canvas: bool) -> Self {
        self.elements.insert(id.to_string(), is_canvas);
        self
    }
}

impl CanvasLookup for MapLookup {
    type Canvas = String;

    fn lookup(&self, id: &str) -> Result<Option<Self::Canvas>, String> {
        match self.elements.get(id) {
            Some(true) => Ok(Some(id.to_string())),
            Some(false) => Err("found a <div>".to_string()),
            None => Ok(None),
        }
    }
}

/// An asset source whose fetches never complete.
#[derive(Debug, Default)]
pub struct PendingAssets;

impl AssetSource for PendingAssets {
    async fn fetch(&self, _path: &str) -> anyhow::Result<Vec<u8>> {
        futures::future::pending().await
    }
}

pub struct FixtureMesh {
    pub name: &'static str,
    pub translation: [f32; 3],
    pub colour: [f32; 4],
    /// Nested under the previous mesh node instead of the scene root.
    pub child_of_previous: bool,
}

impl FixtureMesh {
    pub fn at(name: &'static str, translation: [f32; 3]) -> Self {
        Self {
            name,
            translation,
            colour: [0.2, 0.7, 0.2, 1.0],
            child_of_previous: false,
        }
    }

    pub fn coloured(mut self, colour: [f32; 4]) -> Self {
        self.colour = colour;
        self
    }

    pub fn nested(mut self) -> Self {
        self.child_of_previous = true;
        self
    }
}

/// Builds `scenes/scene.gltf` plus `scenes/scene.bin` in memory. Every mesh
/// is a unit cube with its own material.
pub struct SceneFixture {
    pub cameras: Vec<[f32; 3]>,
    pub meshes: Vec<FixtureMesh>,
}

impl SceneFixture {
    pub fn new() -> Self {
        Self {
            cameras: Vec::new(),
            meshes: Vec::new(),
        }
    }

    pub fn camera(mut self, translation: [f32; 3]) -> Self {
        self.cameras.push(translation);
        self
    }

    pub fn mesh(mut self, mesh: FixtureMesh) -> Self {
        self.meshes.push(mesh);
        self
    }

    /// The default playground scene: one camera and `cube2`.
    pub fn playground() -> Self {
        Self::new()
            .camera([0.0, 6.0, 12.0])
            .mesh(FixtureMesh::at("cube2", [-2.0, 0.5, 0.0]))
    }

    pub fn gltf(&self) -> (String, Vec<u8>) {
        let cube = MeshGeometry::cube(1.0);
        let mut bin = Vec::new();
        for v in &cube.vertices {
            for c in v.position {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
        let positions_len = bin.len();
        for v in &cube.vertices {
            for c in v.normal {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
        let normals_len = bin.len() - positions_len;
        for i in &cube.indices {
            bin.extend_from_slice(&i.to_le_bytes());
        }
        let indices_len = bin.len() - positions_len - normals_len;

        let mut nodes = Vec::new();
        let mut roots = Vec::new();
        for translation in &self.cameras {
            roots.push(nodes.len());
            nodes.push(format!(
                r#"{{"name":"camera{}","camera":0,"translation":[{},{},{}]}}"#,
                nodes.len(),
                translation[0],
                translation[1],
                translation[2]
            ));
        }
        let mut materials = Vec::new();
        let mut previous: Option<usize> = None;
        let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
        for mesh in &self.meshes {
            let idx = nodes.len();
            let material = materials.len();
            materials.push(format!(
                r#"{{"name":"{}Material","pbrMetallicRoughness":{{"baseColorFactor":[{},{},{},{}]}}}}"#,
                mesh.name, mesh.colour[0], mesh.colour[1], mesh.colour[2], mesh.colour[3]
            ));
            nodes.push(format!(
                r#"{{"name":"{}","mesh":{},"translation":[{},{},{}]CHILDREN{}}}"#,
                mesh.name, material, mesh.translation[0], mesh.translation[1], mesh.translation[2], idx
            ));
            match (mesh.child_of_previous, previous) {
                (true, Some(parent)) => children.entry(parent).or_default().push(idx),
                _ => roots.push(idx),
            }
            previous = Some(idx);
        }
        let nodes: Vec<String> = nodes
            .into_iter()
            .enumerate()
            .map(|(idx, node)| {
                let marker = format!("CHILDREN{}", idx);
                let replacement = match children.get(&idx) {
                    Some(kids) => format!(
                        r#","children":[{}]"#,
                        kids.iter().map(|k| k.to_string()).collect::<Vec<_>>().join(",")
                    ),
                    None => String::new(),
                };
                node.replace(&marker, &replacement)
            })
            .collect();
        let meshes: Vec<String> = (0..self.meshes.len())
            .map(|material| {
                format!(
                    r#"{{"primitives":[{{"attributes":{{"POSITION":0,"NORMAL":1}},"indices":2,"material":{}}}]}}"#,
                    material
                )
            })
            .collect();
        let cameras = if self.cameras.is_empty() {
            String::new()
        } else {
            r#""cameras":[{"type":"perspective","perspective":{"yfov":0.8,"znear":0.1,"zfar":100}}],"#
                .to_string()
        };
        let meshes_json = if meshes.is_empty() {
            String::new()
        } else {
            format!(
                r#""meshes":[{}],"materials":[{}],"#,
                meshes.join(","),
                materials.join(",")
            )
        };

        let json = format!(
            r#"{{
  "asset":{{"version":"2.0"}},
  "scene":0,
  "scenes":[{{"nodes":[{roots}]}}],
  "nodes":[{nodes}],
  {cameras}
  {meshes_json}
  "buffers":[{{"uri":"scene.bin","byteLength":{len}}}],
  "bufferViews":[
    {{"buffer":0,"byteOffset":0,"byteLength":{positions_len}}},
    {{"buffer":0,"byteOffset":{positions_len},"byteLength":{normals_len}}},
    {{"buffer":0,"byteOffset":{indices_offset},"byteLength":{indices_len}}}
  ],
  "accessors":[
    {{"bufferView":0,"componentType":5126,"count":{count},"type":"VEC3","min":[-0.5,-0.5,-0.5],"max":[0.5,0.5,0.5]}},
    {{"bufferView":1,"componentType":5126,"count":{count},"type":"VEC3"}},
    {{"bufferView":2,"componentType":5125,"count":{index_count},"type":"SCALAR"}}
  ]
}}"#,
            roots = roots.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(","),
            nodes = nodes.join(","),
            len = bin.len(),
            indices_offset = positions_len + normals_len,
            count = cube.vertices.len(),
            index_count = cube.indices.len(),
        );
        (json, bin)
    }

    pub fn assets(&self) -> InMemoryAssets {
        let (json, bin) = self.gltf();
        InMemoryAssets::new()
            .with_file("scenes/scene.gltf", json)
            .with_file("scenes/scene.bin", bin)
    }
}

pub fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-4,
        "expected {} to be close to {}",
        actual,
        expected
    );
}
