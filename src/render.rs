//! Draws a [`Scene`] to the window.
//!
//! Meshes are batched by geometry: built-in primitives of the same shape and
//! size share one vertex/index buffer and are drawn instanced, imported meshes
//! get their own. Each frame renders the shadow casters into the light's
//! depth map first and then draws every mesh lit.

use std::{collections::HashMap, iter};

use wgpu::util::DeviceExt;

use crate::{
    camera::CameraUniform,
    context::Context,
    data_structures::{
        instance::InstanceRaw,
        material::Colour3,
        scene_graph::{MeshId, MeshNode, Scene},
    },
    pipelines::{
        basic::mk_scene_pipeline,
        light::{self, LightResources, LightUniform},
        mk_camera_bind_group_layout,
        shadow::mk_shadow_pipeline,
    },
};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum GeometryKey {
    Shared(String),
    Imported(MeshId),
}

impl GeometryKey {
    fn of(id: MeshId, mesh: &MeshNode) -> Self {
        match mesh.geometry.share_key() {
            Some(key) => GeometryKey::Shared(key),
            None => GeometryKey::Imported(id),
        }
    }
}

#[derive(Debug)]
struct GpuGeometry {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    count: u32,
}

/// One instanced draw.
struct Batch<'a> {
    geometry: &'a GpuGeometry,
    instances: wgpu::Buffer,
    amount: u32,
}

#[derive(Debug)]
pub struct SceneRenderer {
    scene_pipeline: wgpu::RenderPipeline,
    shadow_pipeline: wgpu::RenderPipeline,
    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    light_layout: wgpu::BindGroupLayout,
    light: LightResources,
    shadow_extent: f32,
    geometries: HashMap<GeometryKey, GpuGeometry>,
}

impl SceneRenderer {
    pub fn new(ctx: &Context, shadow_map_size: u32, shadow_extent: f32) -> Self {
        let device = &ctx.device;
        let camera_layout = mk_camera_bind_group_layout(device);
        let camera_uniform = CameraUniform::new();
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let light_layout = light::mk_bind_group_layout(device);
        let shadow_layout = light::mk_shadow_bind_group_layout(device);
        let light = LightResources::new(device, &light_layout, &shadow_layout, shadow_map_size);

        Self {
            scene_pipeline: mk_scene_pipeline(device, &ctx.config, &camera_layout, &light_layout),
            shadow_pipeline: mk_shadow_pipeline(device, &shadow_layout),
            camera_uniform,
            camera_buffer,
            camera_bind_group,
            light_layout,
            light,
            shadow_extent,
            geometries: HashMap::new(),
        }
    }

    /// Uploads geometry for meshes the renderer has not seen yet.
    fn upload(&mut self, device: &wgpu::Device, scene: &Scene) {
        for (id, mesh) in scene.meshes() {
            let key = GeometryKey::of(id, mesh);
            if self.geometries.contains_key(&key) {
                continue;
            }
            let geometry = mesh.geometry.build();
            if geometry.is_empty() {
                continue;
            }
            let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Vertex Buffer", mesh.name)),
                contents: bytemuck::cast_slice(&geometry.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Index Buffer", mesh.name)),
                contents: bytemuck::cast_slice(&geometry.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            log::debug!("uploaded geometry {:?}", key);
            self.geometries.insert(
                key,
                GpuGeometry {
                    vertex,
                    index,
                    count: geometry.indices.len() as u32,
                },
            );
        }
    }

    fn update_uniforms(&mut self, ctx: &Context, scene: &Scene) -> bool {
        let (width, height) = ctx.size();
        if let Some(camera) = scene.active_camera() {
            self.camera_uniform.update_view_proj(camera, width, height);
            ctx.queue.write_buffer(
                &self.camera_buffer,
                0,
                bytemuck::cast_slice(&[self.camera_uniform]),
            );
        }

        let generator = scene.shadow_generators().first();
        let light = match generator {
            Some(generator) => scene.light(generator.light),
            None => scene.lights().first(),
        };
        if let Some(generator) = generator {
            if generator.map_size != self.light.map_size() {
                self.light
                    .resize_shadow_map(&ctx.device, &self.light_layout, generator.map_size);
            }
        }
        self.light.uniform = match light {
            Some(light) => LightUniform::from_light(light, self.shadow_extent),
            None => LightUniform::unlit(),
        };
        ctx.queue
            .write_buffer(&self.light.buffer, 0, bytemuck::cast_slice(&[self.light.uniform]));
        generator.is_some()
    }

    fn batches<'a>(
        &'a self,
        device: &wgpu::Device,
        scene: &Scene,
        filter: impl Fn(MeshId) -> bool,
    ) -> Vec<Batch<'a>> {
        let mut grouped: HashMap<GeometryKey, Vec<InstanceRaw>> = HashMap::new();
        for (id, mesh) in scene.meshes().filter(|(id, _)| filter(*id)) {
            let colour = scene
                .mesh_material(id)
                .map(|material| material.diffuse)
                .unwrap_or(Colour3::WHITE);
            grouped
                .entry(GeometryKey::of(id, mesh))
                .or_default()
                .push(mesh.transform.to_raw(colour.to_array(), mesh.receive_shadows));
        }

        grouped
            .into_iter()
            .filter_map(|(key, instances)| {
                let geometry = self.geometries.get(&key)?;
                let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Instance Buffer"),
                    contents: bytemuck::cast_slice(&instances),
                    usage: wgpu::BufferUsages::VERTEX,
                });
                Some(Batch {
                    geometry,
                    instances: buffer,
                    amount: instances.len() as u32,
                })
            })
            .collect()
    }

    pub fn render(&mut self, ctx: &Context, scene: &Scene) -> Result<(), wgpu::SurfaceError> {
        ctx.window.request_redraw();
        if !ctx.is_surface_configured() {
            return Ok(());
        }

        self.upload(&ctx.device, scene);
        let shadows = self.update_uniforms(ctx, scene);

        let output = ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        if shadows {
            let casters = self.batches(&ctx.device, scene, |id| scene.casts_shadow(id));
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.light.shadow_map.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            shadow_pass.set_pipeline(&self.shadow_pipeline);
            shadow_pass.set_bind_group(0, &self.light.shadow_bind_group, &[]);
            draw_batches(&mut shadow_pass, &casters);
        }

        {
            let meshes = self.batches(&ctx.device, scene, |_| true);
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(scene.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&self.scene_pipeline);
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            render_pass.set_bind_group(1, &self.light.bind_group, &[]);
            draw_batches(&mut render_pass, &meshes);
        }

        ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

fn draw_batches(pass: &mut wgpu::RenderPass<'_>, batches: &[Batch<'_>]) {
    for batch in batches {
        if batch.amount == 0 {
            continue;
        }
        pass.set_vertex_buffer(0, batch.geometry.vertex.slice(..));
        pass.set_vertex_buffer(1, batch.instances.slice(..));
        pass.set_index_buffer(batch.geometry.index.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..batch.geometry.count, 0, 0..batch.amount);
    }
}
