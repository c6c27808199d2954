use wgpu::util::DeviceExt;

use crate::data_structures::{light::DirectionalLight, texture::Texture};

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    // w unused, uniforms need 16 byte spacing
    direction: [f32; 4],
    // rgb colour, intensity in w
    colour: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl LightUniform {
    /// Placeholder used until the scene has a light: straight down, no shadows.
    pub fn unlit() -> Self {
        Self {
            direction: [0.0, -1.0, 0.0, 0.0],
            colour: [1.0, 1.0, 1.0, 1.0],
            view_proj: cgmath::Matrix4::from_scale(1.0).into(),
        }
    }

    pub fn from_light(light: &DirectionalLight, shadow_extent: f32) -> Self {
        let d = light.direction;
        let c = light.colour;
        Self {
            direction: [d.x, d.y, d.z, 0.0],
            colour: [c.r, c.g, c.b, light.intensity],
            view_proj: light.view_projection(shadow_extent).into(),
        }
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Light uniform plus the shadow map, as sampled by the lit pass.
pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
        ],
        label: Some("light_bind_group_layout"),
    })
}

/// Light uniform alone, as used by the shadow pass.
pub fn mk_shadow_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
        label: Some("shadow_bind_group_layout"),
    })
}

/// GPU side of the scene's first directional light: its uniform, the shadow
/// map rendered from it, and the bind groups of both passes.
#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub shadow_map: Texture,
    pub bind_group: wgpu::BindGroup,
    pub shadow_bind_group: wgpu::BindGroup,
}

impl LightResources {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        shadow_layout: &wgpu::BindGroupLayout,
        map_size: u32,
    ) -> Self {
        let uniform = LightUniform::unlit();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let shadow_map = Texture::create_shadow_map(device, map_size, "shadow_map");
        let bind_group = mk_bind_group(device, layout, &buffer, &shadow_map);
        let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: shadow_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("shadow_bind_group"),
        });
        Self {
            uniform,
            buffer,
            shadow_map,
            bind_group,
            shadow_bind_group,
        }
    }

    pub fn map_size(&self) -> u32 {
        self.shadow_map.texture.width()
    }

    /// Replaces the shadow map, e.g. when a generator asks for another size.
    pub fn resize_shadow_map(&mut self, device: &wgpu::Device, layout: &wgpu::BindGroupLayout, size: u32) {
        self.shadow_map = Texture::create_shadow_map(device, size, "shadow_map");
        self.bind_group = mk_bind_group(device, layout, &self.buffer, &self.shadow_map);
    }
}

fn mk_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
    shadow_map: &Texture,
) -> wgpu::BindGroup {
    let mut entries = vec![
        wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        },
        wgpu::BindGroupEntry {
            binding: 1,
            resource: wgpu::BindingResource::TextureView(&shadow_map.view),
        },
    ];
    if let Some(sampler) = &shadow_map.sampler {
        entries.push(wgpu::BindGroupEntry {
            binding: 2,
            resource: wgpu::BindingResource::Sampler(sampler),
        });
    }
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &entries,
        label: Some("light_bind_group"),
    })
}
