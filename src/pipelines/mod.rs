//! Render pipelines.
//!
//! - `basic` is the lit pass every mesh is drawn with
//! - `shadow` is the depth-only pass rendered from the light
//! - `light` holds the light uniform and shadow map bindings shared by both

pub mod basic;
pub mod light;
pub mod shadow;

pub fn mk_camera_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("camera_bind_group_layout"),
    })
}
