use crate::{
    data_structures::{geometry::ModelVertex, instance::InstanceRaw, texture::Texture},
    pipelines::basic::mk_render_pipeline,
};

/// Depth-only pipeline that renders shadow casters from the light.
pub fn mk_shadow_pipeline(
    device: &wgpu::Device,
    light_uniform_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Shadow Pipeline Layout"),
        bind_group_layouts: &[light_uniform_layout],
        push_constant_ranges: &[],
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Shadow Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shadow.wgsl").into()),
    };

    mk_render_pipeline(
        device,
        &layout,
        None,
        None,
        Some(Texture::DEPTH_FORMAT),
        // Slope scaled bias against acne on surfaces facing away from the light
        wgpu::DepthBiasState {
            constant: 2,
            slope_scale: 2.0,
            clamp: 0.0,
        },
        &[ModelVertex::desc(), InstanceRaw::desc()],
        shader,
    )
}
