//! GPU and window context.
//!
//! Owns the surface, device and queue plus the depth buffer that has to
//! follow the surface size. The playground drives resizing through
//! [`RenderSurface`], which re-reads the window size instead of trusting the
//! size carried by the event.

use std::sync::Arc;

use anyhow::anyhow;
use winit::window::Window;

use crate::{bootstrap::RenderSurface, data_structures::texture::Texture};

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    is_surface_configured: bool,
}

impl Context {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::debug!("wgpu setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        log::info!("using adapter {:?}", adapter.get_info().name);
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
                ..Default::default()
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Shaders output linear colour and rely on an sRGB surface.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow!("the surface supports no texture formats"))?;
        let present_mode = surface_caps
            .present_modes
            .first()
            .copied()
            .unwrap_or(wgpu::PresentMode::Fifo);
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let depth_texture =
            Texture::create_depth_texture(&device, [config.width, config.height], "depth_texture");

        Ok(Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            is_surface_configured: false,
        })
    }

    /// Reconfigures the surface and depth buffer. Zero sizes (minimised
    /// windows, hidden canvases) are skipped and leave the old size in place.
    pub fn resize_to(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            log::debug!("skipping resize to {}x{}", width, height);
            return false;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            Texture::create_depth_texture(&self.device, [width, height], "depth_texture");
        self.is_surface_configured = true;
        true
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn is_surface_configured(&self) -> bool {
        self.is_surface_configured
    }

    pub fn window(&self) -> &Window {
        &self.window
    }
}

impl RenderSurface for Context {
    fn resize(&mut self) {
        let size = self.window.inner_size();
        if self.resize_to(size.width, size.height) {
            log::debug!("surface resized to {}x{}", size.width, size.height);
        }
    }
}
