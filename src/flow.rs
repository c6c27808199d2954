//! Application event loop.
//!
//! [`run`] opens the window (or binds the canvas on the web), boots the
//! [`Playground`] asynchronously and then drives it frame by frame: physics
//! tick, camera controls, picking and rendering.
//!
//! # Lifecycle
//!
//! 1. `resumed` creates the window and starts the boot future
//! 2. The boot future creates the GPU context, the playground and the
//!    resize binding, then loads the scene and sets up lighting
//! 3. `FlowEvent::Initialized` hands the booted state to the event loop
//!    (natively the boot is awaited in place, on wasm it arrives as a user event)
//! 4. Every `RedrawRequested` advances the scene and renders it
//!
//! Any boot failure is fatal: the loop exits and [`run`] returns the error.

use std::{fmt::Debug, sync::Arc};

use futures::future::{AbortHandle, Abortable};
use instant::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalPosition,
    event::{DeviceEvent, DeviceId, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    bootstrap::{LightingReport, Playground, RenderSurface, ResizeBinding},
    camera::{CameraController, Ray},
    config::PlaygroundConfig,
    context::Context,
    physics::RapierPlugin,
    pick::PointerTracker,
    render::SceneRenderer,
    resources::FileAssets,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Everything that exists once the playground is running.
pub(crate) struct AppState {
    playground: Playground<Context>,
    renderer: SceneRenderer,
    resize: ResizeBinding,
    controller: CameraController,
    pointer: PointerTracker,
    cursor: PhysicalPosition<f64>,
    right_pressed: bool,
}

impl Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("phase", &self.playground.phase())
            .field("meshes", &self.playground.scene().mesh_count())
            .finish()
    }
}

impl AppState {
    fn controls_attached(&self) -> bool {
        self.playground
            .scene()
            .active_camera()
            .is_some_and(|camera| camera.controls_attached())
    }

    fn cursor_ray(&self) -> Option<Ray> {
        let (width, height) = self.playground.surface().size();
        self.playground
            .scene()
            .active_camera()?
            .cast_ray_from_mouse(self.cursor, width, height)
    }

    fn frame(&mut self, dt: instant::Duration) {
        if self.controls_attached() {
            if let Some(camera) = self.playground.scene_mut().active_camera_mut() {
                self.controller.update(camera, dt);
            }
        }
        self.playground.scene_mut().advance(dt.as_secs_f32());

        let (ctx, scene) = self.playground.parts_mut();
        match self.renderer.render(ctx, scene) {
            Ok(()) => {}
            // Reconfigure the surface if it's lost or outdated
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => ctx.resize(),
            Err(e) => log::error!("unable to render: {}", e),
        }
    }
}

async fn boot(window: Arc<Window>, config: PlaygroundConfig) -> anyhow::Result<AppState> {
    let ctx = Context::new(window).await?;
    let renderer = SceneRenderer::new(&ctx, config.shadow_map_size, config.shadow_extent);
    let assets = FileAssets::new(config.asset_dir.clone());

    let mut playground = Playground::new(ctx, Box::new(RapierPlugin::new()), config)?;
    let mut resize = playground.bind_events();
    // The window may already have its final size, pick it up once.
    resize.dispatch(playground.surface_mut());

    let LightingReport { casters, missing } = playground.start(&assets).await?;
    log::info!(
        "playground running with {} shadow caster(s){}",
        casters.len(),
        if missing.is_empty() {
            String::new()
        } else {
            format!(", missing {:?}", missing)
        }
    );

    Ok(AppState {
        playground,
        renderer,
        resize,
        controller: CameraController::new(4.0, 0.4),
        pointer: PointerTracker::new(),
        cursor: PhysicalPosition::new(0.0, 0.0),
        right_pressed: false,
    })
}

pub(crate) struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    proxy: winit::event_loop::EventLoopProxy<FlowEvent>,
    config: PlaygroundConfig,
    state: Option<AppState>,
    boot_handle: Option<AbortHandle>,
    error: Option<anyhow::Error>,
    last_time: Instant,
}

impl App {
    fn new(event_loop: &EventLoop<FlowEvent>, config: PlaygroundConfig) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            config,
            state: None,
            boot_handle: None,
            error: None,
            last_time: Instant::now(),
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("startup failed: {:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    fn window_attributes(&self) -> anyhow::Result<winit::window::WindowAttributes> {
        #[allow(unused_mut)]
        let mut window_attributes =
            Window::default_attributes().with_title(self.config.window_title.clone());

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;

            let document = web_sys::window()
                .and_then(|window| window.document())
                .ok_or_else(|| anyhow::anyhow!("no browser document"))?;
            let canvas = crate::bootstrap::find_canvas(&document, &self.config.canvas_id)?;
            window_attributes = window_attributes.with_canvas(Some(canvas));
        }

        Ok(window_attributes)
    }

    fn on_booted(&mut self, mut state: AppState) {
        let size = state.playground.surface().window().inner_size();
        log::debug!("booted at {}x{}", size.width, size.height);
        state.resize.dispatch(state.playground.surface_mut());
        state.playground.surface().window().request_redraw();
        self.last_time = Instant::now();
        self.state = Some(state);
    }
}

pub(crate) enum FlowEvent {
    #[allow(dead_code)]
    Initialized(Box<AppState>),
    #[allow(dead_code)]
    Failed(anyhow::Error),
}

impl Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(state) => f.debug_tuple("Initialized").field(state).finish(),
            Self::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
        }
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() || self.boot_handle.is_some() {
            return;
        }

        let window = match self
            .window_attributes()
            .and_then(|attributes| Ok(event_loop.create_window(attributes)?))
        {
            Ok(window) => Arc::new(window),
            Err(err) => return self.fail(event_loop, err),
        };

        let (handle, registration) = AbortHandle::new_pair();
        self.boot_handle = Some(handle);
        let init_future = Abortable::new(boot(window, self.config.clone()), registration);

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok(Ok(state)) => self.on_booted(state),
                Ok(Err(err)) => self.fail(event_loop, err),
                Err(_aborted) => log::info!("startup cancelled"),
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match init_future.await {
                    Ok(Ok(state)) => FlowEvent::Initialized(Box::new(state)),
                    Ok(Err(err)) => FlowEvent::Failed(err),
                    Err(_aborted) => {
                        log::info!("startup cancelled");
                        return;
                    }
                };
                if proxy.send_event(event).is_err() {
                    log::warn!("event loop closed before startup finished");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            // This is the message from our wasm `spawn_local`
            FlowEvent::Initialized(state) => self.on_booted(*state),
            FlowEvent::Failed(err) => self.fail(event_loop, err),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if state.right_pressed && state.controls_attached() {
                state.controller.handle_mouse(dx, dy);
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = &mut self.state else {
            if let WindowEvent::CloseRequested = event {
                event_loop.exit();
            }
            return;
        };

        if state.controls_attached() {
            state.controller.handle_window_events(&event);
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(_) => {
                state.resize.dispatch(state.playground.surface_mut());
            }
            WindowEvent::CursorMoved { position, .. } => state.cursor = position,
            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } => match (button, button_state.is_pressed()) {
                (MouseButton::Left, true) => {
                    let ray = state.cursor_ray();
                    state.pointer.press(state.playground.scene(), ray);
                }
                (MouseButton::Left, false) => {
                    let ray = state.cursor_ray();
                    state.pointer.release(state.playground.scene_mut(), ray);
                }
                (MouseButton::Right, pressed) => state.right_pressed = pressed,
                _ => (),
            },
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();
                state.frame(dt);
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(handle) = self.boot_handle.take() {
            handle.abort();
        }
        if let Some(state) = &mut self.state {
            state.resize.release();
        }
        log::info!("shutting down");
    }
}

/// Runs the playground until the window closes. Returns the startup error if
/// booting failed.
pub fn run(config: PlaygroundConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        let env = env_logger::Env::default().default_filter_or("info");
        if let Err(e) = env_logger::Builder::from_env(env).try_init() {
            eprintln!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Could not initialize logger: {}", e).into());
        }
    }

    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;

    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), JsValue> {
    run(PlaygroundConfig::default()).map_err(|e| JsValue::from_str(&format!("{:#}", e)))
}
