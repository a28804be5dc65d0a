//! Platform layer: windowing, event loop and the asset loading lifecycle.
//!
//! The window opens immediately with a checkerboard sphere and a loading
//! overlay. The [`ResourceLoader`] is polled once per loop iteration; when it
//! reports ready, the `basecolor` texture and the `environment` map are handed
//! to the renderer and the overlay fades out.

mod ui;

use std::{path::PathBuf, rc::Rc, sync::Arc};

use anyhow::Result;
use asset::{FailurePolicy, LoaderRegistry, Manifest, ResourceLoader};
use corelib::{
    camera::OrbitControls,
    ecs::{MeshKind, Renderable, World},
    scene::{SceneSettings, Sizes},
    transform::Transform,
};
use renderer::GpuState;
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

pub use ui::{LoadingOverlay, LoadingStatus, overlay_alpha};

/// Names the viewer looks up in the loaded items.
pub const BASE_COLOR_ASSET: &str = "basecolor";
pub const ENVIRONMENT_ASSET: &str = "environment";

/// Pixels of trackpad scroll that count as one wheel notch.
const PIXELS_PER_NOTCH: f64 = 50.0;

pub struct RunOptions {
    pub backends: wgpu::Backends,
    pub width: u32,
    pub height: u32,
    pub manifest: Manifest,
    pub asset_root: PathBuf,
    pub failure_policy: FailurePolicy,
    pub scene: SceneSettings,
}

/// Open the viewer window and run until it is closed.
pub fn run(options: RunOptions) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|e| anyhow::anyhow!("Event loop error: {e:?}"))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(options);
    event_loop
        .run_app(&mut app)
        .map_err(|e| anyhow::anyhow!("Event loop error: {e:?}"))?;

    match app.fatal.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Spheres as entities: one per grid position, uniformly scaled.
fn build_world(scene: &SceneSettings) -> World {
    let mut world = World::new();
    for p in scene.sphere.positions() {
        world.spawn(
            Transform::from_translation(p).with_uniform_scale(scene.sphere.scale),
            Some(Renderable {
                mesh: MeshKind::Sphere,
            }),
        );
    }
    world
}

struct App {
    backends: wgpu::Backends,
    initial_size: PhysicalSize<u32>,
    scene: SceneSettings,
    world: World,
    orbit: OrbitControls,
    sizes: Sizes,

    loader: ResourceLoader,
    status: Rc<LoadingStatus>,
    overlay: LoadingOverlay,
    assets_bound: bool,

    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    egui: Option<ui::EguiLayer>,

    dragging: bool,
    cursor: Option<PhysicalPosition<f64>>,
    fatal: Option<anyhow::Error>,
}

impl App {
    fn new(options: RunOptions) -> Self {
        let RunOptions {
            backends,
            width,
            height,
            manifest,
            asset_root,
            failure_policy,
            scene,
        } = options;

        log::info!(
            "Loading {} assets from {} ({:?} policy)",
            manifest.len(),
            asset_root.display(),
            failure_policy
        );
        let registry = LoaderRegistry::with_defaults(asset_root);
        let mut loader = ResourceLoader::with_policy(manifest, &registry, failure_policy);
        let status = LoadingStatus::attach(&mut loader);
        loader.on_ready(|| log::info!("Assets ready"));

        Self {
            backends,
            initial_size: PhysicalSize::new(width.max(1), height.max(1)),
            world: build_world(&scene),
            orbit: OrbitControls::from_camera(&scene.camera),
            sizes: Sizes::from_physical(width, height, 1.0),
            scene,
            loader,
            status,
            overlay: LoadingOverlay::default(),
            assets_bound: false,
            window: None,
            gpu: None,
            egui: None,
            dragging: false,
            cursor: None,
            fatal: None,
        }
    }

    fn init_graphics(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("Lumisphere")
            .with_inner_size(self.initial_size);
        let window = Arc::new(event_loop.create_window(attrs)?);

        let size = window.inner_size();
        self.on_resize(size, window.scale_factor());
        let (w, h) = self.sizes.render_size();
        log::info!(
            "Window created: {}x{} (render {}x{}, pixel ratio {:.2})",
            size.width,
            size.height,
            w,
            h,
            self.sizes.pixel_ratio
        );

        let mut gpu = pollster::block_on(GpuState::with_backends(
            window.clone(),
            &self.scene,
            self.backends,
            w,
            h,
        ))?;
        gpu.set_instances(&self.world.instances_of(MeshKind::Sphere));

        self.egui = Some(ui::EguiLayer::new(
            &window,
            gpu.device(),
            gpu.surface_format(),
        ));
        self.gpu = Some(gpu);
        self.window = Some(window);
        Ok(())
    }

    fn on_resize(&mut self, size: PhysicalSize<u32>, scale_factor: f64) {
        self.sizes = Sizes::from_physical(size.width.max(1), size.height.max(1), scale_factor);
        self.scene.camera.aspect = self.sizes.aspect();
        if let Some(gpu) = self.gpu.as_mut() {
            let (w, h) = self.sizes.render_size();
            gpu.resize(w, h);
        }
    }

    /// Hand finished assets to the GPU once the loader is ready.
    fn bind_assets(&mut self) {
        if self.assets_bound || !self.status.is_ready() {
            return;
        }
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        self.assets_bound = true;

        match self.loader.get(BASE_COLOR_ASSET).and_then(|a| a.as_texture()) {
            Some(texture) => {
                gpu.set_base_color(texture);
            }
            None => log::warn!("No '{BASE_COLOR_ASSET}' texture loaded; keeping the checkerboard"),
        }
        match self.loader.get(ENVIRONMENT_ASSET).and_then(|a| a.as_radiance()) {
            Some(hdr) => {
                gpu.set_environment(hdr);
            }
            None => log::warn!("No '{ENVIRONMENT_ASSET}' environment loaded"),
        }
    }

    fn on_pointer(&mut self, event: &WindowEvent) {
        match *event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.dragging = state == ElementState::Pressed;
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let (true, Some(last)) = (self.dragging, self.cursor) {
                    let height = self.sizes.height * self.sizes.pixel_ratio;
                    self.orbit.rotate(
                        (position.x - last.x) as f32,
                        (position.y - last.y) as f32,
                        height,
                    );
                }
                self.cursor = Some(position);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => (p.y / PIXELS_PER_NOTCH) as f32,
                };
                self.orbit.zoom(steps);
            }
            _ => {}
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        self.orbit.update(&mut self.scene.camera);

        let (Some(window), Some(gpu), Some(egui)) =
            (self.window.as_ref(), self.gpu.as_mut(), self.egui.as_mut())
        else {
            return;
        };

        let state = self.loader.state();
        let scene = &mut self.scene;
        let status = &self.status;
        let overlay = &mut self.overlay;
        let frame = egui.run(window, |ctx| {
            ui::debug_panel(ctx, scene, status);
            overlay.show(ctx, status, state);
        });

        let pixels_per_point = self.sizes.pixel_ratio;
        let result = gpu.render(&self.scene, |target| {
            egui.paint(target, frame, pixels_per_point)
        });
        match result {
            Ok(()) => {}
            Err(e) if GpuState::is_surface_lost(&e) => {
                log::warn!("Surface lost/outdated: {e:?}. Recreating...");
                gpu.recreate_surface();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of memory. Exiting.");
                event_loop.exit();
            }
            Err(e) => log::warn!("Frame skipped: {e:?}"),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init_graphics(event_loop) {
            log::error!("Graphics init failed: {err:#}");
            self.fatal = Some(err);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let consumed = match (self.window.as_ref(), self.egui.as_mut()) {
            (Some(window), Some(egui)) => egui.on_window_event(window, &event),
            _ => false,
        };

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                let scale = self.window.as_ref().map_or(1.0, |w| w.scale_factor());
                log::debug!("Resized: {}x{}", size.width, size.height);
                self.on_resize(size, scale);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                log::info!("Scale factor changed: {scale_factor:.3}");
                if let Some(size) = self.window.as_ref().map(|w| w.inner_size()) {
                    self.on_resize(size, scale_factor);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            ref pointer if !consumed && !self.overlay.is_visible() => self.on_pointer(pointer),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        self.loader.poll();
        self.bind_assets();
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}
