//! egui layer: loading overlay, debug panel and the wgpu paint pass.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    time::{Duration, Instant},
};

use asset::{LoadState, ResourceLoader};
use corelib::scene::{SceneSettings, SliderRange};
use egui::{Align2, Color32, Id, LayerId, Order, RichText};
use renderer::OverlayTarget;
use winit::window::Window;

const FADE_OUT: Duration = Duration::from_secs(1);

/// Loader events mirrored into plain cells the UI can read every frame.
#[derive(Default)]
pub struct LoadingStatus {
    progress: Cell<u8>,
    ready: Cell<bool>,
    errors: RefCell<Vec<String>>,
}

impl LoadingStatus {
    /// Subscribe to `loader` and return the shared status.
    pub fn attach(loader: &mut ResourceLoader) -> Rc<Self> {
        let status = Rc::new(Self::default());

        let s = status.clone();
        loader.on_progress(move |p| s.progress.set(p));
        let s = status.clone();
        loader.on_ready(move || s.ready.set(true));
        let s = status.clone();
        loader.on_error(move |e| s.errors.borrow_mut().push(e.to_string()));

        status
    }

    pub fn progress(&self) -> u8 {
        self.progress.get()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.get()
    }

    pub fn errors(&self) -> std::cell::Ref<'_, Vec<String>> {
        self.errors.borrow()
    }

    pub fn label(&self) -> String {
        format!("{}%", self.progress())
    }
}

/// Overlay opacity `elapsed` after the ready event.
pub fn overlay_alpha(elapsed: Duration) -> f32 {
    1.0 - (elapsed.as_secs_f32() / FADE_OUT.as_secs_f32()).clamp(0.0, 1.0)
}

/// Full-window curtain with the progress label, faded out once ready.
#[derive(Default)]
pub struct LoadingOverlay {
    ready_at: Option<Instant>,
}

impl LoadingOverlay {
    pub fn is_visible(&self) -> bool {
        self.ready_at.is_none_or(|t| t.elapsed() < FADE_OUT)
    }

    pub fn show(&mut self, ctx: &egui::Context, status: &LoadingStatus, state: LoadState) {
        if status.is_ready() && self.ready_at.is_none() {
            self.ready_at = Some(Instant::now());
        }
        let alpha = self.ready_at.map_or(1.0, |t| overlay_alpha(t.elapsed()));
        if alpha <= 0.0 {
            return;
        }

        let curtain = (alpha * 255.0) as u8;
        ctx.layer_painter(LayerId::new(Order::Middle, Id::new("loading_curtain")))
            .rect_filled(ctx.screen_rect(), 0.0, Color32::from_black_alpha(curtain));

        let text = match state {
            LoadState::Stalled => format!("{} (stalled)", status.label()),
            _ => status.label(),
        };
        egui::Area::new(Id::new("loading_label"))
            .order(Order::Foreground)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .interactable(false)
            .show(ctx, |ui| {
                ui.label(
                    RichText::new(text)
                        .size(48.0)
                        .color(Color32::from_white_alpha(curtain)),
                );
            });
    }
}

fn intensity_slider(ui: &mut egui::Ui, label: &str, value: &mut f32, range: SliderRange) {
    ui.add(
        egui::Slider::new(value, range.min..=range.max)
            .step_by(range.step as f64)
            .text(label),
    );
    *value = range.clamp_snap(*value);
}

/// Light intensity sliders plus any asset failures.
pub fn debug_panel(ctx: &egui::Context, scene: &mut SceneSettings, status: &LoadingStatus) {
    let range = scene.intensity_range;
    egui::Window::new("Debug")
        .anchor(Align2::RIGHT_TOP, [-8.0, 8.0])
        .resizable(false)
        .show(ctx, |ui| {
            intensity_slider(ui, "Ambient", &mut scene.ambient.intensity, range);
            intensity_slider(ui, "Directional", &mut scene.key_light.intensity, range);
            intensity_slider(ui, "Directional 2", &mut scene.fill_light.intensity, range);

            let errors = status.errors();
            if !errors.is_empty() {
                ui.separator();
                for e in errors.iter() {
                    ui.colored_label(Color32::LIGHT_RED, e.as_str());
                }
            }
        });
}

/// egui context + winit glue + wgpu painter.
pub struct EguiLayer {
    ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
}

impl EguiLayer {
    pub fn new(window: &Window, device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let ctx = egui::Context::default();
        let state = egui_winit::State::new(
            ctx.clone(),
            ctx.viewport_id(),
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let renderer = egui_wgpu::Renderer::new(device, format, None, 1, false);
        Self {
            ctx,
            state,
            renderer,
        }
    }

    /// Returns `true` if egui consumed the event.
    pub fn on_window_event(&mut self, window: &Window, event: &winit::event::WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Run the UI for one frame and return what needs painting.
    pub fn run(&mut self, window: &Window, ui: impl FnMut(&egui::Context)) -> EguiFrame {
        let raw = self.state.take_egui_input(window);
        let output = self.ctx.run(raw, ui);
        self.state
            .handle_platform_output(window, output.platform_output);
        EguiFrame {
            shapes: output.shapes,
            textures_delta: output.textures_delta,
        }
    }

    /// Encode `frame` on top of the scene in `target`.
    pub fn paint(&mut self, target: OverlayTarget<'_>, frame: EguiFrame, pixels_per_point: f32) {
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: target.size,
            pixels_per_point,
        };
        let jobs = self.ctx.tessellate(frame.shapes, pixels_per_point);

        for (id, delta) in &frame.textures_delta.set {
            self.renderer
                .update_texture(target.device, target.queue, *id, delta);
        }
        let extra = self.renderer.update_buffers(
            target.device,
            target.queue,
            target.encoder,
            &jobs,
            &screen,
        );
        if !extra.is_empty() {
            target.queue.submit(extra);
        }

        {
            let mut pass = target
                .encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("EguiPass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: target.view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    occlusion_query_set: None,
                    timestamp_writes: None,
                })
                .forget_lifetime();
            self.renderer.render(&mut pass, &jobs, &screen);
        }

        for id in &frame.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }
}

pub struct EguiFrame {
    shapes: Vec<egui::epaint::ClippedShape>,
    textures_delta: egui::TexturesDelta,
}
