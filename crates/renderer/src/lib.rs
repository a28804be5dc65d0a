//! Renderer: wgpu init + depth + environment background + instanced spheres.
//! wgpu = 23.x, winit = 0.30.x

use std::sync::Arc;

use anyhow::{Context, Result};
use asset::{HdrTexture, MeshData, MeshVertex, TextureData};
use bytemuck::{Pod, Zeroable};
use corelib::scene::SceneSettings;
use glam::Vec3;
use wgpu::{
    util::DeviceExt,
    AddressMode, BindGroup, BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry,
    BindingType, BlendState, Buffer, BufferBindingType, BufferUsages, ColorTargetState,
    ColorWrites, CommandEncoder, CommandEncoderDescriptor, DepthBiasState, DepthStencilState,
    Device, DeviceDescriptor, Extent3d, Features, FilterMode, FragmentState, Instance,
    InstanceDescriptor, Limits, LoadOp, Operations, PipelineLayoutDescriptor, PowerPreference,
    PresentMode, Queue, RenderPassColorAttachment, RenderPassDescriptor, RenderPipeline,
    RenderPipelineDescriptor, Sampler, SamplerBindingType, SamplerDescriptor,
    ShaderModuleDescriptor, ShaderSource, ShaderStages, StoreOp, Surface, SurfaceConfiguration,
    SurfaceError, TextureDescriptor, TextureDimension, TextureFormat, TextureSampleType,
    TextureUsages, TextureView, TextureViewDescriptor, TextureViewDimension, VertexBufferLayout,
    VertexState, VertexStepMode,
};

use winit::{dpi::PhysicalSize, window::Window};

/// Sphere vertex as uploaded: position + normal + uv.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2],
    };
}

impl From<&MeshVertex> for Vertex {
    fn from(v: &MeshVertex) -> Self {
        Self {
            pos: v.position,
            normal: v.normal,
            uv: v.uv,
        }
    }
}

/// Per-instance model matrix, one column per attribute.
const INSTANCE_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: std::mem::size_of::<[[f32; 4]; 4]>() as u64,
    step_mode: VertexStepMode::Instance,
    attributes: &wgpu::vertex_attr_array![
        3 => Float32x4, 4 => Float32x4, 5 => Float32x4, 6 => Float32x4
    ],
};

/// Scene UBO (16-byte aligned). Mirrors `Scene` in scene.wgsl.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct SceneUniform {
    view_proj: [[f32; 4]; 4],
    inv_view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    clear_color: [f32; 4],
    ambient: [f32; 4],
    key_dir: [f32; 4],
    key_color: [f32; 4],
    fill_dir: [f32; 4],
    fill_color: [f32; 4],
    environment: [f32; 4],
    material: [f32; 4],
    material_params: [f32; 4],
}

impl SceneUniform {
    fn from_settings(scene: &SceneSettings, env_average: Option<Vec3>) -> Self {
        let view_proj = scene.camera.proj_view();
        let env = env_average.unwrap_or(Vec3::ZERO) * scene.environment_intensity;
        let env_bound = if env_average.is_some() { 1.0 } else { 0.0 };
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            inv_view_proj: view_proj.inverse().to_cols_array_2d(),
            camera_pos: scene.camera.eye.extend(1.0).to_array(),
            clear_color: scene.clear_color.to_linear().extend(1.0).to_array(),
            ambient: scene.ambient.radiance().extend(0.0).to_array(),
            key_dir: scene.key_light.to_light().extend(0.0).to_array(),
            key_color: scene.key_light.radiance().extend(0.0).to_array(),
            fill_dir: scene.fill_light.to_light().extend(0.0).to_array(),
            fill_color: scene.fill_light.radiance().extend(0.0).to_array(),
            environment: env.extend(env_bound).to_array(),
            material: scene
                .material
                .color
                .to_linear()
                .extend(scene.material.roughness.clamp(0.0, 1.0))
                .to_array(),
            material_params: [scene.material.metalness.clamp(0.0, 1.0), 0.0, 0.0, 0.0],
        }
    }
}

/// Everything an overlay pass (egui) needs after the scene is encoded.
pub struct OverlayTarget<'a> {
    pub device: &'a Device,
    pub queue: &'a Queue,
    pub encoder: &'a mut CommandEncoder,
    pub view: &'a TextureView,
    pub size: [u32; 2],
}

const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;
const CHECKER_SIZE: u32 = 64;
const HDR_EXPOSURE: f32 = 1.0;

pub struct GpuState {
    // Surface
    surface: Surface<'static>,
    surface_format: TextureFormat,
    surface_config: SurfaceConfiguration,

    // Device/queue
    device: Device,
    queue: Queue,

    // Pipelines
    background_pipeline: RenderPipeline,
    sphere_pipeline: RenderPipeline,

    // Sphere geometry + instances
    vertex_buf: Buffer,
    index_buf: Buffer,
    index_count: u32,
    instance_buf: Buffer,
    instance_capacity: usize,
    instance_count: u32,

    // Scene bindings
    scene_bgl: BindGroupLayout,
    scene_bg: BindGroup,
    scene_buf: Buffer,
    env_view: TextureView,
    env_average: Option<Vec3>,
    sampler: Sampler,

    // Material bindings
    material_bgl: BindGroupLayout,
    material_bg: BindGroup,

    // Depth
    depth_view: TextureView,

    // Size cache
    width: u32,
    height: u32,
}

impl GpuState {
    /// Create GPU state bound to an Arc<Window>.
    pub async fn new(window: Arc<Window>, scene: &SceneSettings) -> Result<Self> {
        let PhysicalSize { width, height } = window.inner_size();
        Self::with_backends(window, scene, wgpu::Backends::all(), width, height).await
    }

    /// Like [`new`](Self::new) with explicit backends and backbuffer size.
    pub async fn with_backends(
        window: Arc<Window>,
        scene: &SceneSettings,
        backends: wgpu::Backends,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let width = width.max(1);
        let height = height.max(1);

        // Instance & surface
        let instance = Instance::new(InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance
            .create_surface(window.clone())
            .context("create_surface failed")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapter")?;
        log::info!("Using adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("Lumisphere Device"),
                    required_features: Features::empty(),
                    required_limits: Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .context("request_device failed")?;

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("Surface reports no formats")?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let depth_view = create_depth_view(&device, &surface_config);

        // ==== Shaders ====
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Scene WGSL"),
            source: ShaderSource::Wgsl(include_str!("shaders/scene.wgsl").into()),
        });

        // ==== Bind group layouts ====
        let scene_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Scene BGL"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::VERTEX_FRAGMENT,
                    ty: BindingType::Buffer {
                        ty: BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<SceneUniform>() as u64,
                        ),
                    },
                    count: None,
                },
                texture_entry(1),
                BindGroupLayoutEntry {
                    binding: 2,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let material_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Material BGL"),
            entries: &[texture_entry(0)],
        });

        let scene_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scene UBO"),
            contents: bytemuck::bytes_of(&SceneUniform::from_settings(scene, None)),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some("Linear Repeat"),
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            ..Default::default()
        });

        // Until the loader delivers, the background is the clear color and
        // the spheres wear a checkerboard.
        let env_view = upload_texture(&device, &queue, &TextureData::solid([0, 0, 0, 255]), "Env");
        let base_view = upload_texture(
            &device,
            &queue,
            &TextureData::create_test_texture(CHECKER_SIZE),
            "Checker",
        );
        let scene_bg = create_scene_bind_group(&device, &scene_bgl, &scene_buf, &env_view, &sampler);
        let material_bg = create_material_bind_group(&device, &material_bgl, &base_view);

        // ==== Pipelines ====
        let background_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Background PipelineLayout"),
            bind_group_layouts: &[&scene_bgl],
            push_constant_ranges: &[],
        });
        let sphere_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Sphere PipelineLayout"),
            bind_group_layouts: &[&scene_bgl, &material_bgl],
            push_constant_ranges: &[],
        });

        let background_pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Background Pipeline"),
            layout: Some(&background_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_background"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_background"),
                targets: &[Some(color_target(surface_format))],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: Some(DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let sphere_pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Sphere Pipeline"),
            layout: Some(&sphere_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::LAYOUT, INSTANCE_LAYOUT],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(color_target(surface_format))],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            // Double-sided material.
            primitive: wgpu::PrimitiveState {
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // ==== Geometry: indexed UV sphere ====
        let s = &scene.sphere;
        let mesh = MeshData::uv_sphere(s.radius, s.width_segments, s.height_segments);
        let vertices: Vec<Vertex> = mesh.vertices.iter().map(Vertex::from).collect();
        let vertex_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sphere VB"),
            contents: bytemuck::cast_slice(&vertices),
            usage: BufferUsages::VERTEX,
        });
        let index_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sphere IB"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: BufferUsages::INDEX,
        });
        let instance_capacity = 1;
        let instance_buf = create_instance_buffer(&device, instance_capacity);

        Ok(Self {
            surface,
            surface_format,
            surface_config,
            device,
            queue,
            background_pipeline,
            sphere_pipeline,
            vertex_buf,
            index_buf,
            index_count: mesh.indices.len() as u32,
            instance_buf,
            instance_capacity,
            instance_count: 0,
            scene_bgl,
            scene_bg,
            scene_buf,
            env_view,
            env_average: None,
            sampler,
            material_bgl,
            material_bg,
            depth_view,
            width,
            height,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn surface_format(&self) -> TextureFormat {
        self.surface_format
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Replace the checkerboard with the loaded base-color map.
    /// Returns `false` and keeps the current map if the device can't hold it.
    pub fn set_base_color(&mut self, texture: &TextureData) -> bool {
        if !self.fits_device("Base color", texture.width, texture.height) {
            return false;
        }
        let view = upload_texture(&self.device, &self.queue, texture, "BaseColor");
        self.material_bg = create_material_bind_group(&self.device, &self.material_bgl, &view);
        log::debug!("Base color bound ({}x{})", texture.width, texture.height);
        true
    }

    /// Bind an equirectangular HDR map as background and ambient term.
    /// Returns `false` and keeps the clear color if the device can't hold it.
    pub fn set_environment(&mut self, hdr: &HdrTexture) -> bool {
        if !self.fits_device("Environment", hdr.width, hdr.height) {
            return false;
        }
        let ldr = hdr.to_rgba8_tonemapped(HDR_EXPOSURE);
        self.env_view = upload_texture(&self.device, &self.queue, &ldr, "Environment");
        self.env_average = Some(Vec3::from_array(hdr.average()));
        self.scene_bg = create_scene_bind_group(
            &self.device,
            &self.scene_bgl,
            &self.scene_buf,
            &self.env_view,
            &self.sampler,
        );
        log::debug!("Environment bound ({}x{})", hdr.width, hdr.height);
        true
    }

    fn fits_device(&self, what: &str, width: u32, height: u32) -> bool {
        let max = self.device.limits().max_texture_dimension_2d;
        let fits = texture_fits(width, height, max);
        if !fits {
            log::warn!("{what} texture {width}x{height} exceeds the device limit of {max}; skipped");
        }
        fits
    }

    /// Upload per-instance model matrices, growing the buffer as needed.
    pub fn set_instances(&mut self, instances: &[[[f32; 4]; 4]]) {
        if instances.len() > self.instance_capacity {
            self.instance_capacity = instances.len().next_power_of_two();
            self.instance_buf = create_instance_buffer(&self.device, self.instance_capacity);
        }
        self.queue
            .write_buffer(&self.instance_buf, 0, bytemuck::cast_slice(instances));
        self.instance_count = instances.len() as u32;
    }

    /// Resize: reconfigure surface & recreate depth view.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.surface_config.width = self.width;
        self.surface_config.height = self.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, &self.surface_config);
    }

    /// Render one frame: background + spheres, then `overlay` on top.
    pub fn render(
        &mut self,
        scene: &SceneSettings,
        overlay: impl FnOnce(OverlayTarget<'_>),
    ) -> Result<(), SurfaceError> {
        let uniform = SceneUniform::from_settings(scene, self.env_average);
        self.queue
            .write_buffer(&self.scene_buf, 0, bytemuck::bytes_of(&uniform));

        let frame = self.surface.get_current_texture()?;
        let view = frame.texture.create_view(&TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        {
            let clear = scene.clear_color.to_linear();
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("ScenePass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(wgpu::Color {
                            r: clear.x as f64,
                            g: clear.y as f64,
                            b: clear.z as f64,
                            a: 1.0,
                        }),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            rpass.set_bind_group(0, &self.scene_bg, &[]);
            rpass.set_pipeline(&self.background_pipeline);
            rpass.draw(0..3, 0..1);

            if self.instance_count > 0 {
                rpass.set_pipeline(&self.sphere_pipeline);
                rpass.set_bind_group(1, &self.material_bg, &[]);
                rpass.set_vertex_buffer(0, self.vertex_buf.slice(..));
                rpass.set_vertex_buffer(1, self.instance_buf.slice(..));
                rpass.set_index_buffer(self.index_buf.slice(..), wgpu::IndexFormat::Uint32);
                rpass.draw_indexed(0..self.index_count, 0, 0..self.instance_count);
            }
        }

        overlay(OverlayTarget {
            device: &self.device,
            queue: &self.queue,
            encoder: &mut encoder,
            view: &view,
            size: [self.width, self.height],
        });

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.resize(self.width, self.height);
    }
}

fn texture_fits(width: u32, height: u32, max_dimension: u32) -> bool {
    width > 0 && height > 0 && width <= max_dimension && height <= max_dimension
}

fn texture_entry(binding: u32) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::FRAGMENT,
        ty: BindingType::Texture {
            sample_type: TextureSampleType::Float { filterable: true },
            view_dimension: TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn color_target(format: TextureFormat) -> ColorTargetState {
    ColorTargetState {
        format,
        blend: Some(BlendState::REPLACE),
        write_mask: ColorWrites::ALL,
    }
}

fn create_scene_bind_group(
    device: &Device,
    layout: &BindGroupLayout,
    uniform: &Buffer,
    env: &TextureView,
    sampler: &Sampler,
) -> BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Scene BG"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(env),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

fn create_material_bind_group(
    device: &Device,
    layout: &BindGroupLayout,
    base_color: &TextureView,
) -> BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Material BG"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::TextureView(base_color),
        }],
    })
}

fn create_instance_buffer(device: &Device, capacity: usize) -> Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance VB"),
        size: (capacity.max(1) * std::mem::size_of::<[[f32; 4]; 4]>()) as u64,
        usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Upload an RGBA8 image as an sRGB texture and return its view.
fn upload_texture(device: &Device, queue: &Queue, tex: &TextureData, label: &str) -> TextureView {
    let size = Extent3d {
        width: tex.width.max(1),
        height: tex.height.max(1),
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: TextureFormat::Rgba8UnormSrgb,
        usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &tex.data,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * size.width),
            rows_per_image: Some(size.height),
        },
        size,
    );
    texture.create_view(&TextureViewDescriptor::default())
}

/// Create a depth texture view matching the surface config.
fn create_depth_view(device: &Device, sc: &SurfaceConfiguration) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some("DepthTex"),
        size: Extent3d {
            width: sc.width.max(1),
            height: sc.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_matches_wgsl_layout() {
        // 2 mat4 + 10 vec4
        assert_eq!(std::mem::size_of::<SceneUniform>(), 2 * 64 + 10 * 16);
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
    }

    #[test]
    fn uniform_flags_missing_environment() {
        let scene = SceneSettings::default();
        let u = SceneUniform::from_settings(&scene, None);
        assert_eq!(u.environment, [0.0; 4]);
        assert_eq!(u.camera_pos, [0.0, 0.0, 4.0, 1.0]);

        let u = SceneUniform::from_settings(&scene, Some(Vec3::ONE));
        assert_eq!(u.environment[3], 1.0);
        assert!((u.environment[0] - scene.environment_intensity).abs() < 1e-6);
    }

    #[test]
    fn uniform_carries_light_radiance() {
        let mut scene = SceneSettings::default();
        scene.key_light.intensity = 0.0;
        let u = SceneUniform::from_settings(&scene, None);
        assert_eq!(&u.key_color[..3], &[0.0, 0.0, 0.0]);
        assert!(u.fill_color[2] > 1.7);
        assert!((u.ambient[0] - 2.4).abs() < 1e-5);
    }

    #[test]
    fn uniform_carries_material() {
        let mut scene = SceneSettings::default();
        let u = SceneUniform::from_settings(&scene, None);
        assert!((u.material_params[0] - 0.7).abs() < 1e-6);
        assert!((u.material[3] - 0.8).abs() < 1e-6);

        scene.material.metalness = 3.0;
        scene.material.roughness = -1.0;
        let u = SceneUniform::from_settings(&scene, None);
        assert_eq!(u.material_params[0], 1.0);
        assert_eq!(u.material[3], 0.0);
    }

    #[test]
    fn oversized_textures_are_rejected() {
        assert!(texture_fits(1024, 512, 8192));
        assert!(texture_fits(8192, 8192, 8192));
        assert!(!texture_fits(20000, 512, 8192));
        assert!(!texture_fits(512, 8193, 8192));
        assert!(!texture_fits(0, 4, 8192));
    }

    #[test]
    fn vertices_convert_from_mesh() {
        let mesh = MeshData::uv_sphere(1.0, 4, 2);
        let v: Vec<Vertex> = mesh.vertices.iter().map(Vertex::from).collect();
        assert_eq!(v.len(), mesh.vertices.len());
        assert_eq!(v[0].pos, mesh.vertices[0].position);
    }
}
