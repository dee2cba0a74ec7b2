use std::collections::HashMap;
use std::mem::size_of;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytemuck::bytes_of;
use log::{error, info};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use super::shaders::{ShaderLibrary, ShaderStage};
use crate::error::ViewerError;
use crate::frame::{FramePlan, SkyboxDraw, SkyboxUniforms, Uniforms};
use crate::obj::{MeshData, VertexLayout};
use crate::pipeline::{DepthPolicy, PipelineDescriptor, PipelineFactory};
use crate::shaders::{SKYBOX_FRAGMENT_ENTRY, SKYBOX_VERTEX_ENTRY};
use crate::skybox::{SkyboxFaceSet, SKYBOX_VERTICES};
use crate::texture::TextureImage;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const MESH_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
const SKYBOX_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// wgpu draw layer: owns the surface, uploads CPU resources on first use and
/// executes a [`FramePlan`].
pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    depth: DepthBuffer,
    clear_color: wgpu::Color,
    mesh_bind_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    mesh_sampler: wgpu::Sampler,
    meshes: HashMap<usize, (Arc<MeshData>, MeshBuffers)>,
    textures: HashMap<usize, (Arc<TextureImage>, wgpu::BindGroup)>,
    sky: SkyboxResources,
}

impl Renderer {
    /// Initializes the GPU device and surface for the provided window.
    pub async fn new(window: Arc<Window>, clear_color: [f64; 3]) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            anyhow::bail!("window has zero area");
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: Default::default(),
            backend_options: Default::default(),
        });
        let surface = instance.create_surface(Arc::clone(&window))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;

        let device_descriptor = wgpu::DeviceDescriptor {
            label: Some("viewer-device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: Default::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
        };
        let (device, queue) = adapter
            .request_device(&device_descriptor)
            .await
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("surface reports no supported formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        info!("surface {surface_format:?} {}x{}", size.width, size.height);

        let depth = DepthBuffer::create(&device, config.width, config.height);
        let mesh_bind_layout = texture_bind_layout(
            &device,
            "mesh-bind-layout",
            size_of::<Uniforms>() as u64,
            wgpu::TextureViewDimension::D2,
        );
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mesh-uniforms"),
            size: size_of::<Uniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mesh_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("mesh-sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let sky = SkyboxResources::new(&device, surface_format);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            depth,
            clear_color: wgpu::Color {
                r: clear_color[0],
                g: clear_color[1],
                b: clear_color[2],
                a: 1.0,
            },
            mesh_bind_layout,
            uniform_buffer,
            mesh_sampler,
            meshes: HashMap::new(),
            textures: HashMap::new(),
            sky,
        })
    }

    /// Pipeline factory sharing this renderer's device and bind layout.
    pub fn pipeline_factory(&self) -> WgpuPipelineFactory {
        WgpuPipelineFactory::new(
            self.device.clone(),
            ShaderLibrary::builtin(),
            self.mesh_bind_layout.clone(),
        )
    }

    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn depth_format(&self) -> wgpu::TextureFormat {
        DEPTH_FORMAT
    }

    /// Resizes the swap chain to match the new dimensions.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthBuffer::create(&self.device, new_size.width, new_size.height);
    }

    /// Draws the skybox pass, then the mesh pass.
    pub fn render(&mut self, plan: &FramePlan<'_, wgpu::RenderPipeline>) -> Result<(), wgpu::SurfaceError> {
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytes_of(&plan.uniforms));
        if let Some(sky) = &plan.skybox {
            self.sky.ensure_format(&self.device, self.config.format);
            self.sky.prepare(&self.device, &self.queue, sky);
        }
        let mesh_resources = plan.mesh.as_ref().map(|draw| {
            let mesh_key = self.ensure_mesh(draw.mesh);
            let texture_key = self.ensure_texture(draw.texture);
            (mesh_key, texture_key, draw.pipeline)
        });

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("viewer-encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("viewer-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(sky) = &plan.skybox {
                self.sky.draw(&mut pass, sky.vertex_count);
            }

            if let Some((mesh_key, texture_key, pipeline)) = mesh_resources {
                if let (Some((_, mesh)), Some((_, bind_group))) =
                    (self.meshes.get(&mesh_key), self.textures.get(&texture_key))
                {
                    pass.set_pipeline(pipeline);
                    pass.set_bind_group(0, bind_group, &[]);
                    pass.set_vertex_buffer(0, mesh.vertex.slice(..));
                    pass.set_index_buffer(mesh.index.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..mesh.index_count, 0, 0..1);
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn ensure_mesh(&mut self, mesh: &Arc<MeshData>) -> usize {
        let key = Arc::as_ptr(mesh) as usize;
        if !self.meshes.contains_key(&key) {
            let buffers = MeshBuffers::from_mesh(&self.device, mesh, "model");
            self.meshes.insert(key, (Arc::clone(mesh), buffers));
        }
        key
    }

    fn ensure_texture(&mut self, texture: &Arc<TextureImage>) -> usize {
        let key = Arc::as_ptr(texture) as usize;
        if !self.textures.contains_key(&key) {
            let view = upload_texture_2d(&self.device, &self.queue, texture);
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("mesh-bind-group"),
                layout: &self.mesh_bind_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self.uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&self.mesh_sampler),
                    },
                ],
            });
            self.textures.insert(key, (Arc::clone(texture), bind_group));
        }
        key
    }
}

/// Builds mesh pipelines from the shared WGSL library.
pub struct WgpuPipelineFactory {
    device: wgpu::Device,
    library: ShaderLibrary,
    module: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
}

impl WgpuPipelineFactory {
    pub fn new(
        device: wgpu::Device,
        library: ShaderLibrary,
        bind_layout: wgpu::BindGroupLayout,
    ) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mesh-shaders"),
            source: wgpu::ShaderSource::Wgsl(library.source().to_owned().into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mesh-pipeline-layout"),
            bind_group_layouts: &[&bind_layout],
            push_constant_ranges: &[],
        });
        Self {
            device,
            library,
            module,
            pipeline_layout,
        }
    }
}

impl PipelineFactory for WgpuPipelineFactory {
    type Pipeline = wgpu::RenderPipeline;

    fn build(&mut self, desc: &PipelineDescriptor<'_>) -> Result<Self::Pipeline, ViewerError> {
        let vertex = desc.key.vertex.entry_point();
        let fragment = desc.key.fragment.entry_point();
        if !self.library.has_entry(ShaderStage::Vertex, vertex) {
            return Err(ViewerError::not_found(format!("vertex function {vertex}"), Vec::new()));
        }
        if !self.library.has_entry(ShaderStage::Fragment, fragment) {
            return Err(ViewerError::not_found(
                format!("fragment function {fragment}"),
                Vec::new(),
            ));
        }

        let attributes = desc.layout.wgpu_attributes();
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = create_pipeline(
            &self.device,
            &PipelineParams {
                label: "mesh-pipeline",
                layout: &self.pipeline_layout,
                module: &self.module,
                vertex_entry: vertex,
                fragment_entry: fragment,
                buffer: vertex_buffer_layout(desc.layout, &attributes),
                color_format: desc.key.color_format,
                depth_format: desc.key.depth_format,
                depth: desc.depth,
                cull_mode: desc.cull_mode,
            },
        );
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(ViewerError::CompileFailure {
                key: desc.key.to_string(),
                reason: err.to_string(),
            }),
            None => Ok(pipeline),
        }
    }
}

struct PipelineParams<'a> {
    label: &'a str,
    layout: &'a wgpu::PipelineLayout,
    module: &'a wgpu::ShaderModule,
    vertex_entry: &'a str,
    fragment_entry: &'a str,
    buffer: wgpu::VertexBufferLayout<'a>,
    color_format: wgpu::TextureFormat,
    depth_format: wgpu::TextureFormat,
    depth: DepthPolicy,
    cull_mode: Option<wgpu::Face>,
}

fn create_pipeline(device: &wgpu::Device, params: &PipelineParams<'_>) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(params.label),
        layout: Some(params.layout),
        vertex: wgpu::VertexState {
            module: params.module,
            entry_point: Some(params.vertex_entry),
            compilation_options: Default::default(),
            buffers: &[params.buffer.clone()],
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: params.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: params.depth_format,
            depth_write_enabled: params.depth.write,
            depth_compare: params.depth.compare,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: params.module,
            entry_point: Some(params.fragment_entry),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: params.color_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    })
}

fn texture_bind_layout(
    device: &wgpu::Device,
    label: &str,
    uniform_size: u64,
    view_dimension: wgpu::TextureViewDimension,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(uniform_size),
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

fn upload_texture_2d(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    image: &TextureImage,
) -> wgpu::TextureView {
    let size = wgpu::Extent3d {
        width: image.width.max(1),
        height: image.height.max(1),
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("mesh-texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: MESH_TEXTURE_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    write_layer(queue, &texture, 0, image);
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn write_layer(queue: &wgpu::Queue, texture: &wgpu::Texture, layer: u32, image: &TextureImage) {
    if image.is_empty() {
        return;
    }
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d {
                x: 0,
                y: 0,
                z: layer,
            },
            aspect: wgpu::TextureAspect::All,
        },
        &image.pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(image.width * 4),
            rows_per_image: Some(image.height),
        },
        wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        },
    );
}

/// Sky pipeline, cube geometry and the uploaded cube texture.
struct SkyboxResources {
    module: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    bind_group: Option<(u64, wgpu::BindGroup)>,
}

impl SkyboxResources {
    fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat) -> Self {
        let bind_layout = texture_bind_layout(
            device,
            "skybox-bind-layout",
            size_of::<SkyboxUniforms>() as u64,
            wgpu::TextureViewDimension::Cube,
        );
        let library = ShaderLibrary::skybox();
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("skybox-shaders"),
            source: wgpu::ShaderSource::Wgsl(library.source().to_owned().into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("skybox-pipeline-layout"),
            bind_group_layouts: &[&bind_layout],
            push_constant_ranges: &[],
        });
        let pipeline = build_skybox_pipeline(device, &pipeline_layout, &module, color_format);

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("skybox-uniforms"),
            size: size_of::<SkyboxUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("skybox-vertices"),
            contents: bytemuck::cast_slice(&SKYBOX_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("skybox-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            module,
            pipeline_layout,
            color_format,
            pipeline,
            bind_layout,
            uniform_buffer,
            vertex_buffer,
            sampler,
            bind_group: None,
        }
    }

    /// Rebuilds the sky pipeline when the surface format no longer matches.
    fn ensure_format(&mut self, device: &wgpu::Device, color_format: wgpu::TextureFormat) {
        if color_format == self.color_format {
            return;
        }
        info!("skybox pipeline rebuilt for {color_format:?}");
        self.pipeline =
            build_skybox_pipeline(device, &self.pipeline_layout, &self.module, color_format);
        self.color_format = color_format;
    }

    fn prepare(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, draw: &SkyboxDraw<'_>) {
        queue.write_buffer(&self.uniform_buffer, 0, bytes_of(&draw.uniforms));
        if matches!(&self.bind_group, Some((generation, _)) if *generation == draw.generation) {
            return;
        }
        let view = upload_cube(device, queue, draw.faces);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("skybox-bind-group"),
            layout: &self.bind_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        self.bind_group = Some((draw.generation, bind_group));
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>, vertex_count: u32) {
        let (Some(pipeline), Some((_, bind_group))) = (&self.pipeline, &self.bind_group) else {
            return;
        };
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.draw(0..vertex_count, 0..1);
    }
}

fn build_skybox_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    color_format: wgpu::TextureFormat,
) -> Option<wgpu::RenderPipeline> {
    let attributes = [wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    }];
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = create_pipeline(
        device,
        &PipelineParams {
            label: "skybox-pipeline",
            layout,
            module,
            vertex_entry: SKYBOX_VERTEX_ENTRY,
            fragment_entry: SKYBOX_FRAGMENT_ENTRY,
            buffer: wgpu::VertexBufferLayout {
                array_stride: size_of::<[f32; 3]>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &attributes,
            },
            color_format,
            depth_format: DEPTH_FORMAT,
            depth: DepthPolicy::SKYBOX,
            cull_mode: None,
        },
    );
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => {
            error!("skybox pipeline unavailable: {err}");
            None
        }
        None => Some(pipeline),
    }
}

fn upload_cube(device: &wgpu::Device, queue: &wgpu::Queue, faces: &SkyboxFaceSet) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("skybox-cube"),
        size: wgpu::Extent3d {
            width: faces.width().max(1),
            height: faces.height().max(1),
            depth_or_array_layers: 6,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: SKYBOX_TEXTURE_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    for (layer, face) in faces.faces().iter().enumerate() {
        write_layer(queue, &texture, layer as u32, face);
    }
    texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some("skybox-cube-view"),
        dimension: Some(wgpu::TextureViewDimension::Cube),
        ..Default::default()
    })
}

struct MeshBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
}

impl MeshBuffers {
    fn from_mesh(device: &wgpu::Device, mesh: &MeshData, label: &str) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index,
            index_count: mesh.indices.len() as u32,
        }
    }
}

struct DepthBuffer {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthBuffer {
    fn create(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

/// Vertex buffer layout for a mesh, borrowing attribute storage from the caller.
pub fn vertex_buffer_layout<'a>(
    layout: &VertexLayout,
    attributes: &'a [wgpu::VertexAttribute],
) -> wgpu::VertexBufferLayout<'a> {
    wgpu::VertexBufferLayout {
        array_stride: layout.stride,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes,
    }
}
