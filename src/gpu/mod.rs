//! wgpu pipeline for the particle field.
//!
//! One render pipeline, one uniform buffer and five dynamic vertex streams
//! (position, size, opacity, color, phase). The streams are rebuilt
//! wholesale every frame and sized exactly to the live particle count — no
//! partial or incremental updates. This O(n) re-upload is a deliberate
//! simplicity-over-efficiency tradeoff; the population is capped at 200.
//!
//! Each particle is drawn as a soft circular sprite: a per-instance
//! billboard quad expanded in the vertex stage, with a breathing size
//! oscillation and an additive glow that follows it. The whole population
//! goes out in a single draw call with standard alpha blending.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::error::GpuError;
use crate::particle::ParticleStore;

/// WGSL for the field. Pixel-space positions are mapped to clip space with a
/// Y-flip; sprite size breathes with `1 + 0.1*sin(2t + phase)`, reduced by
/// 30% when the field is globally not visible.
pub(crate) const SHADER_SOURCE: &str = r#"
struct Uniforms {
    resolution: vec2<f32>,
    time: f32,
    global_opacity: f32,
    visible: f32,
}

@group(0) @binding(0) var<uniform> uniforms: Uniforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) color: vec3<f32>,
    @location(2) alpha: f32,
    @location(3) breathing: f32,
}

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    @location(0) position: vec2<f32>,
    @location(1) size: f32,
    @location(2) opacity: f32,
    @location(3) color: vec3<f32>,
    @location(4) phase: f32,
) -> VertexOutput {
    var quad = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>( 1.0, -1.0),
        vec2<f32>(-1.0,  1.0),
        vec2<f32>(-1.0,  1.0),
        vec2<f32>( 1.0, -1.0),
        vec2<f32>( 1.0,  1.0),
    );
    let corner = quad[vertex_index];

    var breathing = 1.0 + 0.1 * sin(uniforms.time * 2.0 + phase);
    if uniforms.visible < 0.5 {
        breathing = breathing * 0.7;
    }

    let world = position + corner * size * breathing;
    let clip = vec2<f32>(
        world.x / uniforms.resolution.x * 2.0 - 1.0,
        1.0 - world.y / uniforms.resolution.y * 2.0,
    );

    var out: VertexOutput;
    out.clip_position = vec4<f32>(clip, 0.0, 1.0);
    out.uv = corner * 0.5;
    out.color = color;
    out.alpha = opacity * uniforms.global_opacity;
    out.breathing = breathing;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let dist = length(in.uv);
    let alpha = (1.0 - smoothstep(0.3, 0.5, dist)) * in.alpha;
    let glow = (in.breathing - 1.0) * 2.0;
    let rgb = in.color + in.color * glow;
    return vec4<f32>(rgb, alpha);
}
"#;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Uniforms {
    resolution: [f32; 2],
    time: f32,
    global_opacity: f32,
    visible: f32,
    _padding: [f32; 3],
}

/// CPU-side staging for the five vertex streams.
#[derive(Default)]
struct Streams {
    positions: Vec<f32>,
    sizes: Vec<f32>,
    opacities: Vec<f32>,
    colors: Vec<f32>,
    phases: Vec<f32>,
}

impl Streams {
    fn rebuild(&mut self, store: &ParticleStore) {
        self.positions.clear();
        self.sizes.clear();
        self.opacities.clear();
        self.colors.clear();
        self.phases.clear();
        for p in &store.particles {
            self.positions.extend_from_slice(&[p.position.x, p.position.y]);
            self.sizes.push(p.size);
            self.opacities.push(p.opacity);
            self.colors.extend_from_slice(&[p.color.x, p.color.y, p.color.z]);
            self.phases.push(p.phase);
        }
    }
}

/// Compiles the shader program, owns the vertex buffers, issues the draw.
pub struct FieldPipeline {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    render_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    position_buffer: wgpu::Buffer,
    size_buffer: wgpu::Buffer,
    opacity_buffer: wgpu::Buffer,
    color_buffer: wgpu::Buffer,
    phase_buffer: wgpu::Buffer,
    /// Particle count the vertex buffers are currently sized for.
    buffer_count: usize,
    streams: Streams,
    renderer_name: String,
}

impl FieldPipeline {
    /// Bring up the GPU context and compile the shader program. Any failure
    /// here is terminal for the engine session.
    pub fn new(window: Arc<Window>, initial_count: usize) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|_| GpuError::NoAdapter)?;

        let renderer_name = adapter.get_info().name;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("driftfield device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            ..Default::default()
        }))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        // Shader validation failures are reported asynchronously; an error
        // scope turns them back into a synchronous result.
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Field Shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER_SOURCE.into()),
        });
        if let Some(e) = pollster::block_on(device.pop_error_scope()) {
            return Err(GpuError::ShaderCompile(e.to_string()));
        }

        let uniforms = Uniforms {
            resolution: [config.width as f32, config.height as f32],
            time: 0.0,
            global_opacity: 1.0,
            visible: 1.0,
            _padding: [0.0; 3],
        };
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Field Uniform Buffer"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Field Uniform Bind Group Layout"),
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
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Field Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Field Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            push_constant_ranges: &[],
        });

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Field Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[
                    stream_layout(0, 8),  // position: vec2<f32>
                    stream_layout(1, 4),  // size: f32
                    stream_layout(2, 4),  // opacity: f32
                    stream_layout(3, 12), // color: vec3<f32>
                    stream_layout(4, 4),  // phase: f32
                ],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        if let Some(e) = pollster::block_on(device.pop_error_scope()) {
            return Err(GpuError::PipelineCreation(e.to_string()));
        }

        let count = initial_count.max(1);
        let position_buffer = empty_stream(&device, "Field Position Buffer", count * 8);
        let size_buffer = empty_stream(&device, "Field Size Buffer", count * 4);
        let opacity_buffer = empty_stream(&device, "Field Opacity Buffer", count * 4);
        let color_buffer = empty_stream(&device, "Field Color Buffer", count * 12);
        let phase_buffer = empty_stream(&device, "Field Phase Buffer", count * 4);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            render_pipeline,
            uniform_buffer,
            uniform_bind_group,
            position_buffer,
            size_buffer,
            opacity_buffer,
            color_buffer,
            phase_buffer,
            buffer_count: count,
            streams: Streams::default(),
            renderer_name,
        })
    }

    /// GPU renderer identifier string, fed to tier detection.
    pub fn renderer_name(&self) -> &str {
        &self.renderer_name
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Reconfigure after a lost or outdated surface.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Rebuild the five vertex streams from the live population and draw it.
    /// `time` is the actual elapsed wall-clock seconds, decoupled from the
    /// fixed simulation step.
    pub fn render(
        &mut self,
        store: &ParticleStore,
        time: f32,
        global_opacity: f32,
        visible: bool,
    ) -> Result<(), wgpu::SurfaceError> {
        let count = store.len();
        self.upload(store);

        let uniforms = Uniforms {
            resolution: [self.config.width as f32, self.config.height as f32],
            time,
            global_opacity,
            visible: if visible { 1.0 } else { 0.0 },
            _padding: [0.0; 3],
        };
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Field Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Field Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if count > 0 {
                render_pass.set_pipeline(&self.render_pipeline);
                render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.position_buffer.slice(..));
                render_pass.set_vertex_buffer(1, self.size_buffer.slice(..));
                render_pass.set_vertex_buffer(2, self.opacity_buffer.slice(..));
                render_pass.set_vertex_buffer(3, self.color_buffer.slice(..));
                render_pass.set_vertex_buffer(4, self.phase_buffer.slice(..));
                render_pass.draw(0..6, 0..count as u32);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    /// Full re-upload of all five streams. Buffers are recreated when the
    /// population size changes so they stay sized exactly to the live count.
    fn upload(&mut self, store: &ParticleStore) {
        let count = store.len();
        if count == 0 {
            return;
        }
        self.streams.rebuild(store);

        if count != self.buffer_count {
            self.position_buffer =
                init_stream(&self.device, "Field Position Buffer", &self.streams.positions);
            self.size_buffer = init_stream(&self.device, "Field Size Buffer", &self.streams.sizes);
            self.opacity_buffer =
                init_stream(&self.device, "Field Opacity Buffer", &self.streams.opacities);
            self.color_buffer =
                init_stream(&self.device, "Field Color Buffer", &self.streams.colors);
            self.phase_buffer =
                init_stream(&self.device, "Field Phase Buffer", &self.streams.phases);
            self.buffer_count = count;
        } else {
            let q = &self.queue;
            q.write_buffer(&self.position_buffer, 0, bytemuck::cast_slice(&self.streams.positions));
            q.write_buffer(&self.size_buffer, 0, bytemuck::cast_slice(&self.streams.sizes));
            q.write_buffer(&self.opacity_buffer, 0, bytemuck::cast_slice(&self.streams.opacities));
            q.write_buffer(&self.color_buffer, 0, bytemuck::cast_slice(&self.streams.colors));
            q.write_buffer(&self.phase_buffer, 0, bytemuck::cast_slice(&self.streams.phases));
        }
    }
}

// One attribute per stream, at the shader location matching its index.
static STREAM_ATTRS: [[wgpu::VertexAttribute; 1]; 5] = [
    [wgpu::VertexAttribute {
        offset: 0,
        shader_location: 0,
        format: wgpu::VertexFormat::Float32x2,
    }],
    [wgpu::VertexAttribute {
        offset: 0,
        shader_location: 1,
        format: wgpu::VertexFormat::Float32,
    }],
    [wgpu::VertexAttribute {
        offset: 0,
        shader_location: 2,
        format: wgpu::VertexFormat::Float32,
    }],
    [wgpu::VertexAttribute {
        offset: 0,
        shader_location: 3,
        format: wgpu::VertexFormat::Float32x3,
    }],
    [wgpu::VertexAttribute {
        offset: 0,
        shader_location: 4,
        format: wgpu::VertexFormat::Float32,
    }],
];

fn stream_layout(index: usize, stride: u64) -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: stride,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &STREAM_ATTRS[index],
    }
}

fn empty_stream(device: &wgpu::Device, label: &str, bytes: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: bytes as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn init_stream(device: &wgpu::Device, label: &str, data: &[f32]) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(data),
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Tier;
    use glam::Vec3;

    #[test]
    fn test_shader_source_validates() {
        let module = naga::front::wgsl::parse_str(SHADER_SOURCE).expect("shader parses");
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .expect("shader validates");
    }

    #[test]
    fn test_streams_sized_exactly_to_population() {
        let mut store = ParticleStore::with_seed(640.0, 480.0, Tier::Low, 9);
        store.initialize(37, Vec3::ONE);

        let mut streams = Streams::default();
        streams.rebuild(&store);
        assert_eq!(streams.positions.len(), 37 * 2);
        assert_eq!(streams.sizes.len(), 37);
        assert_eq!(streams.opacities.len(), 37);
        assert_eq!(streams.colors.len(), 37 * 3);
        assert_eq!(streams.phases.len(), 37);

        // Rebuild after shrink reuses the staging without stale tail data.
        store.resize(10, Vec3::ONE);
        streams.rebuild(&store);
        assert_eq!(streams.positions.len(), 10 * 2);
        assert_eq!(streams.phases.len(), 10);
    }

    #[test]
    fn test_uniforms_layout_matches_wgsl() {
        assert_eq!(std::mem::size_of::<Uniforms>(), 32);
    }
}
