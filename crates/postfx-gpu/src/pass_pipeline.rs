use std::collections::HashMap;

use postfx_core::uniforms::MAX_UNIFORM_SLOTS;
use postfx_core::ShaderProgram;
use wgpu::{BindGroupLayout, Device, Queue, RenderPipeline};

use crate::targets::TARGET_FORMAT;

/// Size of every pass's uniform buffer: one `vec4<f32>` per slot.
pub const UNIFORM_BUFFER_SIZE: u64 = (MAX_UNIFORM_SLOTS * 16) as u64;

/// One render pipeline per program, all sharing a single bind group layout:
///   binding 0 : input texture
///   binding 1 : linear clamp sampler
///   binding 2 : `Params` uniform buffer
///   binding 3 : auxiliary texture (1×1 dummy when the pass has none)
pub struct PassPipelines {
    layout: BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<&'static str, RenderPipeline>,
    pub sampler: wgpu::Sampler,
    pub dummy_aux: wgpu::TextureView,
}

impl PassPipelines {
    /// Build the layout and compile every built-in and custom program up
    /// front; programs added later are compiled on first use.
    pub fn new(device: &Device, queue: &Queue) -> Self {
        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("pass_bgl"),
            entries: &[
                texture_entry(0),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                texture_entry(3),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pass_pl"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("pass_sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        });

        let dummy_aux = upload_rgba8(device, queue, "dummy_aux", 1, 1, &[0, 0, 0, 0])
            .create_view(&Default::default());

        let mut this = Self {
            layout,
            pipeline_layout,
            pipelines: HashMap::new(),
            sampler,
            dummy_aux,
        };
        for program in &postfx_core::PROGRAMS {
            this.ensure(device, program);
        }
        this
    }

    pub fn layout(&self) -> &BindGroupLayout {
        &self.layout
    }

    /// Compile `program` if no pipeline with its label exists yet.
    pub fn ensure(&mut self, device: &Device, program: &ShaderProgram) {
        if self.pipelines.contains_key(program.label) {
            return;
        }
        let pipeline = build_pipeline(device, &self.pipeline_layout, program);
        log::debug!("compiled pass pipeline `{}`", program.label);
        self.pipelines.insert(program.label, pipeline);
    }

    pub fn get(&self, label: &str) -> Option<&RenderPipeline> {
        self.pipelines.get(label)
    }
}

fn build_pipeline(device: &Device, layout: &wgpu::PipelineLayout, program: &ShaderProgram) -> RenderPipeline {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(program.label),
        source: wgpu::ShaderSource::Wgsl(program.module_source().into()),
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(program.label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: "vs_main",
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: TARGET_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Create an `Rgba8Unorm` sampled texture holding `bytes`.
pub fn upload_rgba8(device: &Device, queue: &Queue, label: &str, width: u32, height: u32, bytes: &[u8]) -> wgpu::Texture {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        bytes,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    texture
}
