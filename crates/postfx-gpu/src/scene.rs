use glam::Vec3;
use postfx_core::source::{
    Camera, ALBEDO, AMBIENT, EXPOSURE, FOV_Y_DEGREES, LIGHT_INTENSITY, LIGHT_POSITION, SKY_BOTTOM, SKY_TOP,
};
use wgpu::{Device, Queue};

use crate::targets::{RenderTarget, TARGET_FORMAT};

pub const SCENE_WGSL: &str = include_str!("../shaders/scene.wgsl");

/// MSAA sample count for the scene at pixel ratio 1. wgpu guarantees 4
/// samples for `Rgba16Float` on every backend; 2 is adapter-specific.
pub const SCENE_MSAA_SAMPLES: u32 = 4;

/// Multisample only when the chain runs at one buffer pixel per logical
/// pixel; higher ratios already supersample.
pub fn scene_sample_count(pixel_ratio: f32) -> u32 {
    if pixel_ratio == 1.0 {
        SCENE_MSAA_SAMPLES
    } else {
        1
    }
}

/// Must match `Scene` in scene.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneUniforms {
    pub eye: [f32; 4],
    pub forward: [f32; 4],
    pub right: [f32; 4],
    pub up: [f32; 4],
    pub light: [f32; 4],
    pub albedo: [f32; 4],
    pub sky_top: [f32; 4],
    pub sky_bottom: [f32; 4],
    pub lens: [f32; 4],
}

impl SceneUniforms {
    pub fn new(camera: &Camera, aspect: f32) -> Self {
        let v = |v: Vec3, w: f32| v.extend(w).to_array();
        let tan_half = (FOV_Y_DEGREES.to_radians() * 0.5).tan();
        Self {
            eye: v(camera.eye, 0.0),
            forward: v(camera.forward, 0.0),
            right: v(camera.right, 0.0),
            up: v(camera.up, 0.0),
            light: v(LIGHT_POSITION.normalize(), LIGHT_INTENSITY),
            albedo: v(ALBEDO, 1.0),
            sky_top: v(SKY_TOP, 1.0),
            sky_bottom: v(SKY_BOTTOM, 1.0),
            lens: [tan_half * aspect, tan_half, EXPOSURE, AMBIENT],
        }
    }
}

/// GPU frame source: renders the orbiting demo scene into its own target,
/// which the first pass of the chain then samples.
pub struct ScenePass {
    layout: wgpu::PipelineLayout,
    module: wgpu::ShaderModule,
    pipeline: wgpu::RenderPipeline,
    uniform_buf: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    target: RenderTarget,
    /// Multisampled colour buffer resolved into `target`; `None` at 1 sample.
    msaa: Option<wgpu::TextureView>,
    sample_count: u32,
    size: (u32, u32),
}

impl ScenePass {
    pub fn new(device: &Device, width: u32, height: u32, sample_count: u32) -> Self {
        let bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scene_uniforms"),
            size: std::mem::size_of::<SceneUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene_bg"),
            layout: &bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buf.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pl"),
            bind_group_layouts: &[&bgl],
            push_constant_ranges: &[],
        });
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene"),
            source: wgpu::ShaderSource::Wgsl(SCENE_WGSL.into()),
        });
        let sample_count = sample_count.max(1);
        Self {
            pipeline: scene_pipeline(device, &pipeline_layout, &module, sample_count),
            layout: pipeline_layout,
            module,
            uniform_buf,
            bind_group,
            target: RenderTarget::new(device, "scene_target", width, height),
            msaa: msaa_view(device, width, height, sample_count),
            sample_count,
            size: (width, height),
        }
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Switch the scene's MSAA sample count, rebuilding the pipeline and the
    /// multisampled buffer only when it changes.
    pub fn set_sample_count(&mut self, device: &Device, sample_count: u32) {
        let sample_count = sample_count.max(1);
        if sample_count == self.sample_count {
            return;
        }
        log::debug!("scene MSAA {} -> {sample_count} samples", self.sample_count);
        self.pipeline = scene_pipeline(device, &self.layout, &self.module, sample_count);
        self.msaa = msaa_view(device, self.size.0, self.size.1, sample_count);
        self.sample_count = sample_count;
    }

    pub fn resize(&mut self, device: &Device, width: u32, height: u32) {
        if (width, height) != self.size {
            self.target = RenderTarget::new(device, "scene_target", width, height);
            self.msaa = msaa_view(device, width, height, self.sample_count);
            self.size = (width, height);
        }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.target.view
    }

    /// Upload the camera for this tick and record the scene draw.
    pub fn record(&self, queue: &Queue, encoder: &mut wgpu::CommandEncoder, camera: &Camera) {
        let aspect = self.size.0 as f32 / self.size.1.max(1) as f32;
        queue.write_buffer(&self.uniform_buf, 0, bytemuck::bytes_of(&SceneUniforms::new(camera, aspect)));

        let (view, resolve_target) = match &self.msaa {
            Some(msaa) => (msaa, Some(&self.target.view)),
            None => (&self.target.view, None),
        };
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.draw(0..6, 0..1);
    }
}

fn scene_pipeline(
    device: &Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    sample_count: u32,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("scene"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: "vs_main",
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module,
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
        multisample: wgpu::MultisampleState {
            count: sample_count,
            ..Default::default()
        },
        multiview: None,
        cache: None,
    })
}

fn msaa_view(device: &Device, width: u32, height: u32, sample_count: u32) -> Option<wgpu::TextureView> {
    (sample_count > 1).then(|| {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("scene_msaa"),
                size: wgpu::Extent3d {
                    width: width.max(1),
                    height: height.max(1),
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count,
                dimension: wgpu::TextureDimension::D2,
                format: TARGET_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&Default::default())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniforms_are_nine_vec4s() {
        assert_eq!(std::mem::size_of::<SceneUniforms>(), 9 * 16);
    }

    #[test]
    fn msaa_only_at_unit_ratio() {
        assert_eq!(scene_sample_count(1.0), SCENE_MSAA_SAMPLES);
        assert_eq!(scene_sample_count(2.0), 1);
        assert_eq!(scene_sample_count(1.5), 1);
    }

    #[test]
    fn lens_carries_aspect() {
        let u = SceneUniforms::new(&Camera::orbit(0.0), 2.0);
        assert!((u.lens[0] - 2.0 * u.lens[1]).abs() < 1e-6);
        assert_eq!(u.lens[2], EXPOSURE);
    }
}
