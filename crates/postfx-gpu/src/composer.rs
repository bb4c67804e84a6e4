use std::collections::HashMap;
use std::sync::Arc;

use postfx_core::{Composer, Image, PassId};
use wgpu::{Buffer, Device, Queue};

use crate::pass_pipeline::{upload_rgba8, PassPipelines, UNIFORM_BUFFER_SIZE};
use crate::targets::PingPong;

/// GPU-side state owned by one pass: its uniform buffer and, when the pass
/// samples an auxiliary image, the uploaded copy of it.
struct PassResources {
    uniforms: Buffer,
    aux: Option<(Arc<Image>, wgpu::TextureView)>,
}

impl PassResources {
    fn new(device: &Device, label: &str) -> Self {
        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: UNIFORM_BUFFER_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self { uniforms, aux: None }
    }

    /// Upload `aux` unless the same image is already resident.
    fn sync_aux(&mut self, device: &Device, queue: &Queue, aux: Option<&Arc<Image>>) {
        match aux {
            None => self.aux = None,
            Some(image) => {
                if matches!(&self.aux, Some((resident, _)) if Arc::ptr_eq(resident, image)) {
                    return;
                }
                let texture = upload_rgba8(device, queue, "pass_aux", image.width(), image.height(), &image.to_rgba8());
                self.aux = Some((Arc::clone(image), texture.create_view(&Default::default())));
            }
        }
    }
}

/// Runs a [`Composer`]'s enabled passes on the GPU.
///
/// The CPU composer stays the single source of truth for order, enable
/// flags and parameters; every tick its state is mirrored into uniform
/// buffers and each enabled pass is drawn full-screen, ping-ponging between
/// two targets.
pub struct GpuComposer {
    pipelines: PassPipelines,
    targets: PingPong,
    resources: HashMap<PassId, PassResources>,
}

impl GpuComposer {
    pub fn new(device: &Device, queue: &Queue, width: u32, height: u32) -> Self {
        Self {
            pipelines: PassPipelines::new(device, queue),
            targets: PingPong::new(device, width, height),
            resources: HashMap::new(),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        self.targets.size()
    }

    pub fn resize(&mut self, device: &Device, width: u32, height: u32) {
        self.targets.ensure_size(device, width, height);
    }

    /// Record one tick of `composer` into `encoder`, reading the live frame
    /// from `scene`. Returns the number of passes drawn.
    pub fn record(
        &mut self,
        device: &Device,
        queue: &Queue,
        encoder: &mut wgpu::CommandEncoder,
        composer: &mut Composer,
        scene: &wgpu::TextureView,
    ) -> usize {
        let active = composer.begin_tick();
        let (width, height) = composer.size();
        self.targets.ensure_size(device, width, height);
        self.resources.retain(|id, _| composer.pass(*id).is_some());

        let mut drawn = 0;
        for id in active {
            let Some(pass) = composer.pass(id) else { continue };
            let shader = pass.shader();
            let program = shader.program();
            self.pipelines.ensure(device, program);
            let Some(pipeline) = self.pipelines.get(program.label) else { continue };

            let res = self
                .resources
                .entry(id)
                .or_insert_with(|| PassResources::new(device, shader.name()));
            queue.write_buffer(&res.uniforms, 0, bytemuck::cast_slice(&shader.uniforms().to_slots()));
            res.sync_aux(device, queue, shader.aux());

            let input = if drawn == 0 { scene } else { &self.targets.target(drawn - 1).view };
            let output = &self.targets.target(drawn).view;
            let aux = res.aux.as_ref().map_or(&self.pipelines.dummy_aux, |(_, view)| view);

            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("pass_bg"),
                layout: self.pipelines.layout(),
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(input),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.pipelines.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: res.uniforms.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(aux),
                    },
                ],
            });

            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(shader.name()),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: output,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, &bind_group, &[]);
            rpass.draw(0..6, 0..1);
            drawn += 1;
        }
        drawn
    }

    /// Texture holding the tick's final image: the scene itself when no pass
    /// was drawn.
    pub fn output_view<'a>(&'a self, scene: &'a wgpu::TextureView, drawn: usize) -> &'a wgpu::TextureView {
        match drawn {
            0 => scene,
            n => &self.targets.target(n - 1).view,
        }
    }

    pub fn output_texture(&self, drawn: usize) -> Option<&wgpu::Texture> {
        drawn.checked_sub(1).map(|n| &self.targets.target(n).texture)
    }
}
