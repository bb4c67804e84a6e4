use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use postfx_core::source::Camera;
use postfx_core::{Clock, Pipeline, PipelineConfig, Preset};
use postfx_gpu::{scene_sample_count, BlitPipeline, GpuComposer, ScenePass};
use winit::event::WindowEvent;
use winit::window::Window;

use crate::input::{InputAction, InputState, Key};
use crate::panel::{self, PanelEdit};

// ---------------------------------------------------------------------------
// Simple FPS counter: logs to console once per second
// ---------------------------------------------------------------------------

struct FpsCounter {
    frames: u32,
    last_report: Instant,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            frames: 0,
            last_report: Instant::now(),
        }
    }

    /// Returns the FPS once a full second has passed since the last report.
    fn tick(&mut self) -> Option<f32> {
        self.frames += 1;
        let elapsed = self.last_report.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            let fps = self.frames as f32 / elapsed;
            self.frames = 0;
            self.last_report = Instant::now();
            Some(fps)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Overlay: egui state for the control panel
// ---------------------------------------------------------------------------

struct Overlay {
    ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
    visible: bool,
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,

    // The CPU-side chain is the source of truth; the GPU composer mirrors it.
    config: PipelineConfig,
    preset: Preset,
    pipeline: Pipeline,
    scene: ScenePass,
    gpu: GpuComposer,
    blit: BlitPipeline,

    overlay: Overlay,
    input: InputState,
    fps: FpsCounter,
}

impl App {
    /// Initialise wgpu for `window` and build the chain described by
    /// `config`. `preset` is where Space-cycling starts from.
    pub fn new(window: Arc<Window>, config: PipelineConfig, preset: Preset) -> Result<Self> {
        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        // ---- Instance / surface / adapter -----------------------------------
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(Arc::clone(&window))
            .context("failed to create wgpu surface")?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| anyhow!("no suitable GPU adapter found"))?;

        log::info!("GPU adapter: {}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("postfx device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("failed to create GPU device")?;

        // ---- Surface configuration ------------------------------------------
        // The chain ends in its own gamma pass, so the surface must not
        // encode to sRGB a second time.
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| anyhow!("surface reports no formats"))?;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);
        log::info!("Surface configured: {width}×{height} {format:?} Fifo");

        // ---- Chain ----------------------------------------------------------
        let mut config = config;
        config.viewport.pixel_ratio = window.scale_factor() as f32;
        let mut pipeline = config.build(Clock::realtime()).context("building pass chain")?;
        let logical = size.to_logical::<u32>(window.scale_factor());
        pipeline.resize(logical.width, logical.height, window.scale_factor() as f32);
        let (bw, bh) = pipeline.composer.size();

        let samples = scene_sample_count(pipeline.composer.pixel_ratio());
        let scene = ScenePass::new(&device, bw, bh, samples);
        let gpu = GpuComposer::new(&device, &queue, bw, bh);
        let blit = BlitPipeline::new(&device, format);

        // ---- Overlay --------------------------------------------------------
        let ctx = egui::Context::default();
        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            &*window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let renderer = egui_wgpu::Renderer::new(&device, format, None, 1, false);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            surface_config,
            config,
            preset,
            pipeline,
            scene,
            gpu,
            blit,
            overlay: Overlay {
                ctx,
                state,
                renderer,
                visible: true,
            },
            input: InputState::new(),
            fps: FpsCounter::new(),
        })
    }

    // -------------------------------------------------------------------------
    // Resize
    // -------------------------------------------------------------------------

    /// Reconfigure the surface and resize the chain to the window's logical
    /// size at its current scale factor.
    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        if new_width == 0 || new_height == 0 {
            return;
        }
        self.surface_config.width = new_width;
        self.surface_config.height = new_height;
        self.surface.configure(&self.device, &self.surface_config);

        let scale = self.window.scale_factor();
        let logical = winit::dpi::PhysicalSize::new(new_width, new_height).to_logical::<u32>(scale);
        self.pipeline.resize(logical.width, logical.height, scale as f32);

        let (bw, bh) = self.pipeline.composer.size();
        let samples = scene_sample_count(self.pipeline.composer.pixel_ratio());
        self.scene.set_sample_count(&self.device, samples);
        self.scene.resize(&self.device, bw, bh);
        self.gpu.resize(&self.device, bw, bh);
        log::debug!("Surface resized to {new_width}×{new_height} (buffers {bw}×{bh})");
    }

    // -------------------------------------------------------------------------
    // Input
    // -------------------------------------------------------------------------

    /// Forward a window event to the panel. Returns `true` when the panel
    /// consumed it.
    pub fn on_window_event(&mut self, event: &WindowEvent) -> bool {
        if !self.overlay.visible {
            return false;
        }
        self.overlay.state.on_window_event(&self.window, event).consumed
    }

    pub fn on_key_pressed(&self, key: Key) -> Option<InputAction> {
        self.input.on_key(key)
    }

    /// Apply an action to the app state.
    ///
    /// Returns `true` if the app should exit (i.e. action was `Quit`).
    pub fn handle_action(&mut self, action: InputAction) -> bool {
        match action {
            InputAction::TogglePass(n) => match self.pipeline.nth(n) {
                Some(id) => match self.pipeline.toggle(id) {
                    Ok(enabled) => log::info!("pass {} → {}", n + 1, if enabled { "on" } else { "off" }),
                    Err(e) => log::warn!("toggle: {e}"),
                },
                None => log::debug!("no pass at position {}", n + 1),
            },

            InputAction::CycleNextPreset => {
                let idx = Preset::ALL.iter().position(|&p| p == self.preset).unwrap_or(0);
                self.load_preset(Preset::ALL[(idx + 1) % Preset::ALL.len()]);
            }

            InputAction::TogglePanel => {
                self.overlay.visible = !self.overlay.visible;
            }

            InputAction::Reset => {
                log::info!("Reset to config defaults");
                self.rebuild(self.config.clone());
            }

            InputAction::Quit => return true,
        }
        false
    }

    fn load_preset(&mut self, preset: Preset) {
        log::info!("Loading preset: {}", preset.name());
        if self.rebuild(preset.apply(&self.config)) {
            self.preset = preset;
        }
    }

    /// Swap in a freshly built chain, keeping the old one on failure.
    fn rebuild(&mut self, mut config: PipelineConfig) -> bool {
        config.viewport.pixel_ratio = self.window.scale_factor() as f32;
        match config.build(Clock::realtime()) {
            Ok(pipeline) => {
                self.pipeline = pipeline;
                self.config = config;
                let size = self.window.inner_size();
                self.resize(size.width, size.height);
                true
            }
            Err(e) => {
                log::error!("failed to build chain: {e}");
                false
            }
        }
    }

    // -------------------------------------------------------------------------
    // Render
    // -------------------------------------------------------------------------

    /// Run one full frame: scene, chain, blit, then the panel on top.
    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let elapsed = self.pipeline.driver.advance(&mut self.pipeline.composer);
        let camera = Camera::orbit(elapsed);

        if let Some(fps) = self.fps.tick() {
            log::debug!(
                "FPS: {fps:.1}  preset: {}  t: {elapsed:.1}s  buffers: {:?}",
                self.preset.name(),
                self.pipeline.composer.size()
            );
        }

        let output = self.surface.get_current_texture()?;
        let surface_view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame-encoder"),
        });

        // --- 1. Scene and pass chain -------------------------------------------
        let (bw, bh) = self.pipeline.composer.size();
        self.scene.resize(&self.device, bw, bh);
        self.scene.record(&self.queue, &mut encoder, &camera);
        let drawn = self.gpu.record(
            &self.device,
            &self.queue,
            &mut encoder,
            &mut self.pipeline.composer,
            self.scene.view(),
        );

        // --- 2. Present the chain output -----------------------------------------
        let final_view = self.gpu.output_view(self.scene.view(), drawn);
        self.blit.draw(&self.device, &mut encoder, final_view, &surface_view);

        // --- 3. Panel ----------------------------------------------------------
        let (edits, panel_cmds) = self.draw_overlay(&mut encoder, &surface_view);

        self.queue
            .submit(panel_cmds.into_iter().chain(std::iter::once(encoder.finish())));
        output.present();

        for edit in edits {
            match panel::apply(&mut self.pipeline, edit) {
                Ok(Some(preset)) => self.load_preset(preset),
                Ok(None) => {}
                Err(e) => log::warn!("panel: {e}"),
            }
        }
        Ok(())
    }

    fn draw_overlay(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
    ) -> (Vec<PanelEdit>, Vec<wgpu::CommandBuffer>) {
        let overlay = &mut self.overlay;
        let raw_input = overlay.state.take_egui_input(&self.window);
        let mut edits = Vec::new();
        let (visible, pipeline, preset) = (overlay.visible, &self.pipeline, self.preset);
        let full = overlay.ctx.run(raw_input, |ctx| {
            if visible {
                edits.extend(panel::show(ctx, pipeline, preset));
            }
        });
        overlay.state.handle_platform_output(&self.window, full.platform_output);

        let jobs = overlay.ctx.tessellate(full.shapes, full.pixels_per_point);
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.surface_config.width, self.surface_config.height],
            pixels_per_point: full.pixels_per_point,
        };
        for (id, delta) in &full.textures_delta.set {
            overlay.renderer.update_texture(&self.device, &self.queue, *id, delta);
        }
        let cmds = overlay
            .renderer
            .update_buffers(&self.device, &self.queue, encoder, &jobs, &screen);
        {
            let mut rpass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("panel-pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: target,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();
            overlay.renderer.render(&mut rpass, &jobs, &screen);
        }
        for id in &full.textures_delta.free {
            overlay.renderer.free_texture(id);
        }
        (edits, cmds)
    }
}
