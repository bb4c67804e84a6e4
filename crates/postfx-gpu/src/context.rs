use wgpu::{Adapter, Device, Instance, Queue};

pub struct GpuContext {
    pub instance: Instance,
    pub adapter: Adapter,
    pub device: Device,
    pub queue: Queue,
}

impl GpuContext {
    /// Create a headless GPU context (no surface), for offscreen rendering
    /// and tests. Returns `None` when the machine has no usable adapter. The
    /// windowed variant is created by `postfx-app`.
    pub async fn new_headless() -> Option<Self> {
        let instance = Instance::default();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;
        log::info!("GPU adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("postfx-gpu device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| log::warn!("failed to create GPU device: {e}"))
            .ok()?;

        Some(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }
}
