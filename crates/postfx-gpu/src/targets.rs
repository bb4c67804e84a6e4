use wgpu::Device;

/// Format of every intermediate image. Half floats keep values above 1.0
/// (bloom, tint) until gamma correction.
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// A texture a pass can render into and the next pass can sample.
pub struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl RenderTarget {
    pub fn new(device: &Device, label: &str, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&Default::default());
        Self { texture, view }
    }
}

/// Ping-pong target pair: pass `n` of a tick writes target `n % 2` and reads
/// the other one.
pub struct PingPong {
    targets: [RenderTarget; 2],
    width: u32,
    height: u32,
}

impl PingPong {
    pub fn new(device: &Device, width: u32, height: u32) -> Self {
        Self {
            targets: [
                RenderTarget::new(device, "ping", width, height),
                RenderTarget::new(device, "pong", width, height),
            ],
            width,
            height,
        }
    }

    /// Reallocate only when the size actually changed. Returns whether it did.
    pub fn ensure_size(&mut self, device: &Device, width: u32, height: u32) -> bool {
        if (width, height) == (self.width, self.height) {
            return false;
        }
        *self = Self::new(device, width, height);
        log::debug!("ping-pong targets resized to {width}x{height}");
        true
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Target written by the `n`-th drawn pass.
    pub fn target(&self, n: usize) -> &RenderTarget {
        &self.targets[n % 2]
    }
}
