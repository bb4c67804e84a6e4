use std::path::Path;

use glam::{Vec2, Vec4};

use crate::error::{Error, Result};

/// A linear RGBA image, row 0 at the top.
///
/// This is the CPU-side stand-in for a render target: every pass reads one
/// `Image` and writes another of the same size.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<Vec4>,
}

impl Image {
    /// Create an image cleared to transparent black.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Vec4::ZERO)
    }

    pub fn filled(width: u32, height: u32, color: Vec4) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    /// Build an image by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Vec4) -> Self {
        let mut image = Self::new(width, height);
        for y in 0..image.height {
            for x in 0..image.width {
                image.put(x, y, f(x, y));
            }
        }
        image
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[Vec4] {
        &self.pixels
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
    pub fn get(&self, x: u32, y: u32) -> Vec4 {
        self.pixels[self.index(x, y)]
    }

    pub fn put(&mut self, x: u32, y: u32, color: Vec4) {
        let idx = self.index(x, y);
        self.pixels[idx] = color;
    }

    pub fn fill(&mut self, color: Vec4) {
        self.pixels.fill(color);
    }

    /// Reallocate to a new size. Contents are cleared; a no-op when the size
    /// is unchanged.
    pub fn resize(&mut self, width: u32, height: u32) {
        let width = width.max(1);
        let height = height.max(1);
        if (width, height) == self.size() {
            return;
        }
        self.width = width;
        self.height = height;
        self.pixels = vec![Vec4::ZERO; width as usize * height as usize];
    }

    /// Bilinear sample with clamp-to-edge addressing.
    ///
    /// Texel centres sit at `(i + 0.5) / width`, the same convention as a
    /// linear GPU sampler.
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        let x = uv.x * self.width as f32 - 0.5;
        let y = uv.y * self.height as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;

        let texel = |tx: f32, ty: f32| {
            let cx = (tx as i64).clamp(0, self.width as i64 - 1) as u32;
            let cy = (ty as i64).clamp(0, self.height as i64 - 1) as u32;
            self.get(cx, cy)
        };

        // a + (b - a) * t stays exact when a == b
        let mix = |a: Vec4, b: Vec4, t: f32| a + (b - a) * t;
        let top = mix(texel(x0, y0), texel(x0 + 1.0, y0), fx);
        let bottom = mix(texel(x0, y0 + 1.0), texel(x0 + 1.0, y0 + 1.0), fx);
        mix(top, bottom, fy)
    }

    /// Quantise to 8-bit RGBA, clamping every channel to [0, 1].
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|p| {
                let c = p.clamp(Vec4::ZERO, Vec4::ONE) * 255.0;
                [c.x, c.y, c.z, c.w].map(|v| v.round() as u8)
            })
            .collect()
    }

    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Self {
        let mut image = Self::new(width, height);
        for (dst, px) in image.pixels.iter_mut().zip(bytes.chunks_exact(4)) {
            *dst = Vec4::new(px[0] as f32, px[1] as f32, px[2] as f32, px[3] as f32) / 255.0;
        }
        image
    }

    /// Decode a PNG/JPEG file into a linear-valued image (no colour-space
    /// conversion; normal maps are stored as raw data).
    pub fn load(path: &Path) -> Result<Self> {
        let decoded = image::open(path).map_err(|source| Error::Image {
            path: path.to_path_buf(),
            source,
        })?;
        let rgba = decoded.to_rgba8();
        Ok(Self::from_rgba8(rgba.width(), rgba.height(), rgba.as_raw()))
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        let buffer = image::RgbaImage::from_raw(self.width, self.height, self.to_rgba8())
            .expect("pixel buffer matches image dimensions");
        buffer
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|source| Error::Image {
                path: path.to_path_buf(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient() -> Image {
        // 2×1: black on the left, white on the right
        Image::from_fn(2, 1, |x, _| if x == 0 { Vec4::ZERO } else { Vec4::ONE })
    }

    #[test]
    fn sample_at_texel_centre_is_exact() {
        let img = gradient();
        assert_eq!(img.sample(Vec2::new(0.25, 0.5)), Vec4::ZERO);
        assert_eq!(img.sample(Vec2::new(0.75, 0.5)), Vec4::ONE);
    }

    #[test]
    fn sample_between_centres_interpolates() {
        let v = gradient().sample(Vec2::new(0.5, 0.5));
        assert!((v.x - 0.5).abs() < 1e-6, "got {v}");
    }

    #[test]
    fn sample_outside_clamps_to_edge() {
        let img = gradient();
        assert_eq!(img.sample(Vec2::new(-3.0, 0.5)), Vec4::ZERO);
        assert_eq!(img.sample(Vec2::new(7.0, 9.0)), Vec4::ONE);
    }

    #[test]
    fn resize_same_size_keeps_contents() {
        let mut img = Image::filled(4, 4, Vec4::ONE);
        img.resize(4, 4);
        assert_eq!(img.get(3, 3), Vec4::ONE);
        img.resize(8, 2);
        assert_eq!(img.size(), (8, 2));
        assert_eq!(img.get(7, 1), Vec4::ZERO);
    }

    #[test]
    fn zero_size_is_promoted_to_one_pixel() {
        assert_eq!(Image::new(0, 0).size(), (1, 1));
    }

    #[test]
    fn rgba8_clamps_out_of_range_channels() {
        let img = Image::filled(1, 1, Vec4::new(1.5, -0.2, 0.5, 1.0));
        assert_eq!(img.to_rgba8(), vec![255, 0, 128, 255]);
    }
}
