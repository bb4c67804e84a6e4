use std::path::Path;

use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};
use glam::{Vec3, Vec4};

use crate::error::Result;
use crate::raster::Image;

/// Encoded zero-tilt normal.
pub const FLAT: Vec4 = Vec4::new(0.5, 0.5, 1.0, 1.0);

/// Height-field slope multiplier before normalisation.
const BUMP: f32 = 4.0;

pub fn flat(width: u32, height: u32) -> Image {
    Image::filled(width, height, FLAT)
}

/// Encode a unit normal from [-1, 1] into [0, 1] colour space.
pub fn encode(n: Vec3) -> Vec4 {
    (n * 0.5 + Vec3::splat(0.5)).extend(1.0)
}

/// Procedural tangent-space normal map: fractal simplex heights,
/// central-difference gradients.
pub fn generate(size: u32, seed: i32) -> Image {
    let size = size.max(2);
    let mut noise = FastNoiseLite::with_seed(seed);
    noise.set_noise_type(Some(NoiseType::OpenSimplex2));
    noise.set_fractal_type(Some(FractalType::FBm));
    noise.set_fractal_octaves(Some(4));
    noise.set_frequency(Some(4.0 / size as f32));

    let heights: Vec<f32> = (0..size * size)
        .map(|i| noise.get_noise_2d((i % size) as f32, (i / size) as f32))
        .collect();
    let h = |x: i64, y: i64| {
        let cx = x.clamp(0, size as i64 - 1) as u32;
        let cy = y.clamp(0, size as i64 - 1) as u32;
        heights[(cy * size + cx) as usize]
    };

    Image::from_fn(size, size, |x, y| {
        let (x, y) = (x as i64, y as i64);
        let dx = (h(x + 1, y) - h(x - 1, y)) * 0.5 * BUMP;
        let dy = (h(x, y + 1) - h(x, y - 1)) * 0.5 * BUMP;
        encode(Vec3::new(-dx, -dy, 1.0).normalize())
    })
}

pub fn load(path: &Path) -> Result<Image> {
    let image = Image::load(path)?;
    log::info!("loaded normal map {} ({}x{})", path.display(), image.width(), image.height());
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4Swizzles;

    fn decode(p: Vec4) -> Vec3 {
        p.xyz() * 2.0 - Vec3::ONE
    }

    #[test]
    fn flat_decodes_to_up() {
        let map = flat(3, 2);
        assert_eq!(map.size(), (3, 2));
        assert_eq!(decode(map.get(1, 1)), Vec3::Z);
    }

    #[test]
    fn generated_normals_are_unit_and_facing_out() {
        let map = generate(32, 7);
        for p in map.pixels() {
            let n = decode(*p);
            assert!((n.length() - 1.0).abs() < 1e-4, "{n}");
            assert!(n.z > 0.0);
        }
    }

    #[test]
    fn generated_map_is_not_flat() {
        let map = generate(32, 7);
        assert!(map.pixels().iter().any(|p| (*p - FLAT).abs().max_element() > 0.01));
    }

    #[test]
    fn generate_is_deterministic() {
        assert_eq!(generate(16, 3), generate(16, 3));
    }

    #[test]
    fn load_missing_file_reports_path() {
        let err = load(Path::new("/nonexistent/normals.png")).unwrap_err();
        assert!(err.to_string().contains("normals.png"), "{err}");
    }
}
