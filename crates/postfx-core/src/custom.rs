//! The three user-authored passes: additive tint, wave displacement and
//! normal-map relief.
//!
//! `uv` puts v = 0 on the top row, so vertical displacements are subtracted:
//! a positive offset (or a normal tilted toward +y) samples from higher up
//! the image.

use std::sync::Arc;

use glam::{Vec2, Vec3, Vec4, Vec4Swizzles};

use crate::error::Result;
use crate::raster::Image;
use crate::shader::{Fragment, ShaderPass, ShaderProgram};
use crate::uniforms::Uniforms;

/// Sample-coordinate offset per unit of decoded normal.
pub const NORMAL_DISPLACEMENT: f32 = 0.1;

// ---------------------------------------------------------------------------
// Tint
// ---------------------------------------------------------------------------

fn tint(f: &Fragment<'_>) -> Vec4 {
    let color = f.sample(f.uv);
    (color.xyz() + f.vec3("tint")).extend(color.w)
}

pub const TINT: ShaderProgram = ShaderProgram {
    label: "tint",
    fragment: tint,
    fragment_wgsl: include_str!("../shaders/tint.wgsl"),
};

pub fn tint_pass(color: Vec3) -> Result<ShaderPass> {
    ShaderPass::new("tint", TINT, Uniforms::new().with("tint", color, 0.0, 1.0))
}

// ---------------------------------------------------------------------------
// Wave displacement
// ---------------------------------------------------------------------------

/// Vertical sample offset at horizontal coordinate `u`.
pub fn wave_offset(u: f32, time: f32, speed: f32, amplitude: f32) -> f32 {
    amplitude * (u * 10.0 + speed * time).sin()
}

fn wave(f: &Fragment<'_>) -> Vec4 {
    let offset = wave_offset(f.uv.x, f.float("time"), f.float("speed"), f.float("amplitude"));
    f.sample(Vec2::new(f.uv.x, f.uv.y - offset))
}

pub const WAVE: ShaderProgram = ShaderProgram {
    label: "wave",
    fragment: wave,
    fragment_wgsl: include_str!("../shaders/wave.wgsl"),
};

/// `time` is left to the animation driver; it starts at zero.
pub fn wave_pass(speed: f32, amplitude: f32) -> Result<ShaderPass> {
    let uniforms = Uniforms::new()
        .with_fixed("time", 0.0)
        .with("speed", speed, 0.0, 3.0)
        .with("amplitude", amplitude, 0.0, 0.3);
    ShaderPass::new("wave", WAVE, uniforms)
}

// ---------------------------------------------------------------------------
// Normal-map relief
// ---------------------------------------------------------------------------

/// `clamp(dot(normal, normalize(dir)), 0, 1) * strength`; a zero light
/// direction contributes nothing.
pub fn lightness(normal: Vec3, light_direction: Vec2, strength: f32) -> f32 {
    match light_direction.extend(0.0).try_normalize() {
        Some(dir) => normal.dot(dir).clamp(0.0, 1.0) * strength,
        None => 0.0,
    }
}

fn normal_relief(f: &Fragment<'_>) -> Vec4 {
    let normal = f.sample_aux(f.uv).xyz() * 2.0 - Vec3::ONE;
    let shift = Vec2::new(normal.x, -normal.y) * NORMAL_DISPLACEMENT;
    let color = f.sample(f.uv + shift);
    let light = lightness(normal, f.vec2("light_direction"), f.float("light_strength"));
    (color.xyz() + Vec3::splat(light)).extend(color.w)
}

pub const NORMAL_MAP: ShaderProgram = ShaderProgram {
    label: "normal_map",
    fragment: normal_relief,
    fragment_wgsl: include_str!("../shaders/normal_map.wgsl"),
};

/// The normal image must already be decoded; the pass never renders without
/// one.
pub fn normal_map_pass(normals: Arc<Image>, light_direction: Vec2, light_strength: f32) -> Result<ShaderPass> {
    let uniforms = Uniforms::new()
        .with("light_direction", light_direction, -1.0, 1.0)
        .with("light_strength", light_strength, 0.0, 4.0);
    Ok(ShaderPass::new("normal_map", NORMAL_MAP, uniforms)?.with_aux(normals))
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use proptest::prelude::*;

    use super::*;
    use crate::normal_map;

    fn render(pass: &ShaderPass, input: &Image) -> Image {
        let mut out = Image::new(input.width(), input.height());
        pass.render(input, &mut out);
        out
    }

    fn ramp(w: u32, h: u32) -> Image {
        Image::from_fn(w, h, |x, y| Vec4::new(x as f32 / w as f32, y as f32 / h as f32, 0.5, 1.0))
    }

    #[test]
    fn tint_adds_offset_everywhere() {
        let pass = tint_pass(Vec3::new(0.2, 0.0, 0.1)).unwrap();
        let input = ramp(4, 3);
        let out = render(&pass, &input);
        for (a, b) in input.pixels().iter().zip(out.pixels()) {
            assert!((b.x - a.x - 0.2).abs() < 1e-6);
            assert!((b.y - a.y).abs() < 1e-6);
            assert!((b.z - a.z - 0.1).abs() < 1e-6);
            assert_eq!(a.w, b.w);
        }
    }

    #[test]
    fn tint_output_is_not_clamped() {
        let pass = tint_pass(Vec3::ONE).unwrap();
        let out = render(&pass, &Image::filled(1, 1, Vec4::new(0.9, 0.9, 0.9, 1.0)));
        assert!(out.get(0, 0).x > 1.0);
    }

    #[test]
    fn tint_components_are_clamped_on_write() {
        let mut pass = tint_pass(Vec3::ZERO).unwrap();
        pass.set_parameter("tint", Vec3::new(1.5, -0.5, 0.25)).unwrap();
        assert_eq!(pass.uniforms().vec3("tint"), Vec3::new(1.0, 0.0, 0.25));
    }

    #[test]
    fn wave_offset_at_time_zero() {
        for &u in &[0.0f32, 0.1, 0.37, 0.9] {
            let expected = 0.2 * (10.0 * u).sin();
            assert!((wave_offset(u, 0.0, 1.0, 0.2) - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn wave_offset_is_periodic_in_u() {
        let period = PI / 5.0;
        for &u in &[0.0, 0.05, 0.3, 0.6] {
            let a = wave_offset(u, 2.0, 1.5, 0.3);
            let b = wave_offset(u + period, 2.0, 1.5, 0.3);
            assert!((a - b).abs() < 1e-5, "{a} vs {b}");
        }
    }

    #[test]
    fn wave_offset_varies_over_time_within_amplitude() {
        let samples: Vec<f32> = (0..200).map(|i| wave_offset(0.25, i as f32 * 0.05, 1.0, 0.1)).collect();
        assert!(samples.iter().all(|v| v.abs() <= 0.1 + 1e-6));
        let rising = samples.windows(2).any(|w| w[1] > w[0]);
        let falling = samples.windows(2).any(|w| w[1] < w[0]);
        assert!(rising && falling);
    }

    #[test]
    fn wave_with_zero_amplitude_is_identity() {
        let mut pass = wave_pass(1.0, 0.0).unwrap();
        pass.set_parameter("time", 3.0).unwrap();
        let input = ramp(8, 8);
        assert_eq!(render(&pass, &input), input);
    }

    #[test]
    fn wave_shifts_rows_vertically() {
        let pass = wave_pass(0.0, 0.25).unwrap();
        // vertical stripes of value == row index: any offset changes the value
        let input = Image::from_fn(8, 8, |_, y| Vec4::new(y as f32, 0.0, 0.0, 1.0));
        let out = render(&pass, &input);
        assert_ne!(out, input);
    }

    #[test]
    fn positive_wave_offset_samples_upward() {
        let pass = wave_pass(0.0, 0.25).unwrap();
        let input = Image::from_fn(8, 8, |_, y| Vec4::new(y as f32, 0.0, 0.0, 1.0));
        let out = render(&pass, &input);
        // column 1 sits at u = 0.1875, where sin(10u) > 0
        let offset = wave_offset(0.1875, 0.0, 0.0, 0.25);
        assert!(offset > 0.0);
        let expected = (0.5625 - offset) * 8.0 - 0.5;
        assert!((out.get(1, 4).x - expected).abs() < 1e-3, "{}", out.get(1, 4));
        assert!(out.get(1, 4).x < 4.0);
    }

    #[test]
    fn normal_tilted_up_samples_from_above() {
        // encoded (0.5, 1, 0.5): fully toward +y
        let tilted = Arc::new(Image::filled(1, 8, Vec4::new(0.5, 1.0, 0.5, 1.0)));
        let pass = normal_map_pass(tilted, Vec2::new(1.0, 0.0), 0.0).unwrap();
        let input = Image::from_fn(1, 8, |_, y| Vec4::new(y as f32, 0.0, 0.0, 1.0));
        let out = render(&pass, &input);
        // 0.1 in v is 0.8 rows toward the top
        assert!((out.get(0, 4).x - 3.2).abs() < 1e-4, "{}", out.get(0, 4));
    }

    #[test]
    fn flat_normal_map_only_adds_lightness() {
        let flat = Arc::new(normal_map::flat(4, 4));
        let pass = normal_map_pass(flat, Vec2::new(-1.0, 1.0), 2.0).unwrap();
        let input = ramp(4, 4);
        let out = render(&pass, &input);
        // (0, 0, 1) is perpendicular to any xy light direction
        let expected = lightness(Vec3::Z, Vec2::new(-1.0, 1.0), 2.0);
        assert_eq!(expected, 0.0);
        for (a, b) in input.pixels().iter().zip(out.pixels()) {
            assert!((*a - *b).abs().max_element() < 1e-5, "{a} -> {b}");
        }
    }

    #[test]
    fn tilted_normal_lights_facing_direction() {
        // normal tilted toward +x, light from +x
        let n = Vec3::new(0.6, 0.0, 0.8);
        assert!((lightness(n, Vec2::new(1.0, 0.0), 2.0) - 1.2).abs() < 1e-6);
        assert_eq!(lightness(n, Vec2::new(-1.0, 0.0), 2.0), 0.0);
        assert_eq!(lightness(n, Vec2::ZERO, 4.0), 0.0);
    }

    #[test]
    fn normal_map_pass_displaces_by_normal_xy() {
        // every normal tilts fully toward +x: encoded (1, 0.5, 0.5)
        let tilted = Arc::new(Image::filled(8, 1, Vec4::new(1.0, 0.5, 0.5, 1.0)));
        let pass = normal_map_pass(tilted, Vec2::new(0.0, 1.0), 0.0).unwrap();
        let input = Image::from_fn(8, 1, |x, _| Vec4::new(x as f32, 0.0, 0.0, 1.0));
        let out = render(&pass, &input);
        // offset 0.1 in u is 0.8 texels to the right
        assert!((out.get(2, 0).x - 2.8).abs() < 1e-4, "{}", out.get(2, 0));
    }

    proptest! {
        #[test]
        fn tint_is_position_independent_addition(
            c in prop::array::uniform3(0.0f32..2.0),
            t in prop::array::uniform3(0.0f32..=1.0),
        ) {
            let pass = tint_pass(Vec3::from(t)).unwrap();
            let input = Image::filled(3, 2, Vec3::from(c).extend(1.0));
            let out = render(&pass, &input);
            let expected = Vec3::from(c) + Vec3::from(t);
            for p in out.pixels() {
                prop_assert!((p.xyz() - expected).abs().max_element() < 1e-5);
                prop_assert_eq!(p.w, 1.0);
            }
        }

        #[test]
        fn wave_offset_has_period_pi_over_five(
            u in 0.0f32..1.0, time in 0.0f32..100.0, speed in 0.0f32..3.0, amplitude in 0.0f32..0.3
        ) {
            let a = wave_offset(u, time, speed, amplitude);
            let b = wave_offset(u + PI / 5.0, time, speed, amplitude);
            prop_assert!((a - b).abs() < 1e-3, "{} vs {}", a, b);
            prop_assert!(a.abs() <= amplitude + 1e-6);
        }
    }
}
