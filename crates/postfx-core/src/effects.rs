//! Built-in effects: dot screen, glitch, RGB shift, bloom, gamma correction
//! and FXAA antialiasing.
//!
//! Each one is a single full-screen [`ShaderProgram`]; the CPU fragment
//! functions below mirror the WGSL in `shaders/` line for line.

use std::f32::consts::PI;
use std::sync::Arc;

use glam::{Vec2, Vec3, Vec4, Vec4Swizzles};

use crate::error::Result;
use crate::glitch::{displacement_map, GlitchState};
use crate::shader::{Fragment, ShaderPass, ShaderProgram};
use crate::uniforms::Uniforms;
use crate::Stage;

// ---------------------------------------------------------------------------
// Dot screen
// ---------------------------------------------------------------------------

fn dot_screen(f: &Fragment<'_>) -> Vec4 {
    let angle = f.float("angle");
    let (s, c) = angle.sin_cos();
    let tex = f.uv * f.vec2("t_size") - f.vec2("center");
    let rotated = Vec2::new(c * tex.x - s * tex.y, s * tex.x + c * tex.y) * f.float("scale");
    let pattern = rotated.x.sin() * rotated.y.sin() * 4.0;

    let color = f.sample(f.uv);
    let average = (color.x + color.y + color.z) / 3.0;
    Vec3::splat(average * 10.0 - 5.0 + pattern).extend(color.w)
}

pub const DOT_SCREEN: ShaderProgram = ShaderProgram {
    label: "dot_screen",
    fragment: dot_screen,
    fragment_wgsl: include_str!("../shaders/dot_screen.wgsl"),
};

// ---------------------------------------------------------------------------
// RGB shift
// ---------------------------------------------------------------------------

fn rgb_shift(f: &Fragment<'_>) -> Vec4 {
    let angle = f.float("angle");
    let offset = f.float("amount") * Vec2::new(angle.cos(), angle.sin());
    let cr = f.sample(f.uv + offset);
    let cga = f.sample(f.uv);
    let cb = f.sample(f.uv - offset);
    Vec4::new(cr.x, cga.y, cb.z, cga.w)
}

pub const RGB_SHIFT: ShaderProgram = ShaderProgram {
    label: "rgb_shift",
    fragment: rgb_shift,
    fragment_wgsl: include_str!("../shaders/rgb_shift.wgsl"),
};

// ---------------------------------------------------------------------------
// Glitch
// ---------------------------------------------------------------------------

fn glsl_rand(co: Vec2) -> f32 {
    (co.dot(Vec2::new(12.9898, 78.233)).sin() * 43758.5453).fract()
}

fn glitch(f: &Fragment<'_>) -> Vec4 {
    if f.float("byp") > 0.5 {
        return f.sample(f.uv);
    }

    let seed = f.float("seed");
    let col_s = f.float("col_s");
    let dist_x = f.float("distortion_x");
    let dist_y = f.float("distortion_y");
    let seed_x = f.float("seed_x");
    let seed_y = f.float("seed_y");
    let xs = (f.coord.x / 0.5).floor();
    let ys = (f.coord.y / 0.5).floor();

    let mut p = f.uv;
    let disp = f.sample_aux(p * seed * seed);
    if p.y < dist_x + col_s && p.y > dist_x - col_s * seed {
        p.y = if seed_x > 0.0 { 1.0 - (p.y + dist_y) } else { dist_y };
    }
    if p.x < dist_y + col_s && p.x > dist_y - col_s * seed {
        p.x = if seed_y > 0.0 { dist_x } else { 1.0 - (p.x + dist_x) };
    }
    p.x += disp.x * seed_x * (seed / 5.0);
    p.y += disp.y * seed_y * (seed / 5.0);

    let amount = f.float("amount");
    let angle = f.float("angle");
    let offset = amount * Vec2::new(angle.cos(), angle.sin());
    let cr = f.sample(p + offset);
    let cga = f.sample(p);
    let cb = f.sample(p - offset);
    let snow = 200.0 * amount * glsl_rand(Vec2::new(xs * seed, ys * seed * 50.0)) * 0.2;
    Vec4::new(cr.x, cga.y, cb.z, cga.w) + Vec4::splat(snow)
}

pub const GLITCH: ShaderProgram = ShaderProgram {
    label: "glitch",
    fragment: glitch,
    fragment_wgsl: include_str!("../shaders/glitch.wgsl"),
};

// ---------------------------------------------------------------------------
// Bloom
// ---------------------------------------------------------------------------

const BLOOM_SMOOTH_WIDTH: f32 = 0.01;
const BLOOM_SIGMA: f32 = 1.5;
const LUMINANCE: Vec3 = Vec3::new(0.2126, 0.7152, 0.0722);

pub(crate) fn smoothstep(e0: f32, e1: f32, x: f32) -> f32 {
    let t = ((x - e0) / (e1 - e0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn bloom(f: &Fragment<'_>) -> Vec4 {
    let threshold = f.float("threshold");
    let bright = |c: Vec3| c * smoothstep(threshold, threshold + BLOOM_SMOOTH_WIDTH, c.dot(LUMINANCE));

    let base = f.sample(f.uv);
    let spacing = f.float("radius") * 4.0 * f.vec2("texel");
    let mut glow = Vec3::ZERO;
    let mut total = 0.0;
    for j in -2..=2 {
        for i in -2..=2 {
            let offset = Vec2::new(i as f32, j as f32);
            let w = (-offset.dot(offset) / (2.0 * BLOOM_SIGMA * BLOOM_SIGMA)).exp();
            glow += bright(f.sample(f.uv + offset * spacing).xyz()) * w;
            total += w;
        }
    }
    (base.xyz() + f.float("strength") * glow / total).extend(base.w)
}

pub const BLOOM: ShaderProgram = ShaderProgram {
    label: "bloom",
    fragment: bloom,
    fragment_wgsl: include_str!("../shaders/bloom.wgsl"),
};

// ---------------------------------------------------------------------------
// Gamma correction
// ---------------------------------------------------------------------------

/// Linear → sRGB transfer for one channel.
pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.max(0.0).powf(1.0 / 2.4) - 0.055
    }
}

fn gamma(f: &Fragment<'_>) -> Vec4 {
    let c = f.sample(f.uv);
    Vec4::new(linear_to_srgb(c.x), linear_to_srgb(c.y), linear_to_srgb(c.z), c.w)
}

pub const GAMMA_CORRECTION: ShaderProgram = ShaderProgram {
    label: "gamma_correction",
    fragment: gamma,
    fragment_wgsl: include_str!("../shaders/gamma.wgsl"),
};

// ---------------------------------------------------------------------------
// FXAA
// ---------------------------------------------------------------------------

const FXAA_REDUCE_MIN: f32 = 1.0 / 128.0;
const FXAA_REDUCE_MUL: f32 = 1.0 / 8.0;
const FXAA_SPAN_MAX: f32 = 8.0;
const FXAA_LUMA: Vec3 = Vec3::new(0.299, 0.587, 0.114);

fn fxaa(f: &Fragment<'_>) -> Vec4 {
    let texel = f.vec2("texel");
    let tap = |uv: Vec2| f.sample(uv);

    let rgb_nw = tap(f.uv + Vec2::new(-1.0, -1.0) * texel).xyz();
    let rgb_ne = tap(f.uv + Vec2::new(1.0, -1.0) * texel).xyz();
    let rgb_sw = tap(f.uv + Vec2::new(-1.0, 1.0) * texel).xyz();
    let rgb_se = tap(f.uv + Vec2::new(1.0, 1.0) * texel).xyz();
    let rgba_m = tap(f.uv);

    let luma_nw = rgb_nw.dot(FXAA_LUMA);
    let luma_ne = rgb_ne.dot(FXAA_LUMA);
    let luma_sw = rgb_sw.dot(FXAA_LUMA);
    let luma_se = rgb_se.dot(FXAA_LUMA);
    let luma_m = rgba_m.xyz().dot(FXAA_LUMA);

    let luma_min = luma_m.min(luma_nw.min(luma_ne).min(luma_sw.min(luma_se)));
    let luma_max = luma_m.max(luma_nw.max(luma_ne).max(luma_sw.max(luma_se)));

    let dir = Vec2::new(
        -((luma_nw + luma_ne) - (luma_sw + luma_se)),
        (luma_nw + luma_sw) - (luma_ne + luma_se),
    );
    let dir_reduce =
        ((luma_nw + luma_ne + luma_sw + luma_se) * (0.25 * FXAA_REDUCE_MUL)).max(FXAA_REDUCE_MIN);
    let rcp_dir_min = 1.0 / (dir.x.abs().min(dir.y.abs()) + dir_reduce);
    let dir = (dir * rcp_dir_min).clamp(Vec2::splat(-FXAA_SPAN_MAX), Vec2::splat(FXAA_SPAN_MAX)) * texel;

    let rgb_a = 0.5 * (tap(f.uv + dir * (1.0 / 3.0 - 0.5)).xyz() + tap(f.uv + dir * (2.0 / 3.0 - 0.5)).xyz());
    let rgb_b = rgb_a * 0.5 + 0.25 * (tap(f.uv + dir * -0.5).xyz() + tap(f.uv + dir * 0.5).xyz());
    let luma_b = rgb_b.dot(FXAA_LUMA);

    if luma_b < luma_min || luma_b > luma_max {
        rgb_a.extend(rgba_m.w)
    } else {
        rgb_b.extend(rgba_m.w)
    }
}

pub const FXAA: ShaderProgram = ShaderProgram {
    label: "fxaa",
    fragment: fxaa,
    fragment_wgsl: include_str!("../shaders/fxaa.wgsl"),
};

// ---------------------------------------------------------------------------
// Effect / BuiltinPass
// ---------------------------------------------------------------------------

/// The built-in effect a [`BuiltinPass`] wraps, plus any per-frame state it
/// keeps outside its uniforms.
pub enum Effect {
    DotScreen,
    Glitch(GlitchState),
    RgbShift,
    Bloom,
    GammaCorrection,
    Antialias,
}

impl Effect {
    pub fn stage(&self) -> Stage {
        match self {
            Effect::GammaCorrection => Stage::ColorSpace,
            Effect::Antialias => Stage::Antialias,
            _ => Stage::Effect,
        }
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Effect::DotScreen => "DotScreen",
            Effect::Glitch(_) => "Glitch",
            Effect::RgbShift => "RgbShift",
            Effect::Bloom => "Bloom",
            Effect::GammaCorrection => "GammaCorrection",
            Effect::Antialias => "Antialias",
        };
        f.write_str(name)
    }
}

/// A library effect: opaque to the chain apart from its shader and toggles.
#[derive(Debug)]
pub struct BuiltinPass {
    effect: Effect,
    shader: ShaderPass,
}

impl BuiltinPass {
    fn new(effect: Effect, shader: ShaderPass) -> Self {
        let stage = effect.stage();
        Self {
            effect,
            shader: shader.with_stage(stage),
        }
    }

    pub fn dot_screen() -> Result<Self> {
        let uniforms = Uniforms::new()
            .with("center", Vec2::splat(0.5), 0.0, 1.0)
            .with("angle", 1.57, 0.0, PI)
            .with("scale", 1.0, 0.0, 4.0)
            .with_fixed("t_size", Vec2::splat(256.0));
        Ok(Self::new(Effect::DotScreen, ShaderPass::new("dot_screen", DOT_SCREEN, uniforms)?))
    }

    pub fn rgb_shift() -> Result<Self> {
        let uniforms = Uniforms::new()
            .with("amount", 0.005, 0.0, 0.1)
            .with("angle", 0.0, 0.0, 2.0 * PI);
        Ok(Self::new(Effect::RgbShift, ShaderPass::new("rgb_shift", RGB_SHIFT, uniforms)?))
    }

    /// Glitch with a 64×64 displacement map; `seed` makes the burst timing
    /// and distortion reproducible.
    pub fn glitch(seed: i32) -> Result<Self> {
        // Declaration order matches `Params` in glitch.wgsl.
        let uniforms = Uniforms::new()
            .with_fixed("amount", 0.08)
            .with_fixed("angle", 0.02)
            .with_fixed("seed", 0.02)
            .with_fixed("seed_x", 0.02)
            .with_fixed("seed_y", 0.02)
            .with_fixed("distortion_x", 0.5)
            .with_fixed("distortion_y", 0.6)
            .with_fixed("col_s", 0.05)
            .with_fixed("byp", 0.0);
        let shader = ShaderPass::new("glitch", GLITCH, uniforms)?
            .with_aux(Arc::new(displacement_map(64, seed)));
        Ok(Self::new(Effect::Glitch(GlitchState::new(seed)), shader))
    }

    pub fn bloom() -> Result<Self> {
        let uniforms = Uniforms::new()
            .with("strength", 1.5, 0.0, 3.0)
            .with("radius", 0.4, 0.0, 1.0)
            .with("threshold", 0.85, 0.0, 1.0)
            .with_fixed("texel", Vec2::ONE);
        Ok(Self::new(Effect::Bloom, ShaderPass::new("bloom", BLOOM, uniforms)?))
    }

    pub fn gamma_correction() -> Result<Self> {
        Ok(Self::new(
            Effect::GammaCorrection,
            ShaderPass::new("gamma_correction", GAMMA_CORRECTION, Uniforms::new())?,
        ))
    }

    pub fn antialias() -> Result<Self> {
        let uniforms = Uniforms::new().with_fixed("texel", Vec2::ONE);
        Ok(Self::new(Effect::Antialias, ShaderPass::new("antialias", FXAA, uniforms)?))
    }

    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    pub fn effect_mut(&mut self) -> &mut Effect {
        &mut self.effect
    }

    pub fn shader(&self) -> &ShaderPass {
        &self.shader
    }

    pub fn shader_mut(&mut self) -> &mut ShaderPass {
        &mut self.shader
    }

    /// Per-tick state update, run just before the pass renders.
    pub fn prepare(&mut self) {
        if let Effect::Glitch(state) = &mut self.effect {
            state.step().apply(&mut self.shader);
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.shader.resize(width, height);
        if self.shader.uniforms().contains("texel") {
            let texel = Vec2::new(1.0 / width as f32, 1.0 / height as f32);
            if let Err(e) = self.shader.set_parameter("texel", texel) {
                log::warn!("{}: {e}", self.shader.name());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Image;

    fn run(pass: &BuiltinPass, input: &Image) -> Image {
        let mut out = Image::new(input.width(), input.height());
        pass.shader().render(input, &mut out);
        out
    }

    fn checker(w: u32, h: u32) -> Image {
        Image::from_fn(w, h, |x, y| {
            if (x + y) % 2 == 0 {
                Vec4::ONE
            } else {
                Vec4::new(0.0, 0.0, 0.0, 1.0)
            }
        })
    }

    #[test]
    fn stages_follow_effect_kind() {
        assert_eq!(BuiltinPass::bloom().unwrap().shader().stage(), Stage::Effect);
        assert_eq!(BuiltinPass::gamma_correction().unwrap().shader().stage(), Stage::ColorSpace);
        assert_eq!(BuiltinPass::antialias().unwrap().shader().stage(), Stage::Antialias);
    }

    #[test]
    fn srgb_curve_reference_points() {
        assert_eq!(linear_to_srgb(0.0), 0.0);
        assert!((linear_to_srgb(1.0) - 1.0).abs() < 1e-5);
        assert!((linear_to_srgb(0.2) - 0.4845).abs() < 1e-3, "{}", linear_to_srgb(0.2));
        assert!((linear_to_srgb(0.002) - 0.02584).abs() < 1e-6);
    }

    #[test]
    fn gamma_leaves_alpha_alone() {
        let input = Image::filled(2, 2, Vec4::new(0.2, 0.0, 1.0, 0.5));
        let out = run(&BuiltinPass::gamma_correction().unwrap(), &input);
        let p = out.get(1, 1);
        assert!((p.x - linear_to_srgb(0.2)).abs() < 1e-6);
        assert_eq!(p.y, 0.0);
        assert_eq!(p.w, 0.5);
    }

    #[test]
    fn rgb_shift_zero_amount_is_identity() {
        let mut pass = BuiltinPass::rgb_shift().unwrap();
        pass.shader_mut().set_parameter("amount", 0.0).unwrap();
        let input = checker(4, 4);
        assert_eq!(run(&pass, &input), input);
    }

    #[test]
    fn rgb_shift_splits_red_and_blue() {
        let mut pass = BuiltinPass::rgb_shift().unwrap();
        pass.shader_mut().set_parameter("amount", 0.1).unwrap();
        // left half black, right half white
        let input = Image::from_fn(20, 1, |x, _| if x < 10 { Vec4::W } else { Vec4::ONE });
        let p = run(&pass, &input).get(9, 0);
        // red samples two texels to the right (white), blue two to the left (black)
        assert!((p.x - 1.0).abs() < 1e-6, "{p}");
        assert_eq!(p.z, 0.0);
    }

    #[test]
    fn fxaa_keeps_uniform_images() {
        let mut pass = BuiltinPass::antialias().unwrap();
        pass.resize(8, 8);
        let input = Image::filled(8, 8, Vec4::new(0.3, 0.6, 0.9, 1.0));
        assert_eq!(run(&pass, &input), input);
    }

    #[test]
    fn fxaa_softens_hard_edges() {
        let mut pass = BuiltinPass::antialias().unwrap();
        pass.resize(8, 8);
        // diagonal staircase; FXAA leaves axis-aligned edges untouched
        let input = Image::from_fn(8, 8, |x, y| if x > y { Vec4::ONE } else { Vec4::W });
        let out = run(&pass, &input);
        assert!(out.pixels().iter().any(|p| p.x > 0.01 && p.x < 0.99));
    }

    #[test]
    fn bloom_below_threshold_is_identity() {
        let mut pass = BuiltinPass::bloom().unwrap();
        pass.resize(6, 6);
        let input = Image::filled(6, 6, Vec4::new(0.2, 0.2, 0.2, 1.0));
        let out = run(&pass, &input);
        for p in out.pixels() {
            assert!((p.x - 0.2).abs() < 1e-6);
        }
    }

    #[test]
    fn bloom_adds_strength_times_bright_input() {
        let mut pass = BuiltinPass::bloom().unwrap();
        pass.resize(6, 6);
        let input = Image::filled(6, 6, Vec4::ONE);
        let p = run(&pass, &input).get(3, 3);
        // uniform image: glow == input, output == (1 + strength) * input
        assert!((p.x - 2.5).abs() < 1e-4, "{p}");
        assert_eq!(p.w, 1.0);
    }

    #[test]
    fn resize_updates_texel_uniform() {
        let mut pass = BuiltinPass::bloom().unwrap();
        pass.resize(200, 100);
        assert_eq!(pass.shader().uniforms().vec2("texel"), Vec2::new(0.005, 0.01));
        assert_eq!(pass.shader().size(), (200, 100));
    }

    #[test]
    fn dot_screen_produces_greyscale() {
        let pass = BuiltinPass::dot_screen().unwrap();
        let out = run(&pass, &checker(5, 5));
        for p in out.pixels() {
            assert_eq!(p.x, p.y);
            assert_eq!(p.y, p.z);
        }
    }

    #[test]
    fn glitch_bypass_frame_is_identity() {
        let mut pass = BuiltinPass::glitch(4).unwrap();
        pass.shader_mut().set_parameter("byp", 1.0).unwrap();
        let input = checker(4, 4);
        assert_eq!(run(&pass, &input), input);
    }

    #[test]
    fn glitch_prepare_rolls_new_seed() {
        let mut pass = BuiltinPass::glitch(4).unwrap();
        pass.prepare();
        let first = pass.shader().uniforms().float("seed");
        pass.prepare();
        assert_ne!(first, pass.shader().uniforms().float("seed"));
        assert_eq!(pass.shader().uniforms().float("col_s"), 0.05);
    }
}
