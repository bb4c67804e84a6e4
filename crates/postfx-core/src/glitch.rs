use std::f32::consts::PI;

use fastnoise_lite::{FastNoiseLite, NoiseType};
use glam::Vec4;

use crate::raster::Image;
use crate::shader::ShaderPass;

// ---------------------------------------------------------------------------
// GlitchRng: deterministic random stream
// ---------------------------------------------------------------------------

/// Random stream drawn from value-noise lattice points: sampling integer
/// coordinates returns the raw lattice hash, so consecutive steps are
/// uncorrelated and the sequence is reproducible from the seed.
pub struct GlitchRng {
    noise: FastNoiseLite,
    step: u32,
}

impl GlitchRng {
    pub fn new(seed: i32) -> Self {
        let mut noise = FastNoiseLite::with_seed(seed);
        noise.set_noise_type(Some(NoiseType::Value));
        noise.set_frequency(Some(1.0));
        Self { noise, step: 0 }
    }

    /// Next value in [0, 1).
    pub fn next_f32(&mut self) -> f32 {
        // Stay inside the range where f32 holds every integer exactly.
        self.step = (self.step + 1) & 0x00FF_FFFF;
        let raw = self.noise.get_noise_2d(self.step as f32, 0.0);
        ((raw + 1.0) * 0.5).clamp(0.0, 0.999_999)
    }

    pub fn range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next_f32()
    }

    /// Integer in `lo..=hi`.
    pub fn range_u32(&mut self, lo: u32, hi: u32) -> u32 {
        lo + (self.next_f32() * (hi - lo + 1) as f32) as u32
    }
}

/// Random grey displacement map sampled by the glitch program.
pub fn displacement_map(size: u32, seed: i32) -> Image {
    let mut rng = GlitchRng::new(seed);
    Image::from_fn(size, size, |_, _| {
        let v = rng.next_f32();
        Vec4::new(v, v, v, 1.0)
    })
}

// ---------------------------------------------------------------------------
// GlitchState: per-frame trigger logic
// ---------------------------------------------------------------------------

/// Uniform values for one glitch frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlitchFrame {
    pub seed: f32,
    pub amount: f32,
    pub angle: f32,
    pub seed_x: f32,
    pub seed_y: f32,
    pub distortion_x: f32,
    pub distortion_y: f32,
    pub bypass: bool,
}

/// What a frame does, decided by the frame counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlitchPhase {
    Strong,
    Weak,
    Bypass,
}

/// Frame counter driving the glitch: a strong burst every `trigger` frames
/// (120–240, re-rolled after each burst), weak jitter for the first fifth of
/// each period, bypass otherwise. `go_wild` makes every frame a burst.
pub struct GlitchState {
    pub go_wild: bool,
    rng: GlitchRng,
    frame: u32,
    trigger: u32,
    last: Option<GlitchFrame>,
}

impl GlitchState {
    pub fn new(seed: i32) -> Self {
        let mut rng = GlitchRng::new(seed);
        let trigger = rng.range_u32(120, 240);
        Self {
            go_wild: false,
            rng,
            frame: 0,
            trigger,
            last: None,
        }
    }

    pub fn trigger(&self) -> u32 {
        self.trigger
    }

    pub fn phase(&self) -> GlitchPhase {
        let pos = self.frame % self.trigger;
        if pos == 0 || self.go_wild {
            GlitchPhase::Strong
        } else if (pos as f32) < self.trigger as f32 / 5.0 {
            GlitchPhase::Weak
        } else {
            GlitchPhase::Bypass
        }
    }

    /// Advance one frame. Values not re-rolled this frame keep their previous
    /// setting, as the uniforms do on the GPU.
    pub fn step(&mut self) -> GlitchFrame {
        let prev = self.last.unwrap_or(GlitchFrame {
            seed: 0.02,
            amount: 0.08,
            angle: 0.02,
            seed_x: 0.02,
            seed_y: 0.02,
            distortion_x: 0.5,
            distortion_y: 0.6,
            bypass: false,
        });
        let mut next = GlitchFrame {
            seed: self.rng.next_f32(),
            bypass: false,
            ..prev
        };

        match self.phase() {
            GlitchPhase::Strong => {
                next.amount = self.rng.next_f32() / 30.0;
                next.angle = self.rng.range(-PI, PI);
                next.seed_x = self.rng.range(-1.0, 1.0);
                next.seed_y = self.rng.range(-1.0, 1.0);
                next.distortion_x = self.rng.range(0.0, 1.0);
                next.distortion_y = self.rng.range(0.0, 1.0);
                self.frame = 0;
                self.trigger = self.rng.range_u32(120, 240);
                log::trace!("glitch burst, next trigger in {} frames", self.trigger);
            }
            GlitchPhase::Weak => {
                next.amount = self.rng.next_f32() / 90.0;
                next.angle = self.rng.range(-PI, PI);
                next.distortion_x = self.rng.range(0.0, 1.0);
                next.distortion_y = self.rng.range(0.0, 1.0);
                next.seed_x = self.rng.range(-0.3, 0.3);
                next.seed_y = self.rng.range(-0.3, 0.3);
            }
            GlitchPhase::Bypass => next.bypass = true,
        }

        self.frame += 1;
        self.last = Some(next);
        next
    }
}

impl GlitchFrame {
    /// Write this frame into the glitch pass's uniforms.
    pub fn apply(&self, shader: &mut ShaderPass) {
        let values = [
            ("seed", self.seed),
            ("amount", self.amount),
            ("angle", self.angle),
            ("seed_x", self.seed_x),
            ("seed_y", self.seed_y),
            ("distortion_x", self.distortion_x),
            ("distortion_y", self.distortion_y),
            ("byp", if self.bypass { 1.0 } else { 0.0 }),
        ];
        for (name, value) in values {
            if let Err(e) = shader.set_parameter(name, value) {
                log::warn!("glitch: {e}");
            }
        }
    }
}
