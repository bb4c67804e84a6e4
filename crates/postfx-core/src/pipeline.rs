use std::sync::Arc;

use glam::{Vec2, Vec3};

use crate::composer::Composer;
use crate::config::{clamp_ratio, Antialias, PipelineConfig};
use crate::custom::{normal_map_pass, tint_pass, wave_pass};
use crate::driver::{AnimationDriver, Clock};
use crate::effects::{BuiltinPass, Effect};
use crate::error::Result;
use crate::normal_map;
use crate::pass::{Pass, PassId};
use crate::source::{DisplaySurface, FrameSource};

/// Handles to every pass a config builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassIds {
    pub dot_screen: PassId,
    pub glitch: PassId,
    pub rgb_shift: PassId,
    pub bloom: PassId,
    pub tint: PassId,
    pub wave: PassId,
    pub normal_map: PassId,
    pub gamma_correction: PassId,
    pub antialias: PassId,
}

/// A built chain together with the driver that animates it.
pub struct Pipeline {
    pub composer: Composer,
    pub driver: AnimationDriver,
    pub ids: PassIds,
    max_pixel_ratio: f32,
    antialias: Antialias,
}

impl PipelineConfig {
    /// Build every pass, sized to the viewport, with the configured ones
    /// enabled. The normal map is loaded (or generated) here, so it is in
    /// place before the first run.
    pub fn build(&self, clock: Clock) -> Result<Pipeline> {
        let normals = match &self.normal_map.path {
            Some(path) => normal_map::load(path)?,
            None => normal_map::generate(self.normal_map.size, self.normal_map.seed),
        };

        let mut glitch = BuiltinPass::glitch(self.glitch.seed)?;
        if let Effect::Glitch(state) = glitch.effect_mut() {
            state.go_wild = self.glitch.go_wild;
        }

        let ratio = self.viewport.effective_ratio();
        let mut composer = Composer::new();
        composer.resize(self.viewport.width, self.viewport.height, ratio);

        let toggles = &self.passes;
        let mut add = |pass: Pass, enabled: bool| {
            let id = composer.add_pass(pass);
            if let Some(p) = composer.pass_mut(id) {
                p.set_enabled(enabled);
            }
            id
        };
        let ids = PassIds {
            dot_screen: add(BuiltinPass::dot_screen()?.into(), toggles.dot_screen),
            glitch: add(glitch.into(), toggles.glitch),
            rgb_shift: add(BuiltinPass::rgb_shift()?.into(), toggles.rgb_shift),
            bloom: add(BuiltinPass::bloom()?.into(), toggles.bloom),
            tint: add(tint_pass(Vec3::from(self.tint))?.into(), toggles.tint),
            wave: add(wave_pass(self.wave.speed, self.wave.amplitude)?.into(), toggles.wave),
            normal_map: add(
                normal_map_pass(
                    Arc::new(normals),
                    Vec2::from(self.normal_map.light_direction),
                    self.normal_map.light_strength,
                )?
                .into(),
                toggles.normal_map,
            ),
            gamma_correction: add(BuiltinPass::gamma_correction()?.into(), toggles.gamma_correction),
            antialias: add(BuiltinPass::antialias()?.into(), toggles.antialias.enabled_at(ratio)),
        };

        let mut driver = AnimationDriver::new(clock);
        driver.bind_time(ids.wave, "time");

        log::info!(
            "built pipeline: {} passes at {}x{} (ratio {ratio})",
            composer.len(),
            composer.size().0,
            composer.size().1
        );
        Ok(Pipeline {
            composer,
            driver,
            ids,
            max_pixel_ratio: self.viewport.max_pixel_ratio,
            antialias: self.passes.antialias,
        })
    }
}

impl Pipeline {
    pub fn tick(&mut self, source: &mut dyn FrameSource, surface: &mut dyn DisplaySurface) {
        self.driver.tick(&mut self.composer, source, surface);
    }

    /// Viewport change from the windowing layer; the device ratio is capped
    /// at the configured maximum. When the ratio changes, `auto` antialiasing
    /// is switched to match it; a manual toggle holds until the next change.
    pub fn resize(&mut self, width: u32, height: u32, device_ratio: f32) {
        let ratio = clamp_ratio(device_ratio, self.max_pixel_ratio);
        let before = self.composer.pixel_ratio();
        self.composer.resize(width, height, ratio);

        let after = self.composer.pixel_ratio();
        if after != before && self.antialias == Antialias::Auto {
            let enabled = self.antialias.enabled_at(after);
            if let Err(e) = self.composer.set_enabled(self.ids.antialias, enabled) {
                log::warn!("antialias toggle failed: {e}");
            }
            log::debug!("antialias {} at ratio {after}", if enabled { "on" } else { "off" });
        }
    }

    /// The n-th pass in execution order.
    pub fn nth(&self, n: usize) -> Option<PassId> {
        self.composer.passes().nth(n).map(|(id, _)| id)
    }

    pub fn toggle(&mut self, id: PassId) -> Result<bool> {
        let enabled = !self.composer.pass(id).is_some_and(|p| p.enabled());
        self.composer.set_enabled(id, enabled)?;
        Ok(enabled)
    }

    pub fn go_wild(&self) -> bool {
        match self.composer.pass(self.ids.glitch) {
            Some(Pass::Builtin(b)) => matches!(b.effect(), Effect::Glitch(s) if s.go_wild),
            _ => false,
        }
    }

    pub fn set_go_wild(&mut self, go_wild: bool) {
        if let Some(Pass::Builtin(b)) = self.composer.pass_mut(self.ids.glitch) {
            if let Effect::Glitch(state) = b.effect_mut() {
                state.go_wild = go_wild;
            }
        }
    }
}
