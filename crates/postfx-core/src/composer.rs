use crate::error::{Error, Result};
use crate::pass::{Pass, PassId};
use crate::raster::Image;
use crate::source::{DisplaySurface, FrameSource};
use crate::uniforms::UniformValue;

/// The ordered pass chain plus the images it renders through.
///
/// The live frame is rendered into its own buffer; enabled passes then
/// ping-pong between two scratch images of the same size. Disabled passes
/// are skipped, so the previous output flows on unchanged.
pub struct Composer {
    passes: Vec<(PassId, Pass)>,
    next_id: u32,
    frame: Image,
    buffers: [Image; 2],
    /// Buffer holding the last run's result; `None` means the raw frame.
    output: Option<usize>,
    logical: (u32, u32),
    pixel_ratio: f32,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new()
    }
}

impl Composer {
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            next_id: 0,
            frame: Image::new(1, 1),
            buffers: [Image::new(1, 1), Image::new(1, 1)],
            output: None,
            logical: (1, 1),
            pixel_ratio: 1.0,
        }
    }

    // -----------------------------------------------------------------------
    // Chain editing
    // -----------------------------------------------------------------------

    /// Insert a pass after every pass of the same or an earlier stage, so the
    /// chain always stays sorted by [`Stage`](crate::Stage).
    pub fn add_pass(&mut self, pass: impl Into<Pass>) -> PassId {
        let mut pass = pass.into();
        let (w, h) = self.size();
        pass.resize(w, h);

        let id = PassId(self.next_id);
        self.next_id += 1;
        let at = self
            .passes
            .iter()
            .position(|(_, p)| p.stage() > pass.stage())
            .unwrap_or(self.passes.len());
        log::debug!("add pass `{}` ({:?}) at position {at}", pass.name(), pass.stage());
        self.passes.insert(at, (id, pass));
        id
    }

    pub fn remove_pass(&mut self, id: PassId) -> Result<Pass> {
        let idx = self.index_of(id)?;
        Ok(self.passes.remove(idx).1)
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Passes in execution order.
    pub fn passes(&self) -> impl Iterator<Item = (PassId, &Pass)> {
        self.passes.iter().map(|(id, p)| (*id, p))
    }

    pub fn ids(&self) -> Vec<PassId> {
        self.passes.iter().map(|(id, _)| *id).collect()
    }

    pub fn pass(&self, id: PassId) -> Option<&Pass> {
        self.passes.iter().find(|(i, _)| *i == id).map(|(_, p)| p)
    }

    pub fn pass_mut(&mut self, id: PassId) -> Option<&mut Pass> {
        self.passes.iter_mut().find(|(i, _)| *i == id).map(|(_, p)| p)
    }

    /// First pass with the given name.
    pub fn find(&self, name: &str) -> Option<PassId> {
        self.passes.iter().find(|(_, p)| p.name() == name).map(|(id, _)| *id)
    }

    pub fn set_enabled(&mut self, id: PassId, enabled: bool) -> Result<()> {
        let pass = self.pass_mut(id).ok_or(Error::UnknownPass(id.0))?;
        if pass.enabled() != enabled {
            log::debug!("{} `{}`", if enabled { "enable" } else { "disable" }, pass.name());
        }
        pass.set_enabled(enabled);
        Ok(())
    }

    pub fn set_parameter(&mut self, id: PassId, name: &str, value: impl Into<UniformValue>) -> Result<()> {
        self.pass_mut(id)
            .ok_or(Error::UnknownPass(id.0))?
            .set_parameter(name, value)
    }

    fn index_of(&self, id: PassId) -> Result<usize> {
        self.passes
            .iter()
            .position(|(i, _)| *i == id)
            .ok_or(Error::UnknownPass(id.0))
    }

    // -----------------------------------------------------------------------
    // Sizing
    // -----------------------------------------------------------------------

    /// Size every buffer to `floor(width * pixel_ratio) × floor(height *
    /// pixel_ratio)`. Repeating the same call does nothing; a zero-sized
    /// viewport (minimised window) or one past [`MAX_DIMENSION`] is ignored.
    pub fn resize(&mut self, width: u32, height: u32, pixel_ratio: f32) {
        if width == 0 || height == 0 {
            log::debug!("ignoring resize to {width}x{height}");
            return;
        }
        let pixel_ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
            pixel_ratio
        } else {
            log::warn!("invalid pixel ratio {pixel_ratio}, using 1.0");
            1.0
        };

        let buffer = buffer_size(width, height, pixel_ratio);
        if buffer.0 > MAX_DIMENSION || buffer.1 > MAX_DIMENSION {
            log::warn!(
                "ignoring resize to {}x{}: larger than {MAX_DIMENSION} pixels per side",
                buffer.0,
                buffer.1
            );
            return;
        }
        self.logical = (width, height);
        self.pixel_ratio = pixel_ratio;
        if buffer == self.size() {
            return;
        }

        log::debug!("resize chain to {}x{} (ratio {pixel_ratio})", buffer.0, buffer.1);
        self.frame.resize(buffer.0, buffer.1);
        for b in &mut self.buffers {
            b.resize(buffer.0, buffer.1);
        }
        for (_, pass) in &mut self.passes {
            pass.resize(buffer.0, buffer.1);
        }
        self.output = None;
    }

    /// Buffer size in pixels.
    pub fn size(&self) -> (u32, u32) {
        self.frame.size()
    }

    pub fn logical_size(&self) -> (u32, u32) {
        self.logical
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// Start a tick: run per-tick preparation on every enabled pass and
    /// return their ids in execution order. Parameter writes made after this
    /// call are seen next tick.
    pub fn begin_tick(&mut self) -> Vec<PassId> {
        self.passes
            .iter_mut()
            .filter(|(_, p)| p.enabled())
            .map(|(id, p)| {
                p.prepare();
                *id
            })
            .collect()
    }

    /// Render one frame from `source` through every enabled pass and present
    /// the result.
    pub fn run(&mut self, source: &mut dyn FrameSource, surface: &mut dyn DisplaySurface) {
        let active = self.begin_tick();
        source.render(&mut self.frame);

        let mut current: Option<usize> = None;
        for (id, pass) in &self.passes {
            if !active.contains(id) {
                continue;
            }
            let target = current.map_or(0, |i| 1 - i);
            let [a, b] = &mut self.buffers;
            let (input, output) = match current {
                None => (&self.frame, a),
                Some(0) => (&*a, b),
                Some(_) => (&*b, a),
            };
            pass.render(input, output);
            current = Some(target);
        }

        self.output = current;
        surface.present(self.output());
    }

    /// Result of the last run (the raw frame when no pass was enabled).
    pub fn output(&self) -> &Image {
        match self.output {
            Some(i) => &self.buffers[i],
            None => &self.frame,
        }
    }
}

/// Largest buffer side the chain allocates. Matches the 2D texture limit of
/// common GPUs.
pub const MAX_DIMENSION: u32 = 16_384;

/// Pixel size of a `width × height` viewport at `pixel_ratio`.
pub fn buffer_size(width: u32, height: u32, pixel_ratio: f32) -> (u32, u32) {
    let scale = |v: u32| ((v as f32 * pixel_ratio).floor() as u32).max(1);
    (scale(width), scale(height))
}

#[cfg(test)]
mod tests {
    use glam::{Vec3, Vec4};
    use proptest::prelude::*;

    use super::*;
    use crate::custom::tint_pass;
    use crate::effects::{linear_to_srgb, BuiltinPass};
    use crate::source::{ImageSurface, SolidColor};
    use crate::Stage;

    fn stages(c: &Composer) -> Vec<Stage> {
        c.passes().map(|(_, p)| p.stage()).collect()
    }

    fn run_solid(c: &mut Composer, color: Vec4) -> Image {
        let mut surface = ImageSurface::new();
        c.run(&mut SolidColor(color), &mut surface);
        surface.into_frame().unwrap()
    }

    #[test]
    fn insertion_keeps_stage_order() {
        let mut c = Composer::new();
        c.add_pass(BuiltinPass::antialias().unwrap());
        c.add_pass(BuiltinPass::gamma_correction().unwrap());
        let tint = c.add_pass(tint_pass(Vec3::ZERO).unwrap());
        let glitch = c.add_pass(BuiltinPass::glitch(1).unwrap());
        assert_eq!(
            stages(&c),
            vec![Stage::Effect, Stage::Effect, Stage::ColorSpace, Stage::Antialias]
        );
        // insertion order kept within a stage
        assert_eq!(c.ids()[..2], [tint, glitch]);
    }

    #[test]
    fn empty_chain_presents_raw_frame() {
        let mut c = Composer::new();
        c.resize(4, 3, 1.0);
        let out = run_solid(&mut c, Vec4::new(0.3, 0.2, 0.1, 1.0));
        assert_eq!(out, Image::filled(4, 3, Vec4::new(0.3, 0.2, 0.1, 1.0)));
    }

    #[test]
    fn tint_then_gamma_on_black() {
        let mut c = Composer::new();
        c.resize(8, 8, 1.0);
        let tint = c.add_pass(tint_pass(Vec3::new(0.2, 0.0, 0.0)).unwrap());
        let gamma = c.add_pass(BuiltinPass::gamma_correction().unwrap());

        c.set_enabled(gamma, false).unwrap();
        let before = run_solid(&mut c, Vec4::new(0.0, 0.0, 0.0, 1.0));
        for p in before.pixels() {
            assert!((*p - Vec4::new(0.2, 0.0, 0.0, 1.0)).abs().max_element() < 1e-6);
        }

        c.set_enabled(gamma, true).unwrap();
        let after = run_solid(&mut c, Vec4::new(0.0, 0.0, 0.0, 1.0));
        for p in after.pixels() {
            assert!((p.x - linear_to_srgb(0.2)).abs() < 1e-6);
            assert!((p.x - 0.4845).abs() < 1e-3);
            assert_eq!((p.y, p.z, p.w), (0.0, 0.0, 1.0));
        }
        assert!(c.pass(tint).unwrap().enabled());
    }

    #[test]
    fn disabled_dot_screen_and_glitch_pass_frame_through() {
        let mut c = Composer::new();
        c.resize(6, 4, 1.0);
        let dots = c.add_pass(BuiltinPass::dot_screen().unwrap());
        let glitch = c.add_pass(BuiltinPass::glitch(2).unwrap());
        c.set_enabled(dots, false).unwrap();
        c.set_enabled(glitch, false).unwrap();
        let color = Vec4::new(0.6, 0.4, 0.2, 1.0);
        assert_eq!(run_solid(&mut c, color), Image::filled(6, 4, color));
    }

    #[test]
    fn resize_scales_buffers_and_is_idempotent() {
        let mut c = Composer::new();
        c.add_pass(BuiltinPass::bloom().unwrap());
        c.resize(100, 50, 2.0);
        assert_eq!(c.size(), (200, 100));
        c.resize(100, 50, 2.0);
        assert_eq!(c.size(), (200, 100));
        c.resize(10, 10, 1.5);
        assert_eq!(c.size(), (15, 15));
        assert_eq!(c.logical_size(), (10, 10));
        let (_, bloom) = c.passes().next().unwrap();
        assert_eq!(bloom.shader().size(), (15, 15));
    }

    #[test]
    fn zero_resize_is_ignored() {
        let mut c = Composer::new();
        c.resize(20, 10, 1.0);
        c.resize(0, 10, 1.0);
        assert_eq!(c.size(), (20, 10));
    }

    #[test]
    fn oversized_resize_is_ignored() {
        let mut c = Composer::new();
        c.add_pass(BuiltinPass::bloom().unwrap());
        c.resize(20, 10, 1.0);
        c.resize(70_000, 70_000, 1.0);
        assert_eq!(c.size(), (20, 10));
        assert_eq!(c.logical_size(), (20, 10));
        c.resize(MAX_DIMENSION / 2 + 1, 10, 2.0);
        assert_eq!(c.size(), (20, 10));
    }

    #[test]
    fn invalid_ratio_falls_back_to_one() {
        let mut c = Composer::new();
        c.resize(20, 10, f32::NAN);
        assert_eq!(c.size(), (20, 10));
        assert_eq!(c.pixel_ratio(), 1.0);
    }

    #[test]
    fn added_pass_is_sized_to_chain() {
        let mut c = Composer::new();
        c.resize(40, 30, 1.0);
        let id = c.add_pass(BuiltinPass::antialias().unwrap());
        assert_eq!(c.pass(id).unwrap().shader().size(), (40, 30));
    }

    #[test]
    fn unknown_ids_are_errors() {
        let mut c = Composer::new();
        let id = c.add_pass(tint_pass(Vec3::ZERO).unwrap());
        c.remove_pass(id).unwrap();
        assert!(matches!(c.set_enabled(id, true), Err(Error::UnknownPass(_))));
        assert!(c.set_parameter(id, "tint", Vec3::ONE).is_err());
        assert!(c.is_empty());
    }

    #[test]
    fn find_by_name() {
        let mut c = Composer::new();
        let g = c.add_pass(BuiltinPass::gamma_correction().unwrap());
        assert_eq!(c.find("gamma_correction"), Some(g));
        assert_eq!(c.find("bloom"), None);
    }

    #[test]
    fn begin_tick_skips_disabled_passes() {
        let mut c = Composer::new();
        let a = c.add_pass(tint_pass(Vec3::ZERO).unwrap());
        let b = c.add_pass(BuiltinPass::glitch(3).unwrap());
        c.set_enabled(a, false).unwrap();
        assert_eq!(c.begin_tick(), vec![b]);
    }

    #[test]
    fn output_alternates_buffers_for_long_chains() {
        let mut c = Composer::new();
        c.resize(2, 2, 1.0);
        for _ in 0..5 {
            c.add_pass(tint_pass(Vec3::new(0.1, 0.0, 0.0)).unwrap());
        }
        let out = run_solid(&mut c, Vec4::new(0.0, 0.0, 0.0, 1.0));
        assert!((out.get(0, 0).x - 0.5).abs() < 1e-5);
    }

    proptest! {
        #[test]
        fn zero_enabled_passes_is_identity(
            r in 0.0f32..1.0, g in 0.0f32..1.0, b in 0.0f32..1.0, n in 0usize..4
        ) {
            let mut c = Composer::new();
            c.resize(3, 3, 1.0);
            for _ in 0..n {
                let id = c.add_pass(tint_pass(Vec3::splat(0.3)).unwrap());
                c.set_enabled(id, false).unwrap();
            }
            let color = Vec4::new(r, g, b, 1.0);
            prop_assert_eq!(run_solid(&mut c, color), Image::filled(3, 3, color));
        }

        #[test]
        fn disabling_equals_removing(
            tints in proptest::collection::vec((0.0f32..1.0, any::<bool>()), 1..5)
        ) {
            let mut toggled = Composer::new();
            let mut pruned = Composer::new();
            toggled.resize(3, 2, 1.0);
            pruned.resize(3, 2, 1.0);
            for (t, enabled) in &tints {
                let id = toggled.add_pass(tint_pass(Vec3::new(*t, 0.0, *t)).unwrap());
                toggled.set_enabled(id, *enabled).unwrap();
                if *enabled {
                    pruned.add_pass(tint_pass(Vec3::new(*t, 0.0, *t)).unwrap());
                }
            }
            toggled.add_pass(BuiltinPass::gamma_correction().unwrap());
            pruned.add_pass(BuiltinPass::gamma_correction().unwrap());

            let color = Vec4::new(0.1, 0.2, 0.3, 1.0);
            prop_assert_eq!(run_solid(&mut toggled, color), run_solid(&mut pruned, color));
        }

        #[test]
        fn resize_output_matches_scaled_size(
            w in 1u32..64, h in 1u32..64, ratio in 0.5f32..3.0, repeat in any::<bool>()
        ) {
            let mut c = Composer::new();
            c.add_pass(tint_pass(Vec3::ZERO).unwrap());
            c.resize(w, h, ratio);
            if repeat {
                c.resize(w, h, ratio);
            }
            let expected = buffer_size(w, h, ratio);
            let out = run_solid(&mut c, Vec4::ONE);
            prop_assert_eq!(out.size(), expected);
            prop_assert_eq!(c.size(), expected);
        }
    }
}
