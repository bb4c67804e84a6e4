use crate::effects::BuiltinPass;
use crate::error::Result;
use crate::raster::Image;
use crate::shader::ShaderPass;
use crate::uniforms::UniformValue;

/// Where a pass may sit in the chain. The composer keeps passes sorted by
/// stage, so colour-space conversion always follows every effect and
/// antialiasing is always last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Effect,
    ColorSpace,
    Antialias,
}

/// Stable handle to a pass inside a [`Composer`](crate::Composer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(pub(crate) u32);

impl PassId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// One stage of the chain: a library effect or a user-authored shader.
#[derive(Debug)]
pub enum Pass {
    Builtin(BuiltinPass),
    Custom(ShaderPass),
}

impl Pass {
    pub fn shader(&self) -> &ShaderPass {
        match self {
            Pass::Builtin(b) => b.shader(),
            Pass::Custom(s) => s,
        }
    }

    pub fn shader_mut(&mut self) -> &mut ShaderPass {
        match self {
            Pass::Builtin(b) => b.shader_mut(),
            Pass::Custom(s) => s,
        }
    }

    pub fn name(&self) -> &str {
        self.shader().name()
    }

    pub fn stage(&self) -> Stage {
        self.shader().stage()
    }

    pub fn enabled(&self) -> bool {
        self.shader().enabled()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.shader_mut().set_enabled(enabled);
    }

    pub fn set_parameter(&mut self, name: &str, value: impl Into<UniformValue>) -> Result<()> {
        self.shader_mut().set_parameter(name, value)
    }

    /// Per-tick state that is not a plain parameter write (glitch timing).
    pub fn prepare(&mut self) {
        if let Pass::Builtin(b) = self {
            b.prepare();
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        match self {
            Pass::Builtin(b) => b.resize(width, height),
            Pass::Custom(s) => s.resize(width, height),
        }
    }

    pub fn render(&self, input: &Image, output: &mut Image) {
        self.shader().render(input, output);
    }
}

impl From<BuiltinPass> for Pass {
    fn from(pass: BuiltinPass) -> Self {
        Pass::Builtin(pass)
    }
}

impl From<ShaderPass> for Pass {
    fn from(pass: ShaderPass) -> Self {
        Pass::Custom(pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custom::tint_pass;
    use glam::Vec3;

    #[test]
    fn stages_are_ordered() {
        assert!(Stage::Effect < Stage::ColorSpace);
        assert!(Stage::ColorSpace < Stage::Antialias);
    }

    #[test]
    fn pass_forwards_to_its_shader() {
        let mut pass = Pass::from(tint_pass(Vec3::ZERO).unwrap());
        assert_eq!(pass.name(), "tint");
        assert_eq!(pass.stage(), Stage::Effect);
        pass.set_enabled(false);
        assert!(!pass.enabled());
        pass.set_parameter("tint", Vec3::new(0.5, 0.0, 0.0)).unwrap();
        assert_eq!(pass.shader().uniforms().vec3("tint").x, 0.5);
    }

    #[test]
    fn builtin_resize_reaches_shader() {
        let mut pass = Pass::from(BuiltinPass::antialias().unwrap());
        pass.resize(32, 16);
        assert_eq!(pass.shader().size(), (32, 16));
        assert_eq!(pass.stage(), Stage::Antialias);
    }
}
