use std::sync::Arc;

use glam::{Vec2, Vec4};

use crate::error::{Error, Result};
use crate::raster::Image;
use crate::uniforms::{UniformValue, Uniforms, MAX_UNIFORM_SLOTS};
use crate::Stage;

// ---------------------------------------------------------------------------
// Vertex stage: shared by every program
// ---------------------------------------------------------------------------

/// Full-screen vertex stage prepended to every pass program.
///
/// Generates two clip-space triangles from the vertex index and passes the
/// texture coordinate through unchanged (v grows downwards, matching texture
/// row order). Also declares the bindings every pass shares:
///   binding 0 : input image
///   binding 1 : linear clamp sampler
///   binding 3 : auxiliary image (normal map, displacement map, or a dummy)
/// Binding 2 is the pass's own `Params` uniform block, declared per program.
pub const VERTEX_WGSL: &str = r#"
struct VertexOut {
    @builtin(position) pos: vec4<f32>,
    @location(0)       uv:  vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) vi: u32) -> VertexOut {
    var positions = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0), vec2<f32>( 1.0, -1.0), vec2<f32>(-1.0,  1.0),
        vec2<f32>(-1.0,  1.0), vec2<f32>( 1.0, -1.0), vec2<f32>( 1.0,  1.0),
    );
    let p = positions[vi];
    var out: VertexOut;
    out.pos = vec4(p, 0.0, 1.0);
    out.uv  = vec2(p.x * 0.5 + 0.5, 0.5 - p.y * 0.5);
    return out;
}

@group(0) @binding(0) var t_input:   texture_2d<f32>;
@group(0) @binding(1) var s_linear:  sampler;
@group(0) @binding(3) var t_aux:     texture_2d<f32>;
"#;

/// CPU counterpart of `vs_main`: the texture coordinate of pixel `(x, y)`.
pub fn vertex_uv(x: u32, y: u32, width: u32, height: u32) -> Vec2 {
    Vec2::new(
        (x as f32 + 0.5) / width as f32,
        (y as f32 + 0.5) / height as f32,
    )
}

// ---------------------------------------------------------------------------
// Fragment stage
// ---------------------------------------------------------------------------

/// Everything a fragment function can see for one pixel.
pub struct Fragment<'a> {
    pub uv: Vec2,
    /// Pixel centre in framebuffer coordinates (`@builtin(position).xy`).
    pub coord: Vec2,
    pub input: &'a Image,
    pub aux: Option<&'a Image>,
    pub uniforms: &'a Uniforms,
}

impl Fragment<'_> {
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        self.input.sample(uv)
    }

    /// Sample the auxiliary image; reads transparent black when none is bound,
    /// like the GPU dummy texture.
    pub fn sample_aux(&self, uv: Vec2) -> Vec4 {
        self.aux.map_or(Vec4::ZERO, |img| img.sample(uv))
    }

    pub fn float(&self, name: &str) -> f32 {
        self.uniforms.float(name)
    }

    pub fn vec2(&self, name: &str) -> Vec2 {
        self.uniforms.vec2(name)
    }

    pub fn vec3(&self, name: &str) -> glam::Vec3 {
        self.uniforms.vec3(name)
    }
}

pub type FragmentFn = fn(&Fragment<'_>) -> Vec4;

/// A per-pixel program: CPU reference function plus the WGSL fragment stage
/// the GPU executes. Both must compute the same image.
#[derive(Clone, Copy)]
pub struct ShaderProgram {
    pub label: &'static str,
    pub fragment: FragmentFn,
    /// WGSL declaring `Params` at binding 2 (if any) and `fs_main`.
    pub fragment_wgsl: &'static str,
}

impl ShaderProgram {
    /// The complete WGSL module: shared vertex stage plus this fragment stage.
    pub fn module_source(&self) -> String {
        format!("{VERTEX_WGSL}\n{}", self.fragment_wgsl)
    }
}

impl std::fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderProgram").field("label", &self.label).finish()
    }
}

// ---------------------------------------------------------------------------
// ShaderPass
// ---------------------------------------------------------------------------

/// A chain stage defined by a [`ShaderProgram`] and the parameter record it
/// reads. Built-in effects and user-authored passes are both `ShaderPass`es
/// underneath.
#[derive(Debug, Clone)]
pub struct ShaderPass {
    name: String,
    enabled: bool,
    stage: Stage,
    program: ShaderProgram,
    uniforms: Uniforms,
    aux: Option<Arc<Image>>,
    size: (u32, u32),
}

impl ShaderPass {
    pub fn new(name: impl Into<String>, program: ShaderProgram, uniforms: Uniforms) -> Result<Self> {
        let name = name.into();
        if uniforms.len() > MAX_UNIFORM_SLOTS {
            return Err(Error::TooManyUniforms(name));
        }
        Ok(Self {
            name,
            enabled: true,
            stage: Stage::Effect,
            program,
            uniforms,
            aux: None,
            size: (1, 1),
        })
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    pub fn with_aux(mut self, aux: Arc<Image>) -> Self {
        self.aux = Some(aux);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn uniforms(&self) -> &Uniforms {
        &self.uniforms
    }

    pub fn aux(&self) -> Option<&Arc<Image>> {
        self.aux.as_ref()
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn set_parameter(&mut self, name: &str, value: impl Into<UniformValue>) -> Result<()> {
        self.uniforms.set(&self.name, name, value.into())
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    /// Evaluate the fragment function over every pixel of `output`.
    pub fn render(&self, input: &Image, output: &mut Image) {
        let (width, height) = output.size();
        let fragment = self.program.fragment;
        for y in 0..height {
            for x in 0..width {
                let frag = Fragment {
                    uv: vertex_uv(x, y, width, height),
                    coord: Vec2::new(x as f32 + 0.5, y as f32 + 0.5),
                    input,
                    aux: self.aux.as_deref(),
                    uniforms: &self.uniforms,
                };
                output.put(x, y, fragment(&frag));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invert(f: &Fragment<'_>) -> Vec4 {
        let c = f.sample(f.uv);
        Vec4::new(1.0 - c.x, 1.0 - c.y, 1.0 - c.z, c.w)
    }

    const INVERT: ShaderProgram = ShaderProgram {
        label: "invert",
        fragment: invert,
        fragment_wgsl: "",
    };

    #[test]
    fn vertex_uv_hits_pixel_centres() {
        assert_eq!(vertex_uv(0, 0, 4, 2), Vec2::new(0.125, 0.25));
        assert_eq!(vertex_uv(3, 1, 4, 2), Vec2::new(0.875, 0.75));
    }

    #[test]
    fn render_evaluates_every_pixel() {
        let pass = ShaderPass::new("invert", INVERT, Uniforms::new()).unwrap();
        let input = Image::filled(3, 2, Vec4::new(0.25, 0.5, 1.0, 1.0));
        let mut output = Image::new(3, 2);
        pass.render(&input, &mut output);
        for p in output.pixels() {
            assert_eq!(*p, Vec4::new(0.75, 0.5, 0.0, 1.0));
        }
    }

    #[test]
    fn too_many_uniforms_is_rejected() {
        const NAMES: [&str; MAX_UNIFORM_SLOTS + 1] = [
            "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q",
        ];
        let uniforms = NAMES.iter().fold(Uniforms::new(), |u, n| u.with_fixed(*n, 0.0));
        assert!(matches!(
            ShaderPass::new("big", INVERT, uniforms),
            Err(Error::TooManyUniforms(_))
        ));
    }

    #[test]
    fn module_source_contains_both_stages() {
        let src = INVERT.module_source();
        assert!(src.contains("fn vs_main"));
        assert!(src.contains("t_aux"));
    }
}
