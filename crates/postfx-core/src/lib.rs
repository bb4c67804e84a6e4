//! Post-processing pass chain: an ordered list of full-screen image
//! transforms applied to a rendered frame once per tick.
//!
//! Every pass is a [`ShaderProgram`]: a CPU reference fragment function plus
//! the WGSL the GPU crate compiles from it. This crate evaluates chains on
//! the CPU; `postfx-gpu` runs the same chain with wgpu.

pub mod composer;
pub mod config;
pub mod custom;
pub mod driver;
pub mod effects;
pub mod error;
pub mod glitch;
pub mod normal_map;
pub mod pass;
pub mod pipeline;
pub mod presets;
pub mod raster;
pub mod shader;
pub mod source;
pub mod uniforms;

pub use composer::Composer;
pub use config::PipelineConfig;
pub use driver::{AnimationDriver, Clock, StopHandle};
pub use effects::{BuiltinPass, Effect};
pub use error::{Error, Result};
pub use pass::{Pass, PassId, Stage};
pub use pipeline::{PassIds, Pipeline};
pub use presets::Preset;
pub use raster::Image;
pub use shader::{ShaderPass, ShaderProgram};
pub use source::{DisplaySurface, FrameSource};
pub use uniforms::{UniformValue, Uniforms};

/// Every program the chain can run, for pipeline pre-compilation and
/// shader validation.
pub const PROGRAMS: [ShaderProgram; 9] = [
    effects::DOT_SCREEN,
    effects::GLITCH,
    effects::RGB_SHIFT,
    effects::BLOOM,
    effects::GAMMA_CORRECTION,
    effects::FXAA,
    custom::TINT,
    custom::WAVE,
    custom::NORMAL_MAP,
];
