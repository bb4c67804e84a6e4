//! wgpu execution of a `postfx-core` pass chain.
//!
//! Each pass program compiles to one full-screen render pipeline; the
//! [`GpuComposer`] draws the enabled ones in order between two half-float
//! targets, reading the live frame from a [`ScenePass`] (or any texture).

pub mod composer;
pub mod context;
pub mod pass_pipeline;
pub mod renderer;
pub mod scene;
pub mod targets;

pub use composer::GpuComposer;
pub use context::GpuContext;
pub use renderer::{read_rgba8, BlitPipeline};
pub use scene::{scene_sample_count, ScenePass};
pub use targets::{PingPong, RenderTarget, TARGET_FORMAT};
