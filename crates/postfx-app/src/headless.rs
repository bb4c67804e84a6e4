use std::path::Path;

use anyhow::{anyhow, Context, Result};
use postfx_core::source::{ImageSurface, ProceduralScene};
use postfx_core::{Clock, PipelineConfig};

/// Fixed step for offline rendering, so output does not depend on how fast
/// the CPU chain runs.
pub const FRAME_STEP: f32 = 1.0 / 60.0;

/// Render `frames` ticks of the demo scene through the CPU chain and save
/// the last one as a PNG.
pub fn render_to_png(config: &PipelineConfig, frames: u64, out: &Path) -> Result<()> {
    let mut pipeline = config.build(Clock::fixed(FRAME_STEP)).context("building pass chain")?;
    let mut scene = ProceduralScene::new();
    let mut surface = ImageSurface::new();

    let rendered = pipeline
        .driver
        .run(&mut pipeline.composer, &mut scene, &mut surface, Some(frames));
    let frame = surface
        .into_frame()
        .ok_or_else(|| anyhow!("no frame rendered (asked for {frames})"))?;

    frame
        .save_png(out)
        .with_context(|| format!("writing {}", out.display()))?;
    log::info!(
        "rendered {rendered} frames ({}x{}) to {}",
        frame.width(),
        frame.height(),
        out.display()
    );
    Ok(())
}
