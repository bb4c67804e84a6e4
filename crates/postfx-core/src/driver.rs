use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::composer::Composer;
use crate::pass::PassId;
use crate::source::{DisplaySurface, FrameSource};

/// Time base for the driver.
#[derive(Debug, Clone, Copy)]
pub enum Clock {
    /// Wall-clock seconds since the driver was created.
    Realtime(Instant),
    /// Deterministic: each tick advances by `step` seconds.
    Fixed { step: f32, ticks: u64 },
}

impl Clock {
    pub fn realtime() -> Self {
        Clock::Realtime(Instant::now())
    }

    pub fn fixed(step: f32) -> Self {
        Clock::Fixed { step, ticks: 0 }
    }

    /// Seconds elapsed for the next tick. The first call to a fixed clock
    /// returns zero.
    fn next(&mut self) -> f32 {
        match self {
            Clock::Realtime(start) => start.elapsed().as_secs_f32(),
            Clock::Fixed { step, ticks } => {
                let t = *step * *ticks as f32;
                *ticks += 1;
                t
            }
        }
    }
}

/// Cancels a running [`AnimationDriver::run`] from anywhere.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Advances time-dependent parameters and runs the chain once per tick.
pub struct AnimationDriver {
    clock: Clock,
    elapsed: f32,
    frames: u64,
    time_bindings: Vec<(PassId, &'static str)>,
    stop: StopHandle,
}

impl AnimationDriver {
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            elapsed: 0.0,
            frames: 0,
            time_bindings: Vec::new(),
            stop: StopHandle::default(),
        }
    }

    /// Write elapsed seconds into `uniform` of `pass` every tick.
    pub fn bind_time(&mut self, pass: PassId, uniform: &'static str) {
        self.time_bindings.push((pass, uniform));
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Read the clock and update every time binding. Returns elapsed seconds.
    pub fn advance(&mut self, composer: &mut Composer) -> f32 {
        self.elapsed = self.clock.next();
        for (id, uniform) in &self.time_bindings {
            if let Err(e) = composer.set_parameter(*id, uniform, self.elapsed) {
                log::warn!("time binding: {e}");
            }
        }
        self.elapsed
    }

    /// One complete frame; never interrupted part-way.
    pub fn tick(&mut self, composer: &mut Composer, source: &mut dyn FrameSource, surface: &mut dyn DisplaySurface) {
        let elapsed = self.advance(composer);
        source.update(elapsed);
        composer.run(source, surface);
        self.frames += 1;
    }

    /// Tick until stopped or `max_frames` is reached. Returns the number of
    /// frames rendered by this call.
    pub fn run(
        &mut self,
        composer: &mut Composer,
        source: &mut dyn FrameSource,
        surface: &mut dyn DisplaySurface,
        max_frames: Option<u64>,
    ) -> u64 {
        let mut rendered = 0;
        while !self.stop.is_stopped() && max_frames.map_or(true, |max| rendered < max) {
            self.tick(composer, source, surface);
            rendered += 1;
        }
        log::debug!("driver stopped after {rendered} frames ({:.2}s)", self.elapsed);
        rendered
    }
}
