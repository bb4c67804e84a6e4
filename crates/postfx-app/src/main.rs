use std::sync::Arc;

use anyhow::{Context, Result};
use postfx_core::{PipelineConfig, Preset};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

mod app;
mod cli;
mod headless;
mod input;
mod panel;

use app::App;
use input::Key;

// ---------------------------------------------------------------------------
// Key mapping
// ---------------------------------------------------------------------------

fn map_key(code: KeyCode) -> Option<Key> {
    Some(match code {
        KeyCode::Digit0 => Key::Digit(0),
        KeyCode::Digit1 => Key::Digit(1),
        KeyCode::Digit2 => Key::Digit(2),
        KeyCode::Digit3 => Key::Digit(3),
        KeyCode::Digit4 => Key::Digit(4),
        KeyCode::Digit5 => Key::Digit(5),
        KeyCode::Digit6 => Key::Digit(6),
        KeyCode::Digit7 => Key::Digit(7),
        KeyCode::Digit8 => Key::Digit(8),
        KeyCode::Digit9 => Key::Digit(9),
        KeyCode::Space => Key::Space,
        KeyCode::KeyH => Key::H,
        KeyCode::KeyR => Key::R,
        KeyCode::KeyQ => Key::Q,
        KeyCode::Escape => Key::Escape,
        _ => return None,
    })
}

// ---------------------------------------------------------------------------
// Handler: winit ApplicationHandler
// ---------------------------------------------------------------------------

struct Handler {
    config: PipelineConfig,
    preset: Preset,
    window: Option<Arc<Window>>,
    app: Option<App>,
}

impl ApplicationHandler for Handler {
    /// Called once on desktop when the event loop starts.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.app.is_some() {
            return;
        }
        let viewport = &self.config.viewport;
        let window_attrs = Window::default_attributes()
            .with_title(format!("postfx: {}", self.preset.name()))
            .with_inner_size(winit::dpi::LogicalSize::new(viewport.width, viewport.height));

        let window = match event_loop.create_window(window_attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };
        log::info!("Window created ({}×{})", viewport.width, viewport.height);

        match App::new(Arc::clone(&window), self.config.clone(), self.preset) {
            Ok(app) => {
                self.window = Some(window);
                self.app = Some(app);
            }
            Err(e) => {
                log::error!("{e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(app) = &mut self.app else { return };
        if app.on_window_event(&event) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested: exiting");
                event_loop.exit();
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if let Some(action) = map_key(code).and_then(|key| app.on_key_pressed(key)) {
                    if app.handle_action(action) {
                        log::info!("Quit requested: exiting");
                        event_loop.exit();
                    }
                }
            }

            // The window's scale factor feeds the chain's pixel ratio, so a
            // scale change is a resize even when the physical size is unchanged.
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = &self.window {
                    let size = window.inner_size();
                    app.resize(size.width, size.height);
                }
            }

            WindowEvent::RedrawRequested => match app.render() {
                Ok(()) => {}
                // Surface lost / outdated: reconfigure and try again next frame.
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    if let Some(window) = &self.window {
                        let size = window.inner_size();
                        app.resize(size.width, size.height);
                    }
                }
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    log::error!("GPU out of memory: exiting");
                    event_loop.exit();
                }
                Err(e) => log::warn!("render error: {e:?}"),
            },

            _ => {}
        }
    }

    /// Drive continuous redraws.
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    env_logger::init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let cli = cli::parse_cli(&argv)?;
    let config = cli.resolve_config()?;

    if let Some(frames) = cli.headless {
        return headless::render_to_png(&config, frames, &cli.out);
    }

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut handler = Handler {
        config,
        preset: cli.preset(),
        window: None,
        app: None,
    };
    event_loop.run_app(&mut handler).context("event loop error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_row_maps_to_digits() {
        assert_eq!(map_key(KeyCode::Digit1), Some(Key::Digit(1)));
        assert_eq!(map_key(KeyCode::Digit9), Some(Key::Digit(9)));
        assert_eq!(map_key(KeyCode::Digit0), Some(Key::Digit(0)));
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        assert_eq!(map_key(KeyCode::KeyZ), None);
    }
}
