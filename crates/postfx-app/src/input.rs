// ---------------------------------------------------------------------------
// Key: windowing-library-independent key representation
// ---------------------------------------------------------------------------

/// A keyboard key, independent of any windowing library.
///
/// `main.rs` maps `winit::keyboard::PhysicalKey` → `Key`; everything else
/// in the input pipeline works purely with this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Number row, 1 through 9.
    Digit(u8),
    Space,
    H,
    R,
    Q,
    Escape,
}

// ---------------------------------------------------------------------------
// InputAction: what the app does in response to input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    /// Flip the enable flag of the n-th pass in chain order (zero-based).
    TogglePass(usize),
    CycleNextPreset,
    TogglePanel,
    /// Rebuild the chain from the active config.
    Reset,
    Quit,
}

// ---------------------------------------------------------------------------
// InputState
// ---------------------------------------------------------------------------

pub struct InputState;

impl InputState {
    pub fn new() -> Self {
        Self
    }

    /// Translate a `Key` press into an `InputAction`, if the key is mapped.
    pub fn on_key(&self, key: Key) -> Option<InputAction> {
        match key {
            Key::Digit(n @ 1..=9) => Some(InputAction::TogglePass(n as usize - 1)),
            Key::Digit(_) => None,
            Key::Space => Some(InputAction::CycleNextPreset),
            Key::H => Some(InputAction::TogglePanel),
            Key::R => Some(InputAction::Reset),
            Key::Q | Key::Escape => Some(InputAction::Quit),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> InputState {
        InputState::new()
    }

    #[test]
    fn digits_toggle_passes_in_order() {
        for n in 1..=9u8 {
            assert_eq!(
                input().on_key(Key::Digit(n)),
                Some(InputAction::TogglePass(n as usize - 1))
            );
        }
    }

    #[test]
    fn digit_zero_is_unmapped() {
        assert_eq!(input().on_key(Key::Digit(0)), None);
    }

    #[test]
    fn space_cycles_next_preset() {
        assert_eq!(input().on_key(Key::Space), Some(InputAction::CycleNextPreset));
    }

    #[test]
    fn h_toggles_panel() {
        assert_eq!(input().on_key(Key::H), Some(InputAction::TogglePanel));
    }

    #[test]
    fn r_resets() {
        assert_eq!(input().on_key(Key::R), Some(InputAction::Reset));
    }

    #[test]
    fn q_quits() {
        assert_eq!(input().on_key(Key::Q), Some(InputAction::Quit));
    }

    #[test]
    fn escape_quits() {
        assert_eq!(input().on_key(Key::Escape), Some(InputAction::Quit));
    }
}
