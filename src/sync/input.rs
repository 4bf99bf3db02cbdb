//! Joypad state and edge detection for speed controls

use bitflags::bitflags;

bitflags! {
    /// Frontend joypad state, one bit per libretro joypad id
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct JoypadButtons: u16 {
        /// B
        const B = 1 << 0;
        /// Y
        const Y = 1 << 1;
        /// Select
        const SELECT = 1 << 2;
        /// Start
        const START = 1 << 3;
        /// D-pad up
        const UP = 1 << 4;
        /// D-pad down
        const DOWN = 1 << 5;
        /// D-pad left
        const LEFT = 1 << 6;
        /// D-pad right
        const RIGHT = 1 << 7;
        /// A
        const A = 1 << 8;
        /// X
        const X = 1 << 9;
        /// L
        const L = 1 << 10;
        /// R
        const R = 1 << 11;
        /// L2
        const L2 = 1 << 12;
        /// R2
        const R2 = 1 << 13;
        /// L3
        const L3 = 1 << 14;
        /// R3
        const R3 = 1 << 15;
    }
}

impl JoypadButtons {
    /// True when every button of `combo` is held
    pub fn holds(&self, combo: JoypadButtons) -> bool {
        !combo.is_empty() && self.contains(combo)
    }
}

/// Rising-edge detector for one control.
///
/// Fires once when the control goes from released to held.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeTrigger {
    previous: bool,
}

impl EdgeTrigger {
    /// Create a released trigger
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed this tick's level; returns true on a rising edge
    pub fn update(&mut self, pressed: bool) -> bool {
        let rising = pressed && !self.previous;
        self.previous = pressed;
        rising
    }
}

/// Button combinations bound to the speed controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedCombos {
    /// Cycles fast-forward multipliers
    pub fast_forward: JoypadButtons,
    /// Cycles slow-motion divisors
    pub slow_motion: JoypadButtons,
}

impl Default for SpeedCombos {
    fn default() -> Self {
        SpeedCombos {
            fast_forward: JoypadButtons::SELECT | JoypadButtons::A,
            slow_motion: JoypadButtons::SELECT | JoypadButtons::B,
        }
    }
}
