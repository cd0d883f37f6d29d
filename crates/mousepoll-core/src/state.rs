//! Normalized mouse snapshot and the raw report decode step.

use tracing::trace;

/// Platform-defined magnitude of one scroll-wheel detent.
pub const WHEEL_DELTA: i32 = 120;

/// Button-flag bits of a raw mouse report.
///
/// Values match the Win32 `RI_MOUSE_*` constants so platform reports can be
/// copied without translation.
pub mod flags {
    pub const BUTTON_1_DOWN: u16 = 0x0001;
    pub const BUTTON_1_UP: u16 = 0x0002;
    pub const BUTTON_2_DOWN: u16 = 0x0004;
    pub const BUTTON_2_UP: u16 = 0x0008;
    pub const BUTTON_3_DOWN: u16 = 0x0010;
    pub const BUTTON_3_UP: u16 = 0x0020;
    pub const BUTTON_4_DOWN: u16 = 0x0040;
    pub const BUTTON_4_UP: u16 = 0x0080;
    pub const BUTTON_5_DOWN: u16 = 0x0100;
    pub const BUTTON_5_UP: u16 = 0x0200;
    pub const WHEEL: u16 = 0x0400;
}

/// The subset of a raw device report that the decode step reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawMouseReport {
    /// Transition flags (`flags::*`).
    pub button_flags: u16,
    /// Wheel payload; a signed 16-bit value stored unsigned.
    pub button_data: u16,
    /// Relative X motion.
    pub last_x: i32,
    /// Relative Y motion.
    pub last_y: i32,
}

impl RawMouseReport {
    /// Pure motion report.
    pub fn motion(last_x: i32, last_y: i32) -> Self {
        Self {
            last_x,
            last_y,
            ..Self::default()
        }
    }

    /// Wheel report of `notches` detents (negative scrolls toward the user).
    pub fn wheel(notches: i16) -> Self {
        Self {
            button_flags: flags::WHEEL,
            button_data: notches.wrapping_mul(WHEEL_DELTA as i16) as u16,
            ..Self::default()
        }
    }

    /// Report carrying only the given transition flags.
    pub fn buttons(button_flags: u16) -> Self {
        Self {
            button_flags,
            ..Self::default()
        }
    }
}

/// Mouse buttons tracked by the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    X1,
    X2,
}

impl MouseButton {
    pub const ALL: [MouseButton; 5] = [
        MouseButton::Left,
        MouseButton::Right,
        MouseButton::Middle,
        MouseButton::X1,
        MouseButton::X2,
    ];

    /// (down, up) flag pair for this button.
    fn transition_flags(self) -> (u16, u16) {
        match self {
            MouseButton::Left => (flags::BUTTON_1_DOWN, flags::BUTTON_1_UP),
            MouseButton::Right => (flags::BUTTON_2_DOWN, flags::BUTTON_2_UP),
            MouseButton::Middle => (flags::BUTTON_3_DOWN, flags::BUTTON_3_UP),
            MouseButton::X1 => (flags::BUTTON_4_DOWN, flags::BUTTON_4_UP),
            MouseButton::X2 => (flags::BUTTON_5_DOWN, flags::BUTTON_5_UP),
        }
    }
}

/// Snapshot of the most recent decoded mouse event.
///
/// Deltas describe only the event that produced the snapshot. Button states
/// persist until a later report flags a transition for that button.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MouseState {
    pub delta_x: i32,
    pub delta_y: i32,
    pub delta_wheel: i32,
    /// Left.
    pub button1: bool,
    /// Right.
    pub button2: bool,
    /// Middle.
    pub button3: bool,
    /// First extended (back).
    pub button4: bool,
    /// Second extended (forward).
    pub button5: bool,
}

impl MouseState {
    /// Whether `button` is currently held.
    pub fn button(&self, button: MouseButton) -> bool {
        match button {
            MouseButton::Left => self.button1,
            MouseButton::Right => self.button2,
            MouseButton::Middle => self.button3,
            MouseButton::X1 => self.button4,
            MouseButton::X2 => self.button5,
        }
    }

    fn button_mut(&mut self, button: MouseButton) -> &mut bool {
        match button {
            MouseButton::Left => &mut self.button1,
            MouseButton::Right => &mut self.button2,
            MouseButton::Middle => &mut self.button3,
            MouseButton::X1 => &mut self.button4,
            MouseButton::X2 => &mut self.button5,
        }
    }

    /// Decode `report` into this snapshot in place.
    pub(crate) fn apply(&mut self, report: &RawMouseReport) {
        self.delta_x = report.last_x;
        self.delta_y = report.last_y;

        self.delta_wheel = if report.button_flags & flags::WHEEL != 0 {
            i32::from(report.button_data as i16) / WHEEL_DELTA
        } else {
            0
        };

        for button in MouseButton::ALL {
            let (down, up) = button.transition_flags();
            if report.button_flags & down != 0 {
                *self.button_mut(button) = true;
            } else if report.button_flags & up != 0 {
                *self.button_mut(button) = false;
            }
        }

        trace!(
            dx = self.delta_x,
            dy = self.delta_y,
            wheel = self.delta_wheel,
            flags = report.button_flags,
            "Decoded raw mouse report"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motion_with_left_down() {
        let mut state = MouseState {
            button3: true,
            ..MouseState::default()
        };
        let report = RawMouseReport {
            button_flags: flags::BUTTON_1_DOWN,
            button_data: 0,
            last_x: 5,
            last_y: -3,
        };

        state.apply(&report);

        assert_eq!(state.delta_x, 5);
        assert_eq!(state.delta_y, -3);
        assert_eq!(state.delta_wheel, 0);
        assert!(state.button1);
        assert!(!state.button2);
        assert!(state.button3);
        assert!(!state.button4);
        assert!(!state.button5);
    }

    #[test]
    fn test_wheel_one_notch_negative() {
        let mut state = MouseState::default();
        let report = RawMouseReport {
            button_flags: flags::WHEEL,
            button_data: (-120i16) as u16,
            last_x: 0,
            last_y: 0,
        };

        state.apply(&report);
        assert_eq!(state.delta_wheel, -1);
    }

    #[test]
    fn test_wheel_resets_on_non_wheel_event() {
        let mut state = MouseState::default();
        state.apply(&RawMouseReport::wheel(3));
        assert_eq!(state.delta_wheel, 3);

        state.apply(&RawMouseReport::motion(1, 1));
        assert_eq!(state.delta_wheel, 0);
    }

    #[test]
    fn test_wheel_data_ignored_without_flag() {
        let mut state = MouseState::default();
        let report = RawMouseReport {
            button_flags: 0,
            button_data: 240,
            last_x: 0,
            last_y: 0,
        };
        state.apply(&report);
        assert_eq!(state.delta_wheel, 0);
    }

    #[test]
    fn test_sparse_button_update() {
        let mut state = MouseState::default();
        state.apply(&RawMouseReport::buttons(flags::BUTTON_2_DOWN));
        assert!(state.button2);

        state.apply(&RawMouseReport::motion(7, 0));
        assert!(state.button2);
        assert_eq!(state.delta_x, 7);

        state.apply(&RawMouseReport::buttons(flags::BUTTON_2_UP));
        assert!(!state.button2);
    }

    #[test]
    fn test_every_button_transitions() {
        let mut state = MouseState::default();
        let downs = flags::BUTTON_1_DOWN
            | flags::BUTTON_2_DOWN
            | flags::BUTTON_3_DOWN
            | flags::BUTTON_4_DOWN
            | flags::BUTTON_5_DOWN;
        state.apply(&RawMouseReport::buttons(downs));
        assert!(MouseButton::ALL.iter().all(|b| state.button(*b)));

        state.apply(&RawMouseReport::buttons(flags::BUTTON_4_UP));
        assert!(!state.button(MouseButton::X1));
        assert!(state.button(MouseButton::X2));
    }

    #[test]
    fn test_down_wins_over_up_in_same_report() {
        let mut state = MouseState::default();
        state.apply(&RawMouseReport::buttons(
            flags::BUTTON_3_DOWN | flags::BUTTON_3_UP,
        ));
        assert!(state.button3);
    }

    #[test]
    fn test_deltas_do_not_accumulate() {
        let mut state = MouseState::default();
        state.apply(&RawMouseReport::motion(10, 10));
        state.apply(&RawMouseReport::motion(-2, 4));
        assert_eq!((state.delta_x, state.delta_y), (-2, 4));
    }
}
