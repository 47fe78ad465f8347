//! Input state collaborator.
//!
//! Tracks the four movement keys, the pause toggle and accumulated cursor
//! movement between two loop iterations.
//!
//! Cursor movement comes from one of two sources. With a locked pointer the
//! platform stops moving the cursor and only reports relative motion, so
//! deltas come from [`InputState::on_mouse_motion`]. Otherwise they are
//! derived from absolute positions in [`InputState::on_cursor_moved`]. Only
//! the active source is counted, so a platform that reports both does not
//! double the movement.

use std::collections::HashSet;

use winit::keyboard::KeyCode;

/// Key that toggles pause / cursor capture.
pub const TOGGLE_KEY: KeyCode = KeyCode::Escape;

/// Key-down state of the movement keys, sampled once per iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementKeys {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

#[derive(Debug, Default)]
pub struct InputState {
    pressed_keys: HashSet<KeyCode>,
    toggle_pending: bool,

    /// Last cursor position; `None` until the first sample arrives.
    last_cursor: Option<(f64, f64)>,
    cursor_delta: (f32, f32),
    relative_motion: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_key_pressed(&mut self, key: KeyCode) {
        // Auto-repeat must not toggle twice.
        if self.pressed_keys.insert(key) && key == TOGGLE_KEY {
            self.toggle_pending = true;
        }
    }

    pub fn on_key_released(&mut self, key: KeyCode) {
        self.pressed_keys.remove(&key);
    }

    /// Record an absolute cursor position. The first sample only seeds the
    /// reference point so the camera does not jump on the first event.
    pub fn on_cursor_moved(&mut self, x: f64, y: f64) {
        if self.relative_motion {
            return;
        }
        if let Some((last_x, last_y)) = self.last_cursor {
            self.cursor_delta.0 += (x - last_x) as f32;
            self.cursor_delta.1 += (y - last_y) as f32;
        }
        self.last_cursor = Some((x, y));
    }

    /// Record raw pointer motion. Ignored unless relative motion is the
    /// active source.
    pub fn on_mouse_motion(&mut self, dx: f64, dy: f64) {
        if self.relative_motion {
            self.cursor_delta.0 += dx as f32;
            self.cursor_delta.1 += dy as f32;
        }
    }

    /// Selects raw pointer motion (`true`) or absolute cursor positions
    /// (`false`) as the source of cursor deltas.
    pub fn set_relative_motion(&mut self, relative: bool) {
        if self.relative_motion != relative {
            self.relative_motion = relative;
            self.reset_cursor();
        }
    }

    #[inline]
    pub fn relative_motion(&self) -> bool {
        self.relative_motion
    }

    /// Forget the cursor reference, e.g. after the cursor was re-grabbed.
    pub fn reset_cursor(&mut self) {
        self.last_cursor = None;
        self.cursor_delta = (0.0, 0.0);
    }

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    pub fn movement(&self) -> MovementKeys {
        MovementKeys {
            forward: self.is_key_pressed(KeyCode::KeyW),
            backward: self.is_key_pressed(KeyCode::KeyS),
            left: self.is_key_pressed(KeyCode::KeyA),
            right: self.is_key_pressed(KeyCode::KeyD),
        }
    }

    /// Returns whether the toggle key was pressed since the last call.
    pub fn take_toggle(&mut self) -> bool {
        std::mem::take(&mut self.toggle_pending)
    }

    /// Returns the cursor movement accumulated since the last call.
    pub fn take_cursor_delta(&mut self) -> (f32, f32) {
        std::mem::take(&mut self.cursor_delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_cursor_sample_is_skipped() {
        let mut input = InputState::new();
        input.on_cursor_moved(400.0, 300.0);
        assert_eq!(input.take_cursor_delta(), (0.0, 0.0));

        input.on_cursor_moved(410.0, 295.0);
        assert_eq!(input.take_cursor_delta(), (10.0, -5.0));
    }

    #[test]
    fn test_cursor_delta_accumulates_until_taken() {
        let mut input = InputState::new();
        input.on_cursor_moved(0.0, 0.0);
        input.on_cursor_moved(3.0, 1.0);
        input.on_cursor_moved(5.0, 4.0);
        assert_eq!(input.take_cursor_delta(), (5.0, 4.0));
        assert_eq!(input.take_cursor_delta(), (0.0, 0.0));
    }

    #[test]
    fn test_reset_cursor_skips_next_sample() {
        let mut input = InputState::new();
        input.on_cursor_moved(0.0, 0.0);
        input.reset_cursor();
        input.on_cursor_moved(100.0, 100.0);
        assert_eq!(input.take_cursor_delta(), (0.0, 0.0));
    }

    #[test]
    fn test_relative_motion_accumulates_until_taken() {
        let mut input = InputState::new();
        input.set_relative_motion(true);
        input.on_mouse_motion(4.0, -2.0);
        input.on_mouse_motion(1.5, 0.5);
        assert_eq!(input.take_cursor_delta(), (5.5, -1.5));
        assert_eq!(input.take_cursor_delta(), (0.0, 0.0));
    }

    #[test]
    fn test_only_active_motion_source_counts() {
        let mut input = InputState::new();
        input.on_mouse_motion(10.0, 10.0);
        input.on_cursor_moved(0.0, 0.0);
        input.on_cursor_moved(2.0, 3.0);
        assert_eq!(input.take_cursor_delta(), (2.0, 3.0));

        // Locked pointer: the cursor position no longer changes.
        input.set_relative_motion(true);
        input.on_cursor_moved(2.0, 3.0);
        input.on_cursor_moved(50.0, 50.0);
        input.on_mouse_motion(-3.0, 7.0);
        assert_eq!(input.take_cursor_delta(), (-3.0, 7.0));
    }

    #[test]
    fn test_switching_source_drops_pending_delta() {
        let mut input = InputState::new();
        input.set_relative_motion(true);
        input.on_mouse_motion(8.0, 8.0);
        input.set_relative_motion(false);
        assert!(!input.relative_motion());
        assert_eq!(input.take_cursor_delta(), (0.0, 0.0));

        input.on_cursor_moved(100.0, 100.0);
        assert_eq!(input.take_cursor_delta(), (0.0, 0.0));
    }

    #[test]
    fn test_movement_keys() {
        let mut input = InputState::new();
        input.on_key_pressed(KeyCode::KeyW);
        input.on_key_pressed(KeyCode::KeyD);

        let keys = input.movement();
        assert!(keys.forward && keys.right);
        assert!(!keys.backward && !keys.left);

        input.on_key_released(KeyCode::KeyW);
        assert!(!input.movement().forward);
    }

    #[test]
    fn test_toggle_fires_once_per_press() {
        let mut input = InputState::new();
        input.on_key_pressed(TOGGLE_KEY);
        input.on_key_pressed(TOGGLE_KEY); // auto-repeat
        assert!(input.take_toggle());
        assert!(!input.take_toggle());

        input.on_key_released(TOGGLE_KEY);
        input.on_key_pressed(TOGGLE_KEY);
        assert!(input.take_toggle());
    }
}
