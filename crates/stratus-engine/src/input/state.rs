use std::collections::HashSet;

use super::frame::InputFrame;
use super::types::{
    InputEvent,
    Key,
    KeyState,
    MouseButton,
    MouseButtonState,
    MouseMotionEvent,
    PointerButtonEvent,
    PointerMoveEvent,
};

/// Current input state for the window.
///
/// Holds "is down" information and the current pointer position.
/// Per-frame transitions are recorded into an `InputFrame`.
#[derive(Debug, Default)]
pub struct InputState {
    /// Whether the window is focused.
    pub focused: bool,

    /// Pointer position in physical pixels.
    pub pointer_pos: Option<(f32, f32)>,

    /// Set of currently held keys.
    pub keys_down: HashSet<Key>,

    /// Set of currently held mouse buttons.
    pub buttons_down: HashSet<MouseButton>,
}

impl InputState {
    /// Applies an input event to the current state and writes deltas to `frame`.
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match &ev {
            InputEvent::Focused(f) => {
                self.focused = *f;
                if !*f {
                    // Release events never arrive for keys held while unfocused.
                    self.keys_down.clear();
                    self.buttons_down.clear();
                }
            }

            InputEvent::PointerMoved(PointerMoveEvent { x, y }) => {
                self.pointer_pos = Some((*x, *y));
            }

            InputEvent::PointerLeft => {
                self.pointer_pos = None;
            }

            InputEvent::MouseMotion(MouseMotionEvent { dx, dy }) => {
                frame.mouse_delta.0 += *dx;
                frame.mouse_delta.1 += *dy;
            }

            InputEvent::Key { key, state, .. } => match state {
                KeyState::Pressed => {
                    if self.keys_down.insert(*key) {
                        frame.keys_pressed.insert(*key);
                    }
                }
                KeyState::Released => {
                    if self.keys_down.remove(key) {
                        frame.keys_released.insert(*key);
                    }
                }
            },

            InputEvent::PointerButton(PointerButtonEvent { button, state, x, y }) => {
                self.pointer_pos = Some((*x, *y));

                match state {
                    MouseButtonState::Pressed => {
                        self.buttons_down.insert(*button);
                    }
                    MouseButtonState::Released => {
                        self.buttons_down.remove(button);
                    }
                }
            }
        }

        frame.push_event(ev);
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn button_down(&self, btn: MouseButton) -> bool {
        self.buttons_down.contains(&btn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(key: Key, state: KeyState, repeat: bool) -> InputEvent {
        InputEvent::Key { key, state, repeat }
    }

    // ── keys ──────────────────────────────────────────────────────────────

    #[test]
    fn press_records_edge_once() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, key(Key::W, KeyState::Pressed, false));
        state.apply_event(&mut frame, key(Key::W, KeyState::Pressed, true));

        assert!(state.key_down(Key::W));
        assert!(frame.key_pressed(Key::W));
        assert_eq!(frame.keys_pressed.len(), 1);
        assert_eq!(frame.events.len(), 2);
    }

    #[test]
    fn repeat_after_clear_is_not_a_new_edge() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, key(Key::Space, KeyState::Pressed, false));
        frame.clear();
        state.apply_event(&mut frame, key(Key::Space, KeyState::Pressed, true));

        assert!(!frame.key_pressed(Key::Space));
        assert!(state.key_down(Key::Space));
    }

    #[test]
    fn release_records_edge_and_clears_down() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, key(Key::A, KeyState::Pressed, false));
        state.apply_event(&mut frame, key(Key::A, KeyState::Released, false));

        assert!(!state.key_down(Key::A));
        assert!(frame.keys_released.contains(&Key::A));
    }

    // ── focus / pointer ───────────────────────────────────────────────────

    #[test]
    fn focus_loss_releases_everything() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, key(Key::D, KeyState::Pressed, false));
        state.apply_event(
            &mut frame,
            InputEvent::PointerButton(PointerButtonEvent {
                button: MouseButton::Left,
                state: MouseButtonState::Pressed,
                x: 1.0,
                y: 2.0,
            }),
        );
        state.apply_event(&mut frame, InputEvent::Focused(false));

        assert!(!state.key_down(Key::D));
        assert!(!state.button_down(MouseButton::Left));
        assert!(!state.focused);
    }

    #[test]
    fn pointer_position_tracks_moves_and_leave() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, InputEvent::PointerMoved(PointerMoveEvent { x: 3.0, y: 4.0 }));
        assert_eq!(state.pointer_pos, Some((3.0, 4.0)));

        state.apply_event(&mut frame, InputEvent::PointerLeft);
        assert_eq!(state.pointer_pos, None);
    }

    #[test]
    fn mouse_motion_accumulates_per_frame() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, InputEvent::MouseMotion(MouseMotionEvent { dx: 2.0, dy: -1.0 }));
        state.apply_event(&mut frame, InputEvent::MouseMotion(MouseMotionEvent { dx: 3.0, dy: 4.0 }));
        assert_eq!(frame.mouse_delta, (5.0, 3.0));
        assert_eq!(frame.events.len(), 2);
        assert_eq!(state.pointer_pos, None);

        frame.clear();
        assert_eq!(frame.mouse_delta, (0.0, 0.0));
    }
}
