use glam::Vec2;

use stratus_engine::camera::{Camera, MatrixCache, Movement};
use stratus_engine::input::{InputEvent, InputFrame, InputState, Key, KeyState};

/// Movement bindings, polled every frame while captured.
pub const MOVEMENT_KEYS: [(Key, Movement); 6] = [
    (Key::W, Movement::Forward),
    (Key::S, Movement::Backward),
    (Key::A, Movement::Left),
    (Key::D, Movement::Right),
    (Key::R, Movement::Up),
    (Key::F, Movement::Down),
];

pub const CAPTURE_TOGGLE: Key = Key::Space;
pub const SHUTDOWN: Key = Key::Escape;

/// What the frame driver must act on after routing.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct RouteOutcome {
    /// Escape was pressed; no further frames.
    pub shutdown: bool,
    /// New capture state, if it changed this frame.
    pub capture_changed: Option<bool>,
}

/// Decides whether pointer and keys drive the camera or the editor.
///
/// Look input is raw relative mouse motion, so turning is unbounded and
/// works with a locked cursor.
#[derive(Debug, Clone)]
pub struct InputRouter {
    captured: bool,
    first_sample: bool,
}

impl InputRouter {
    pub fn new(captured: bool) -> Self {
        Self {
            captured,
            first_sample: true,
        }
    }

    pub fn is_captured(&self) -> bool {
        self.captured
    }

    /// Text telling the user what the capture toggle does next.
    pub fn hint(&self) -> &'static str {
        if self.captured {
            "Press [SPACE] to edit settings."
        } else {
            "Press [SPACE] to look around."
        }
    }

    /// Routes this frame's events, then the held movement keys.
    ///
    /// Every camera mutation marks `matrices` dirty.
    pub fn route(
        &mut self,
        input: &InputState,
        frame: &InputFrame,
        dt: f32,
        camera: &mut Camera,
        matrices: &mut MatrixCache,
    ) -> RouteOutcome {
        let mut outcome = RouteOutcome::default();

        for ev in &frame.events {
            match ev {
                InputEvent::Key {
                    key,
                    state: KeyState::Pressed,
                    repeat: false,
                } => match *key {
                    SHUTDOWN => {
                        outcome.shutdown = true;
                        return outcome;
                    }
                    CAPTURE_TOGGLE => {
                        self.toggle_capture();
                        outcome.capture_changed = Some(self.captured);
                    }
                    _ => {}
                },

                InputEvent::MouseMotion(m) => {
                    self.mouse_motion(Vec2::new(m.dx, m.dy), camera, matrices);
                }

                InputEvent::Focused(false) => {
                    // Re-entering the window must not produce a jump.
                    self.first_sample = true;
                }

                _ => {}
            }
        }

        if self.captured {
            self.apply_held_keys(input, dt, camera, matrices);
        }

        outcome
    }

    /// Flips capture mode. Entering capture arms first-sample suppression.
    pub fn toggle_capture(&mut self) {
        self.captured = !self.captured;
        if self.captured {
            self.first_sample = true;
        }
        log::debug!("capture mode {}", if self.captured { "on" } else { "off" });
    }

    /// Handles one raw motion delta (device units, +Y down).
    ///
    /// The first delta after entering capture is dropped; grabbing the
    /// cursor can produce one large spurious jump.
    pub fn mouse_motion(&mut self, delta: Vec2, camera: &mut Camera, matrices: &mut MatrixCache) {
        if !self.captured {
            return;
        }
        if std::mem::take(&mut self.first_sample) {
            return;
        }

        // Screen Y grows downward; looking up is positive pitch.
        camera.process_mouse_movement(delta.x, -delta.y);
        matrices.mark_dirty();
    }

    fn apply_held_keys(
        &mut self,
        input: &InputState,
        dt: f32,
        camera: &mut Camera,
        matrices: &mut MatrixCache,
    ) {
        for (key, movement) in MOVEMENT_KEYS {
            if input.key_down(key) {
                camera.process_keyboard(movement, dt);
                matrices.mark_dirty();
            }
        }
    }
}

impl Default for InputRouter {
    fn default() -> Self {
        Self::new(true)
    }
}
