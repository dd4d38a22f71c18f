//! Input subsystem.
//!
//! Public API is platform-agnostic and does not expose winit types.
//! The window runtime translates platform events into `InputEvent`s
//! (see `platform::winit`), applies them to `InputState`, and records the
//! per-frame deltas in `InputFrame`.

mod frame;
pub(crate) mod platform;
mod state;
mod types;

pub use frame::InputFrame;
pub use state::InputState;
pub use types::{
    InputEvent,
    Key,
    KeyState,
    MouseButton,
    MouseButtonState,
    MouseMotionEvent,
    PointerButtonEvent,
    PointerMoveEvent,
};
