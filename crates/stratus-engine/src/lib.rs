//! Stratus engine crate.
//!
//! Platform + GPU runtime pieces for the cloud viewer: window loop, device,
//! input, frame clock, fly camera with cached matrices, and the shader program
//! / volume texture plumbing the renderer is built from.

pub mod camera;
pub mod core;
pub mod device;
pub mod input;
pub mod logging;
pub mod render;
pub mod time;
pub mod window;

pub use glam;
