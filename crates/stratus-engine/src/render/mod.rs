//! GPU rendering subsystem.
//!
//! - `program`: linked vertex+fragment pipeline with a reflected uniform block
//! - `reflect`: per-stage WGSL compilation and uniform-block reflection (naga)
//! - `fullscreen`: the single oversized triangle that covers the viewport
//! - `volume`: 3-D noise volumes and their sampled bind group
//!
//! Each renderer owns its GPU resources and creates them lazily from a
//! `RenderCtx` on first use.

mod ctx;
pub mod fullscreen;
pub mod program;
pub mod reflect;
pub mod volume;

pub use ctx::{RenderCtx, RenderTarget};
