//! Camera subsystem.
//!
//! `Camera` accumulates yaw/pitch/position from input deltas and derives an
//! orthonormal basis and a view matrix. `MatrixCache` memoizes the view,
//! projection and inverse view-projection matrices behind a dirty flag.
//!
//! The camera never touches the cache; whoever mutates the camera marks the
//! cache dirty.

mod fly;
mod matrices;

pub use fly::{Camera, CameraConfig, Movement};
pub use matrices::{MatrixCache, Projection};
