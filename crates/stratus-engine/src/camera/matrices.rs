use glam::Mat4;

use super::Camera;

/// Fixed projection parameters. The field of view comes from the camera's zoom.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Projection {
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Projection {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            ..Self::default()
        }
    }

    /// Right-handed perspective with wgpu's [0, 1] depth range.
    pub fn matrix(&self, fov_y_degrees: f32) -> Mat4 {
        Mat4::perspective_rh(fov_y_degrees.to_radians(), self.aspect, self.near, self.far)
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

/// Memoized camera matrices.
///
/// While `dirty` is false the three matrices are consistent with the camera
/// state they were computed from. Any camera mutation must be followed by
/// [`MatrixCache::mark_dirty`]; [`MatrixCache::refresh`] recomputes all three
/// together and only then clears the flag.
///
/// The cache starts dirty so the first refresh always produces real matrices.
#[derive(Debug, Clone)]
pub struct MatrixCache {
    projection_params: Projection,
    view: Mat4,
    projection: Mat4,
    inverse_view_projection: Mat4,
    dirty: bool,
}

impl MatrixCache {
    pub fn new(projection: Projection) -> Self {
        Self {
            projection_params: projection,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            inverse_view_projection: Mat4::IDENTITY,
            dirty: true,
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Clears the flag without recomputing. Idempotent.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Recomputes view, projection and inverse view-projection if dirty.
    ///
    /// Returns `true` when the matrices were recomputed.
    pub fn refresh(&mut self, camera: &Camera) -> bool {
        if !self.dirty {
            return false;
        }

        self.view = camera.view_matrix();
        self.projection = self.projection_params.matrix(camera.zoom);
        self.inverse_view_projection = (self.projection * self.view).inverse();
        self.dirty = false;

        log::trace!("camera matrices recomputed");
        true
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn inverse_view_projection(&self) -> Mat4 {
        self.inverse_view_projection
    }

    pub fn projection_params(&self) -> Projection {
        self.projection_params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Movement;

    fn cache() -> MatrixCache {
        MatrixCache::new(Projection::new(1920, 1080))
    }

    // ── refresh ───────────────────────────────────────────────────────────

    #[test]
    fn starts_dirty_and_first_refresh_computes() {
        let mut m = cache();
        assert!(m.is_dirty());
        assert!(m.refresh(&Camera::default()));
        assert!(!m.is_dirty());
        assert_ne!(m.projection(), Mat4::IDENTITY);
    }

    #[test]
    fn clean_refresh_reuses_matrices_bit_for_bit() {
        let mut m = cache();
        let mut camera = Camera::default();
        m.refresh(&camera);
        let (v, p, ivp) = (m.view(), m.projection(), m.inverse_view_projection());

        // Camera moves but nobody marked the cache dirty: nothing recomputes.
        camera.process_keyboard(Movement::Forward, 1.0);
        assert!(!m.refresh(&camera));

        assert_eq!(m.view().to_cols_array(), v.to_cols_array());
        assert_eq!(m.projection().to_cols_array(), p.to_cols_array());
        assert_eq!(m.inverse_view_projection().to_cols_array(), ivp.to_cols_array());
    }

    #[test]
    fn recomputation_is_idempotent() {
        let mut camera = Camera::default();
        camera.process_mouse_movement(37.0, -12.0);
        camera.process_keyboard(Movement::Left, 0.3);

        let mut m = cache();
        m.refresh(&camera);
        let first = (m.view(), m.projection(), m.inverse_view_projection());

        m.mark_dirty();
        m.refresh(&camera);
        let second = (m.view(), m.projection(), m.inverse_view_projection());

        assert_eq!(first.0.to_cols_array(), second.0.to_cols_array());
        assert_eq!(first.1.to_cols_array(), second.1.to_cols_array());
        assert_eq!(first.2.to_cols_array(), second.2.to_cols_array());
    }

    #[test]
    fn refreshed_matrices_are_mutually_consistent() {
        let mut camera = Camera::default();
        let mut m = cache();
        m.refresh(&camera);

        camera.process_mouse_movement(-300.0, 150.0);
        camera.process_keyboard(Movement::Up, 2.0);
        m.mark_dirty();
        m.refresh(&camera);

        assert!(!m.is_dirty());
        assert_eq!(m.view(), camera.view_matrix());

        let vp = m.projection() * m.view();
        let product = m.inverse_view_projection() * vp;
        assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-4), "{product:?}");
    }

    #[test]
    fn projection_uses_camera_zoom() {
        let mut camera = Camera::default();
        camera.zoom = 60.0;
        let mut m = cache();
        m.refresh(&camera);
        assert_eq!(m.projection(), Projection::new(1920, 1080).matrix(60.0));
    }

    // ── dirty flag ────────────────────────────────────────────────────────

    #[test]
    fn clear_dirty_is_idempotent() {
        let mut m = cache();
        m.clear_dirty();
        m.clear_dirty();
        assert!(!m.is_dirty());
    }
}
