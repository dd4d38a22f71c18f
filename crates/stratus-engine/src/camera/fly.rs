use glam::{Mat4, Vec3};

/// Movement directions accepted by [`Camera::process_keyboard`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Movement {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

impl Movement {
    pub const ALL: [Movement; 6] = [
        Movement::Forward,
        Movement::Backward,
        Movement::Left,
        Movement::Right,
        Movement::Up,
        Movement::Down,
    ];
}

/// Initial pose and tuning for a [`Camera`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraConfig {
    pub position: Vec3,
    pub world_up: Vec3,
    /// Degrees. -90 looks down -Z.
    pub yaw: f32,
    /// Degrees.
    pub pitch: f32,
    /// World units per second.
    pub speed: f32,
    /// Degrees per pointer pixel.
    pub sensitivity: f32,
    /// Vertical field of view, degrees.
    pub zoom: f32,
    /// Pitch stays strictly inside (-pitch_limit, pitch_limit). Must be < 90.
    pub pitch_limit: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            world_up: Vec3::Y,
            yaw: -90.0,
            pitch: 0.0,
            speed: 2.5,
            sensitivity: 0.1,
            zoom: 45.0,
            pitch_limit: 89.0,
        }
    }
}

/// First-person fly camera driven by yaw/pitch angles.
///
/// `front`, `right` and `up` are derived from yaw/pitch and recomputed on
/// every angle change; they cannot be set directly.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,

    yaw: f32,
    pitch: f32,

    pub speed: f32,
    pub sensitivity: f32,
    pub zoom: f32,

    pitch_limit: f32,
}

impl Camera {
    pub fn new(config: CameraConfig) -> Self {
        // `clamp` panics on NaN bounds, so a NaN limit falls back to the default.
        let pitch_limit = if config.pitch_limit.is_nan() {
            CameraConfig::default().pitch_limit
        } else {
            config.pitch_limit.clamp(0.0, 89.9)
        };

        let mut camera = Self {
            position: config.position,
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            world_up: config.world_up.normalize_or(Vec3::Y),
            yaw: config.yaw,
            pitch: config.pitch.clamp(-pitch_limit, pitch_limit),
            speed: config.speed,
            sensitivity: config.sensitivity,
            zoom: config.zoom,
            pitch_limit,
        };
        camera.update_vectors();
        camera
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Applies a raw pointer delta (pixels, +Y = look up).
    ///
    /// The caller is responsible for marking any derived matrices dirty.
    pub fn process_mouse_movement(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.sensitivity;
        self.pitch = (self.pitch + dy * self.sensitivity).clamp(-self.pitch_limit, self.pitch_limit);
        self.update_vectors();
    }

    /// Moves along the current basis by `speed * dt`.
    ///
    /// Negative `dt` is treated as zero.
    pub fn process_keyboard(&mut self, direction: Movement, dt: f32) {
        let velocity = self.speed * dt.max(0.0);
        let axis = match direction {
            Movement::Forward => self.front,
            Movement::Backward => -self.front,
            Movement::Right => self.right,
            Movement::Left => -self.right,
            Movement::Up => self.up,
            Movement::Down => -self.up,
        };
        self.position += axis * velocity;
    }

    /// Right-handed look-at from `position` toward `position + front`.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}
