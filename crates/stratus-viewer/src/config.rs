use std::path::PathBuf;
use std::time::Duration;

use stratus_engine::camera::{CameraConfig, Projection};
use stratus_engine::window::RuntimeConfig;
use winit::dpi::PhysicalSize;

/// Directory holding the shader sources and noise volumes.
const ASSET_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets");

/// Everything the viewer needs before the first frame.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,

    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    pub base_noise: PathBuf,
    pub detail_noise: PathBuf,

    pub camera: CameraConfig,
    pub clear_color: wgpu::Color,

    /// How often the frame statistics are logged.
    pub stats_interval: Duration,

    /// Whether the viewer starts with the pointer captured.
    pub start_captured: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let assets = PathBuf::from(ASSET_DIR);
        Self {
            title: "Volumetric Clouds".to_string(),
            width: 1920,
            height: 1080,
            vertex_shader: assets.join("shaders/clouds.vert.wgsl"),
            fragment_shader: assets.join("shaders/clouds.frag.wgsl"),
            base_noise: assets.join("textures/base_noise.png"),
            detail_noise: assets.join("textures/detail_noise.png"),
            camera: CameraConfig::default(),
            clear_color: wgpu::Color {
                r: 0.5,
                g: 0.5,
                b: 0.5,
                a: 1.0,
            },
            stats_interval: Duration::from_secs(1),
            start_captured: true,
        }
    }
}

impl ViewerConfig {
    pub fn runtime(&self) -> RuntimeConfig {
        RuntimeConfig {
            title: self.title.clone(),
            size: PhysicalSize::new(self.width, self.height),
            resizable: false,
        }
    }

    pub fn projection(&self) -> Projection {
        Projection::new(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_window_is_fixed_size() {
        let cfg = ViewerConfig::default();
        let rt = cfg.runtime();
        assert_eq!(rt.size, PhysicalSize::new(1920, 1080));
        assert!(!rt.resizable);
    }

    #[test]
    fn projection_uses_window_aspect() {
        let cfg = ViewerConfig::default();
        let p = cfg.projection();
        assert!((p.aspect - 16.0 / 9.0).abs() < 1e-6);
        assert_eq!(p.near, 0.1);
        assert_eq!(p.far, 100.0);
    }

    #[test]
    fn asset_paths_point_into_the_crate() {
        let cfg = ViewerConfig::default();
        assert!(cfg.fragment_shader.ends_with("shaders/clouds.frag.wgsl"));
        assert!(cfg.vertex_shader.exists());
        assert!(cfg.fragment_shader.exists());
    }
}
