use glam::{Quat, Vec3};

/// Direction the sun's altitude and azimuth rotate.
const SUN_REFERENCE: Vec3 = Vec3::Z;

/// Editable cloud-rendering parameters.
///
/// Values are trusted as stored; range limits belong to whatever edits them.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudParams {
    // sun
    pub sun_energy: f32,
    pub sun_color: Vec3,
    /// Radians above the horizon.
    pub sun_altitude: f32,
    /// Radians around the world Y axis.
    pub sun_azimuth: f32,

    // layer bounds (world units)
    pub cloud_bottom: f32,
    pub cloud_top: f32,

    // shape
    pub shape_scale: f32,
    pub shape_weights: Vec3,
    pub cloud_cover: f32,

    // detail
    pub detail_scale: f32,
    pub detail_weights: Vec3,
    pub detail_multiplier: f32,

    pub wind_speed: f32,

    // lighting
    pub light_absorption_towards_sun: f32,
    pub forward_scattering: f32,
    pub powder_strength: f32,
    pub cloud_absorption: f32,
    pub ambient: Vec3,

    // quality
    pub raymarching_steps: i32,
    pub render_distance: f32,
}

impl Default for CloudParams {
    fn default() -> Self {
        Self {
            sun_energy: 1.0,
            sun_color: Vec3::ONE,
            sun_altitude: 0.2 * std::f32::consts::PI,
            sun_azimuth: std::f32::consts::PI,

            cloud_bottom: 1500.0,
            cloud_top: 5000.0,

            shape_scale: 0.00002,
            shape_weights: Vec3::new(0.625, 0.25, 0.125),
            cloud_cover: 0.35,

            detail_scale: 0.0004,
            detail_weights: Vec3::new(0.625, 0.25, 0.125),
            detail_multiplier: 0.05,

            wind_speed: 50.0,

            light_absorption_towards_sun: 0.2,
            forward_scattering: 0.1,
            powder_strength: 0.25,
            cloud_absorption: 1.0,
            ambient: Vec3::splat(0.4),

            raymarching_steps: 256,
            render_distance: 50000.0,
        }
    }
}

impl CloudParams {
    pub fn sun_direction(&self) -> Vec3 {
        sun_direction(self.sun_altitude, self.sun_azimuth)
    }
}

/// Rotates +Z by `altitude` about −X, then by `azimuth` about +Y.
pub fn sun_direction(altitude: f32, azimuth: f32) -> Vec3 {
    let tilt = Quat::from_axis_angle(Vec3::NEG_X, altitude);
    let turn = Quat::from_axis_angle(Vec3::Y, azimuth);
    turn * (tilt * SUN_REFERENCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn zero_angles_leave_reference_unchanged() {
        assert!(close(sun_direction(0.0, 0.0), Vec3::Z));
    }

    #[test]
    fn altitude_raises_towards_zenith() {
        assert!(close(sun_direction(FRAC_PI_2, 0.0), Vec3::Y));
        assert!(sun_direction(0.3, 0.0).y > 0.0);
    }

    #[test]
    fn azimuth_turns_about_y() {
        assert!(close(sun_direction(0.0, PI), Vec3::NEG_Z));
        assert!(close(sun_direction(0.0, FRAC_PI_2), Vec3::X));
    }

    #[test]
    fn altitude_is_applied_before_azimuth() {
        // Applied the other way round, the zenith would be tilted off Y.
        assert!(close(sun_direction(FRAC_PI_2, 1.0), Vec3::Y));

        let d = sun_direction(0.5, FRAC_PI_2);
        assert!((d.y - 0.5f32.sin()).abs() < 1e-5);
        assert!((d.x - 0.5f32.cos()).abs() < 1e-5);
    }

    #[test]
    fn default_sun_is_above_horizon() {
        let d = CloudParams::default().sun_direction();
        assert!(d.y > 0.0);
        assert!((d.length() - 1.0).abs() < 1e-5);
    }
}
