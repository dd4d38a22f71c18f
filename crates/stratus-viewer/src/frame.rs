use glam::Vec2;

use stratus_engine::camera::{Camera, CameraConfig, MatrixCache, Projection};
use stratus_engine::input::{InputFrame, InputState};
use stratus_engine::render::reflect::UniformValue;

use crate::params::CloudParams;
use crate::router::{InputRouter, RouteOutcome};
use crate::uniforms::CloudUniform;

/// All per-frame mutable state of the viewer.
///
/// Input routing, matrix refresh and uniform collection read and write this
/// struct only, so a frame is a function of the context, the input and `dt`.
#[derive(Debug, Clone)]
pub struct FrameContext {
    pub camera: Camera,
    pub matrices: MatrixCache,
    pub router: InputRouter,
    pub params: CloudParams,
    shutdown: bool,
}

impl FrameContext {
    pub fn new(camera: CameraConfig, projection: Projection, start_captured: bool) -> Self {
        Self {
            camera: Camera::new(camera),
            matrices: MatrixCache::new(projection),
            router: InputRouter::new(start_captured),
            params: CloudParams::default(),
            shutdown: false,
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown
    }

    /// Routes this frame's input into the camera. Shutdown is terminal.
    pub fn route_input(&mut self, input: &InputState, frame: &InputFrame, dt: f32) -> RouteOutcome {
        if self.shutdown {
            return RouteOutcome {
                shutdown: true,
                capture_changed: None,
            };
        }

        let outcome = self
            .router
            .route(input, frame, dt, &mut self.camera, &mut self.matrices);
        if outcome.shutdown {
            log::info!("shutdown requested");
            self.shutdown = true;
        }
        outcome
    }

    /// Recomputes the matrices if the camera changed. Returns whether it did.
    pub fn refresh_matrices(&mut self) -> bool {
        self.matrices.refresh(&self.camera)
    }

    /// Routes input, lets `edit` change the parameters, then refreshes the
    /// matrices. `edit` receives the current capture hint and is skipped on
    /// shutdown.
    pub fn step(
        &mut self,
        input: &InputState,
        frame: &InputFrame,
        dt: f32,
        edit: impl FnOnce(&mut CloudParams, &'static str),
    ) -> RouteOutcome {
        let outcome = self.route_input(input, frame, dt);
        if !outcome.shutdown {
            edit(&mut self.params, self.router.hint());
            self.refresh_matrices();
        }
        outcome
    }

    /// Closes the frame. The dirty flag is cleared whether or not it fired.
    pub fn end_frame(&mut self) {
        self.matrices.clear_dirty();
    }

    /// Every uniform written once per frame, in a fixed order.
    pub fn frame_uniforms(&self, time: f32) -> Vec<(CloudUniform, UniformValue)> {
        use CloudUniform as U;
        use UniformValue::{Float, Int, Mat4, Vec3 as V3};

        let p = &self.params;
        vec![
            (U::InverseViewProjection, Mat4(self.matrices.inverse_view_projection())),
            (U::View, Mat4(self.matrices.view())),
            (U::Projection, Mat4(self.matrices.projection())),
            (U::CameraPos, V3(self.camera.position())),
            (U::Time, Float(time)),
            (U::SunEnergy, Float(p.sun_energy)),
            (U::SunColor, V3(p.sun_color)),
            (U::SunDirection, V3(p.sun_direction())),
            (U::CloudBottom, Float(p.cloud_bottom)),
            (U::CloudTop, Float(p.cloud_top)),
            (U::ShapeScale, Float(p.shape_scale)),
            (U::ShapeWeights, V3(p.shape_weights)),
            (U::CloudCover, Float(p.cloud_cover)),
            (U::DetailScale, Float(p.detail_scale)),
            (U::DetailWeights, V3(p.detail_weights)),
            (U::DetailMultiplier, Float(p.detail_multiplier)),
            (U::WindSpeed, Float(p.wind_speed)),
            (U::LightAbsorptionTowardsSun, Float(p.light_absorption_towards_sun)),
            (U::ForwardScattering, Float(p.forward_scattering)),
            (U::PowderStrength, Float(p.powder_strength)),
            (U::CloudAbsorption, Float(p.cloud_absorption)),
            (U::Ambient, V3(p.ambient)),
            (U::RaymarchingSteps, Int(p.raymarching_steps)),
            (U::RenderDistance, Float(p.render_distance)),
        ]
    }
}

/// The uniform written once at startup.
pub fn resolution_uniform(width: u32, height: u32) -> (CloudUniform, UniformValue) {
    (
        CloudUniform::Resolution,
        UniformValue::Vec2(Vec2::new(width as f32, height as f32)),
    )
}
