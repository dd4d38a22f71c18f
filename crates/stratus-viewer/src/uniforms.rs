use stratus_engine::render::program::UniformKey;

/// Every uniform the cloud shader is driven with.
///
/// Names match the members of `CloudUniforms` in `clouds.frag.wgsl`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CloudUniform {
    Resolution,
    InverseViewProjection,
    View,
    Projection,
    CameraPos,
    Time,

    SunEnergy,
    SunColor,
    SunDirection,

    CloudBottom,
    CloudTop,

    ShapeScale,
    ShapeWeights,
    CloudCover,

    DetailScale,
    DetailWeights,
    DetailMultiplier,

    WindSpeed,

    LightAbsorptionTowardsSun,
    ForwardScattering,
    PowderStrength,
    CloudAbsorption,
    Ambient,

    RaymarchingSteps,
    RenderDistance,
}

impl UniformKey for CloudUniform {
    const ALL: &'static [Self] = &[
        CloudUniform::Resolution,
        CloudUniform::InverseViewProjection,
        CloudUniform::View,
        CloudUniform::Projection,
        CloudUniform::CameraPos,
        CloudUniform::Time,
        CloudUniform::SunEnergy,
        CloudUniform::SunColor,
        CloudUniform::SunDirection,
        CloudUniform::CloudBottom,
        CloudUniform::CloudTop,
        CloudUniform::ShapeScale,
        CloudUniform::ShapeWeights,
        CloudUniform::CloudCover,
        CloudUniform::DetailScale,
        CloudUniform::DetailWeights,
        CloudUniform::DetailMultiplier,
        CloudUniform::WindSpeed,
        CloudUniform::LightAbsorptionTowardsSun,
        CloudUniform::ForwardScattering,
        CloudUniform::PowderStrength,
        CloudUniform::CloudAbsorption,
        CloudUniform::Ambient,
        CloudUniform::RaymarchingSteps,
        CloudUniform::RenderDistance,
    ];

    fn name(self) -> &'static str {
        match self {
            CloudUniform::Resolution => "resolution",
            CloudUniform::InverseViewProjection => "ivpm",
            CloudUniform::View => "view",
            CloudUniform::Projection => "projection",
            CloudUniform::CameraPos => "camera_pos",
            CloudUniform::Time => "time",
            CloudUniform::SunEnergy => "sun_energy",
            CloudUniform::SunColor => "sun_color",
            CloudUniform::SunDirection => "sun_direction",
            CloudUniform::CloudBottom => "cloud_bottom",
            CloudUniform::CloudTop => "cloud_top",
            CloudUniform::ShapeScale => "shape_scale",
            CloudUniform::ShapeWeights => "shape_weights",
            CloudUniform::CloudCover => "cloud_cover",
            CloudUniform::DetailScale => "detail_scale",
            CloudUniform::DetailWeights => "detail_weights",
            CloudUniform::DetailMultiplier => "detail_multiplier",
            CloudUniform::WindSpeed => "wind_speed",
            CloudUniform::LightAbsorptionTowardsSun => "light_absorption_towards_sun",
            CloudUniform::ForwardScattering => "forward_scattering",
            CloudUniform::PowderStrength => "powder_strength",
            CloudUniform::CloudAbsorption => "cloud_absorption",
            CloudUniform::Ambient => "ambient",
            CloudUniform::RaymarchingSteps => "raymarching_steps",
            CloudUniform::RenderDistance => "render_distance",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use stratus_engine::render::reflect::{compile_stage, ShaderStage, UniformBlock};

    const FRAGMENT: &str = include_str!("../assets/shaders/clouds.frag.wgsl");

    #[test]
    fn all_is_indexed_by_discriminant() {
        for (i, key) in CloudUniform::ALL.iter().enumerate() {
            assert_eq!(key.index(), i, "{key:?}");
        }
    }

    #[test]
    fn names_are_unique() {
        let names: HashSet<_> = CloudUniform::ALL.iter().map(|k| k.name()).collect();
        assert_eq!(names.len(), CloudUniform::ALL.len());
    }

    #[test]
    fn every_key_resolves_in_the_cloud_shader() {
        let module = compile_stage(ShaderStage::Fragment, FRAGMENT).unwrap();
        let block = UniformBlock::reflect(&module, 0, 0).unwrap();
        for key in CloudUniform::ALL {
            assert!(block.slot(key.name()).is_some(), "{key:?} missing from shader");
        }
    }
}
