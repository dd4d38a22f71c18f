//! 3-D noise volumes: decoding from PNG, upload and the sampled bind group.
//!
//! A volume image stores a cube of side `h` (the image height) in row-major
//! order: the RGBA pixel buffer, flipped vertically, is reinterpreted as
//! `h × h × h` texels. The image must therefore be at least `h²` pixels wide.

use std::path::Path;

use anyhow::{Context, Result};
use image::DynamicImage;

/// Decoded RGBA8 volume data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoiseVolume {
    side: u32,
    rgba: Vec<u8>,
}

impl NoiseVolume {
    /// Reads and decodes a volume image from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let img = image::open(path).with_context(|| format!("failed to decode {}", path.display()))?;
        Self::from_image(img).with_context(|| format!("invalid noise volume {}", path.display()))
    }

    /// Like [`NoiseVolume::load`] but falls back to [`NoiseVolume::white`]
    /// after logging the error.
    pub fn load_or_white(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(volume) => {
                log::info!("loaded noise volume {} ({}³)", path.display(), volume.side);
                volume
            }
            Err(e) => {
                log::error!("{e:#}; using a 1x1x1 white volume");
                Self::white()
            }
        }
    }

    pub fn from_image(img: DynamicImage) -> Result<Self> {
        let rgba = img.flipv().to_rgba8();
        let (width, height) = rgba.dimensions();
        anyhow::ensure!(height > 0, "image is empty");

        let side = height;
        let slices_width = (side as u64).pow(2);
        anyhow::ensure!(
            width as u64 >= slices_width,
            "image is {width}x{height}; a {side}³ volume needs at least {slices_width} columns"
        );

        let mut rgba = rgba.into_raw();
        rgba.truncate(Self::byte_len(side));
        Ok(Self { side, rgba })
    }

    /// Single opaque white texel.
    pub fn white() -> Self {
        Self {
            side: 1,
            rgba: vec![255; 4],
        }
    }

    pub fn side(&self) -> u32 {
        self.side
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    fn byte_len(side: u32) -> usize {
        (side as usize).pow(3) * 4
    }
}

/// A `NoiseVolume` uploaded to a 3-D `Rgba8Unorm` texture.
pub struct VolumeTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl VolumeTexture {
    pub fn upload(device: &wgpu::Device, queue: &wgpu::Queue, label: &str, volume: &NoiseVolume) -> Self {
        let side = volume.side();
        let size = wgpu::Extent3d {
            width: side,
            height: side,
            depth_or_array_layers: side,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D3,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            volume.rgba(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * side),
                rows_per_image: Some(side),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::D3),
            ..Default::default()
        });

        Self { texture, view }
    }
}

/// Layout + bind group exposing volumes at bindings `0..n` and one shared
/// repeat/linear sampler at binding `n`.
pub struct VolumeBindings {
    pub layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
}

impl VolumeBindings {
    pub fn new(device: &wgpu::Device, label: &str, volumes: &[&VolumeTexture]) -> Self {
        let sampler_binding = volumes.len() as u32;

        let mut layout_entries: Vec<wgpu::BindGroupLayoutEntry> = (0..sampler_binding)
            .map(|binding| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D3,
                    multisampled: false,
                },
                count: None,
            })
            .collect();
        layout_entries.push(wgpu::BindGroupLayoutEntry {
            binding: sampler_binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &layout_entries,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let mut entries: Vec<wgpu::BindGroupEntry<'_>> = volumes
            .iter()
            .zip(0u32..)
            .map(|(volume, binding)| wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::TextureView(&volume.view),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: sampler_binding,
            resource: wgpu::BindingResource::Sampler(&sampler),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &layout,
            entries: &entries,
        });

        Self { layout, bind_group }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    /// Builds a `side² × side` image whose pixel at (x, y) encodes (x, y).
    fn strip(side: u32) -> DynamicImage {
        let img = RgbaImage::from_fn(side * side, side, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn side_is_image_height() {
        let v = NoiseVolume::from_image(strip(4)).unwrap();
        assert_eq!(v.side(), 4);
        assert_eq!(v.rgba().len(), 4 * 4 * 4 * 4);
    }

    #[test]
    fn rows_are_flipped_vertically() {
        let v = NoiseVolume::from_image(strip(2)).unwrap();
        // First texel comes from the bottom image row.
        assert_eq!(&v.rgba()[..4], &[0, 1, 0, 255]);
        // Second image row (the original top row) starts at texel side².
        assert_eq!(&v.rgba()[16..20], &[0, 0, 0, 255]);
    }

    #[test]
    fn extra_columns_are_dropped() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(10, 2));
        let v = NoiseVolume::from_image(img).unwrap();
        assert_eq!(v.rgba().len(), 2 * 2 * 2 * 4);
    }

    #[test]
    fn too_narrow_image_is_rejected() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(8, 4));
        assert!(NoiseVolume::from_image(img).is_err());
    }

    #[test]
    fn rgb_input_is_expanded_to_rgba() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(4, 2));
        let v = NoiseVolume::from_image(img).unwrap();
        assert_eq!(v.rgba().len(), 2 * 2 * 2 * 4);
        assert_eq!(v.rgba()[3], 255);
    }

    #[test]
    fn missing_file_falls_back_to_white() {
        assert!(NoiseVolume::load("does/not/exist.png").is_err());
        let v = NoiseVolume::load_or_white("does/not/exist.png");
        assert_eq!(v, NoiseVolume::white());
        assert_eq!(v.side(), 1);
        assert_eq!(v.rgba(), &[255, 255, 255, 255]);
    }
}
