//! Texture samplers.
//!
//! All samplers use linear filtering, repeat addressing and anisotropic
//! filtering clamped to what the device reports. Only the LOD range varies:
//! a mipmapped texture needs `max_lod` equal to its level count, a single
//! level texture samples level 0 only.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// Upper bound on anisotropy regardless of device support.
pub const MAX_ANISOTROPY: f32 = 16.0;

/// Sampler parameters that differ between textures.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplerDesc {
    pub max_lod: f32,
    pub max_anisotropy: f32,
}

impl SamplerDesc {
    /// Covers `mip_levels` levels; anisotropy clamped to `device_limit`.
    pub fn for_mip_levels(mip_levels: u32, device_limit: f32) -> Self {
        Self {
            max_lod: if mip_levels > 1 { mip_levels as f32 } else { 0.0 },
            max_anisotropy: MAX_ANISOTROPY.min(device_limit),
        }
    }

    fn create_info(&self) -> vk::SamplerCreateInfo<'static> {
        vk::SamplerCreateInfo::default()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .anisotropy_enable(true)
            .max_anisotropy(self.max_anisotropy)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(self.max_lod)
    }
}

/// Owned `VkSampler`.
pub struct Sampler {
    device: Arc<Device>,
    sampler: vk::Sampler,
    desc: SamplerDesc,
}

impl Sampler {
    /// Creates a sampler for a texture with `mip_levels` levels.
    pub fn new(device: Arc<Device>, mip_levels: u32) -> RhiResult<Self> {
        let desc = SamplerDesc::for_mip_levels(mip_levels, device.max_sampler_anisotropy());
        let sampler = unsafe { device.handle().create_sampler(&desc.create_info(), None)? };

        debug!(
            "Created sampler: max_lod={}, anisotropy={}",
            desc.max_lod, desc.max_anisotropy
        );

        Ok(Self {
            device,
            sampler,
            desc,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::Sampler {
        self.sampler
    }

    #[inline]
    pub fn desc(&self) -> SamplerDesc {
        self.desc
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_sampler(self.sampler, None);
        }
        debug!("Destroyed sampler");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mipmapped_sampler_covers_all_levels() {
        let desc = SamplerDesc::for_mip_levels(12, 16.0);
        assert_eq!(desc.max_lod, 12.0);
        assert_eq!(desc.max_anisotropy, 16.0);
    }

    #[test]
    fn test_single_level_sampler_pins_lod_zero() {
        assert_eq!(SamplerDesc::for_mip_levels(1, 16.0).max_lod, 0.0);
    }

    #[test]
    fn test_anisotropy_clamped_to_device_limit() {
        assert_eq!(SamplerDesc::for_mip_levels(1, 8.0).max_anisotropy, 8.0);
        assert_eq!(SamplerDesc::for_mip_levels(1, 64.0).max_anisotropy, 16.0);
    }

    #[test]
    fn test_create_info_uses_linear_repeat() {
        let info = SamplerDesc::for_mip_levels(4, 16.0).create_info();
        assert_eq!(info.mag_filter, vk::Filter::LINEAR);
        assert_eq!(info.address_mode_u, vk::SamplerAddressMode::REPEAT);
        assert_eq!(info.anisotropy_enable, vk::TRUE);
        assert_eq!(info.max_lod, 4.0);
    }
}
