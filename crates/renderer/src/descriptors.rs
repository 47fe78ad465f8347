//! The viewer's single descriptor set layout and its per-image contents.

use ash::vk;
use viewer_rhi::descriptor::{DescriptorWrites, binding};

use crate::ubo::{CameraUbo, LightUbo, MvpUbo};

pub const MVP_BINDING: u32 = 0;
pub const DIFFUSE_BINDING: u32 = 1;
pub const LIGHT_BINDING: u32 = 2;
pub const CAMERA_BINDING: u32 = 3;
pub const SPECULAR_BINDING: u32 = 4;

/// Layout bindings, in binding order.
pub fn layout_bindings() -> [vk::DescriptorSetLayoutBinding<'static>; 5] {
    [
        binding::uniform_buffer(MVP_BINDING, vk::ShaderStageFlags::VERTEX),
        binding::combined_image_sampler(DIFFUSE_BINDING, vk::ShaderStageFlags::FRAGMENT),
        binding::uniform_buffer(LIGHT_BINDING, vk::ShaderStageFlags::FRAGMENT),
        binding::uniform_buffer(CAMERA_BINDING, vk::ShaderStageFlags::FRAGMENT),
        binding::combined_image_sampler(SPECULAR_BINDING, vk::ShaderStageFlags::FRAGMENT),
    ]
}

/// A sampled image view paired with its sampler.
#[derive(Debug, Clone, Copy)]
pub struct SampledImage {
    pub view: vk::ImageView,
    pub sampler: vk::Sampler,
}

/// Handles written into one image's descriptor set.
#[derive(Debug, Clone, Copy)]
pub struct ImageBindings {
    pub mvp: vk::Buffer,
    pub light: vk::Buffer,
    pub camera: vk::Buffer,
    pub diffuse: SampledImage,
    pub specular: SampledImage,
}

impl ImageBindings {
    /// Every binding of `set`, each buffer bound to its own uniform.
    pub fn writes(&self, set: vk::DescriptorSet) -> DescriptorWrites {
        DescriptorWrites::new(set)
            .uniform_buffer(MVP_BINDING, self.mvp, MvpUbo::SIZE as vk::DeviceSize)
            .combined_image_sampler(DIFFUSE_BINDING, self.diffuse.view, self.diffuse.sampler)
            .uniform_buffer(LIGHT_BINDING, self.light, LightUbo::SIZE as vk::DeviceSize)
            .uniform_buffer(CAMERA_BINDING, self.camera, CameraUbo::SIZE as vk::DeviceSize)
            .combined_image_sampler(
                SPECULAR_BINDING,
                self.specular.view,
                self.specular.sampler,
            )
    }
}
