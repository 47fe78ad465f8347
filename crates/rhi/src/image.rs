//! GPU images.
//!
//! An [`ImageSpec`] describes a 2D image (extent, format, mip levels,
//! samples, usage, memory location). An [`Image`] owns the `VkImage`, its
//! single full-range view and the backing allocation, destroying all three
//! together.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ash::vk;
//! use viewer_rhi::device::Device;
//! use viewer_rhi::image::{Image, ImageSpec};
//!
//! # fn example(device: Arc<Device>, depth_format: vk::Format) -> Result<(), viewer_rhi::RhiError> {
//! let extent = vk::Extent2D { width: 800, height: 800 };
//! let depth = Image::new(
//!     device.clone(),
//!     &ImageSpec::depth_target(extent, depth_format, device.msaa_samples()),
//! )?;
//! let _view = depth.view();
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use tracing::debug;

use crate::command::CommandBuffer;
use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Declarative description of a 2D image and its view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageSpec {
    pub name: &'static str,
    pub extent: vk::Extent2D,
    pub format: vk::Format,
    pub mip_levels: u32,
    pub samples: vk::SampleCountFlags,
    pub tiling: vk::ImageTiling,
    pub usage: vk::ImageUsageFlags,
    pub location: MemoryLocation,
    pub aspect: vk::ImageAspectFlags,
    pub sharing_mode: vk::SharingMode,
}

impl ImageSpec {
    /// Multisampled color attachment that is resolved into the swapchain image.
    pub fn color_target(
        extent: vk::Extent2D,
        format: vk::Format,
        samples: vk::SampleCountFlags,
    ) -> Self {
        Self {
            name: "color_target",
            extent,
            format,
            mip_levels: 1,
            samples,
            tiling: vk::ImageTiling::OPTIMAL,
            usage: vk::ImageUsageFlags::TRANSIENT_ATTACHMENT
                | vk::ImageUsageFlags::COLOR_ATTACHMENT,
            location: MemoryLocation::GpuOnly,
            aspect: vk::ImageAspectFlags::COLOR,
            sharing_mode: vk::SharingMode::EXCLUSIVE,
        }
    }

    /// Depth attachment matching the color target's sample count.
    pub fn depth_target(
        extent: vk::Extent2D,
        format: vk::Format,
        samples: vk::SampleCountFlags,
    ) -> Self {
        Self {
            name: "depth_target",
            extent,
            format,
            mip_levels: 1,
            samples,
            tiling: vk::ImageTiling::OPTIMAL,
            usage: vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            location: MemoryLocation::GpuOnly,
            aspect: vk::ImageAspectFlags::DEPTH,
            sharing_mode: vk::SharingMode::EXCLUSIVE,
        }
    }

    /// Sampled texture. Also a transfer source so its mip chain can be
    /// generated by blitting level to level.
    pub fn texture(extent: vk::Extent2D, format: vk::Format, mip_levels: u32) -> Self {
        Self {
            name: "texture",
            extent,
            format,
            mip_levels,
            samples: vk::SampleCountFlags::TYPE_1,
            tiling: vk::ImageTiling::OPTIMAL,
            usage: vk::ImageUsageFlags::TRANSFER_SRC
                | vk::ImageUsageFlags::TRANSFER_DST
                | vk::ImageUsageFlags::SAMPLED,
            location: MemoryLocation::GpuOnly,
            aspect: vk::ImageAspectFlags::COLOR,
            sharing_mode: vk::SharingMode::EXCLUSIVE,
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Full subresource range covering every mip level.
    pub fn subresource_range(&self) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange::default()
            .aspect_mask(self.aspect)
            .base_mip_level(0)
            .level_count(self.mip_levels)
            .base_array_layer(0)
            .layer_count(1)
    }
}

/// Image handle, view and backing allocation as one owned value.
pub struct Image {
    device: Arc<Device>,
    image: vk::Image,
    view: vk::ImageView,
    allocation: Option<Allocation>,
    spec: ImageSpec,
}

impl Image {
    /// Creates the image, binds memory to it and creates its view.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the extent is zero in either dimension
    /// - image or view creation fails
    /// - no memory type satisfies `spec.location`
    pub fn new(device: Arc<Device>, spec: &ImageSpec) -> RhiResult<Self> {
        if spec.extent.width == 0 || spec.extent.height == 0 {
            return Err(RhiError::OutOfBounds(format!(
                "{} extent must be non-zero, got {}x{}",
                spec.name, spec.extent.width, spec.extent.height
            )));
        }

        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(spec.format)
            .extent(vk::Extent3D {
                width: spec.extent.width,
                height: spec.extent.height,
                depth: 1,
            })
            .mip_levels(spec.mip_levels)
            .array_layers(1)
            .samples(spec.samples)
            .tiling(spec.tiling)
            .usage(spec.usage)
            .sharing_mode(spec.sharing_mode)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe { device.handle().create_image(&image_info, None)? };
        let requirements = unsafe { device.handle().get_image_memory_requirements(image) };

        let allocation = device.allocator().and_then(|mut allocator| {
            Ok(allocator.allocate(&AllocationCreateDesc {
                name: spec.name,
                requirements,
                location: spec.location,
                linear: spec.tiling == vk::ImageTiling::LINEAR,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })?)
        });

        let mut this = Self {
            device,
            image,
            view: vk::ImageView::null(),
            allocation: None,
            spec: *spec,
        };
        let allocation = allocation?;
        let bind = unsafe {
            this.device
                .handle()
                .bind_image_memory(image, allocation.memory(), allocation.offset())
        };
        this.allocation = Some(allocation);
        bind?;

        this.view = create_image_view(
            &this.device,
            image,
            spec.format,
            spec.aspect,
            spec.mip_levels,
        )?;

        debug!(
            "Created {}: {}x{} {:?}, {} mip(s), {:?}",
            spec.name,
            spec.extent.width,
            spec.extent.height,
            spec.format,
            spec.mip_levels,
            spec.samples
        );

        Ok(this)
    }

    #[inline]
    pub fn handle(&self) -> vk::Image {
        self.image
    }

    #[inline]
    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    #[inline]
    pub fn spec(&self) -> &ImageSpec {
        &self.spec
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.spec.extent
    }

    #[inline]
    pub fn mip_levels(&self) -> u32 {
        self.spec.mip_levels
    }

    /// Records a layout transition of every mip level.
    ///
    /// Supports the transitions a texture upload needs:
    /// `UNDEFINED -> TRANSFER_DST_OPTIMAL` and
    /// `TRANSFER_DST_OPTIMAL -> SHADER_READ_ONLY_OPTIMAL`.
    ///
    /// # Errors
    ///
    /// [`RhiError::UnsupportedFormat`] for any other pair of layouts.
    pub fn record_transition(
        &self,
        cmd: &CommandBuffer,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
    ) -> RhiResult<()> {
        let (src_access, dst_access, src_stage, dst_stage) = transition_masks(old_layout, new_layout)
            .ok_or_else(|| {
                RhiError::UnsupportedFormat(format!(
                    "unsupported layout transition {:?} -> {:?}",
                    old_layout, new_layout
                ))
            })?;

        let barrier = vk::ImageMemoryBarrier::default()
            .old_layout(old_layout)
            .new_layout(new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(self.image)
            .subresource_range(self.spec.subresource_range())
            .src_access_mask(src_access)
            .dst_access_mask(dst_access);

        cmd.pipeline_barrier(src_stage, dst_stage, &[barrier]);
        Ok(())
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        unsafe {
            if self.view != vk::ImageView::null() {
                self.device.handle().destroy_image_view(self.view, None);
            }
            self.device.handle().destroy_image(self.image, None);
        }

        if let Some(allocation) = self.allocation.take() {
            match self.device.allocator() {
                Ok(mut allocator) => {
                    if let Err(e) = allocator.free(allocation) {
                        tracing::error!("Failed to free {} allocation: {:?}", self.spec.name, e);
                    }
                }
                Err(e) => tracing::error!("Leaking {} allocation: {}", self.spec.name, e),
            }
        }

        debug!(
            "Destroyed {}: {}x{}",
            self.spec.name, self.spec.extent.width, self.spec.extent.height
        );
    }
}

/// Access masks and stages for a supported layout transition.
fn transition_masks(
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) -> Option<(
    vk::AccessFlags,
    vk::AccessFlags,
    vk::PipelineStageFlags,
    vk::PipelineStageFlags,
)> {
    match (old_layout, new_layout) {
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => Some((
            vk::AccessFlags::empty(),
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::TRANSFER,
        )),
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => {
            Some((
                vk::AccessFlags::TRANSFER_WRITE,
                vk::AccessFlags::SHADER_READ,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
            ))
        }
        _ => None,
    }
}

/// Creates a 2D view covering `mip_levels` levels of `image`.
///
/// The caller owns the returned view.
pub fn create_image_view(
    device: &Device,
    image: vk::Image,
    format: vk::Format,
    aspect: vk::ImageAspectFlags,
    mip_levels: u32,
) -> RhiResult<vk::ImageView> {
    let create_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping::default())
        .subresource_range(
            vk::ImageSubresourceRange::default()
                .aspect_mask(aspect)
                .base_mip_level(0)
                .level_count(mip_levels)
                .base_array_layer(0)
                .layer_count(1),
        );

    Ok(unsafe { device.handle().create_image_view(&create_info, None)? })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXTENT: vk::Extent2D = vk::Extent2D {
        width: 800,
        height: 600,
    };

    #[test]
    fn test_render_target_specs() {
        let color = ImageSpec::color_target(
            EXTENT,
            vk::Format::B8G8R8A8_SRGB,
            vk::SampleCountFlags::TYPE_4,
        );
        assert_eq!(color.mip_levels, 1);
        assert_eq!(color.samples, vk::SampleCountFlags::TYPE_4);
        assert!(color.usage.contains(vk::ImageUsageFlags::COLOR_ATTACHMENT));
        assert_eq!(color.aspect, vk::ImageAspectFlags::COLOR);

        let depth = ImageSpec::depth_target(
            EXTENT,
            vk::Format::D32_SFLOAT,
            vk::SampleCountFlags::TYPE_4,
        );
        assert!(
            depth
                .usage
                .contains(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
        );
        assert_eq!(depth.aspect, vk::ImageAspectFlags::DEPTH);
        assert_eq!(depth.location, MemoryLocation::GpuOnly);
    }

    #[test]
    fn test_texture_spec_supports_mip_blits() {
        let spec = ImageSpec::texture(EXTENT, vk::Format::R8G8B8A8_SRGB, 9);
        assert!(spec.usage.contains(
            vk::ImageUsageFlags::TRANSFER_SRC
                | vk::ImageUsageFlags::TRANSFER_DST
                | vk::ImageUsageFlags::SAMPLED
        ));
        assert_eq!(spec.subresource_range().level_count, 9);
        assert_eq!(spec.with_name("diffuse").name, "diffuse");
    }

    #[test]
    fn test_transition_masks() {
        let (_, dst_access, src_stage, dst_stage) = transition_masks(
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        )
        .unwrap();
        assert_eq!(dst_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(src_stage, vk::PipelineStageFlags::TOP_OF_PIPE);
        assert_eq!(dst_stage, vk::PipelineStageFlags::TRANSFER);

        let (src_access, dst_access, _, dst_stage) = transition_masks(
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )
        .unwrap();
        assert_eq!(src_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(dst_access, vk::AccessFlags::SHADER_READ);
        assert_eq!(dst_stage, vk::PipelineStageFlags::FRAGMENT_SHADER);

        assert!(
            transition_masks(
                vk::ImageLayout::GENERAL,
                vk::ImageLayout::PRESENT_SRC_KHR
            )
            .is_none()
        );
    }
}
