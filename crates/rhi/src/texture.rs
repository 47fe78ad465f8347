//! Sampled textures uploaded from RGBA8 pixel data.
//!
//! Upload goes through a staging buffer. Textures with more than one mip
//! level get their chain generated on the GPU by blitting each level into
//! the next with linear filtering, which requires the format to support
//! `SAMPLED_IMAGE_FILTER_LINEAR` with optimal tiling.

use std::sync::Arc;

use ash::vk;
use tracing::info;

use crate::buffer::{Buffer, BufferSpec};
use crate::command::{CommandBuffer, CommandPool};
use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::image::{Image, ImageSpec};

/// Format used for all color textures.
pub const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_SRGB;

/// How many mip levels a texture gets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MipLevels {
    /// `floor(log2(max(width, height)))` levels, at least one.
    Full,
    /// Base level only.
    Single,
}

impl MipLevels {
    pub fn count(self, width: u32, height: u32) -> u32 {
        match self {
            MipLevels::Full => mip_level_count(width, height),
            MipLevels::Single => 1,
        }
    }
}

/// `floor(log2(max(width, height)))`, clamped to at least one level.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    width.max(height).checked_ilog2().unwrap_or(0).max(1)
}

/// Offsets of the source and destination regions for each blit of the
/// mip chain: entry `i` copies level `i` into level `i + 1`.
pub fn mip_blit_extents(width: u32, height: u32, mip_levels: u32) -> Vec<([i32; 2], [i32; 2])> {
    let mut src = [width as i32, height as i32];
    (1..mip_levels)
        .map(|_| {
            let dst = [(src[0] / 2).max(1), (src[1] / 2).max(1)];
            let pair = (src, dst);
            src = dst;
            pair
        })
        .collect()
}

/// Borrowed RGBA8 pixels plus the name used in logs.
#[derive(Clone, Copy, Debug)]
pub struct TexturePixels<'a> {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    /// Tightly packed rows, 4 bytes per pixel.
    pub pixels: &'a [u8],
}

/// A sampled image with its full mip chain resident.
pub struct Texture {
    image: Image,
}

impl Texture {
    /// Uploads `source` and prepares the image for
    /// sampling in fragment shaders.
    ///
    /// Blocks until the upload has finished on `queue`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `pixels` is not `width * height * 4` bytes
    /// - mipmaps are requested but the format cannot be linearly blitted
    /// - any allocation or submission fails
    pub fn from_rgba8(
        device: Arc<Device>,
        pool: &CommandPool,
        queue: vk::Queue,
        source: TexturePixels<'_>,
        mips: MipLevels,
    ) -> RhiResult<Self> {
        let TexturePixels {
            name,
            width,
            height,
            pixels,
        } = source;
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(RhiError::OutOfBounds(format!(
                "{} has {} bytes, expected {} for {}x{} RGBA8",
                name,
                pixels.len(),
                expected,
                width,
                height
            )));
        }

        let mip_levels = mips.count(width, height);
        if mip_levels > 1 {
            let props = device.format_properties(TEXTURE_FORMAT);
            if !props
                .optimal_tiling_features
                .contains(vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR)
            {
                return Err(RhiError::UnsupportedFormat(format!(
                    "{:?} does not support linear blitting",
                    TEXTURE_FORMAT
                )));
            }
        }

        let staging = Buffer::with_data(
            device.clone(),
            &BufferSpec::staging(pixels.len() as u64),
            pixels,
        )?;

        let extent = vk::Extent2D { width, height };
        let image = Image::new(
            device,
            &ImageSpec::texture(extent, TEXTURE_FORMAT, mip_levels).with_name(name),
        )?;

        pool.submit_one_time(queue, |cmd| {
            image.record_transition(
                cmd,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            )?;

            let region = vk::BufferImageCopy::default()
                .image_subresource(color_layers(0))
                .image_extent(vk::Extent3D {
                    width,
                    height,
                    depth: 1,
                });
            cmd.copy_buffer_to_image(
                staging.handle(),
                image.handle(),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );

            if mip_levels > 1 {
                record_mip_chain(cmd, &image);
                Ok(())
            } else {
                image.record_transition(
                    cmd,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                )
            }
        })?;

        info!(
            "Uploaded texture '{}': {}x{}, {} mip level(s)",
            name, width, height, mip_levels
        );

        Ok(Self { image })
    }

    #[inline]
    pub fn view(&self) -> vk::ImageView {
        self.image.view()
    }

    #[inline]
    pub fn mip_levels(&self) -> u32 {
        self.image.mip_levels()
    }
}

fn color_layers(mip_level: u32) -> vk::ImageSubresourceLayers {
    vk::ImageSubresourceLayers::default()
        .aspect_mask(vk::ImageAspectFlags::COLOR)
        .mip_level(mip_level)
        .base_array_layer(0)
        .layer_count(1)
}

/// Records the blits that fill levels `1..n` from level 0 and leaves every
/// level in `SHADER_READ_ONLY_OPTIMAL`. All levels start in
/// `TRANSFER_DST_OPTIMAL`.
fn record_mip_chain(cmd: &CommandBuffer, image: &Image) {
    let extent = image.extent();
    let mip_levels = image.mip_levels();

    let level_barrier = |level: u32,
                         old_layout: vk::ImageLayout,
                         new_layout: vk::ImageLayout,
                         src_access: vk::AccessFlags,
                         dst_access: vk::AccessFlags| {
        vk::ImageMemoryBarrier::default()
            .image(image.handle())
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .base_mip_level(level)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            )
            .old_layout(old_layout)
            .new_layout(new_layout)
            .src_access_mask(src_access)
            .dst_access_mask(dst_access)
    };

    for (i, (src, dst)) in mip_blit_extents(extent.width, extent.height, mip_levels)
        .into_iter()
        .enumerate()
    {
        let level = i as u32;

        cmd.pipeline_barrier(
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::TRANSFER,
            &[level_barrier(
                level,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                vk::AccessFlags::TRANSFER_WRITE,
                vk::AccessFlags::TRANSFER_READ,
            )],
        );

        let blit = vk::ImageBlit::default()
            .src_offsets([
                vk::Offset3D::default(),
                vk::Offset3D {
                    x: src[0],
                    y: src[1],
                    z: 1,
                },
            ])
            .src_subresource(color_layers(level))
            .dst_offsets([
                vk::Offset3D::default(),
                vk::Offset3D {
                    x: dst[0],
                    y: dst[1],
                    z: 1,
                },
            ])
            .dst_subresource(color_layers(level + 1));

        cmd.blit_image(
            image.handle(),
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            image.handle(),
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &[blit],
            vk::Filter::LINEAR,
        );

        cmd.pipeline_barrier(
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
            &[level_barrier(
                level,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                vk::AccessFlags::TRANSFER_READ,
                vk::AccessFlags::SHADER_READ,
            )],
        );
    }

    // The last level was only ever written.
    cmd.pipeline_barrier(
        vk::PipelineStageFlags::TRANSFER,
        vk::PipelineStageFlags::FRAGMENT_SHADER,
        &[level_barrier(
            mip_levels - 1,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            vk::AccessFlags::TRANSFER_WRITE,
            vk::AccessFlags::SHADER_READ,
        )],
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mip_level_count() {
        assert_eq!(mip_level_count(4096, 4096), 12);
        assert_eq!(mip_level_count(1024, 512), 10);
        assert_eq!(mip_level_count(1000, 10), 9);
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(0, 0), 1);
    }

    #[test]
    fn test_single_mip_level() {
        assert_eq!(MipLevels::Single.count(4096, 4096), 1);
        assert_eq!(MipLevels::Full.count(4096, 4096), 12);
    }

    #[test]
    fn test_mip_blit_extents_halve_until_one() {
        let blits = mip_blit_extents(8, 2, 4);
        assert_eq!(
            blits,
            vec![([8, 2], [4, 1]), ([4, 1], [2, 1]), ([2, 1], [1, 1])]
        );
    }

    #[test]
    fn test_no_blits_for_single_level() {
        assert!(mip_blit_extents(512, 512, 1).is_empty());
    }
}
