//! Multisampled forward render pass and its framebuffers.
//!
//! The pass has one subpass and three attachments:
//!
//! 0. multisampled color, cleared, transient
//! 1. multisampled depth, cleared, discarded after the pass
//! 2. single-sample resolve target, the swapchain image, left in
//!    `PRESENT_SRC_KHR`
//!
//! A [`Framebuffer`] binds one swapchain image view together with the shared
//! color and depth targets.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

pub const COLOR_ATTACHMENT: u32 = 0;
pub const DEPTH_ATTACHMENT: u32 = 1;
pub const RESOLVE_ATTACHMENT: u32 = 2;

/// Attachment descriptions in attachment-index order.
pub fn attachment_descriptions(
    color_format: vk::Format,
    depth_format: vk::Format,
    samples: vk::SampleCountFlags,
) -> [vk::AttachmentDescription; 3] {
    let color = vk::AttachmentDescription::default()
        .format(color_format)
        .samples(samples)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

    let depth = vk::AttachmentDescription::default()
        .format(depth_format)
        .samples(samples)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::DONT_CARE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    let resolve = vk::AttachmentDescription::default()
        .format(color_format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::DONT_CARE)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR);

    [color, depth, resolve]
}

/// External-to-subpass dependency covering color output and depth tests.
///
/// The color output stage is where submission waits on the acquired image,
/// so the layout transition of the resolve target is ordered after it.
pub fn external_dependency() -> vk::SubpassDependency {
    let stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS;

    vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(stages)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(stages)
        .dst_access_mask(
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        )
}

/// Owned `VkRenderPass`.
pub struct RenderPass {
    device: Arc<Device>,
    render_pass: vk::RenderPass,
    color_format: vk::Format,
    depth_format: vk::Format,
    samples: vk::SampleCountFlags,
}

impl RenderPass {
    /// Creates the forward pass for the given swapchain format.
    ///
    /// # Errors
    ///
    /// Returns an error if render pass creation fails.
    pub fn new(
        device: Arc<Device>,
        color_format: vk::Format,
        depth_format: vk::Format,
        samples: vk::SampleCountFlags,
    ) -> RhiResult<Self> {
        let attachments = attachment_descriptions(color_format, depth_format, samples);

        let color_refs = [vk::AttachmentReference::default()
            .attachment(COLOR_ATTACHMENT)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];
        let depth_ref = vk::AttachmentReference::default()
            .attachment(DEPTH_ATTACHMENT)
            .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
        let resolve_refs = [vk::AttachmentReference::default()
            .attachment(RESOLVE_ATTACHMENT)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];

        let subpasses = [vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)
            .depth_stencil_attachment(&depth_ref)
            .resolve_attachments(&resolve_refs)];

        let dependencies = [external_dependency()];

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        let render_pass = unsafe { device.handle().create_render_pass(&create_info, None)? };

        debug!(
            "Created render pass: color={:?}, depth={:?}, samples={:?}",
            color_format, depth_format, samples
        );

        Ok(Self {
            device,
            render_pass,
            color_format,
            depth_format,
            samples,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::RenderPass {
        self.render_pass
    }

    #[inline]
    pub fn color_format(&self) -> vk::Format {
        self.color_format
    }

    #[inline]
    pub fn depth_format(&self) -> vk::Format {
        self.depth_format
    }

    #[inline]
    pub fn samples(&self) -> vk::SampleCountFlags {
        self.samples
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_render_pass(self.render_pass, None);
        }
        debug!("Destroyed render pass");
    }
}

/// Framebuffer for one swapchain image.
pub struct Framebuffer {
    device: Arc<Device>,
    framebuffer: vk::Framebuffer,
    extent: vk::Extent2D,
}

impl Framebuffer {
    /// Binds `[color, depth, resolve]` to `render_pass`.
    ///
    /// # Errors
    ///
    /// [`RhiError::OutOfBounds`] for a zero extent, or a Vulkan error if
    /// creation fails.
    pub fn new(
        device: Arc<Device>,
        render_pass: &RenderPass,
        color_view: vk::ImageView,
        depth_view: vk::ImageView,
        resolve_view: vk::ImageView,
        extent: vk::Extent2D,
    ) -> RhiResult<Self> {
        if extent.width == 0 || extent.height == 0 {
            return Err(RhiError::OutOfBounds(format!(
                "Framebuffer extent {}x{} has zero area",
                extent.width, extent.height
            )));
        }

        let attachments = [color_view, depth_view, resolve_view];
        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass.handle())
            .attachments(&attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let framebuffer = unsafe { device.handle().create_framebuffer(&create_info, None)? };

        Ok(Self {
            device,
            framebuffer,
            extent,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::Framebuffer {
        self.framebuffer
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_framebuffer(self.framebuffer, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_layouts() {
        let [color, depth, resolve] = attachment_descriptions(
            vk::Format::B8G8R8A8_SRGB,
            vk::Format::D32_SFLOAT,
            vk::SampleCountFlags::TYPE_4,
        );

        assert_eq!(color.samples, vk::SampleCountFlags::TYPE_4);
        assert_eq!(color.load_op, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(color.final_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

        assert_eq!(depth.format, vk::Format::D32_SFLOAT);
        assert_eq!(depth.samples, vk::SampleCountFlags::TYPE_4);
        assert_eq!(depth.store_op, vk::AttachmentStoreOp::DONT_CARE);

        assert_eq!(resolve.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(resolve.samples, vk::SampleCountFlags::TYPE_1);
        assert_eq!(resolve.store_op, vk::AttachmentStoreOp::STORE);
        assert_eq!(resolve.final_layout, vk::ImageLayout::PRESENT_SRC_KHR);
    }

    #[test]
    fn test_external_dependency_waits_on_color_output() {
        let dep = external_dependency();
        assert_eq!(dep.src_subpass, vk::SUBPASS_EXTERNAL);
        assert_eq!(dep.dst_subpass, 0);
        assert!(dep
            .src_stage_mask
            .contains(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT));
        assert!(dep
            .dst_access_mask
            .contains(vk::AccessFlags::COLOR_ATTACHMENT_WRITE));
    }
}
