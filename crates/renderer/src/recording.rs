//! Per-image command recording.
//!
//! Each frame the image's command buffer is reset and re-recorded from
//! scratch: one render pass, one pipeline, one vertex/index buffer pair, the
//! image's descriptor set and a single indexed draw over the whole mesh.

use ash::vk;
use viewer_rhi::RhiResult;
use viewer_rhi::command::CommandBuffer;

/// Clear values for the color and depth attachments. The resolve
/// attachment is not cleared.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearValues {
    pub color: [f32; 4],
    pub depth: f32,
}

impl Default for ClearValues {
    fn default() -> Self {
        Self {
            color: [0.0, 0.0, 0.0, 1.0],
            depth: 1.0,
        }
    }
}

impl ClearValues {
    /// Values in attachment order: color, depth.
    pub fn to_vk(self) -> [vk::ClearValue; 2] {
        [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.color,
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: self.depth,
                    stencil: 0,
                },
            },
        ]
    }
}

/// Everything one draw needs.
#[derive(Debug, Clone, Copy)]
pub struct DrawParams {
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
    pub extent: vk::Extent2D,
    pub pipeline: vk::Pipeline,
    pub pipeline_layout: vk::PipelineLayout,
    pub vertex_buffer: vk::Buffer,
    pub index_buffer: vk::Buffer,
    pub index_count: u32,
    pub descriptor_set: vk::DescriptorSet,
    pub clear: ClearValues,
}

/// Viewport covering the whole target with depth range 0..1.
pub fn full_viewport(extent: vk::Extent2D) -> vk::Viewport {
    vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

pub fn full_scissor(extent: vk::Extent2D) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    }
}

/// Resets `cmd` and records the frame described by `params`.
///
/// # Errors
///
/// Returns an error if the reset, begin or end call fails.
pub fn record_frame(cmd: &CommandBuffer, params: &DrawParams) -> RhiResult<()> {
    cmd.reset()?;
    cmd.begin()?;

    let clear_values = params.clear.to_vk();
    let begin_info = vk::RenderPassBeginInfo::default()
        .render_pass(params.render_pass)
        .framebuffer(params.framebuffer)
        .render_area(full_scissor(params.extent))
        .clear_values(&clear_values);

    cmd.begin_render_pass(&begin_info);
    cmd.bind_pipeline(vk::PipelineBindPoint::GRAPHICS, params.pipeline);
    cmd.set_viewport(&full_viewport(params.extent));
    cmd.set_scissor(&full_scissor(params.extent));
    cmd.bind_vertex_buffers(0, &[params.vertex_buffer], &[0]);
    cmd.bind_index_buffer(params.index_buffer, 0, vk::IndexType::UINT32);
    cmd.bind_descriptor_sets(
        vk::PipelineBindPoint::GRAPHICS,
        params.pipeline_layout,
        0,
        &[params.descriptor_set],
    );
    cmd.draw_indexed(params.index_count, 1, 0, 0, 0);
    cmd.end_render_pass();

    cmd.end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_values_order() {
        let clear = ClearValues {
            color: [0.1, 0.2, 0.3, 1.0],
            depth: 1.0,
        };
        let values = clear.to_vk();

        // SAFETY: the union members read are the ones written above.
        unsafe {
            assert_eq!(values[0].color.float32, [0.1, 0.2, 0.3, 1.0]);
            assert_eq!(values[1].depth_stencil.depth, 1.0);
            assert_eq!(values[1].depth_stencil.stencil, 0);
        }
    }

    #[test]
    fn test_default_clear_is_opaque_black() {
        assert_eq!(ClearValues::default().color, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(ClearValues::default().depth, 1.0);
    }

    #[test]
    fn test_viewport_and_scissor_cover_extent() {
        let extent = vk::Extent2D {
            width: 400,
            height: 300,
        };
        let viewport = full_viewport(extent);
        assert_eq!((viewport.width, viewport.height), (400.0, 300.0));
        assert_eq!((viewport.min_depth, viewport.max_depth), (0.0, 1.0));

        let scissor = full_scissor(extent);
        assert_eq!(scissor.offset, vk::Offset2D { x: 0, y: 0 });
        assert_eq!(scissor.extent, extent);
    }
}
