//! Command pools and command buffers.
//!
//! - [`CommandPool`] owns a `VkCommandPool` for one queue family.
//! - [`CommandBuffer`] owns one primary buffer allocated from a pool and
//!   frees it on drop. The pool must outlive every buffer allocated from it.
//! - [`CommandPool::submit_one_time`] records, submits and waits for a
//!   short upload or layout-transition batch.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use viewer_rhi::command::CommandPool;
//! use viewer_rhi::device::Device;
//!
//! # fn example(device: Arc<Device>, graphics_family: u32) -> Result<(), viewer_rhi::RhiError> {
//! let pool = CommandPool::new(device.clone(), graphics_family)?;
//!
//! let cmd = pool.allocate_command_buffer()?;
//! cmd.begin()?;
//! // ... record ...
//! cmd.end()?;
//!
//! pool.submit_one_time(device.graphics_queue(), |cmd| {
//!     // ... copy commands ...
//! #   let _ = cmd;
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::sync::Fence;

/// Command pool for a single queue family.
///
/// Created with `RESET_COMMAND_BUFFER` so each frame's buffer can be reset
/// individually before it is re-recorded.
pub struct CommandPool {
    device: Arc<Device>,
    pool: vk::CommandPool,
    queue_family_index: u32,
}

impl CommandPool {
    /// Creates a resettable command pool for `queue_family_index`.
    ///
    /// # Errors
    ///
    /// Returns an error if command pool creation fails.
    pub fn new(device: Arc<Device>, queue_family_index: u32) -> RhiResult<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family_index)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        let pool = unsafe { device.handle().create_command_pool(&create_info, None)? };

        info!(
            "Command pool created for queue family {}",
            queue_family_index
        );

        Ok(Self {
            device,
            pool,
            queue_family_index,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    /// Allocates one primary command buffer.
    pub fn allocate_command_buffer(&self) -> RhiResult<CommandBuffer> {
        let mut buffers = self.allocate_command_buffers(1)?;
        buffers
            .pop()
            .ok_or(RhiError::Vulkan(vk::Result::ERROR_OUT_OF_HOST_MEMORY))
    }

    /// Allocates `count` primary command buffers.
    pub fn allocate_command_buffers(&self, count: u32) -> RhiResult<Vec<CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        let buffers = unsafe { self.device.handle().allocate_command_buffers(&alloc_info)? };
        debug!("Allocated {} command buffer(s)", buffers.len());

        Ok(buffers
            .into_iter()
            .map(|buffer| CommandBuffer {
                device: self.device.clone(),
                pool: self.pool,
                buffer,
            })
            .collect())
    }

    /// Records `record` into a temporary buffer, submits it to `queue` and
    /// blocks until the GPU has executed it.
    ///
    /// # Errors
    ///
    /// Returns the first error from recording, submission or the wait.
    pub fn submit_one_time<F>(&self, queue: vk::Queue, record: F) -> RhiResult<()>
    where
        F: FnOnce(&CommandBuffer) -> RhiResult<()>,
    {
        let cmd = self.allocate_command_buffer()?;
        cmd.begin()?;
        record(&cmd)?;
        cmd.end()?;

        let fence = Fence::new(self.device.clone(), false)?;
        let command_buffers = [cmd.handle()];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

        unsafe {
            self.device
                .handle()
                .queue_submit(queue, &[submit_info], fence.handle())?;
        }
        fence.wait(u64::MAX)?;

        Ok(())
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_command_pool(self.pool, None);
        }
        info!(
            "Command pool destroyed for queue family {}",
            self.queue_family_index
        );
    }
}

/// Primary command buffer allocated from a [`CommandPool`].
///
/// Freed back to its pool on drop; it must not be pending execution then.
pub struct CommandBuffer {
    device: Arc<Device>,
    pool: vk::CommandPool,
    buffer: vk::CommandBuffer,
}

impl CommandBuffer {
    #[inline]
    pub fn handle(&self) -> vk::CommandBuffer {
        self.buffer
    }

    // =========================================================================
    // Recording Control
    // =========================================================================

    /// Begins a one-time-submit recording.
    pub fn begin(&self) -> RhiResult<()> {
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            self.device
                .handle()
                .begin_command_buffer(self.buffer, &begin_info)?;
        }

        Ok(())
    }

    pub fn end(&self) -> RhiResult<()> {
        unsafe {
            self.device.handle().end_command_buffer(self.buffer)?;
        }

        Ok(())
    }

    /// Returns the buffer to the initial state so it can be re-recorded.
    pub fn reset(&self) -> RhiResult<()> {
        unsafe {
            self.device
                .handle()
                .reset_command_buffer(self.buffer, vk::CommandBufferResetFlags::empty())?;
        }

        Ok(())
    }

    // =========================================================================
    // Render Pass
    // =========================================================================

    pub fn begin_render_pass(&self, begin_info: &vk::RenderPassBeginInfo) {
        unsafe {
            self.device.handle().cmd_begin_render_pass(
                self.buffer,
                begin_info,
                vk::SubpassContents::INLINE,
            );
        }
    }

    pub fn end_render_pass(&self) {
        unsafe {
            self.device.handle().cmd_end_render_pass(self.buffer);
        }
    }

    // =========================================================================
    // Binding
    // =========================================================================

    pub fn bind_pipeline(&self, bind_point: vk::PipelineBindPoint, pipeline: vk::Pipeline) {
        unsafe {
            self.device
                .handle()
                .cmd_bind_pipeline(self.buffer, bind_point, pipeline);
        }
    }

    pub fn bind_vertex_buffers(
        &self,
        first_binding: u32,
        buffers: &[vk::Buffer],
        offsets: &[vk::DeviceSize],
    ) {
        unsafe {
            self.device.handle().cmd_bind_vertex_buffers(
                self.buffer,
                first_binding,
                buffers,
                offsets,
            );
        }
    }

    pub fn bind_index_buffer(
        &self,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        index_type: vk::IndexType,
    ) {
        unsafe {
            self.device
                .handle()
                .cmd_bind_index_buffer(self.buffer, buffer, offset, index_type);
        }
    }

    pub fn bind_descriptor_sets(
        &self,
        bind_point: vk::PipelineBindPoint,
        layout: vk::PipelineLayout,
        first_set: u32,
        descriptor_sets: &[vk::DescriptorSet],
    ) {
        unsafe {
            self.device.handle().cmd_bind_descriptor_sets(
                self.buffer,
                bind_point,
                layout,
                first_set,
                descriptor_sets,
                &[],
            );
        }
    }

    // =========================================================================
    // Dynamic State
    // =========================================================================

    pub fn set_viewport(&self, viewport: &vk::Viewport) {
        unsafe {
            self.device
                .handle()
                .cmd_set_viewport(self.buffer, 0, std::slice::from_ref(viewport));
        }
    }

    pub fn set_scissor(&self, scissor: &vk::Rect2D) {
        unsafe {
            self.device
                .handle()
                .cmd_set_scissor(self.buffer, 0, std::slice::from_ref(scissor));
        }
    }

    // =========================================================================
    // Draw
    // =========================================================================

    pub fn draw_indexed(
        &self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.handle().cmd_draw_indexed(
                self.buffer,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
    }

    // =========================================================================
    // Barriers and Transfers
    // =========================================================================

    pub fn pipeline_barrier(
        &self,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        image_barriers: &[vk::ImageMemoryBarrier],
    ) {
        unsafe {
            self.device.handle().cmd_pipeline_barrier(
                self.buffer,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                image_barriers,
            );
        }
    }

    pub fn copy_buffer(&self, src: vk::Buffer, dst: vk::Buffer, regions: &[vk::BufferCopy]) {
        unsafe {
            self.device
                .handle()
                .cmd_copy_buffer(self.buffer, src, dst, regions);
        }
    }

    pub fn copy_buffer_to_image(
        &self,
        src: vk::Buffer,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
        regions: &[vk::BufferImageCopy],
    ) {
        unsafe {
            self.device.handle().cmd_copy_buffer_to_image(
                self.buffer,
                src,
                dst,
                dst_layout,
                regions,
            );
        }
    }

    pub fn blit_image(
        &self,
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
        regions: &[vk::ImageBlit],
        filter: vk::Filter,
    ) {
        unsafe {
            self.device.handle().cmd_blit_image(
                self.buffer,
                src,
                src_layout,
                dst,
                dst_layout,
                regions,
                filter,
            );
        }
    }
}

impl Drop for CommandBuffer {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .free_command_buffers(self.pool, &[self.buffer]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_types_are_send() {
        fn assert_send<T: Send>() {}
        assert_send::<CommandPool>();
        assert_send::<CommandBuffer>();
    }
}
