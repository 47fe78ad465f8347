//! Renderer orchestration.
//!
//! [`Renderer`] owns every GPU object of the viewer and implements
//! [`FrameBackend`] for the presentation loop:
//!
//! - resize-independent objects (instance, surface, device, command pool,
//!   frame slots, [`SceneResources`]) are created once in [`Renderer::new`]
//! - surface-dependent objects live in a [`DependencyGraph`] and are replaced
//!   wholesale by [`Renderer::rebuild`]
//! - [`Renderer::draw_frame`] runs one pass of the [`FrameRing`]

use std::sync::Arc;

use ash::vk;
use tracing::{error, info};

use viewer_core::ViewerConfig;
use viewer_platform::{Surface, Window};
use viewer_resources::ViewerAssets;
use viewer_rhi::RhiError;
use viewer_rhi::command::CommandPool;
use viewer_rhi::device::Device;
use viewer_rhi::instance::Instance;
use viewer_rhi::physical_device::select_physical_device;
use viewer_rhi::swapchain::{AcquireOutcome, SurfaceStatus};
use viewer_scene::SceneState;

use crate::error::{RenderError, RenderResult};
use crate::frame_ring::{
    FrameGpu, FrameOutcome, FrameRing, FrameSlot, FrameSlots, MAX_FRAMES_IN_FLIGHT,
};
use crate::loop_state::FrameBackend;
use crate::recording::{ClearValues, DrawParams, record_frame};
use crate::scene_resources::{SceneResources, ShaderPaths};
use crate::surface_targets::{SurfaceTargets, VulkanTargetFactory};
use crate::targets::{DependencyGraph, RebuildOutcome, TargetSummary};
use crate::ubo::FrameUniforms;

/// Owner of the viewer's GPU state.
///
/// Fields drop in declaration order: surface-dependent targets, scene
/// resources, frame slots, command pool, device, surface, instance.
pub struct Renderer {
    graph: DependencyGraph<SurfaceTargets>,
    ring: FrameRing,
    scene: SceneResources,
    slots: FrameSlots,
    command_pool: CommandPool,
    device: Arc<Device>,
    surface: Surface,
    instance: Instance,

    framebuffer_size: vk::Extent2D,
    clear: ClearValues,
    frame_timeout_ns: u64,
}

impl Renderer {
    /// Creates the device and every resize-independent resource, then runs
    /// the first rebuild.
    ///
    /// If the window has no area yet the first rebuild is deferred; check
    /// [`build_outcome`](Self::build_outcome).
    ///
    /// # Errors
    ///
    /// Returns an error if no suitable GPU exists, a shader or depth format is
    /// unavailable, or any GPU object cannot be created.
    pub fn new(
        window: &Window,
        config: &ViewerConfig,
        assets: &ViewerAssets,
    ) -> RenderResult<Self> {
        let (width, height) = window.framebuffer_size();
        info!("Initializing Vulkan renderer ({}x{})", width, height);

        let display_handle = window.raw_display_handle()?;
        let instance = Instance::new(config.render.validation, Some(display_handle))?;
        let surface = window.create_surface(instance.entry(), instance.handle())?;

        let gpu = select_physical_device(instance.handle(), surface.handle(), surface.loader())?;
        let device = Device::new(&instance, &gpu)?;

        let graphics_family = device
            .queue_families()
            .graphics_family
            .ok_or(RhiError::NoSuitableGpu)?;
        let command_pool = CommandPool::new(device.clone(), graphics_family)?;
        let slots = FrameSlots::new(device.clone())?;
        let scene = SceneResources::new(
            device.clone(),
            &command_pool,
            assets,
            ShaderPaths {
                vertex: &config.assets.vertex_shader,
                fragment: &config.assets.fragment_shader,
            },
        )?;

        let mut renderer = Self {
            graph: DependencyGraph::new(),
            ring: FrameRing::new(0),
            scene,
            slots,
            command_pool,
            device,
            surface,
            instance,
            framebuffer_size: vk::Extent2D { width, height },
            clear: ClearValues {
                color: config.render.clear_color,
                depth: config.render.clear_depth,
            },
            frame_timeout_ns: config.render.frame_timeout_ns,
        };
        renderer.rebuild()?;

        info!(
            "Renderer initialized: {} frames in flight, validation {}",
            MAX_FRAMES_IN_FLIGHT,
            renderer.instance.has_validation()
        );
        Ok(renderer)
    }

    /// Records the latest framebuffer size reported by the window. Takes
    /// effect at the next rebuild.
    pub fn set_framebuffer_size(&mut self, width: u32, height: u32) {
        self.framebuffer_size = vk::Extent2D { width, height };
    }

    /// Shape of the current swapchain, `None` while a rebuild is deferred.
    #[inline]
    pub fn summary(&self) -> Option<TargetSummary> {
        self.graph.summary()
    }

    /// Outcome equivalent to the current graph state, for seeding the
    /// presentation loop.
    pub fn build_outcome(&self) -> RebuildOutcome {
        self.summary()
            .map_or(RebuildOutcome::Deferred, RebuildOutcome::Rebuilt)
    }

    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Runs the rebuild protocol against the current surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be idled or any surface-dependent
    /// object cannot be created.
    pub fn rebuild(&mut self) -> RenderResult<RebuildOutcome> {
        let mut factory = VulkanTargetFactory {
            device: &self.device,
            surface: &self.surface,
            scene: &self.scene,
            command_pool: &self.command_pool,
            framebuffer_size: self.framebuffer_size,
        };
        let outcome = self.graph.rebuild(&mut factory)?;
        if let RebuildOutcome::Rebuilt(summary) = outcome {
            self.ring.reset_images(summary.image_count);
        }
        Ok(outcome)
    }

    /// Draws one frame of `scene`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::TargetsMissing`] if called while a rebuild is
    /// deferred, or any fatal GPU error.
    pub fn draw_frame(&mut self, scene: &SceneState) -> RenderResult<FrameOutcome> {
        let targets = self.graph.targets().ok_or(RenderError::TargetsMissing)?;
        let mut gpu = VulkanFrame {
            device: &self.device,
            slots: &self.slots,
            targets,
            scene: &self.scene,
            uniforms: FrameUniforms::from_scene(scene, targets.extent()),
            clear: self.clear,
            timeout_ns: self.frame_timeout_ns,
        };
        self.ring.run_frame(&mut gpu)
    }

    /// Blocks until the device has finished all submitted work.
    pub fn wait_idle(&self) -> RenderResult<()> {
        Ok(self.device.wait_idle()?)
    }
}

impl FrameBackend for Renderer {
    type Error = RenderError;

    fn draw_frame(&mut self, scene: &SceneState) -> RenderResult<FrameOutcome> {
        Renderer::draw_frame(self, scene)
    }

    fn rebuild(&mut self) -> RenderResult<RebuildOutcome> {
        Renderer::rebuild(self)
    }

    fn wait_idle(&mut self) -> RenderResult<()> {
        Renderer::wait_idle(self)
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            error!("Failed to wait for device idle during renderer drop: {}", e);
        }
        self.graph.teardown();
        info!("Renderer destroyed");
    }
}

/// Borrowed view of the renderer for one pass of the frame ring.
struct VulkanFrame<'a> {
    device: &'a Device,
    slots: &'a FrameSlots,
    targets: &'a SurfaceTargets,
    scene: &'a SceneResources,
    uniforms: FrameUniforms,
    clear: ClearValues,
    timeout_ns: u64,
}

impl VulkanFrame<'_> {
    fn slot(&self, slot: usize) -> RenderResult<&FrameSlot> {
        self.slots.get(slot).ok_or(RenderError::SlotIndex(slot))
    }

    fn image_error(&self, image: usize) -> RenderError {
        RenderError::ImageIndex {
            image,
            count: self.targets.swapchain().image_count(),
        }
    }
}

impl FrameGpu for VulkanFrame<'_> {
    type Error = RenderError;

    fn wait_for_slot(&mut self, slot: usize) -> RenderResult<()> {
        if self.slot(slot)?.in_flight().wait(self.timeout_ns)? {
            Ok(())
        } else {
            Err(RenderError::FrameTimeout {
                slot,
                timeout_ns: self.timeout_ns,
            })
        }
    }

    fn acquire_image(&mut self, slot: usize) -> RenderResult<AcquireOutcome> {
        let image_acquired = self.slot(slot)?.image_acquired().handle();
        Ok(self
            .targets
            .swapchain()
            .acquire_next_image(image_acquired, self.timeout_ns)?)
    }

    fn prepare_image(&mut self, image: usize) -> RenderResult<()> {
        let targets = self.targets;
        let uniforms = targets.uniforms(image).ok_or_else(|| self.image_error(image))?;
        uniforms.write(&self.uniforms)?;

        let (Some(cmd), Some(framebuffer), Some(descriptor_set)) = (
            targets.command_buffer(image),
            targets.framebuffer(image),
            targets.descriptor_set(image),
        ) else {
            return Err(self.image_error(image));
        };

        record_frame(
            cmd,
            &DrawParams {
                render_pass: targets.render_pass().handle(),
                framebuffer: framebuffer.handle(),
                extent: targets.extent(),
                pipeline: targets.pipeline().handle(),
                pipeline_layout: self.scene.pipeline_layout().handle(),
                vertex_buffer: self.scene.vertex_buffer().handle(),
                index_buffer: self.scene.index_buffer().handle(),
                index_count: self.scene.index_count(),
                descriptor_set,
                clear: self.clear,
            },
        )?;
        Ok(())
    }

    fn reset_slot(&mut self, slot: usize) -> RenderResult<()> {
        Ok(self.slot(slot)?.in_flight().reset()?)
    }

    fn submit(&mut self, slot: usize, image: usize) -> RenderResult<()> {
        let frame = self.slot(slot)?;
        let cmd = self
            .targets
            .command_buffer(image)
            .ok_or_else(|| self.image_error(image))?;

        let wait_semaphores = [frame.image_acquired().handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [cmd.handle()];
        let signal_semaphores = [frame.render_finished().handle()];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        // SAFETY: every handle belongs to `device`; the command buffer was
        // recorded this frame and the fence was reset just before this call.
        unsafe {
            self.device
                .handle()
                .queue_submit(
                    self.device.graphics_queue(),
                    &[submit_info],
                    frame.in_flight().handle(),
                )
                .map_err(RhiError::from)?;
        }
        Ok(())
    }

    fn present(&mut self, slot: usize, image: usize) -> RenderResult<SurfaceStatus> {
        let render_finished = self.slot(slot)?.render_finished().handle();
        Ok(self.targets.swapchain().present(
            self.device.present_queue(),
            image as u32,
            render_finished,
        )?)
    }
}
