//! Vulkan objects that depend on the surface configuration, and the factory
//! that builds them for [`DependencyGraph`](crate::targets::DependencyGraph).

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use viewer_platform::Surface;
use viewer_rhi::{RhiError, RhiResult};
use viewer_rhi::buffer::{Buffer, BufferSpec};
use viewer_rhi::command::{CommandBuffer, CommandPool};
use viewer_rhi::descriptor::DescriptorPool;
use viewer_rhi::device::Device;
use viewer_rhi::image::{Image, ImageSpec};
use viewer_rhi::pipeline::{
    ColorBlendAttachment, CullMode, FrontFace, GraphicsPipelineBuilder, Pipeline,
};
use viewer_rhi::render_pass::{Framebuffer, RenderPass};
use viewer_rhi::swapchain::{Swapchain, choose_extent};
use viewer_rhi::vertex::Vertex;

use crate::descriptors::ImageBindings;
use crate::error::RenderError;
use crate::scene_resources::SceneResources;
use crate::targets::{ExtentSource, SurfaceDependent, TargetFactory, TargetSummary};
use crate::ubo::{CameraUbo, FrameUniforms, LightUbo, MvpUbo};

/// Host-visible uniform buffers for one swapchain image.
pub struct ImageUniforms {
    mvp: Buffer,
    light: Buffer,
    camera: Buffer,
}

impl ImageUniforms {
    fn new(device: &Arc<Device>) -> RhiResult<Self> {
        Ok(Self {
            mvp: Buffer::new(device.clone(), &BufferSpec::uniform(MvpUbo::SIZE as u64))?,
            light: Buffer::new(device.clone(), &BufferSpec::uniform(LightUbo::SIZE as u64))?,
            camera: Buffer::new(device.clone(), &BufferSpec::uniform(CameraUbo::SIZE as u64))?,
        })
    }

    /// Copies this frame's uniform values into the mapped buffers.
    pub fn write(&self, uniforms: &FrameUniforms) -> RhiResult<()> {
        self.mvp.write_pod(&uniforms.mvp)?;
        self.light.write_pod(&uniforms.light)?;
        self.camera.write_pod(&uniforms.camera)
    }
}

/// Everything rebuilt when the surface changes.
///
/// Fields drop in declaration order, which is reverse dependency order.
/// Underscored fields are only held so they outlive their dependents.
pub struct SurfaceTargets {
    framebuffers: Vec<Framebuffer>,
    command_buffers: Vec<CommandBuffer>,
    _color: Image,
    _depth: Image,
    render_pass: RenderPass,
    pipeline: Pipeline,
    swapchain: Swapchain,
    uniforms: Vec<ImageUniforms>,
    descriptor_sets: Vec<vk::DescriptorSet>,
    _descriptor_pool: DescriptorPool,
}

impl SurfaceTargets {
    #[inline]
    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    #[inline]
    pub fn render_pass(&self) -> &RenderPass {
        &self.render_pass
    }

    #[inline]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    #[inline]
    pub fn framebuffer(&self, image: usize) -> Option<&Framebuffer> {
        self.framebuffers.get(image)
    }

    #[inline]
    pub fn command_buffer(&self, image: usize) -> Option<&CommandBuffer> {
        self.command_buffers.get(image)
    }

    #[inline]
    pub fn uniforms(&self, image: usize) -> Option<&ImageUniforms> {
        self.uniforms.get(image)
    }

    #[inline]
    pub fn descriptor_set(&self, image: usize) -> Option<vk::DescriptorSet> {
        self.descriptor_sets.get(image).copied()
    }
}

impl SurfaceDependent for SurfaceTargets {
    fn summary(&self) -> TargetSummary {
        TargetSummary {
            image_count: self.swapchain.image_count(),
            extent: self.swapchain.extent(),
            format: self.swapchain.format(),
        }
    }
}

/// Builds [`SurfaceTargets`] from the live surface and the resize-independent
/// resources.
pub struct VulkanTargetFactory<'a> {
    pub device: &'a Arc<Device>,
    pub surface: &'a Surface,
    pub scene: &'a SceneResources,
    pub command_pool: &'a CommandPool,
    /// Last framebuffer size reported by the window.
    pub framebuffer_size: vk::Extent2D,
}

impl ExtentSource for VulkanTargetFactory<'_> {
    type Error = RenderError;

    fn current_extent(&mut self) -> Result<vk::Extent2D, RenderError> {
        let size = self.framebuffer_size;
        if size.width == 0 || size.height == 0 {
            return Ok(size);
        }

        let capabilities = unsafe {
            self.surface
                .loader()
                .get_physical_device_surface_capabilities(
                    self.device.physical_device(),
                    self.surface.handle(),
                )
                .map_err(RhiError::from)?
        };
        Ok(choose_extent(&capabilities, size))
    }
}

impl TargetFactory for VulkanTargetFactory<'_> {
    type Targets = SurfaceTargets;

    fn wait_idle(&mut self) -> Result<(), RenderError> {
        Ok(self.device.wait_idle()?)
    }

    fn create_targets(&mut self, extent: vk::Extent2D) -> Result<SurfaceTargets, RenderError> {
        let device = self.device;
        let scene = self.scene;

        let swapchain = Swapchain::new(
            device.clone(),
            self.surface.handle(),
            self.surface.loader(),
            extent,
        )?;
        let extent = swapchain.extent();
        let format = swapchain.format();
        let samples = device.msaa_samples();
        let image_count = swapchain.image_count();

        let color = Image::new(
            device.clone(),
            &ImageSpec::color_target(extent, format, samples),
        )?;
        let depth = Image::new(
            device.clone(),
            &ImageSpec::depth_target(extent, scene.depth_format(), samples),
        )?;

        let render_pass = RenderPass::new(device.clone(), format, scene.depth_format(), samples)?;

        let pipeline = GraphicsPipelineBuilder::new()
            .vertex_shader(scene.vertex_shader())
            .fragment_shader(scene.fragment_shader())
            .vertex_binding(Vertex::binding_description())
            .vertex_attributes(&Vertex::attribute_descriptions())
            .cull_mode(CullMode::Back)
            .front_face(FrontFace::CounterClockwise)
            .rasterization_samples(samples)
            .sample_shading(1.0)
            .depth_test(true, true, vk::CompareOp::LESS)
            .color_blend_attachment(ColorBlendAttachment::alpha_blend())
            .build(device.clone(), scene.pipeline_layout(), &render_pass)?;

        let framebuffers = swapchain
            .image_views()
            .iter()
            .map(|&view| {
                Framebuffer::new(
                    device.clone(),
                    &render_pass,
                    color.view(),
                    depth.view(),
                    view,
                    extent,
                )
            })
            .collect::<RhiResult<Vec<_>>>()?;

        let uniforms = (0..image_count)
            .map(|_| ImageUniforms::new(device))
            .collect::<RhiResult<Vec<_>>>()?;

        let descriptor_pool = DescriptorPool::for_layout(
            device.clone(),
            scene.descriptor_layout(),
            image_count as u32,
        )?;
        let descriptor_sets = descriptor_pool.allocate(scene.descriptor_layout(), image_count)?;
        for (set, image_uniforms) in descriptor_sets.iter().zip(&uniforms) {
            ImageBindings {
                mvp: image_uniforms.mvp.handle(),
                light: image_uniforms.light.handle(),
                camera: image_uniforms.camera.handle(),
                diffuse: scene.diffuse(),
                specular: scene.specular(),
            }
            .writes(*set)
            .submit(device);
        }

        let command_buffers = self.command_pool.allocate_command_buffers(image_count as u32)?;

        debug!(
            "Created {} framebuffers, uniform sets and command buffers",
            image_count
        );

        Ok(SurfaceTargets {
            framebuffers,
            command_buffers,
            _color: color,
            _depth: depth,
            render_pass,
            pipeline,
            swapchain,
            uniforms,
            descriptor_sets,
            _descriptor_pool: descriptor_pool,
        })
    }
}
