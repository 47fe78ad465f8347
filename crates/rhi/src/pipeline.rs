//! Graphics pipeline creation.
//!
//! - [`PipelineLayout`] wraps `VkPipelineLayout` built from descriptor set
//!   layouts.
//! - [`Pipeline`] owns a `VkPipeline`.
//! - [`GraphicsPipelineBuilder`] assembles fixed-function state for a
//!   pipeline that renders into subpass 0 of a [`RenderPass`].
//!
//! Viewport and scissor are always dynamic, so a pipeline only depends on
//! the render pass and sample count, never on the surface extent.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use ash::vk;
//! use viewer_rhi::device::Device;
//! use viewer_rhi::pipeline::{ColorBlendAttachment, GraphicsPipelineBuilder, PipelineLayout};
//! use viewer_rhi::render_pass::RenderPass;
//! use viewer_rhi::shader::{Shader, ShaderStage};
//! use viewer_rhi::vertex::Vertex;
//!
//! # fn example(device: Arc<Device>, render_pass: &RenderPass, set_layout: vk::DescriptorSetLayout) -> Result<(), viewer_rhi::RhiError> {
//! let vert = Shader::from_spirv_file(device.clone(), Path::new("shaders/vert.spv"), ShaderStage::Vertex)?;
//! let frag = Shader::from_spirv_file(device.clone(), Path::new("shaders/frag.spv"), ShaderStage::Fragment)?;
//! let layout = PipelineLayout::new(device.clone(), &[set_layout])?;
//!
//! let pipeline = GraphicsPipelineBuilder::new()
//!     .vertex_shader(&vert)
//!     .fragment_shader(&frag)
//!     .vertex_binding(Vertex::binding_description())
//!     .vertex_attributes(&Vertex::attribute_descriptions())
//!     .rasterization_samples(render_pass.samples())
//!     .sample_shading(1.0)
//!     .color_blend_attachment(ColorBlendAttachment::alpha_blend())
//!     .build(device, &layout, render_pass)?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::render_pass::RenderPass;
use crate::shader::Shader;

/// Vulkan pipeline layout wrapper.
pub struct PipelineLayout {
    device: Arc<Device>,
    layout: vk::PipelineLayout,
}

impl PipelineLayout {
    /// Creates a layout over the given descriptor set layouts.
    ///
    /// # Errors
    ///
    /// Returns an error if layout creation fails.
    pub fn new(
        device: Arc<Device>,
        descriptor_set_layouts: &[vk::DescriptorSetLayout],
    ) -> RhiResult<Self> {
        let create_info =
            vk::PipelineLayoutCreateInfo::default().set_layouts(descriptor_set_layouts);

        let layout = unsafe { device.handle().create_pipeline_layout(&create_info, None)? };

        debug!(
            "Created pipeline layout with {} descriptor set layout(s)",
            descriptor_set_layouts.len()
        );

        Ok(Self { device, layout })
    }

    #[inline]
    pub fn handle(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for PipelineLayout {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_pipeline_layout(self.layout, None);
        }
        debug!("Pipeline layout destroyed");
    }
}

/// Graphics pipeline.
pub struct Pipeline {
    device: Arc<Device>,
    pipeline: vk::Pipeline,
}

impl Pipeline {
    fn create_graphics(
        device: Arc<Device>,
        create_info: &vk::GraphicsPipelineCreateInfo<'_>,
    ) -> RhiResult<Self> {
        let pipelines = unsafe {
            device
                .handle()
                .create_graphics_pipelines(vk::PipelineCache::null(), &[*create_info], None)
                .map_err(|(_, result)| result)?
        };

        let pipeline = pipelines
            .into_iter()
            .next()
            .ok_or_else(|| RhiError::Pipeline("Driver returned no pipeline".to_string()))?;

        info!("Graphics pipeline created");

        Ok(Self { device, pipeline })
    }

    #[inline]
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    #[inline]
    pub fn bind_point(&self) -> vk::PipelineBindPoint {
        vk::PipelineBindPoint::GRAPHICS
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_pipeline(self.pipeline, None);
        }
        info!("Graphics pipeline destroyed");
    }
}

/// Face culling mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    #[default]
    Back,
}

impl CullMode {
    pub fn to_vk(self) -> vk::CullModeFlags {
        match self {
            CullMode::None => vk::CullModeFlags::NONE,
            CullMode::Front => vk::CullModeFlags::FRONT,
            CullMode::Back => vk::CullModeFlags::BACK,
        }
    }
}

/// Front face winding order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrontFace {
    #[default]
    CounterClockwise,
    Clockwise,
}

impl FrontFace {
    pub fn to_vk(self) -> vk::FrontFace {
        match self {
            FrontFace::CounterClockwise => vk::FrontFace::COUNTER_CLOCKWISE,
            FrontFace::Clockwise => vk::FrontFace::CLOCKWISE,
        }
    }
}

/// Color blend state for the single color attachment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorBlendAttachment {
    pub blend_enable: bool,
    pub src_color_blend_factor: vk::BlendFactor,
    pub dst_color_blend_factor: vk::BlendFactor,
    pub src_alpha_blend_factor: vk::BlendFactor,
    pub dst_alpha_blend_factor: vk::BlendFactor,
}

impl Default for ColorBlendAttachment {
    fn default() -> Self {
        Self {
            blend_enable: false,
            src_color_blend_factor: vk::BlendFactor::ONE,
            dst_color_blend_factor: vk::BlendFactor::ZERO,
            src_alpha_blend_factor: vk::BlendFactor::ONE,
            dst_alpha_blend_factor: vk::BlendFactor::ZERO,
        }
    }
}

impl ColorBlendAttachment {
    /// `src * src_alpha + dst * (1 - src_alpha)`; alpha is passed through.
    pub fn alpha_blend() -> Self {
        Self {
            blend_enable: true,
            src_color_blend_factor: vk::BlendFactor::SRC_ALPHA,
            dst_color_blend_factor: vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
            src_alpha_blend_factor: vk::BlendFactor::ONE,
            dst_alpha_blend_factor: vk::BlendFactor::ZERO,
        }
    }

    pub fn to_vk(&self) -> vk::PipelineColorBlendAttachmentState {
        vk::PipelineColorBlendAttachmentState {
            blend_enable: self.blend_enable.into(),
            src_color_blend_factor: self.src_color_blend_factor,
            dst_color_blend_factor: self.dst_color_blend_factor,
            color_blend_op: vk::BlendOp::ADD,
            src_alpha_blend_factor: self.src_alpha_blend_factor,
            dst_alpha_blend_factor: self.dst_alpha_blend_factor,
            alpha_blend_op: vk::BlendOp::ADD,
            color_write_mask: vk::ColorComponentFlags::RGBA,
        }
    }
}

/// Builder for render-pass-based graphics pipelines.
///
/// Defaults:
///
/// - Triangle list, filled polygons
/// - Back-face culling with counter-clockwise front faces
/// - Depth test and write enabled, compare op `LESS`
/// - 1 sample, sample shading off
/// - Blending off
/// - Dynamic viewport and scissor
pub struct GraphicsPipelineBuilder<'a> {
    vertex_shader: Option<&'a Shader>,
    fragment_shader: Option<&'a Shader>,

    vertex_bindings: Vec<vk::VertexInputBindingDescription>,
    vertex_attributes: Vec<vk::VertexInputAttributeDescription>,

    cull_mode: CullMode,
    front_face: FrontFace,

    rasterization_samples: vk::SampleCountFlags,
    sample_shading_enable: bool,
    min_sample_shading: f32,

    depth_test_enable: bool,
    depth_write_enable: bool,
    depth_compare_op: vk::CompareOp,

    color_blend: ColorBlendAttachment,
}

impl Default for GraphicsPipelineBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> GraphicsPipelineBuilder<'a> {
    pub fn new() -> Self {
        Self {
            vertex_shader: None,
            fragment_shader: None,
            vertex_bindings: Vec::new(),
            vertex_attributes: Vec::new(),
            cull_mode: CullMode::Back,
            front_face: FrontFace::CounterClockwise,
            rasterization_samples: vk::SampleCountFlags::TYPE_1,
            sample_shading_enable: false,
            min_sample_shading: 1.0,
            depth_test_enable: true,
            depth_write_enable: true,
            depth_compare_op: vk::CompareOp::LESS,
            color_blend: ColorBlendAttachment::default(),
        }
    }

    pub fn vertex_shader(mut self, shader: &'a Shader) -> Self {
        self.vertex_shader = Some(shader);
        self
    }

    pub fn fragment_shader(mut self, shader: &'a Shader) -> Self {
        self.fragment_shader = Some(shader);
        self
    }

    pub fn vertex_binding(mut self, binding: vk::VertexInputBindingDescription) -> Self {
        self.vertex_bindings.push(binding);
        self
    }

    pub fn vertex_attributes(mut self, attributes: &[vk::VertexInputAttributeDescription]) -> Self {
        self.vertex_attributes.extend_from_slice(attributes);
        self
    }

    pub fn cull_mode(mut self, mode: CullMode) -> Self {
        self.cull_mode = mode;
        self
    }

    pub fn front_face(mut self, face: FrontFace) -> Self {
        self.front_face = face;
        self
    }

    /// Sample count; must match the render pass color attachment.
    pub fn rasterization_samples(mut self, samples: vk::SampleCountFlags) -> Self {
        self.rasterization_samples = samples;
        self
    }

    /// Enables per-sample shading with the given minimum fraction.
    pub fn sample_shading(mut self, min_sample_shading: f32) -> Self {
        self.sample_shading_enable = true;
        self.min_sample_shading = min_sample_shading;
        self
    }

    pub fn depth_test(mut self, test: bool, write: bool, op: vk::CompareOp) -> Self {
        self.depth_test_enable = test;
        self.depth_write_enable = write;
        self.depth_compare_op = op;
        self
    }

    pub fn color_blend_attachment(mut self, attachment: ColorBlendAttachment) -> Self {
        self.color_blend = attachment;
        self
    }

    fn validate(&self) -> RhiResult<(&'a Shader, &'a Shader)> {
        let vertex = self
            .vertex_shader
            .ok_or_else(|| RhiError::Pipeline("Vertex shader is required".to_string()))?;
        let fragment = self
            .fragment_shader
            .ok_or_else(|| RhiError::Pipeline("Fragment shader is required".to_string()))?;
        if !(0.0..=1.0).contains(&self.min_sample_shading) {
            return Err(RhiError::Pipeline(format!(
                "min_sample_shading {} outside [0, 1]",
                self.min_sample_shading
            )));
        }
        Ok((vertex, fragment))
    }

    /// Builds the pipeline against subpass 0 of `render_pass`.
    ///
    /// # Errors
    ///
    /// Returns an error if a shader stage is missing, the sample count does
    /// not match the render pass, or pipeline creation fails.
    pub fn build(
        self,
        device: Arc<Device>,
        layout: &PipelineLayout,
        render_pass: &RenderPass,
    ) -> RhiResult<Pipeline> {
        let (vertex_shader, fragment_shader) = self.validate()?;

        if self.rasterization_samples != render_pass.samples() {
            return Err(RhiError::Pipeline(format!(
                "Pipeline samples {:?} do not match render pass samples {:?}",
                self.rasterization_samples,
                render_pass.samples()
            )));
        }

        let shader_stages = [
            vertex_shader.stage_create_info(),
            fragment_shader.stage_create_info(),
        ];

        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&self.vertex_bindings)
            .vertex_attribute_descriptions(&self.vertex_attributes);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(self.cull_mode.to_vk())
            .front_face(self.front_face.to_vk())
            .depth_bias_enable(false);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(self.sample_shading_enable)
            .rasterization_samples(self.rasterization_samples)
            .min_sample_shading(self.min_sample_shading);

        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(self.depth_test_enable)
            .depth_write_enable(self.depth_write_enable)
            .depth_compare_op(self.depth_compare_op)
            .depth_bounds_test_enable(false)
            .min_depth_bounds(0.0)
            .max_depth_bounds(1.0)
            .stencil_test_enable(false);

        let color_blend_attachments = [self.color_blend.to_vk()];
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .depth_stencil_state(&depth_stencil_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(layout.handle())
            .render_pass(render_pass.handle())
            .subpass(0);

        Pipeline::create_graphics(device, &pipeline_info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cull_mode_to_vk() {
        assert_eq!(CullMode::Back.to_vk(), vk::CullModeFlags::BACK);
        assert_eq!(CullMode::None.to_vk(), vk::CullModeFlags::NONE);
        assert_eq!(CullMode::default(), CullMode::Back);
    }

    #[test]
    fn test_front_face_default_is_ccw() {
        assert_eq!(
            FrontFace::default().to_vk(),
            vk::FrontFace::COUNTER_CLOCKWISE
        );
    }

    #[test]
    fn test_alpha_blend_state() {
        let state = ColorBlendAttachment::alpha_blend().to_vk();
        assert_eq!(state.blend_enable, vk::TRUE);
        assert_eq!(state.src_color_blend_factor, vk::BlendFactor::SRC_ALPHA);
        assert_eq!(
            state.dst_color_blend_factor,
            vk::BlendFactor::ONE_MINUS_SRC_ALPHA
        );
        assert_eq!(state.src_alpha_blend_factor, vk::BlendFactor::ONE);
        assert_eq!(state.dst_alpha_blend_factor, vk::BlendFactor::ZERO);
        assert_eq!(state.color_write_mask, vk::ColorComponentFlags::RGBA);
    }

    #[test]
    fn test_default_blend_is_disabled() {
        assert_eq!(ColorBlendAttachment::default().to_vk().blend_enable, vk::FALSE);
    }

    #[test]
    fn test_builder_defaults() {
        let builder = GraphicsPipelineBuilder::new();
        assert_eq!(builder.cull_mode, CullMode::Back);
        assert_eq!(builder.front_face, FrontFace::CounterClockwise);
        assert_eq!(builder.depth_compare_op, vk::CompareOp::LESS);
        assert!(builder.depth_test_enable && builder.depth_write_enable);
        assert!(!builder.sample_shading_enable);
        assert_eq!(builder.rasterization_samples, vk::SampleCountFlags::TYPE_1);
    }

    #[test]
    fn test_builder_requires_shaders() {
        let err = GraphicsPipelineBuilder::new().validate();
        assert!(matches!(err, Err(RhiError::Pipeline(_))));
    }

    #[test]
    fn test_sample_shading_sets_fraction() {
        let builder = GraphicsPipelineBuilder::new()
            .rasterization_samples(vk::SampleCountFlags::TYPE_4)
            .sample_shading(1.0);
        assert!(builder.sample_shading_enable);
        assert_eq!(builder.min_sample_shading, 1.0);
        assert_eq!(builder.rasterization_samples, vk::SampleCountFlags::TYPE_4);
    }
}
