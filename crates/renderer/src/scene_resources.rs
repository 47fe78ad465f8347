//! Resize-independent GPU resources.
//!
//! Created once at startup and left untouched by every rebuild: geometry,
//! textures and their samplers, shader modules, the descriptor set layout and
//! the pipeline layout.

use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::info;

use viewer_resources::ViewerAssets;
use viewer_rhi::RhiResult;
use viewer_rhi::buffer::{Buffer, BufferSpec};
use viewer_rhi::command::CommandPool;
use viewer_rhi::descriptor::DescriptorSetLayout;
use viewer_rhi::device::Device;
use viewer_rhi::physical_device::find_depth_format;
use viewer_rhi::pipeline::PipelineLayout;
use viewer_rhi::sampler::Sampler;
use viewer_rhi::shader::{Shader, ShaderStage};
use viewer_rhi::texture::{MipLevels, Texture};

use crate::descriptors::{self, SampledImage};

/// Paths of the compiled shader stages.
#[derive(Debug, Clone, Copy)]
pub struct ShaderPaths<'a> {
    pub vertex: &'a Path,
    pub fragment: &'a Path,
}

pub struct SceneResources {
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    index_count: u32,
    diffuse: Texture,
    diffuse_sampler: Sampler,
    specular: Texture,
    specular_sampler: Sampler,
    vertex_shader: Shader,
    fragment_shader: Shader,
    pipeline_layout: PipelineLayout,
    descriptor_layout: DescriptorSetLayout,
    depth_format: vk::Format,
}

impl SceneResources {
    /// Uploads `assets` and loads the shaders. Blocks until every upload has
    /// completed on the graphics queue.
    ///
    /// # Errors
    ///
    /// Returns an error if a shader cannot be read, no depth format is
    /// supported, or any allocation or upload fails.
    pub fn new(
        device: Arc<Device>,
        pool: &CommandPool,
        assets: &ViewerAssets,
        shaders: ShaderPaths<'_>,
    ) -> RhiResult<Self> {
        let queue = device.graphics_queue();
        let mesh = &assets.mesh;

        let vertex_buffer = Buffer::new_device_local(
            device.clone(),
            pool,
            queue,
            &BufferSpec::vertex(0),
            bytemuck::cast_slice(&mesh.vertices),
        )?;
        let index_buffer = Buffer::new_device_local(
            device.clone(),
            pool,
            queue,
            &BufferSpec::index(0),
            bytemuck::cast_slice(&mesh.indices),
        )?;

        let diffuse = Texture::from_rgba8(
            device.clone(),
            pool,
            queue,
            assets.diffuse.as_texture_pixels("diffuse"),
            MipLevels::Full,
        )?;
        let diffuse_sampler = Sampler::new(device.clone(), diffuse.mip_levels())?;
        let specular = Texture::from_rgba8(
            device.clone(),
            pool,
            queue,
            assets.specular.as_texture_pixels("specular"),
            MipLevels::Single,
        )?;
        let specular_sampler = Sampler::new(device.clone(), specular.mip_levels())?;

        let vertex_shader =
            Shader::from_spirv_file(device.clone(), shaders.vertex, ShaderStage::Vertex)?;
        let fragment_shader =
            Shader::from_spirv_file(device.clone(), shaders.fragment, ShaderStage::Fragment)?;

        let descriptor_layout =
            DescriptorSetLayout::new(device.clone(), &descriptors::layout_bindings())?;
        let pipeline_layout = PipelineLayout::new(device.clone(), &[descriptor_layout.handle()])?;

        let depth_format = find_depth_format(device.instance(), device.physical_device())?;

        info!(
            "Scene resources ready: {} vertices, {} indices, diffuse {} mips, depth {:?}",
            mesh.vertices.len(),
            mesh.indices.len(),
            diffuse.mip_levels(),
            depth_format
        );

        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count(),
            diffuse,
            diffuse_sampler,
            specular,
            specular_sampler,
            vertex_shader,
            fragment_shader,
            pipeline_layout,
            descriptor_layout,
            depth_format,
        })
    }

    #[inline]
    pub fn vertex_buffer(&self) -> &Buffer {
        &self.vertex_buffer
    }

    #[inline]
    pub fn index_buffer(&self) -> &Buffer {
        &self.index_buffer
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn diffuse(&self) -> SampledImage {
        SampledImage {
            view: self.diffuse.view(),
            sampler: self.diffuse_sampler.handle(),
        }
    }

    pub fn specular(&self) -> SampledImage {
        SampledImage {
            view: self.specular.view(),
            sampler: self.specular_sampler.handle(),
        }
    }

    #[inline]
    pub fn vertex_shader(&self) -> &Shader {
        &self.vertex_shader
    }

    #[inline]
    pub fn fragment_shader(&self) -> &Shader {
        &self.fragment_shader
    }

    #[inline]
    pub fn pipeline_layout(&self) -> &PipelineLayout {
        &self.pipeline_layout
    }

    #[inline]
    pub fn descriptor_layout(&self) -> &DescriptorSetLayout {
        &self.descriptor_layout
    }

    #[inline]
    pub fn depth_format(&self) -> vk::Format {
        self.depth_format
    }
}
