//! SPIR-V shader modules.
//!
//! - [`ShaderStage`] names the pipeline stage a module is bound to.
//! - [`Shader`] owns a `VkShaderModule` and produces the stage create info
//!   consumed by pipeline creation. Modules can be dropped once the pipeline
//!   has been built.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use viewer_rhi::device::Device;
//! use viewer_rhi::shader::{Shader, ShaderStage};
//!
//! # fn example(device: Arc<Device>) -> Result<(), viewer_rhi::RhiError> {
//! let vert = Shader::from_spirv_file(device.clone(), Path::new("shaders/vert.spv"), ShaderStage::Vertex)?;
//! let frag = Shader::from_spirv_file(device, Path::new("shaders/frag.spv"), ShaderStage::Fragment)?;
//! let _stages = [vert.stage_create_info(), frag.stage_create_info()];
//! # Ok(())
//! # }
//! ```

use std::ffi::CStr;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Entry point of every shader module.
const ENTRY_POINT: &CStr = c"main";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn to_vk_stage(self) -> vk::ShaderStageFlags {
        match self {
            ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Decodes a SPIR-V binary into 32-bit words.
///
/// # Errors
///
/// [`RhiError::Shader`] if the length is not a multiple of four or the
/// magic number is wrong.
pub fn decode_spirv(bytes: &[u8]) -> RhiResult<Vec<u32>> {
    ash::util::read_spv(&mut Cursor::new(bytes))
        .map_err(|e| RhiError::Shader(format!("Invalid SPIR-V: {}", e)))
}

/// Owned shader module tagged with its stage.
pub struct Shader {
    device: Arc<Device>,
    module: vk::ShaderModule,
    stage: ShaderStage,
}

impl Shader {
    /// Reads and creates a shader module from a SPIR-V file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid SPIR-V, or
    /// module creation fails.
    pub fn from_spirv_file(device: Arc<Device>, path: &Path, stage: ShaderStage) -> RhiResult<Self> {
        debug!("Loading {} shader from {}", stage, path.display());

        let bytes = std::fs::read(path).map_err(|e| {
            RhiError::Shader(format!("Failed to read shader file {}: {}", path.display(), e))
        })?;

        Self::from_spirv_bytes(device, &bytes, stage)
    }

    /// Creates a shader module from an in-memory SPIR-V binary.
    pub fn from_spirv_bytes(device: Arc<Device>, bytes: &[u8], stage: ShaderStage) -> RhiResult<Self> {
        let code = decode_spirv(bytes)?;
        let create_info = vk::ShaderModuleCreateInfo::default().code(&code);

        let module = unsafe { device.handle().create_shader_module(&create_info, None)? };

        debug!("Created {} shader module ({} words)", stage, code.len());

        Ok(Self {
            device,
            module,
            stage,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    #[inline]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Stage description for pipeline creation; borrows this shader.
    pub fn stage_create_info(&self) -> vk::PipelineShaderStageCreateInfo<'_> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(self.stage.to_vk_stage())
            .module(self.module)
            .name(ENTRY_POINT)
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_shader_module(self.module, None);
        }
        debug!("Destroyed {} shader module", self.stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPIRV_MAGIC: u32 = 0x0723_0203;

    #[test]
    fn test_shader_stage_to_vk_stage() {
        assert_eq!(
            ShaderStage::Vertex.to_vk_stage(),
            vk::ShaderStageFlags::VERTEX
        );
        assert_eq!(
            ShaderStage::Fragment.to_vk_stage(),
            vk::ShaderStageFlags::FRAGMENT
        );
    }

    #[test]
    fn test_shader_stage_display() {
        assert_eq!(ShaderStage::Vertex.to_string(), "vertex");
        assert_eq!(ShaderStage::Fragment.to_string(), "fragment");
    }

    #[test]
    fn test_decode_spirv_words() {
        let words = [SPIRV_MAGIC, 0x0001_0000, 0, 1, 0];
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();

        assert_eq!(decode_spirv(&bytes).unwrap(), words);
    }

    #[test]
    fn test_decode_spirv_rejects_misaligned() {
        let mut bytes = SPIRV_MAGIC.to_le_bytes().to_vec();
        bytes.push(0);
        assert!(matches!(decode_spirv(&bytes), Err(RhiError::Shader(_))));
    }

    #[test]
    fn test_decode_spirv_rejects_bad_magic() {
        let bytes = 0xdead_beef_u32.to_le_bytes();
        assert!(decode_spirv(&bytes).is_err());
    }
}
