//! Vulkan abstraction layer (Render Hardware Interface).
//!
//! Safe wrappers over `ash` for the pieces the viewer needs:
//! - Instance, physical device selection and logical device
//! - Swapchain with explicit out-of-date / suboptimal reporting
//! - Render pass, framebuffers and the graphics pipeline
//! - Buffers, images, textures and samplers backed by `gpu-allocator`
//! - Descriptor layouts, pools and writes
//! - Command pools, command buffers and synchronization primitives
//!
//! Every handle-owning type destroys its Vulkan object on drop and holds an
//! `Arc<Device>` so that the device outlives it.

mod error;

pub mod buffer;
pub mod command;
pub mod descriptor;
pub mod device;
pub mod image;
pub mod instance;
pub mod physical_device;
pub mod pipeline;
pub mod render_pass;
pub mod sampler;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod texture;
pub mod vertex;

pub use error::{RhiError, RhiResult};

pub use ash::vk;
