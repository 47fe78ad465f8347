//! GPU-layer error types.

use ash::vk;
use thiserror::Error;

/// Error raised by the GPU object factory.
///
/// Surface staleness (`ERROR_OUT_OF_DATE_KHR`, `SUBOPTIMAL_KHR`) is not
/// represented here: swapchain calls report it through
/// [`SurfaceStatus`](crate::swapchain::SurfaceStatus) instead.
#[derive(Error, Debug)]
pub enum RhiError {
    /// A Vulkan call returned a failure code.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// The Vulkan loader could not be found or loaded.
    #[error("Failed to load Vulkan: {0}")]
    Loading(#[from] ash::LoadingError),

    /// GPU memory allocation failed.
    #[error("Allocator error: {0}")]
    Allocator(#[from] gpu_allocator::AllocationError),

    /// The allocator mutex was poisoned by a panicking thread.
    #[error("Allocator lock poisoned")]
    AllocatorPoisoned,

    /// No physical device satisfies the viewer's requirements.
    #[error("No suitable GPU found")]
    NoSuitableGpu,

    /// No format in the candidate list supports the requested features.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A SPIR-V module could not be read or created.
    #[error("Shader error: {0}")]
    Shader(String),

    /// Surface query or swapchain creation failed.
    #[error("Swapchain error: {0}")]
    Swapchain(String),

    /// Graphics pipeline creation failed.
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// A write or copy exceeded the bounds of a resource.
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),
}

/// Result type alias for GPU-layer operations.
pub type RhiResult<T> = std::result::Result<T, RhiError>;
