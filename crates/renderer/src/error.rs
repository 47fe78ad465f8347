//! Renderer error types.

use thiserror::Error;
use viewer_resources::ResourceError;
use viewer_rhi::RhiError;

/// Fatal renderer failure.
///
/// A stale surface is not an error: it is reported through
/// [`FrameOutcome`](crate::frame_ring::FrameOutcome) and handled by a rebuild.
#[derive(Error, Debug)]
pub enum RenderError {
    /// A GPU call failed with something other than success, suboptimal or
    /// out-of-date.
    #[error(transparent)]
    Rhi(#[from] RhiError),

    /// A model or texture could not be loaded.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// The window could not provide a surface.
    #[error(transparent)]
    Platform(#[from] viewer_core::Error),

    /// The slot's completion guard did not signal within the frame timeout.
    #[error("Frame slot {slot} did not complete within {timeout_ns} ns")]
    FrameTimeout { slot: usize, timeout_ns: u64 },

    /// A frame slot index at or above the number of slots.
    #[error("Frame slot {0} out of range")]
    SlotIndex(usize),

    /// A swapchain image index outside the per-image tables.
    #[error("Swapchain image {image} out of range ({count} images)")]
    ImageIndex { image: usize, count: usize },

    /// A frame was requested while the surface-dependent resources are absent.
    #[error("Surface resources are not built")]
    TargetsMissing,
}

/// Result type alias for renderer operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;
