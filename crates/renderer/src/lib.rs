//! Frame scheduling and presentation for the viewer.
//!
//! - [`frame_ring`]: frames-in-flight synchronization ring
//! - [`targets`]: surface-dependent resource graph and the rebuild protocol
//! - [`loop_state`]: RENDERING / REBUILDING presentation loop
//! - [`recording`]: per-image command recording
//! - [`renderer`]: the Vulkan implementation tying the above together

pub mod descriptors;
pub mod error;
pub mod frame_ring;
pub mod loop_state;
pub mod recording;
pub mod renderer;
pub mod scene_resources;
pub mod surface_targets;
pub mod targets;
pub mod ubo;

pub use error::{RenderError, RenderResult};
pub use frame_ring::{FrameGpu, FrameOutcome, FrameRing, MAX_FRAMES_IN_FLIGHT};
pub use loop_state::{FrameBackend, LoopControl, LoopState, PresentationLoop};
pub use renderer::Renderer;
pub use targets::{
    DependencyGraph, ExtentSource, RebuildOutcome, SurfaceDependent, TargetFactory, TargetSummary,
};
