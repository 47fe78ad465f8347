//! Core utilities for the viewer.
//!
//! - Error types and result aliases
//! - Logging initialization
//! - Frame clock
//! - Configuration

mod config;
mod error;
mod logging;
mod timer;

pub use config::{AssetConfig, CameraConfig, RenderConfig, ViewerConfig, WindowConfig};
pub use error::{Error, Result};
pub use logging::{DEFAULT_LOG_FILTER, init_logging};
pub use timer::{FrameClock, FrameTime};
