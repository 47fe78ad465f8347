//! CPU-side asset loading.
//!
//! - Wavefront OBJ models, triangulated and deduplicated into indexed meshes
//! - Images decoded to RGBA8 for texture upload

pub mod assets;
pub mod error;
pub mod image_data;
pub mod mesh;

pub use assets::ViewerAssets;
pub use error::{ResourceError, ResourceResult};
pub use image_data::ImageData;
pub use mesh::{MeshBuilder, MeshData};
