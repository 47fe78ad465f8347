//! Error types for asset loading.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for asset loading operations.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The OBJ parser rejected the file.
    #[error("Failed to load OBJ '{path}': {source}")]
    Obj {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    /// The model contains no triangles.
    #[error("Model '{0}' contains no geometry")]
    EmptyMesh(PathBuf),

    /// A face refers to an attribute that does not exist.
    #[error("Model '{path}': {attribute} index {index} out of range ({len} available)")]
    AttributeIndex {
        path: PathBuf,
        attribute: &'static str,
        index: usize,
        len: usize,
    },

    /// More unique vertices than a 32-bit index can address.
    #[error("Model '{0}' has too many unique vertices for 32-bit indices")]
    TooManyVertices(PathBuf),

    /// Image decoding failed.
    #[error("Failed to load image '{path}': {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// IO error while opening an asset.
    #[error("IO error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for asset operations.
pub type ResourceResult<T> = Result<T, ResourceError>;
