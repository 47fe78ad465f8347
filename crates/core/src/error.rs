//! Error types shared by the viewer crates.

use thiserror::Error;

/// Errors raised outside the GPU layer: windowing and configuration.
#[derive(Error, Debug)]
pub enum Error {
    /// Window creation or surface plumbing failed.
    #[error("Window error: {0}")]
    Window(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file could not be parsed.
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type alias using the viewer's Error type.
pub type Result<T> = std::result::Result<T, Error>;
