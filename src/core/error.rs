//! Error types for the grass subsystem

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Buffer '{label}' needs {requested} bytes, device limit is {limit}")]
    ResourceExhausted {
        label: String,
        requested: u64,
        limit: u64,
    },

    #[error("Grass subsystem used after shutdown")]
    StaleHandle,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
