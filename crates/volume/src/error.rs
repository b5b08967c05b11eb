//! Error types for volume resources

use thiserror::Error;

/// Result type for volume operations
pub type Result<T> = std::result::Result<T, VolumeError>;

/// Errors that can occur while building or loading volume resources
#[derive(Error, Debug)]
pub enum VolumeError {
    /// A dimension was zero
    #[error("Invalid volume dimensions: {width}x{height}x{depth}")]
    InvalidDimensions { width: u32, height: u32, depth: u32 },

    /// Voxel buffer does not match the declared dimensions
    #[error("Data length mismatch: expected {expected} values, got {actual}")]
    DataLength { expected: usize, actual: usize },

    /// Transfer function cannot be built from the given table
    #[error("Invalid transfer function: {0}")]
    InvalidTransferFunction(String),

    /// Cube map face has the wrong size
    #[error("Invalid environment face {face}: {reason}")]
    InvalidEnvironmentFace { face: usize, reason: String },

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
