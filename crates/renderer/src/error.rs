//! Error types for the renderers

use thiserror::Error;

/// Result type for renderer operations
pub type Result<T> = std::result::Result<T, RenderError>;

/// Errors that can occur while creating or driving GL renderers
#[derive(Error, Debug)]
pub enum RenderError {
    /// GL object creation failed
    #[error("Failed to create {what}: {reason}")]
    Allocation { what: &'static str, reason: String },

    /// Shader did not compile; carries the driver info log
    #[error("{stage} shader compilation error: {log}")]
    ShaderCompile { stage: &'static str, log: String },

    /// Program did not link; carries the driver info log
    #[error("Program '{name}' link error: {log}")]
    ProgramLink { name: &'static str, log: String },

    /// Offscreen target failed the completeness check
    #[error("Framebuffer incomplete (status 0x{status:x}) at {width}x{height}")]
    IncompleteFramebuffer { status: u32, width: u32, height: u32 },

    /// Render called before the accumulation target was sized
    #[error("Renderer '{0}' used before initialization")]
    NotInitialized(&'static str),

    /// Render parameters outside the supported range
    #[error("Invalid render settings: {0}")]
    InvalidSettings(String),

    /// Volume resource could not be built
    #[error("Volume error: {0}")]
    Volume(#[from] volume::VolumeError),

    /// Image output failed
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}
