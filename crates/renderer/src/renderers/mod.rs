//! Renderer implementations for scalar volumes
//!
//! # Software Renderers
//!
//! - [`CpuPhotonTracer`] - Pure Rust photon tracer accumulating into a CPU
//!   sum buffer, rows traced in parallel
//!
//! # GL-Based Renderers
//!
//! - [`PhotonRenderer`] - Progressive photon march into a float accumulation
//!   target, displayed as the running average
//! - [`TextureSliceRenderer`] - Single quad sampling the volume with
//!   brightness/contrast thresholding
//!
//! GL renderers require the context they were created with to be current.
//! They share one [`ShaderLibrary`](crate::shader_utils::ShaderLibrary) and
//! release their GL objects on drop.

pub mod cpu_photon;
pub mod photon_renderer;
pub mod slice_renderer;

pub use cpu_photon::CpuPhotonTracer;
pub use photon_renderer::PhotonRenderer;
pub use slice_renderer::TextureSliceRenderer;
