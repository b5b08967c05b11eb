//! Photon Volume Renderer Library
//!
//! Progressive Monte-Carlo rendering of scalar volumes plus direct texture
//! slicing:
//! - **photon**: per-pixel photon march shared by the CPU and GPU paths
//! - **accumulation**: lifecycle of the running-sum target
//! - **slice**: brightness/contrast/threshold slice shading
//!
//! # Architecture
//!
//! - **ray**: rays, volume bounds, slab intersection, primary ray setup
//! - **sampling**: stateless hash-based random numbers (GLSL-identical)
//! - **renderer**: Unified Renderer trait and framebuffer capture
//! - **renderers**: Renderer implementations (CpuPhotonTracer, PhotonRenderer,
//!   TextureSliceRenderer)
//! - **gl_resources**, **shader_utils**, **textures**: owned GL objects, the
//!   shared shader library, and resource uploads

// Core modules
pub mod accumulation;
pub mod error;
pub mod photon;
pub mod ray;
pub mod renderer;
pub mod sampling;
pub mod slice;

// Renderer implementations
pub mod renderers;

// GL plumbing
pub mod gl_resources;
pub mod shader_utils;
pub mod textures;

// Re-export commonly used types at crate root
pub use accumulation::{Accumulation, AccumulationState, ClearOutcome};
pub use error::{RenderError, Result};
pub use photon::{trace_pixel, CallRandomness, PhotonSettings, MAX_RANDOM_PAIRS};
pub use ray::{intersect_aabb, FrameMatrices, HitInfo, Ray};
pub use renderer::Renderer;
pub use renderers::{CpuPhotonTracer, PhotonRenderer, TextureSliceRenderer};
pub use shader_utils::ShaderLibrary;
pub use slice::{shade_fragment, SliceSettings};
pub use textures::GpuResources;
