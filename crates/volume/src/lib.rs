//! Volume resource set for the photon volume renderer
//!
//! CPU-side data model consumed by every renderer in the workspace:
//! - **grid**: Scalar intensity volume with aspect-corrected addressing
//! - **gradient**: Pre-computed, +0.5 biased gradient volume used for surface detection
//! - **transfer**: 1D transfer function (LUT) mapping intensity to RGBA
//! - **environment**: Cube map used as the sky/background radiance source
//! - **resources**: Shared, optional resource slots borrowed by renderers
//!
//! Volumes are produced externally (see [`raw`] and [`phantom`]) and are
//! immutable once bound to a frame.

pub mod environment;
pub mod error;
pub mod gradient;
pub mod grid;
pub mod phantom;
pub mod raw;
pub mod resources;
pub mod transfer;

pub use environment::{CubeFace, EnvironmentMap};
pub use error::{Result, VolumeError};
pub use gradient::GradientVolume;
pub use grid::{texture_coordinate, Volume, VolumeDims};
pub use raw::{load_raw, RawFormat};
pub use resources::ResourceSet;
pub use transfer::TransferFunction;
