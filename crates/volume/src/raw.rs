//! Raw voxel loader
//!
//! Reads headerless little-endian voxel dumps whose dimensions are supplied
//! by the caller. This is the producer side of the volume contract; richer
//! container formats are handled outside this crate.

use crate::error::{Result, VolumeError};
use crate::grid::{Volume, VolumeDims};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Sample format of a raw voxel file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawFormat {
    /// 8-bit unsigned
    #[default]
    U8,
    /// 16-bit unsigned, little-endian
    U16,
}

impl RawFormat {
    pub fn bytes_per_voxel(self) -> usize {
        match self {
            RawFormat::U8 => 1,
            RawFormat::U16 => 2,
        }
    }
}

/// Decode raw bytes into a normalized volume
pub fn decode_raw(bytes: &[u8], dims: VolumeDims, format: RawFormat) -> Result<Volume> {
    dims.validate()?;
    let expected = dims.voxel_count() * format.bytes_per_voxel();
    if bytes.len() != expected {
        return Err(VolumeError::DataLength {
            expected,
            actual: bytes.len(),
        });
    }

    match format {
        RawFormat::U8 => Volume::from_u8(dims, bytes),
        RawFormat::U16 => {
            let values: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            Volume::from_u16(dims, &values)
        }
    }
}

/// Load a raw voxel file from disk
pub fn load_raw(path: impl AsRef<Path>, dims: VolumeDims, format: RawFormat) -> Result<Volume> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let volume = decode_raw(&bytes, dims, format)?;
    info!(
        "Loaded raw volume {} ({}x{}x{}, {:?})",
        path.display(),
        dims.width,
        dims.height,
        dims.depth,
        format
    );
    Ok(volume)
}
