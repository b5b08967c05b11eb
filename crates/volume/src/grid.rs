//! Scalar intensity volume
//!
//! Volumes live in normalized volume-local space `[-0.5, 0.5]^3`. Non-cubic
//! voxel grids are corrected on the Z axis by the `depth / height` ratio
//! before being turned into texture coordinates, matching the GPU shaders.

use crate::error::{Result, VolumeError};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// Dimensions of a voxel grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeDims {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl VolumeDims {
    pub fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// Cubic grid with the same edge length on every axis
    pub fn cube(size: u32) -> Self {
        Self::new(size, size, size)
    }

    /// Reject grids with a zero-sized axis
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 || self.depth == 0 {
            return Err(VolumeError::InvalidDimensions {
                width: self.width,
                height: self.height,
                depth: self.depth,
            });
        }
        Ok(())
    }

    pub fn voxel_count(&self) -> usize {
        self.width as usize * self.height as usize * self.depth as usize
    }

    /// Z-axis aspect correction (`depth / height`)
    pub fn aspect(&self) -> f32 {
        self.depth as f32 / self.height as f32
    }

    /// Linear index of a voxel, x fastest
    pub fn index(&self, x: u32, y: u32, z: u32) -> usize {
        x as usize
            + y as usize * self.width as usize
            + z as usize * self.width as usize * self.height as usize
    }

    /// Dimensions as a float vector, the `texDim` uniform of the shaders
    pub fn as_vec3(&self) -> Vec3 {
        Vec3::new(self.width as f32, self.height as f32, self.depth as f32)
    }

    pub(crate) fn contains(&self, x: i64, y: i64, z: i64) -> bool {
        x >= 0
            && y >= 0
            && z >= 0
            && x < self.width as i64
            && y < self.height as i64
            && z < self.depth as i64
    }
}

/// Map a volume-local position to a texture coordinate
///
/// `uvw = position * (1, 1, 1 / aspect) + 0.5` with `aspect = depth / height`.
pub fn texture_coordinate(position: Vec3, dims: VolumeDims) -> Vec3 {
    position * Vec3::new(1.0, 1.0, 1.0 / dims.aspect()) + Vec3::splat(0.5)
}

/// Trilinear filtering with GL texel-centre conventions
///
/// `fetch` receives integer texel coordinates that may lie outside the grid
/// and is responsible for the border behaviour.
pub(crate) fn trilinear<T, F>(dims: VolumeDims, uvw: Vec3, fetch: F) -> T
where
    T: Copy + Add<Output = T> + Sub<Output = T> + Mul<f32, Output = T>,
    F: Fn(i64, i64, i64) -> T,
{
    let p = uvw * dims.as_vec3() - Vec3::splat(0.5);
    let base = p.floor();
    let f = p - base;
    let (x0, y0, z0) = (base.x as i64, base.y as i64, base.z as i64);

    let lerp = |a: T, b: T, t: f32| a + (b - a) * t;

    let c00 = lerp(fetch(x0, y0, z0), fetch(x0 + 1, y0, z0), f.x);
    let c10 = lerp(fetch(x0, y0 + 1, z0), fetch(x0 + 1, y0 + 1, z0), f.x);
    let c01 = lerp(fetch(x0, y0, z0 + 1), fetch(x0 + 1, y0, z0 + 1), f.x);
    let c11 = lerp(fetch(x0, y0 + 1, z0 + 1), fetch(x0 + 1, y0 + 1, z0 + 1), f.x);

    let c0 = lerp(c00, c10, f.y);
    let c1 = lerp(c01, c11, f.y);
    lerp(c0, c1, f.z)
}

/// Dense 3D grid of normalized scalar intensities in `[0, 1]`
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    dims: VolumeDims,
    data: Vec<f32>,
}

impl Volume {
    /// Build a volume from normalized intensities (x fastest, then y, then z)
    pub fn new(dims: VolumeDims, data: Vec<f32>) -> Result<Self> {
        dims.validate()?;
        if data.len() != dims.voxel_count() {
            return Err(VolumeError::DataLength {
                expected: dims.voxel_count(),
                actual: data.len(),
            });
        }
        Ok(Self { dims, data })
    }

    /// Volume where every voxel has the same intensity
    pub fn filled(dims: VolumeDims, value: f32) -> Result<Self> {
        dims.validate()?;
        Ok(Self {
            dims,
            data: vec![value; dims.voxel_count()],
        })
    }

    /// Build from 8-bit voxels, normalized by 255
    pub fn from_u8(dims: VolumeDims, bytes: &[u8]) -> Result<Self> {
        let data = bytes.iter().map(|&v| v as f32 / u8::MAX as f32).collect();
        Self::new(dims, data)
    }

    /// Build from 16-bit voxels, normalized by 65535
    pub fn from_u16(dims: VolumeDims, values: &[u16]) -> Result<Self> {
        let data = values.iter().map(|&v| v as f32 / u16::MAX as f32).collect();
        Self::new(dims, data)
    }

    pub fn dims(&self) -> VolumeDims {
        self.dims
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn get(&self, x: u32, y: u32, z: u32) -> f32 {
        self.data[self.dims.index(x, y, z)]
    }

    /// Texel fetch with a zero border outside the grid
    pub fn texel(&self, x: i64, y: i64, z: i64) -> f32 {
        if self.dims.contains(x, y, z) {
            self.get(x as u32, y as u32, z as u32)
        } else {
            0.0
        }
    }

    /// Trilinear sample at a texture coordinate in `[0, 1]^3`
    pub fn sample_texture(&self, uvw: Vec3) -> f32 {
        trilinear(self.dims, uvw, |x, y, z| self.texel(x, y, z))
    }

    /// Sample at a volume-local position with aspect correction
    pub fn sample(&self, position: Vec3) -> f32 {
        self.sample_texture(texture_coordinate(position, self.dims))
    }

    /// Filtered alpha of a single-channel texture at a volume-local position
    ///
    /// Texels inside the grid have alpha 1 and the border has alpha 0, so
    /// this falls to zero half a texel outside the box.
    pub fn coverage(&self, position: Vec3) -> f32 {
        let uvw = texture_coordinate(position, self.dims);
        trilinear(self.dims, uvw, |x, y, z| {
            if self.dims.contains(x, y, z) { 1.0 } else { 0.0 }
        })
    }

    /// Minimum and maximum intensity
    pub fn range(&self) -> (f32, f32) {
        self.data
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_dimension() {
        let result = Volume::filled(VolumeDims::new(4, 0, 4), 0.5);
        assert!(matches!(result, Err(VolumeError::InvalidDimensions { .. })));
    }

    #[test]
    fn test_rejects_wrong_length() {
        let result = Volume::new(VolumeDims::cube(2), vec![0.0; 7]);
        assert!(matches!(
            result,
            Err(VolumeError::DataLength {
                expected: 8,
                actual: 7
            })
        ));
    }

    #[test]
    fn test_index_is_x_fastest() {
        let dims = VolumeDims::new(4, 3, 2);
        assert_eq!(dims.index(1, 0, 0), 1);
        assert_eq!(dims.index(0, 1, 0), 4);
        assert_eq!(dims.index(0, 0, 1), 12);
    }

    #[test]
    fn test_texel_centre_sampling_is_exact() {
        let dims = VolumeDims::cube(4);
        let data: Vec<f32> = (0..dims.voxel_count()).map(|i| i as f32 / 64.0).collect();
        let volume = Volume::new(dims, data).unwrap();

        let uvw = Vec3::new(1.5, 2.5, 3.5) / 4.0;
        let expected = volume.get(1, 2, 3);
        assert!((volume.sample_texture(uvw) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_sampling_outside_reads_border() {
        let volume = Volume::filled(VolumeDims::cube(4), 1.0).unwrap();
        assert_eq!(volume.sample(Vec3::new(2.0, 0.0, 0.0)), 0.0);
        assert!((volume.sample(Vec3::ZERO) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_u8_normalization() {
        let volume = Volume::from_u8(VolumeDims::new(2, 1, 1), &[0, 255]).unwrap();
        assert_eq!(volume.get(0, 0, 0), 0.0);
        assert_eq!(volume.get(1, 0, 0), 1.0);
        assert_eq!(volume.range(), (0.0, 1.0));
    }
}
