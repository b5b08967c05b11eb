//! Gradient volume
//!
//! Each voxel holds the negated central-difference intensity gradient in
//! voxel units, so vectors point out of dense material and act as outward
//! surface normals. Components lie in `[-0.5, 0.5]` for normalized intensities and are stored
//! biased by `+0.5` so they fit an unsigned texture format; readers subtract
//! `0.5` again. Outside the grid the encoded value is `0.5` (zero gradient).

use crate::grid::{texture_coordinate, trilinear, Volume, VolumeDims};
use glam::Vec3;

/// Bias added to every gradient component before storage
pub const GRADIENT_BIAS: f32 = 0.5;

/// Encode a signed gradient component into `[0, 1]`
pub fn encode_component(g: f32) -> f32 {
    (g + GRADIENT_BIAS).clamp(0.0, 1.0)
}

/// Decode a stored gradient component
pub fn decode_component(encoded: f32) -> f32 {
    encoded - GRADIENT_BIAS
}

/// Encode a gradient vector component-wise
pub fn encode(g: Vec3) -> Vec3 {
    Vec3::new(encode_component(g.x), encode_component(g.y), encode_component(g.z))
}

/// Decode a stored gradient vector component-wise
pub fn decode(encoded: Vec3) -> Vec3 {
    encoded - Vec3::splat(GRADIENT_BIAS)
}

/// Pre-computed, biased gradient field with the same addressing as [`Volume`]
#[derive(Debug, Clone, PartialEq)]
pub struct GradientVolume {
    dims: VolumeDims,
    encoded: Vec<Vec3>,
}

impl GradientVolume {
    /// Negated central differences of `volume`, reading zero outside the grid
    pub fn from_volume(volume: &Volume) -> Self {
        let dims = volume.dims();
        let mut encoded = Vec::with_capacity(dims.voxel_count());

        for z in 0..dims.depth as i64 {
            for y in 0..dims.height as i64 {
                for x in 0..dims.width as i64 {
                    let g = Vec3::new(
                        volume.texel(x - 1, y, z) - volume.texel(x + 1, y, z),
                        volume.texel(x, y - 1, z) - volume.texel(x, y + 1, z),
                        volume.texel(x, y, z - 1) - volume.texel(x, y, z + 1),
                    ) * 0.5;
                    encoded.push(encode(g));
                }
            }
        }

        Self { dims, encoded }
    }

    pub fn dims(&self) -> VolumeDims {
        self.dims
    }

    /// Encoded (biased) voxel values
    pub fn encoded(&self) -> &[Vec3] {
        &self.encoded
    }

    /// Decoded gradient at a voxel
    pub fn get(&self, x: u32, y: u32, z: u32) -> Vec3 {
        decode(self.encoded[self.dims.index(x, y, z)])
    }

    fn encoded_texel(&self, x: i64, y: i64, z: i64) -> Vec3 {
        if self.dims.contains(x, y, z) {
            self.encoded[self.dims.index(x as u32, y as u32, z as u32)]
        } else {
            Vec3::splat(GRADIENT_BIAS)
        }
    }

    /// Decoded gradient at a volume-local position with aspect correction
    pub fn sample(&self, position: Vec3) -> Vec3 {
        let uvw = texture_coordinate(position, self.dims);
        decode(trilinear(self.dims, uvw, |x, y, z| self.encoded_texel(x, y, z)))
    }

    /// Quantize to interleaved RGB8 for upload
    pub fn to_rgb8(&self) -> Vec<u8> {
        self.encoded
            .iter()
            .flat_map(|g| g.to_array())
            .map(|c| (c * 255.0).round() as u8)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_recovers_component() {
        for i in 0..=100 {
            let g = -0.5 + i as f32 / 100.0;
            assert!((decode_component(encode_component(g)) - g).abs() < 1e-6);
        }
    }

    #[test]
    fn test_uniform_volume_interior_has_zero_gradient() {
        let volume = Volume::filled(VolumeDims::cube(5), 0.7).unwrap();
        let gradient = GradientVolume::from_volume(&volume);
        assert_eq!(gradient.get(2, 2, 2), Vec3::ZERO);
        // The zero border makes the outer shell point outwards
        assert!(gradient.get(0, 2, 2).x < 0.0);
        assert!(gradient.get(4, 2, 2).x > 0.0);
    }

    #[test]
    fn test_sampling_outside_decodes_to_zero() {
        let volume = Volume::filled(VolumeDims::cube(4), 1.0).unwrap();
        let gradient = GradientVolume::from_volume(&volume);
        assert_eq!(gradient.sample(Vec3::new(0.0, 3.0, 0.0)), Vec3::ZERO);
    }

    #[test]
    fn test_rgb8_zero_gradient_is_mid_gray() {
        let volume = Volume::filled(VolumeDims::cube(3), 0.0).unwrap();
        let bytes = GradientVolume::from_volume(&volume).to_rgb8();
        assert_eq!(bytes.len(), 27 * 3);
        assert!(bytes.iter().all(|&b| b == 128));
    }
}
