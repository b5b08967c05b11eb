//! Transfer function (lookup table)
//!
//! Maps a scalar intensity in `[0, 1]` to an RGBA surface colour and opacity.
//! Sampling mirrors a 1D texture with linear filtering and clamp-to-edge.

use crate::error::{Result, VolumeError};
use glam::Vec4;
use serde::{Deserialize, Serialize};

/// Default table resolution for generated transfer functions
pub const DEFAULT_RESOLUTION: usize = 256;

/// A control point of a piecewise-linear transfer function
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    /// Intensity in `[0, 1]`
    pub intensity: f32,
    /// RGBA colour at this intensity
    pub color: [f32; 4],
}

impl ControlPoint {
    pub fn new(intensity: f32, color: [f32; 4]) -> Self {
        Self { intensity, color }
    }
}

/// 1D RGBA lookup table
#[derive(Debug, Clone, PartialEq)]
pub struct TransferFunction {
    table: Vec<Vec4>,
}

impl TransferFunction {
    /// Build from explicit table entries
    pub fn from_table(table: Vec<Vec4>) -> Result<Self> {
        if table.is_empty() {
            return Err(VolumeError::InvalidTransferFunction(
                "table must not be empty".to_string(),
            ));
        }
        if table.iter().any(|c| !c.is_finite()) {
            return Err(VolumeError::InvalidTransferFunction(
                "table contains non-finite values".to_string(),
            ));
        }
        Ok(Self { table })
    }

    /// Rasterize piecewise-linear control points into a table
    ///
    /// Points are sorted by intensity; intensities outside the first and last
    /// point take the colour of the nearest point.
    pub fn from_control_points(points: &[ControlPoint], resolution: usize) -> Result<Self> {
        if points.is_empty() {
            return Err(VolumeError::InvalidTransferFunction(
                "at least one control point is required".to_string(),
            ));
        }
        if resolution == 0 {
            return Err(VolumeError::InvalidTransferFunction(
                "resolution must be positive".to_string(),
            ));
        }

        let mut points = points.to_vec();
        points.sort_by(|a, b| a.intensity.total_cmp(&b.intensity));

        let table = (0..resolution)
            .map(|i| {
                let t = (i as f32 + 0.5) / resolution as f32;
                interpolate(&points, t)
            })
            .collect();

        Self::from_table(table)
    }

    /// Linear ramp where colour and opacity equal the intensity
    pub fn grayscale(resolution: usize) -> Result<Self> {
        Self::from_control_points(
            &[
                ControlPoint::new(0.0, [0.0, 0.0, 0.0, 0.0]),
                ControlPoint::new(1.0, [1.0, 1.0, 1.0, 1.0]),
            ],
            resolution,
        )
    }

    /// Constant colour for every intensity
    pub fn constant(color: Vec4) -> Result<Self> {
        Self::from_table(vec![color])
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn table(&self) -> &[Vec4] {
        &self.table
    }

    /// Interleaved RGBA floats for upload
    pub fn to_rgba_f32(&self) -> Vec<f32> {
        self.table.iter().flat_map(|c| c.to_array()).collect()
    }

    /// Linearly filtered lookup with clamp-to-edge
    pub fn sample(&self, intensity: f32) -> Vec4 {
        let n = self.table.len();
        let p = intensity * n as f32 - 0.5;
        let base = p.floor();
        let f = p - base;
        let i0 = (base as i64).clamp(0, n as i64 - 1) as usize;
        let i1 = (base as i64 + 1).clamp(0, n as i64 - 1) as usize;
        let (a, b) = (self.table[i0], self.table[i1]);
        a + (b - a) * f
    }
}

fn interpolate(points: &[ControlPoint], t: f32) -> Vec4 {
    let first = points[0];
    let last = points[points.len() - 1];
    if t <= first.intensity {
        return Vec4::from_array(first.color);
    }
    if t >= last.intensity {
        return Vec4::from_array(last.color);
    }

    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t >= a.intensity && t <= b.intensity {
            let span = b.intensity - a.intensity;
            let w = if span > 0.0 { (t - a.intensity) / span } else { 0.0 };
            return Vec4::from_array(a.color).lerp(Vec4::from_array(b.color), w);
        }
    }

    Vec4::from_array(last.color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_points_rejected() {
        assert!(TransferFunction::from_control_points(&[], 16).is_err());
        assert!(TransferFunction::from_table(vec![]).is_err());
    }

    #[test]
    fn test_grayscale_is_monotonic() {
        let lut = TransferFunction::grayscale(DEFAULT_RESOLUTION).unwrap();
        let mut last = -1.0;
        for i in 0..=20 {
            let c = lut.sample(i as f32 / 20.0);
            assert!(c.x >= last);
            last = c.x;
        }
        assert!(lut.sample(0.5).x > 0.49 && lut.sample(0.5).x < 0.51);
    }

    #[test]
    fn test_sample_clamps_to_edge() {
        let lut = TransferFunction::from_table(vec![Vec4::ZERO, Vec4::ONE]).unwrap();
        assert_eq!(lut.sample(-1.0), Vec4::ZERO);
        assert_eq!(lut.sample(2.0), Vec4::ONE);
    }

    #[test]
    fn test_constant_lookup() {
        let color = Vec4::new(0.2, 0.4, 0.6, 1.0);
        let lut = TransferFunction::constant(color).unwrap();
        assert_eq!(lut.sample(0.3), color);
    }

    #[test]
    fn test_unsorted_points_are_sorted() {
        let lut = TransferFunction::from_control_points(
            &[
                ControlPoint::new(1.0, [1.0, 0.0, 0.0, 1.0]),
                ControlPoint::new(0.0, [0.0, 0.0, 1.0, 0.0]),
            ],
            64,
        )
        .unwrap();
        assert!(lut.sample(0.0).z > 0.9);
        assert!(lut.sample(1.0).x > 0.9);
    }
}
