//! Texture slice shading
//!
//! CPU counterpart of `shaders/slice.frag`: a quad through the volume whose
//! fragments are mapped through contrast and brightness, then thresholded.

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};
use volume::Volume;

/// Scale of the UI-facing brightness and contrast controls
const UI_AMOUNT: f32 = 10.0;

/// Alpha below which a fragment lies outside the volume texture
const COVERAGE_EPSILON: f32 = 0.0001;

/// Half extent of the slice quad in model space
pub const SLICE_EXTENT: f32 = 0.5;

/// Slice quad corners (`vec4` positions) and triangle indices
pub const SLICE_VERTICES: [[f32; 4]; 4] = [
    [-SLICE_EXTENT, -SLICE_EXTENT, 0.0, 1.0],
    [SLICE_EXTENT, -SLICE_EXTENT, 0.0, 1.0],
    [SLICE_EXTENT, SLICE_EXTENT, 0.0, 1.0],
    [-SLICE_EXTENT, SLICE_EXTENT, 0.0, 1.0],
];
pub const SLICE_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

/// Shader-facing slice parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliceSettings {
    pub brightness: f32,
    pub contrast: f32,
    pub threshold: f32,
}

impl Default for SliceSettings {
    fn default() -> Self {
        Self {
            brightness: 0.0,
            contrast: 1.0,
            threshold: 0.0,
        }
    }
}

impl SliceSettings {
    /// Set brightness from a UI value in roughly [-100, 100]
    pub fn set_brightness(&mut self, b: f32) {
        self.brightness = UI_AMOUNT * b / 100.0;
    }

    /// Set contrast from a UI value in roughly [-100, 100]
    ///
    /// Negative values shrink contrast towards zero, positive values grow it
    /// linearly; 0 maps to 1.
    pub fn set_contrast(&mut self, c: f32) {
        self.contrast = if c < 0.0 {
            1.0 / (UI_AMOUNT * (-c / 100.0) + 1.0)
        } else {
            UI_AMOUNT * (c / 100.0) + 1.0
        };
    }

    pub fn set_threshold(&mut self, t: f32) {
        self.threshold = t;
    }

    /// Contrast/brightness mapping of a raw intensity, clamped to [0, 1]
    pub fn map_intensity(&self, intensity: f32) -> f32 {
        (self.contrast * intensity + self.brightness).clamp(0.0, 1.0)
    }
}

/// Shade one slice fragment at a volume-local position
///
/// Returns `None` for discarded fragments (outside the volume texture) and
/// transparent black for values at or below the threshold.
pub fn shade_fragment(volume: &Volume, position: Vec3, settings: &SliceSettings) -> Option<Vec4> {
    if volume.coverage(position) <= COVERAGE_EPSILON {
        return None;
    }
    let c = settings.map_intensity(volume.sample(position));
    if c > settings.threshold {
        Some(Vec4::new(c, c, c, 1.0))
    } else {
        Some(Vec4::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contrast_mapping_is_asymmetric() {
        let mut s = SliceSettings::default();
        s.set_contrast(0.0);
        assert_eq!(s.contrast, 1.0);
        s.set_contrast(100.0);
        assert!((s.contrast - 11.0).abs() < 1e-6);
        s.set_contrast(-100.0);
        assert!((s.contrast - 1.0 / 11.0).abs() < 1e-6);
        s.set_contrast(-50.0);
        assert!((s.contrast - 1.0 / 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_brightness_scale() {
        let mut s = SliceSettings::default();
        s.set_brightness(50.0);
        assert!((s.brightness - 5.0).abs() < 1e-6);
        s.set_brightness(-10.0);
        assert!((s.brightness + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_map_intensity_clamps() {
        let s = SliceSettings {
            brightness: 0.5,
            contrast: 2.0,
            threshold: 0.0,
        };
        assert_eq!(s.map_intensity(0.0), 0.5);
        assert_eq!(s.map_intensity(1.0), 1.0);
    }

    #[test]
    fn test_quad_indices_cover_two_triangles() {
        assert_eq!(SLICE_INDICES.len(), 6);
        assert!(SLICE_INDICES.iter().all(|&i| (i as usize) < SLICE_VERTICES.len()));
    }
}
