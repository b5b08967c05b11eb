//! Synthetic volumes for demos and tests

use crate::error::Result;
use crate::grid::{Volume, VolumeDims};
use glam::Vec3;

/// Volume-local centre of voxel `(x, y, z)`, aspect corrected on Z
fn voxel_position(dims: VolumeDims, x: u32, y: u32, z: u32) -> Vec3 {
    let uvw = Vec3::new(
        (x as f32 + 0.5) / dims.width as f32,
        (y as f32 + 0.5) / dims.height as f32,
        (z as f32 + 0.5) / dims.depth as f32,
    );
    (uvw - Vec3::splat(0.5)) * Vec3::new(1.0, 1.0, dims.aspect())
}

/// Build a volume by evaluating `density` at every voxel centre
pub fn from_fn(dims: VolumeDims, density: impl Fn(Vec3) -> f32) -> Result<Volume> {
    dims.validate()?;
    let mut data = Vec::with_capacity(dims.voxel_count());
    for z in 0..dims.depth {
        for y in 0..dims.height {
            for x in 0..dims.width {
                data.push(density(voxel_position(dims, x, y, z)).clamp(0.0, 1.0));
            }
        }
    }
    Volume::new(dims, data)
}

/// Volume with every voxel at zero intensity
pub fn empty(dims: VolumeDims) -> Result<Volume> {
    Volume::filled(dims, 0.0)
}

/// Solid sphere of full intensity centred in the volume
pub fn sphere(dims: VolumeDims, radius: f32) -> Result<Volume> {
    from_fn(dims, |p| if p.length() <= radius { 1.0 } else { 0.0 })
}

/// Three concentric shells of decreasing intensity, a stand-in for
/// skin / tissue / bone layers in medical scans
pub fn nested_shells(dims: VolumeDims) -> Result<Volume> {
    from_fn(dims, |p| {
        let r = p.length();
        if r <= 0.15 {
            1.0
        } else if r <= 0.3 {
            0.6
        } else if r <= 0.42 {
            0.3
        } else {
            0.0
        }
    })
}
