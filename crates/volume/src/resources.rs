//! Resource set shared by the renderers
//!
//! Every slot is optional. Renderers hold clones of the `Arc`s and must
//! tolerate absent resources: a missing volume or gradient reads as empty
//! space, a missing LUT as transparent black, a missing environment as black.

use crate::environment::EnvironmentMap;
use crate::gradient::GradientVolume;
use crate::grid::Volume;
use crate::transfer::TransferFunction;
use glam::{Vec3, Vec4};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct ResourceSet {
    pub volume: Option<Arc<Volume>>,
    pub gradient: Option<Arc<GradientVolume>>,
    pub lut: Option<Arc<TransferFunction>>,
    pub environment: Option<Arc<EnvironmentMap>>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a volume and derive its gradient volume
    pub fn with_volume(mut self, volume: Volume) -> Self {
        self.gradient = Some(Arc::new(GradientVolume::from_volume(&volume)));
        self.volume = Some(Arc::new(volume));
        self
    }

    pub fn with_lut(mut self, lut: TransferFunction) -> Self {
        self.lut = Some(Arc::new(lut));
        self
    }

    pub fn with_environment(mut self, environment: EnvironmentMap) -> Self {
        self.environment = Some(Arc::new(environment));
        self
    }

    /// Scalar intensity at a volume-local position, 0 without a volume
    pub fn intensity(&self, position: Vec3) -> f32 {
        self.volume.as_ref().map_or(0.0, |v| v.sample(position))
    }

    /// Decoded gradient at a volume-local position, zero without a gradient
    pub fn gradient(&self, position: Vec3) -> Vec3 {
        self.gradient
            .as_ref()
            .map_or(Vec3::ZERO, |g| g.sample(position))
    }

    /// Transfer function lookup, transparent black without a LUT
    pub fn surface(&self, intensity: f32) -> Vec4 {
        self.lut.as_ref().map_or(Vec4::ZERO, |l| l.sample(intensity))
    }

    /// Background radiance, black without an environment
    pub fn environment(&self, dir: Vec3) -> Vec3 {
        self.environment
            .as_ref()
            .map_or(Vec3::ZERO, |e| e.sample(dir))
    }
}
