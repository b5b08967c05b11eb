use crate::accumulation::{to_display_byte, Accumulation, AccumulationState};
use crate::error::{RenderError, Result};
use crate::photon::{trace_pixel, CallRandomness, PhotonSettings};
use crate::ray::{frag_coord_to_ndc, FrameMatrices};
use crate::renderer::Renderer;
use glam::{Vec2, Vec3};
use image::{ImageBuffer, Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::path::Path;
use volume::ResourceSet;

/// Pure Rust photon tracer with the same accumulation contract as the GPU
/// renderer
///
/// The sum buffer is stored in GL row order (row 0 at the bottom) so the
/// per-pixel fragment coordinates match the shader's `gl_FragCoord`.
pub struct CpuPhotonTracer {
    resources: ResourceSet,
    settings: PhotonSettings,
    rng: StdRng,
    accumulation: Accumulation,
    sum: Vec<Vec3>,
    visible: bool,
}

impl CpuPhotonTracer {
    pub fn new(resources: ResourceSet, settings: PhotonSettings, seed: u64) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            resources,
            settings,
            rng: StdRng::seed_from_u64(seed),
            accumulation: Accumulation::new(),
            sum: Vec::new(),
            visible: true,
        })
    }

    pub fn settings(&self) -> &PhotonSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: PhotonSettings) -> Result<()> {
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    pub fn resources(&self) -> &ResourceSet {
        &self.resources
    }

    /// Swap the resource set; callers clear afterwards
    pub fn set_resources(&mut self, resources: ResourceSet) {
        self.resources = resources;
    }

    pub fn state(&self) -> AccumulationState {
        self.accumulation.state()
    }

    pub fn size(&self) -> (u32, u32) {
        self.accumulation.size()
    }

    /// Add one estimate per pixel using freshly drawn host randomness
    pub fn render(&mut self, frame: &FrameMatrices) -> Result<()> {
        let randomness = CallRandomness::draw(&mut self.rng, &self.settings);
        self.render_with_randomness(frame, &randomness)
    }

    /// Add one estimate per pixel with caller-supplied host randomness
    pub fn render_with_randomness(
        &mut self,
        frame: &FrameMatrices,
        randomness: &CallRandomness,
    ) -> Result<()> {
        if !self.visible {
            return Ok(());
        }
        if !self.accumulation.is_initialized() {
            return Err(RenderError::NotInitialized("cpu photon"));
        }

        let (width, height) = self.accumulation.size();
        if self.accumulation.begin_pass() {
            self.sum.clear();
            self.sum.resize(self.accumulation.pixel_count(), Vec3::ZERO);
        }

        let inverses = frame.inverses();
        let resources = &self.resources;
        let settings = &self.settings;

        self.sum
            .par_chunks_mut(width as usize)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, texel) in row.iter_mut().enumerate() {
                    let frag = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                    let ray = inverses.primary_ray(frag_coord_to_ndc(frag, width, height));
                    *texel += trace_pixel(frag, &ray, resources, settings, randomness);
                }
            });

        self.accumulation.finish_pass();
        tracing::debug!(
            samples = self.accumulation.sample_count(),
            width,
            height,
            "cpu photon pass accumulated"
        );
        Ok(())
    }

    /// Running sum at image coordinates (top-left origin)
    pub fn sum_at(&self, x: u32, y: u32) -> Vec3 {
        let (width, height) = self.accumulation.size();
        if x >= width || y >= height || self.sum.is_empty() {
            return Vec3::ZERO;
        }
        self.sum[(height - 1 - y) as usize * width as usize + x as usize]
    }

    /// Monte-Carlo estimate at image coordinates (top-left origin)
    pub fn average(&self, x: u32, y: u32) -> Vec3 {
        self.sum_at(x, y) * self.accumulation.display_scale()
    }

    /// Averaged result as an 8-bit image, clamped to [0, 1]
    pub fn display_image(&self) -> RgbImage {
        let (width, height) = self.accumulation.size();
        let scale = self.accumulation.display_scale();
        ImageBuffer::from_fn(width, height, |x, y| {
            let c = self.sum_at(x, y);
            Rgb([
                to_display_byte(c.x, scale),
                to_display_byte(c.y, scale),
                to_display_byte(c.z, scale),
            ])
        })
    }

    /// Save the averaged result to a file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        self.display_image().save(path.as_ref())?;
        tracing::info!(
            path = %path.as_ref().display(),
            samples = self.accumulation.sample_count(),
            "saved cpu photon image"
        );
        Ok(())
    }
}

impl Renderer for CpuPhotonTracer {
    fn name(&self) -> &str {
        "cpu photon"
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn clear(&mut self, width: u32, height: u32) -> Result<()> {
        if !self.visible {
            return Ok(());
        }
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidSettings(format!(
                "accumulation size {}x{} must be non-zero",
                width, height
            )));
        }
        let outcome = self.accumulation.clear(width, height);
        if outcome.resized {
            self.sum = vec![Vec3::ZERO; self.accumulation.pixel_count()];
        }
        Ok(())
    }

    fn sample_count(&self) -> u32 {
        self.accumulation.sample_count()
    }
}
