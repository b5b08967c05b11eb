//! Resource loading and headless rendering shared by the window and CLI paths

use crate::camera::OrbitCamera;
use crate::config::ViewerConfig;
use renderer::{CpuPhotonTracer, Renderer};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use volume::ResourceSet;

/// Build the resource set described by the configuration
pub fn build_resources(config: &ViewerConfig) -> anyhow::Result<ResourceSet> {
    let volume = config.volume.build()?;
    let (lo, hi) = volume.range();
    info!(dims = ?volume.dims(), lo, hi, "volume ready");

    Ok(ResourceSet::new()
        .with_volume(volume)
        .with_lut(config.lut.build()?)
        .with_environment(config.environment.build()?))
}

/// Parameters of an offscreen CPU render
#[derive(Debug, Clone)]
pub struct HeadlessOptions {
    pub width: u32,
    pub height: u32,
    /// Accumulation passes to run
    pub frames: u32,
    pub seed: u64,
    pub output: Option<PathBuf>,
}

/// Accumulate `frames` passes with the software tracer and optionally save the result
pub fn render_headless(
    config: &ViewerConfig,
    options: &HeadlessOptions,
) -> anyhow::Result<CpuPhotonTracer> {
    let resources = build_resources(config)?;
    let mut tracer = CpuPhotonTracer::new(resources, config.photon, options.seed)?;
    tracer.clear(options.width, options.height)?;

    let camera = OrbitCamera::new(config.camera.distance, config.camera.fov_degrees);
    let frame = camera.frame_matrices(options.width, options.height);

    let start = Instant::now();
    for pass in 0..options.frames {
        tracer.render(&frame)?;
        if (pass + 1) % 16 == 0 {
            info!(samples = tracer.sample_count(), "headless progress");
        }
    }
    info!(
        samples = tracer.sample_count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "headless render finished"
    );

    if let Some(path) = &options.output {
        tracer.save_to_file(path)?;
    }
    Ok(tracer)
}
