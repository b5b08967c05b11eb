use clap::Parser;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;
use viewer::{FrameCapture, HeadlessOptions, VolumeViewerApp};
use winit::event_loop::EventLoop;

/// Progressive photon volume viewer
#[derive(Parser, Debug)]
#[command(name = "viewer", version, about)]
struct Args {
    /// Configuration file
    #[arg(long, short = 'c', value_name = "PATH", default_value = "crates/viewer/config.toml")]
    config: PathBuf,

    /// Render offscreen with the CPU tracer instead of opening a window
    #[arg(long)]
    cpu: bool,

    /// Accumulation passes before saving (headless or with --output)
    #[arg(long, default_value_t = 64)]
    frames: u32,

    /// Override the configured image width
    #[arg(long)]
    width: Option<u32>,

    /// Override the configured image height
    #[arg(long)]
    height: Option<u32>,

    /// Save the converged image here
    #[arg(long, short = 'o', value_name = "PATH")]
    output: Option<PathBuf>,

    /// Seed for the host randomness; wall clock when omitted
    #[arg(long)]
    seed: Option<u64>,
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = viewer::load_config_or_default(&args.config);
    if let Some(width) = args.width {
        config.window.width = width;
    }
    if let Some(height) = args.height {
        config.window.height = height;
    }
    let seed = args.seed.unwrap_or_else(clock_seed);
    tracing::info!(seed, "host randomness seeded");

    if args.cpu {
        let options = HeadlessOptions {
            width: config.window.width,
            height: config.window.height,
            frames: args.frames,
            seed,
            output: Some(args.output.unwrap_or_else(|| PathBuf::from("photon.png"))),
        };
        viewer::render_headless(&config, &options)?;
        return Ok(());
    }

    let resources = viewer::build_resources(&config)?;
    let capture = args.output.map(|path| FrameCapture {
        path,
        after_frames: args.frames,
    });

    let event_loop = EventLoop::new()?;
    let mut app = VolumeViewerApp::new(config, resources, seed, capture);
    event_loop.run_app(&mut app)?;
    Ok(())
}
