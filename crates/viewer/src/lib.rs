// Photon Volume Viewer Library
// Window shell, orbit camera, configuration and headless rendering

pub mod app;
pub mod camera;
pub mod config;
pub mod scene;

// Re-export commonly used types
pub use app::{FrameCapture, VolumeViewerApp};
pub use camera::OrbitCamera;
pub use config::{load_config, load_config_or_default, parse_config, ViewerConfig};
pub use scene::{build_resources, render_headless, HeadlessOptions};
