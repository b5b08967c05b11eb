use anyhow::Context;
use glam::Vec3;
use renderer::{PhotonSettings, SliceSettings};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use volume::transfer::{ControlPoint, DEFAULT_RESOLUTION};
use volume::{EnvironmentMap, RawFormat, TransferFunction, Volume, VolumeDims};

/// Configuration loaded from config.toml
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub volume: VolumeConfig,
    pub photon: PhotonSettings,
    pub slice: SliceConfig,
    pub lut: LutConfig,
    pub environment: EnvironmentConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 750,
            title: "Photon Volume Viewer".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CameraConfig {
    /// Initial orbit distance from the volume centre
    pub distance: f32,
    /// Vertical field of view
    pub fov_degrees: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            distance: 2.0,
            fov_degrees: 45.0,
        }
    }
}

/// Synthetic volumes available without a data file
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PhantomKind {
    Sphere,
    #[default]
    NestedShells,
    Empty,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VolumeConfig {
    pub phantom: PhantomKind,
    /// Edge length of the phantom grid
    pub size: u32,
    /// Sphere radius in volume-local units
    pub radius: f32,
    /// Raw voxel file; takes precedence over the phantom
    pub raw: Option<RawVolumeConfig>,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            phantom: PhantomKind::default(),
            size: 128,
            radius: 0.35,
            raw: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawVolumeConfig {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    #[serde(default)]
    pub format: RawFormat,
}

impl VolumeConfig {
    /// Load the raw file or generate the phantom
    pub fn build(&self) -> anyhow::Result<Volume> {
        if let Some(raw) = &self.raw {
            let dims = VolumeDims::new(raw.width, raw.height, raw.depth);
            return volume::load_raw(&raw.path, dims, raw.format)
                .with_context(|| format!("failed to load volume {}", raw.path.display()));
        }

        let dims = VolumeDims::cube(self.size);
        let volume = match self.phantom {
            PhantomKind::Sphere => volume::phantom::sphere(dims, self.radius)?,
            PhantomKind::NestedShells => volume::phantom::nested_shells(dims)?,
            PhantomKind::Empty => volume::phantom::empty(dims)?,
        };
        Ok(volume)
    }
}

/// Slice parameters on the UI scale
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SliceConfig {
    /// Roughly [-100, 100]
    pub brightness: f32,
    /// Roughly [-100, 100], 0 leaves intensities unchanged
    pub contrast: f32,
    pub threshold: f32,
    pub visible: bool,
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self {
            brightness: 0.0,
            contrast: 0.0,
            threshold: 0.0,
            visible: false,
        }
    }
}

impl SliceConfig {
    /// Shader-facing settings derived through the UI mapping
    pub fn settings(&self) -> SliceSettings {
        let mut settings = SliceSettings::default();
        settings.set_brightness(self.brightness);
        settings.set_contrast(self.contrast);
        settings.set_threshold(self.threshold);
        settings
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LutConfig {
    pub resolution: usize,
    /// Piecewise-linear control points; empty means a grayscale ramp
    pub points: Vec<ControlPoint>,
}

impl Default for LutConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            points: Vec::new(),
        }
    }
}

impl LutConfig {
    pub fn build(&self) -> anyhow::Result<TransferFunction> {
        let lut = if self.points.is_empty() {
            TransferFunction::grayscale(self.resolution)?
        } else {
            TransferFunction::from_control_points(&self.points, self.resolution)?
        };
        Ok(lut)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Constant radiance in every direction; overrides the sky gradient
    pub uniform: Option<[f32; 3]>,
    pub zenith: [f32; 3],
    pub horizon: [f32; 3],
    pub ground: [f32; 3],
    /// Face edge length of the generated cube map
    pub size: u32,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            uniform: None,
            zenith: [0.35, 0.55, 0.9],
            horizon: [0.9, 0.9, 0.85],
            ground: [0.25, 0.22, 0.2],
            size: 64,
        }
    }
}

impl EnvironmentConfig {
    pub fn build(&self) -> anyhow::Result<EnvironmentMap> {
        if let Some(color) = self.uniform {
            return Ok(EnvironmentMap::uniform(Vec3::from(color)));
        }
        let map = EnvironmentMap::sky_gradient(
            Vec3::from(self.zenith),
            Vec3::from(self.horizon),
            Vec3::from(self.ground),
            self.size,
        )?;
        Ok(map)
    }
}

/// Parse a configuration string
pub fn parse_config(source: &str) -> anyhow::Result<ViewerConfig> {
    let config: ViewerConfig = toml::from_str(source)?;
    config.photon.validate()?;
    Ok(config)
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> anyhow::Result<ViewerConfig> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_config(&source).with_context(|| format!("invalid config {}", path.display()))
}

/// Load configuration, falling back to defaults when the file is missing or invalid
pub fn load_config_or_default(path: &Path) -> ViewerConfig {
    load_config(path).unwrap_or_else(|e| {
        tracing::warn!("{:#}; using default configuration", e);
        ViewerConfig::default()
    })
}
