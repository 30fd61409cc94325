//! Configuration module for the bubble scene.
//!
//! This module defines the tunable settings of the scene: asset locations,
//! window, camera and orbit controls, the extruded text labels and the debug
//! panel. Every section falls back to its defaults when omitted from a JSON
//! config file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Locations of the three assets the scene loads at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPaths {
    /// Directory all other paths are resolved against
    pub root: PathBuf,

    /// three.js typeface JSON used for the text labels
    pub font: PathBuf,

    /// Matcap texture applied to the text labels
    pub matcap: PathBuf,

    /// Equirectangular Radiance HDR used as background and environment
    pub environment: PathBuf,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            root: PathBuf::from("static"),
            font: PathBuf::from("fonts/helvetiker_regular.typeface.json"),
            matcap: PathBuf::from("textures/matcaps/9.jpg"),
            environment: PathBuf::from("textures/environmentMap/sky.hdr"),
        }
    }
}

impl AssetPaths {
    pub fn font_path(&self) -> PathBuf {
        self.root.join(&self.font)
    }

    pub fn matcap_path(&self) -> PathBuf {
        self.root.join(&self.matcap)
    }

    pub fn environment_path(&self) -> PathBuf {
        self.root.join(&self.environment)
    }
}

/// Initial window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub title: String,

    /// Logical width in points
    pub width: u32,

    /// Logical height in points
    pub height: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Bubbles".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Perspective camera and orbit control settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,

    /// Near clipping plane
    pub near: f32,

    /// Far clipping plane
    pub far: f32,

    /// Initial camera position (the camera looks at the origin)
    pub position: [f32; 3],

    /// Fraction of the pending orbit input applied per frame
    pub damping_factor: f32,

    /// Upper bound of the polar angle measured from +Y (radians)
    pub max_polar_angle: f32,

    /// Maximum distance between camera and target
    pub max_distance: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 100.0,
            position: [1.0, 0.5, 6.0],
            damping_factor: 0.05,
            max_polar_angle: std::f32::consts::PI / 2.1,
            max_distance: 15.0,
        }
    }
}

/// A single line of extruded text and its vertical placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,

    /// Offset along +Y applied after the geometry is centered
    #[serde(default)]
    pub offset_y: f32,
}

/// Bevel applied to the extruded text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BevelSettings {
    pub enabled: bool,

    /// Depth of the bevel along the extrusion axis
    pub thickness: f32,

    /// Distance the bevel extends outward from the outline
    pub size: f32,

    /// Outline offset where the bevel starts
    pub offset: f32,

    pub segments: u32,
}

impl Default for BevelSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            thickness: 0.03,
            size: 0.02,
            offset: 0.0,
            segments: 5,
        }
    }
}

/// Extruded text labels placed at the center of the scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextSettings {
    pub lines: Vec<TextLine>,

    /// Glyph em size in world units
    pub size: f32,

    /// Extrusion depth in world units
    pub depth: f32,

    /// Straight segments used to flatten each curve of a glyph outline
    pub curve_segments: u32,

    pub bevel: BevelSettings,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            lines: vec![
                TextLine {
                    text: "Valentina Restrepo Sanchez".to_string(),
                    offset_y: 0.0,
                },
                TextLine {
                    text: "Creative developer".to_string(),
                    offset_y: -0.8,
                },
            ],
            size: 0.5,
            depth: 0.2,
            curve_segments: 12,
            bevel: BevelSettings::default(),
        }
    }
}

/// Debug panel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelSettings {
    pub title: String,

    /// Panel width in points
    pub width: f32,

    /// Whether the panel starts expanded
    pub start_open: bool,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            title: "Play with the Bubbles".to_string(),
            width: 300.0,
            start_open: false,
        }
    }
}

/// Complete scene configuration combining all sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub assets: AssetPaths,

    pub window: WindowSettings,

    pub camera: CameraSettings,

    pub text: TextSettings,

    pub panel: PanelSettings,

    /// Seed for bubble placement; a fresh random seed is used when unset
    pub seed: Option<u64>,
}

impl SceneConfig {
    /// Load configuration from a JSON file.
    ///
    /// Missing sections and fields take their default values.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|error| ConfigError::Io {
            path: path.as_ref().to_path_buf(),
            error,
        })?;
        serde_json::from_str(&contents).map_err(|error| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            error,
        })
    }

    /// Save configuration to a JSON file.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents =
            serde_json::to_string_pretty(self).map_err(|error| ConfigError::Serialize { error })?;
        fs::write(path.as_ref(), contents).map_err(|error| ConfigError::Io {
            path: path.as_ref().to_path_buf(),
            error,
        })
    }
}

/// Error types for configuration operations.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error when reading or writing configuration files
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
    /// JSON parsing error
    Parse {
        path: PathBuf,
        error: serde_json::Error,
    },
    /// JSON serialization error
    Serialize { error: serde_json::Error },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, error } => {
                write!(
                    formatter,
                    "Failed to read/write config file '{}': {}",
                    path.display(),
                    error
                )
            }
            ConfigError::Parse { path, error } => {
                write!(
                    formatter,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    error
                )
            }
            ConfigError::Serialize { error } => {
                write!(formatter, "Failed to serialize config: {}", error)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { error, .. } => Some(error),
            ConfigError::Parse { error, .. } => Some(error),
            ConfigError::Serialize { error } => Some(error),
        }
    }
}
