//! Viewer configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Camera settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near_plane: f32,
    pub far_plane: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            near_plane: 0.1,
            far_plane: 1000.0,
        }
    }
}

/// Complete viewer configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewerConfig {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub camera: CameraConfig,
    /// Viewport background color.
    #[serde(default = "default_background")]
    pub background: [f32; 3],
    /// URDF to load at startup.
    #[serde(default)]
    pub default_urdf: Option<PathBuf>,
    /// Seed for the random initial pose; drawn from entropy when absent.
    #[serde(default)]
    pub pose_seed: Option<u64>,
}

fn default_background() -> [f32; 3] {
    [0.08, 0.08, 0.1]
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            camera: CameraConfig::default(),
            background: default_background(),
            default_urdf: None,
            pose_seed: None,
        }
    }
}

impl ViewerConfig {
    pub const CURRENT_VERSION: u32 = 1;
    pub const FILE_NAME: &'static str = "viewer.ron";

    /// Load `viewer.ron` from the working directory, defaulting when absent
    /// or invalid.
    pub fn load() -> Self {
        match std::fs::read_to_string(Self::FILE_NAME) {
            Ok(text) => match ron::from_str(&text) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(error = %e, "invalid {}, using defaults", Self::FILE_NAME);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("no {} found, using defaults", Self::FILE_NAME);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.camera.fov_degrees, 45.0);
        assert!(config.default_urdf.is_none());
    }

    #[test]
    fn test_partial_config_round_trip() {
        let config: ViewerConfig =
            ron::from_str(r#"(camera: (fov_degrees: 60.0, near_plane: 0.01, far_plane: 500.0))"#)
                .unwrap();
        assert_eq!(config.camera.fov_degrees, 60.0);
        assert_eq!(config.background, default_background());
    }
}
