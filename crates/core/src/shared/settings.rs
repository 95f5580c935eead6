use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{
    ALERT_TIMEOUT_MS, CALIBRATION_TIMEOUT_MS, FRAME_HEIGHT, FRAME_ROTATION, FRAME_WIDTH,
    SAMPLING_INTERVAL_MS, WARNING_MESSAGE,
};
use crate::shared::frame::FrameMetadata;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Tunables for one pipeline instance. Missing JSON fields take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub frame_width: u32,
    pub frame_height: u32,
    pub rotation: u32,
    pub sampling_interval_ms: u64,
    pub alert_timeout_ms: u64,
    pub calibration_timeout_ms: u64,
    pub warning_message: String,
    pub confidence: f64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            frame_width: FRAME_WIDTH,
            frame_height: FRAME_HEIGHT,
            rotation: FRAME_ROTATION,
            sampling_interval_ms: SAMPLING_INTERVAL_MS,
            alert_timeout_ms: ALERT_TIMEOUT_MS,
            calibration_timeout_ms: CALIBRATION_TIMEOUT_MS,
            warning_message: WARNING_MESSAGE.to_string(),
            confidence: 0.5,
        }
    }
}

impl PipelineSettings {
    pub fn frame_metadata(&self) -> FrameMetadata {
        FrameMetadata::new(self.frame_width, self.frame_height, self.rotation)
    }

    pub fn sampling_interval(&self) -> Duration {
        Duration::from_millis(self.sampling_interval_ms)
    }

    pub fn alert_timeout(&self) -> Duration {
        Duration::from_millis(self.alert_timeout_ms)
    }

    pub fn calibration_timeout(&self) -> Duration {
        Duration::from_millis(self.calibration_timeout_ms)
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("EyeGuard").join("settings.json"))
    }

    /// Load from the platform config directory, falling back to defaults
    /// when the file is missing or unreadable.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path).unwrap_or_else(|e| {
                log::warn!("{e}; using default settings");
                Self::default()
            }),
            _ => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |e| SettingsError::Write {
            path: path.to_path_buf(),
            source: e,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, json).map_err(write_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_camera_constants() {
        let s = PipelineSettings::default();
        assert_eq!(s.frame_metadata(), FrameMetadata::new(600, 600, 270));
        assert_eq!(s.sampling_interval(), Duration::from_millis(300));
        assert_eq!(s.alert_timeout(), Duration::from_millis(2000));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, r#"{ "alert_timeout_ms": 500, "rotation": 0 }"#).unwrap();

        let s = PipelineSettings::load_from(&path).unwrap();
        assert_eq!(s.alert_timeout_ms, 500);
        assert_eq!(s.rotation, 0);
        assert_eq!(s.frame_width, 600);
        assert_eq!(s.warning_message, WARNING_MESSAGE);
    }

    #[test]
    fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("settings.json");
        let s = PipelineSettings {
            sampling_interval_ms: 100,
            confidence: 0.7,
            ..Default::default()
        };
        s.save_to(&path).unwrap();
        assert_eq!(PipelineSettings::load_from(&path).unwrap(), s);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let tmp = TempDir::new().unwrap();
        let err = PipelineSettings::load_from(&tmp.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, SettingsError::Read { .. }));
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        let err = PipelineSettings::load_from(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
    }

    #[test]
    fn test_config_path_is_under_eyeguard() {
        if let Some(path) = PipelineSettings::config_path() {
            assert!(path.to_string_lossy().contains("EyeGuard"));
        }
    }
}
