use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::{DEFAULT_INITIAL_SCALE, DEFAULT_ZOOM_STEP, WHEEL_MAX_SCALE, WHEEL_MIN_SCALE};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "pageview";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_initial_scale")]
    pub initial_scale: f64,

    #[serde(default = "default_zoom_step")]
    pub zoom_step: f64,

    #[serde(default = "default_wheel_min_scale")]
    pub wheel_min_scale: f64,

    #[serde(default = "default_wheel_max_scale")]
    pub wheel_max_scale: f64,

    /// Device pixels per CSS pixel for the backing buffer
    #[serde(default = "default_pixel_ratio")]
    pub pixel_ratio: f64,

    /// CSS pixels covered by one terminal cell horizontally
    #[serde(default = "default_cell_width_px")]
    pub cell_width_px: u16,

    /// CSS pixels covered by one terminal cell vertically (two half-blocks)
    #[serde(default = "default_cell_height_px")]
    pub cell_height_px: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_initial_scale() -> f64 {
    DEFAULT_INITIAL_SCALE
}

fn default_zoom_step() -> f64 {
    DEFAULT_ZOOM_STEP
}

fn default_wheel_min_scale() -> f64 {
    WHEEL_MIN_SCALE
}

fn default_wheel_max_scale() -> f64 {
    WHEEL_MAX_SCALE
}

fn default_pixel_ratio() -> f64 {
    1.0
}

fn default_cell_width_px() -> u16 {
    4
}

fn default_cell_height_px() -> u16 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            initial_scale: default_initial_scale(),
            zoom_step: default_zoom_step(),
            wheel_min_scale: default_wheel_min_scale(),
            wheel_max_scale: default_wheel_max_scale(),
            pixel_ratio: default_pixel_ratio(),
            cell_width_px: default_cell_width_px(),
            cell_height_px: default_cell_height_px(),
            download_dir: None,
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Where downloads land: configured dir, else the platform download dir, else cwd
    #[must_use]
    pub fn resolved_download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    #[must_use]
    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or_else(|_| {
            warn!("Unknown log level {:?}, using info", self.log_level);
            log::LevelFilter::Info
        })
    }
}

pub fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Load settings from `path`, or from the default location.
///
/// A missing default config is created with defaults. Read and parse errors
/// are logged and defaults are returned.
pub fn load_settings(path: Option<&Path>) -> Settings {
    if let Some(path) = path {
        return load_settings_from_path(path);
    }

    let Some(path) = preferred_config_path() else {
        warn!("Could not determine config directory, using default settings");
        return Settings::default();
    };

    if path.exists() {
        load_settings_from_path(&path)
    } else {
        info!("Settings file not found, creating with defaults at {path:?}");
        let settings = Settings::default();
        save_settings_to_file(&settings, &path);
        settings
    }
}

pub fn load_settings_from_path(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
            Ok(mut settings) => {
                debug!("Loaded settings from {path:?}");

                if settings.version < CURRENT_VERSION {
                    migrate_settings(&mut settings);
                    save_settings_to_file(&settings, path);
                }
                settings
            }
            Err(e) => {
                error!("Failed to parse settings file {path:?}: {e}");
                Settings::default()
            }
        },
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
            Settings::default()
        }
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );
    settings.version = CURRENT_VERSION;
}

pub fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            error!("Failed to create config directory {parent:?}: {e}");
            return;
        }
    }

    match serde_yaml::to_string(settings) {
        Ok(yaml) => {
            if let Err(e) = fs::write(path, yaml) {
                error!("Failed to write settings file {path:?}: {e}");
            } else {
                debug!("Saved settings to {path:?}");
            }
        }
        Err(e) => error!("Failed to serialize settings: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_fills_defaults() {
        let settings: Settings = serde_yaml::from_str("zoom_step: 0.25\n").unwrap();
        assert_eq!(settings.zoom_step, 0.25);
        assert_eq!(settings.initial_scale, DEFAULT_INITIAL_SCALE);
        assert_eq!(settings.wheel_max_scale, WHEEL_MAX_SCALE);
        assert_eq!(settings.cell_height_px, 8);
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "initial_scale: [not a number").unwrap();
        assert_eq!(load_settings_from_path(&path), Settings::default());
    }

    #[test]
    fn old_version_is_migrated_and_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "version: 0\ninitial_scale: 1.5\n").unwrap();

        let settings = load_settings_from_path(&path);
        assert_eq!(settings.version, CURRENT_VERSION);
        assert_eq!(settings.initial_scale, 1.5);

        let saved = fs::read_to_string(&path).unwrap();
        assert!(saved.contains("version: 1"));
    }

    #[test]
    fn save_then_load_preserves_download_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let settings = Settings {
            download_dir: Some(PathBuf::from("/tmp/pages")),
            ..Settings::default()
        };
        save_settings_to_file(&settings, &path);
        assert_eq!(load_settings_from_path(&path), settings);
    }

    #[test]
    fn unknown_log_level_defaults_to_info() {
        let settings = Settings {
            log_level: "chatty".to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.log_level_filter(), log::LevelFilter::Info);

        let settings = Settings {
            log_level: "debug".to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.log_level_filter(), log::LevelFilter::Debug);
    }
}
