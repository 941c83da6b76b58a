use log::{LevelFilter, debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{ShellError, ShellResult};
use crate::options::OptionValue;
use crate::text_layer::ImageLayerMode;

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "viewershell";
const DEFAULT_LOG_FILE: &str = "viewershell.log";

/// Settings for the command-line driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    #[serde(default)]
    pub image_layer_mode: ImageLayerMode,

    #[serde(default = "default_device_pixel_ratio")]
    pub device_pixel_ratio: f64,

    /// Enforce document permissions (disables copying from the text layer)
    #[serde(default)]
    pub enable_permissions: bool,

    /// Seed for instance signatures; random when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Application option overrides applied to every instance
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, OptionValue>,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

fn default_device_pixel_ratio() -> f64 {
    1.0
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            log_level: default_log_level(),
            log_file: default_log_file(),
            image_layer_mode: ImageLayerMode::default(),
            device_pixel_ratio: default_device_pixel_ratio(),
            enable_permissions: false,
            seed: None,
            options: BTreeMap::new(),
        }
    }
}

pub fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

impl Settings {
    /// Load from `path`, or from the user config directory when `None`
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> ShellResult<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }
        match preferred_config_path() {
            Some(path) if path.exists() => Self::load_from_path(&path),
            Some(path) => {
                info!("Settings file not found at {path:?}, using defaults");
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory, using default settings");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from_path(path: &Path) -> ShellResult<Self> {
        let content = fs::read_to_string(path)?;
        let mut settings = Self::from_yaml(&content)?;
        debug!("Loaded settings from {path:?}");
        if settings.version < CURRENT_VERSION {
            migrate_settings(&mut settings);
        }
        Ok(settings)
    }

    pub fn from_yaml(content: &str) -> ShellResult<Self> {
        // An empty file is a valid, all-defaults config
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save_to_path(&self, path: &Path) -> ShellResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_yaml::to_string(self)?)?;
        debug!("Saved settings to {path:?}");
        Ok(())
    }

    fn validate(&self) -> ShellResult<()> {
        self.level_filter()?;
        if !(self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0) {
            return Err(ShellError::config(format!(
                "device_pixel_ratio must be positive, got {}",
                self.device_pixel_ratio
            )));
        }
        Ok(())
    }

    pub fn level_filter(&self) -> ShellResult<LevelFilter> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| ShellError::config(format!("unknown log level {:?}", self.log_level)))
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );
    settings.version = CURRENT_VERSION;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(Settings::from_yaml("  \n").unwrap(), Settings::default());
    }

    #[test]
    fn parses_all_fields() {
        let settings = Settings::from_yaml(
            r##"
version: 1
log_level: trace
log_file: /tmp/shell.log
image_layer_mode: placeholder
device_pixel_ratio: 2.0
enable_permissions: true
seed: 42
options:
  sidebarViewOnLoad: 2
  docStyle: "#viewer"
"##,
        )
        .unwrap();
        assert_eq!(settings.level_filter().unwrap(), LevelFilter::Trace);
        assert_eq!(settings.image_layer_mode, ImageLayerMode::Placeholder);
        assert_eq!(settings.device_pixel_ratio, 2.0);
        assert!(settings.enable_permissions);
        assert_eq!(settings.seed, Some(42));
        assert_eq!(settings.options["sidebarViewOnLoad"], OptionValue::Int(2));
        assert_eq!(
            settings.options["docStyle"],
            OptionValue::String("#viewer".to_string())
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            Settings::from_yaml("log_level: chatty"),
            Err(ShellError::Config { .. })
        ));
        assert!(matches!(
            Settings::from_yaml("device_pixel_ratio: 0"),
            Err(ShellError::Config { .. })
        ));
        assert!(matches!(
            Settings::from_yaml("colour: blue"),
            Err(ShellError::Yaml(_))
        ));
    }

    #[test]
    fn save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILENAME);
        let settings = Settings {
            log_level: "warn".to_string(),
            image_layer_mode: ImageLayerMode::Origin,
            ..Settings::default()
        };
        settings.save_to_path(&path).unwrap();
        assert_eq!(Settings::load(Some(&path)).unwrap(), settings);
    }

    #[test]
    fn old_versions_are_migrated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        fs::write(&path, "version: 0\n").unwrap();
        assert_eq!(Settings::load(Some(&path)).unwrap().version, CURRENT_VERSION);
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Settings::load(Some(&dir.path().join("absent.yaml"))),
            Err(ShellError::Io(_))
        ));
    }
}
