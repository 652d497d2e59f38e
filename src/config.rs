//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/fundsplit/fundsplit.toml`
//! 3. Local config: `<dir>/.fundsplit.toml` (usually the working directory)
//! 4. Environment variables: `FUNDSPLIT_*` prefix

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{expand_env_vars, ShareBounds};

/// Raw bounds for intermediate parsing (`None` means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawBounds {
    pub min_share: Option<f64>,
    pub max_share: Option<f64>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub data_dir: Option<PathBuf>,
    pub bounds: RawBounds,
}

/// Unified configuration for fundsplit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the draft and the confirmed history (default: ~/.fundsplit)
    pub data_dir: PathBuf,
    /// Per-fund share bounds (default: 5..95)
    pub bounds: ShareBounds,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            bounds: ShareBounds::default(),
        }
    }
}

/// Get the default data directory (~/.fundsplit).
fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".fundsplit"))
        .unwrap_or_else(|| PathBuf::from("~/.fundsplit"))
}

/// Get the XDG config directory for fundsplit.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "fundsplit").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("fundsplit.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".fundsplit.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.data_dir.to_string_lossy().as_ref());
        self.data_dir = PathBuf::from(expanded);
    }

    /// Overlay wins for every field it specifies.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            data_dir: overlay
                .data_dir
                .clone()
                .unwrap_or_else(|| self.data_dir.clone()),
            bounds: ShareBounds {
                min_share: overlay.bounds.min_share.unwrap_or(self.bounds.min_share),
                max_share: overlay.bounds.max_share.unwrap_or(self.bounds.max_share),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Optional directory searched for `.fundsplit.toml`
    ///
    /// Bounds are validated after all layers are applied.
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_from(global_config_path().as_deref(), local_dir, None)
    }

    /// Load settings from explicit sources.
    ///
    /// `env` replaces the process environment for the `FUNDSPLIT_*` layer
    /// when given, so callers can load without touching real variables.
    pub fn load_from(
        global_path: Option<&Path>,
        local_dir: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_path {
            if global_path.exists() {
                let raw = load_raw_settings(global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current, env)?;
        current.expand_paths();

        current
            .bounds
            .validate()
            .map_err(|e| ApplicationError::Config {
                message: e.to_string(),
            })?;
        Ok(current)
    }

    /// Replace the data directory, expanding `~` and `$VAR` like the config layers do.
    pub fn override_data_dir(&mut self, dir: &Path) {
        self.data_dir = dir.to_path_buf();
        self.expand_paths();
    }

    /// Apply FUNDSPLIT_* environment variables as explicit overrides.
    ///
    /// Nested keys use `__`: `FUNDSPLIT_BOUNDS__MIN_SHARE=10`.
    fn apply_env_overrides(
        mut settings: Self,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("FUNDSPLIT")
                .prefix_separator("_")
                .separator("__")
                .source(env),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("data_dir") {
            settings.data_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_float("bounds.min_share") {
            settings.bounds.min_share = val;
        }
        if let Ok(val) = config.get_float("bounds.max_share") {
            settings.bounds.max_share = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# fundsplit configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/fundsplit/fundsplit.toml
#   Local:  ./.fundsplit.toml
#   Env:    FUNDSPLIT_* environment variables (FUNDSPLIT_BOUNDS__MIN_SHARE=10)

# Directory for the draft allocation and the confirmed history
# data_dir = "~/.fundsplit"

[bounds]
# Smallest share a fund may hold when more than one fund is selected
# min_share = 5.0

# Largest share a fund may hold when more than one fund is selected
# max_share = 95.0
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_default_settings_when_created_then_uses_standard_bounds() {
        let settings = Settings::default();
        assert_eq!(settings.bounds, ShareBounds::default());
        assert!(settings.data_dir.to_string_lossy().contains(".fundsplit"));
    }

    #[test]
    fn given_partial_overlay_when_merging_then_keeps_unspecified_fields() {
        let base = Settings {
            data_dir: PathBuf::from("/data"),
            bounds: ShareBounds::default(),
        };
        let overlay = RawSettings {
            data_dir: None,
            bounds: RawBounds {
                min_share: Some(10.0),
                max_share: None,
            },
        };

        let result = base.merge_with(&overlay);

        assert_eq!(result.data_dir, PathBuf::from("/data"));
        assert_eq!(result.bounds.min_share, 10.0);
        assert_eq!(result.bounds.max_share, 95.0);
    }

    #[test]
    fn given_tilde_in_data_dir_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            data_dir: PathBuf::from("~/.fundsplit"),
            bounds: ShareBounds::default(),
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let dir = settings.data_dir.to_string_lossy();
        assert!(dir.starts_with(&home), "data_dir should start with home: {}", dir);
        assert!(!dir.contains('~'));
    }

    #[test]
    fn given_tilde_override_when_overriding_data_dir_then_expands_to_home() {
        let mut settings = Settings::default();

        settings.override_data_dir(Path::new("~/alloc"));

        let home = std::env::var("HOME").expect("HOME should be set");
        assert_eq!(settings.data_dir, PathBuf::from(home).join("alloc"));
    }

    #[test]
    fn given_settings_when_serialized_then_roundtrips_through_toml() {
        let settings = Settings {
            data_dir: PathBuf::from("/data"),
            bounds: ShareBounds::new(2.5, 90.0).unwrap(),
        };
        let text = settings.to_toml().unwrap();
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn given_template_when_parsed_then_is_valid_toml() {
        let raw: RawSettings = toml::from_str(&Settings::template()).unwrap();
        assert!(raw.data_dir.is_none());
        assert!(raw.bounds.min_share.is_none());
    }
}
