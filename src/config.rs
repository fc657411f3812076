//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/talentcalc/talentcalc.toml`
//! 3. Local config: `<project_dir>/.talentcalc.toml`
//! 4. Environment variables: `TALENTCALC_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{Rules, DEFAULT_MAX_POINTS, DEFAULT_POINTS_PER_ROW};

/// Raw settings for intermediate parsing (`None` → not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub max_points: Option<u32>,
    pub points_per_row: Option<u32>,
    pub catalog: Option<PathBuf>,
}

/// Unified configuration for talentcalc.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Global point budget shared by all trees (default: 51)
    pub max_points: u32,
    /// Lower-row points required per row (default: 5)
    pub points_per_row: u32,
    /// Talent catalog file (default: bundled catalog)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_points: DEFAULT_MAX_POINTS,
            points_per_row: DEFAULT_POINTS_PER_ROW,
            catalog: None,
        }
    }
}

/// Get the XDG config directory for talentcalc.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "talentcalc").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("talentcalc.toml"))
}

/// Get the path to the local config file in a project directory.
pub fn local_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".talentcalc.toml")
}

/// Expand `~`, `$VAR` and `${VAR}` in a path string.
fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
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
    /// Rule constants for the engine.
    pub fn rules(&self) -> Rules {
        Rules::new(self.max_points, self.points_per_row)
    }

    /// Overlay wins wherever it specifies a value. A relative catalog path is
    /// resolved against the directory of the file that named it.
    fn merge_with(&self, overlay: &RawSettings, origin: Option<&Path>) -> Self {
        let catalog = overlay.catalog.as_ref().map(|c| match origin {
            Some(dir) if c.is_relative() && !c.to_string_lossy().starts_with(['~', '$']) => {
                dir.join(c)
            }
            _ => c.clone(),
        });
        Self {
            max_points: overlay.max_points.unwrap_or(self.max_points),
            points_per_row: overlay.points_per_row.unwrap_or(self.points_per_row),
            catalog: catalog.or_else(|| self.catalog.clone()),
        }
    }

    fn expand_paths(&mut self) {
        if let Some(catalog) = &self.catalog {
            let expanded = expand_env_vars(catalog.to_string_lossy().as_ref());
            self.catalog = Some(PathBuf::from(expanded));
        }
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        if self.max_points == 0 {
            return Err(ApplicationError::Config {
                message: "max_points must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `project_dir` - Optional directory holding a local `.talentcalc.toml`
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw, global_path.parent());
            }
        }

        if let Some(dir) = project_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw, Some(dir));
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        current.validate()?;

        Ok(current)
    }

    /// Apply TALENTCALC_* environment variables as explicit overrides.
    ///
    /// `TALENTCALC_MAX_POINTS=61` sets `max_points`. A variable that is set but
    /// does not parse is an error, not a silent fallback.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("TALENTCALC")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Some(val) = env_value::<u32>(&config, "max_points")? {
            settings.max_points = val;
        }
        if let Some(val) = env_value::<u32>(&config, "points_per_row")? {
            settings.points_per_row = val;
        }
        if let Some(val) = env_value::<String>(&config, "catalog")? {
            settings.catalog = Some(PathBuf::from(val));
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
        r#"# talentcalc configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/talentcalc/talentcalc.toml
#   Local:  <project_dir>/.talentcalc.toml
#   Env:    TALENTCALC_MAX_POINTS, TALENTCALC_POINTS_PER_ROW, TALENTCALC_CATALOG

# Total points available across all trees
# max_points = 51

# Points that must be spent in lower rows per row of depth
# points_per_row = 5

# Talent catalog (TOML); the bundled warrior catalog is used when unset
# catalog = "~/talents/warrior.toml"
"#
        .to_string()
    }
}

/// `None` when the variable is unset.
fn env_value<'de, T: Deserialize<'de>>(
    config: &Config,
    key: &str,
) -> Result<Option<T>, ApplicationError> {
    match config.get::<T>(key) {
        Ok(val) => Ok(Some(val)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(ApplicationError::Config {
            message: format!("TALENTCALC_{}: {}", key.to_uppercase(), e),
        }),
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
