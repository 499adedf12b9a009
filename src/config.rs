//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/indtree/indtree.toml`
//! 3. Local config: file given with `--config`
//! 4. Environment variables: `INDTREE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{IdStrategy, LeafDefaults, ThresholdType};

/// Raw leaf defaults for intermediate parsing (fields are Option to detect "not specified").
///
/// - `None` → field not specified, inherit from base
/// - `Some([])` → explicit empty array
/// - `Some([...])` → explicit values to merge
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawLeafDefaults {
    pub threshold_type: Option<ThresholdType>,
    pub precision: Option<u32>,
    pub file_types: Option<Vec<String>>,
    pub max_size: Option<String>,
    pub data_indicator_name: Option<String>,
    pub material_name: Option<String>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub store_dir: Option<PathBuf>,
    pub id_strategy: Option<IdStrategy>,
    pub defaults: RawLeafDefaults,
}

/// Union of `base` and `overlay`, keeping first-seen order.
///
/// Items prefixed with `!` remove the corresponding item from the result.
///
/// # Examples
/// ```ignore
/// merge_array(&["PDF", "Word"], &["Zip"])         // → ["PDF", "Word", "Zip"]
/// merge_array(&["PDF", "Word"], &["!Word", "Zip"]) // → ["PDF", "Zip"]
/// ```
pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
    let mut result: Vec<String> = Vec::with_capacity(base.len() + overlay.len());
    for item in base {
        if !result.contains(item) {
            result.push(item.clone());
        }
    }
    for pattern in overlay {
        if let Some(negated) = pattern.strip_prefix('!') {
            result.retain(|item| item != negated);
        } else if !result.contains(pattern) {
            result.push(pattern.clone());
        }
    }
    result
}

impl LeafDefaults {
    /// Merge overlay onto self: scalars win if given, `file_types` unions.
    pub fn merge(&self, overlay: &RawLeafDefaults) -> Self {
        Self {
            file_types: overlay
                .file_types
                .as_ref()
                .map(|o| merge_array(&self.file_types, o))
                .unwrap_or_else(|| self.file_types.clone()),
            ..self.apply_scalars(overlay)
        }
    }

    /// Apply global config onto defaults: `file_types` is REPLACED if given.
    pub fn apply_global(&self, global: &RawLeafDefaults) -> Self {
        Self {
            file_types: global
                .file_types
                .clone()
                .unwrap_or_else(|| self.file_types.clone()),
            ..self.apply_scalars(global)
        }
    }

    fn apply_scalars(&self, raw: &RawLeafDefaults) -> Self {
        Self {
            threshold_type: raw.threshold_type.unwrap_or(self.threshold_type),
            precision: raw.precision.unwrap_or(self.precision),
            file_types: self.file_types.clone(),
            max_size: raw.max_size.clone().unwrap_or_else(|| self.max_size.clone()),
            data_indicator_name: raw
                .data_indicator_name
                .clone()
                .unwrap_or_else(|| self.data_indicator_name.clone()),
            material_name: raw
                .material_name
                .clone()
                .unwrap_or_else(|| self.material_name.clone()),
        }
    }
}

/// Unified configuration for indtree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Root of the JSON file store (default: ~/.indtree/systems)
    pub store_dir: PathBuf,
    /// How new ids are generated
    pub id_strategy: IdStrategy,
    /// Values for leaf-content fields left empty
    pub defaults: LeafDefaults,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            id_strategy: IdStrategy::default(),
            defaults: LeafDefaults::default(),
        }
    }
}

/// Get the default store directory (~/.indtree/systems).
fn default_store_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".indtree").join("systems"))
        .unwrap_or_else(|| PathBuf::from("~/.indtree/systems"))
}

/// Get the XDG config directory for indtree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "indtree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("indtree.toml"))
}

/// Expand `~`, `$VAR` and `${VAR}`; unknown variables leave the input as is.
pub fn expand_env_vars(path: &str) -> String {
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
    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.store_dir.to_string_lossy().as_ref());
        self.store_dir = PathBuf::from(expanded);
    }

    /// Merge overlay config onto self (base) with union semantics for arrays.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            store_dir: overlay
                .store_dir
                .clone()
                .unwrap_or_else(|| self.store_dir.clone()),
            id_strategy: overlay.id_strategy.unwrap_or(self.id_strategy),
            defaults: self.defaults.merge(&overlay.defaults),
        }
    }

    /// Apply global config onto defaults with REPLACE semantics for arrays.
    fn apply_global(&self, global: &RawSettings) -> Self {
        Self {
            store_dir: global
                .store_dir
                .clone()
                .unwrap_or_else(|| self.store_dir.clone()),
            id_strategy: global.id_strategy.unwrap_or(self.id_strategy),
            defaults: self.defaults.apply_global(&global.defaults),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local` - Optional config file given on the command line
    ///
    /// # Array Merge Semantics
    /// - Defaults → Global: REPLACE
    /// - Global → Local: UNION with `!item` negation
    /// - Any → Env vars: REPLACE
    pub fn load(local: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.apply_global(&raw);
            }
        }

        if let Some(local_path) = local {
            if !local_path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", local_path.display()),
                });
            }
            let raw = load_raw_settings(local_path)?;
            current = current.merge_with(&raw);
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply INDTREE_* environment variables as explicit overrides.
    ///
    /// Nested keys use `__`, e.g. `INDTREE_DEFAULTS__MAX_SIZE=20MB`;
    /// `INDTREE_DEFAULTS__FILE_TYPES` is a comma-separated list.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("INDTREE")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("defaults.file_types"),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("store_dir") {
            settings.store_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("id_strategy") {
            settings.id_strategy = IdStrategy::parse(&val).ok_or_else(|| ApplicationError::Config {
                message: format!("INDTREE_ID_STRATEGY: unknown strategy {:?}", val),
            })?;
        }
        if let Ok(val) = config.get_string("defaults.threshold_type") {
            settings.defaults.threshold_type =
                ThresholdType::parse(&val).ok_or_else(|| ApplicationError::Config {
                    message: format!("INDTREE_DEFAULTS__THRESHOLD_TYPE: unknown type {:?}", val),
                })?;
        }
        if let Ok(val) = config.get_int("defaults.precision") {
            settings.defaults.precision = u32::try_from(val).map_err(|_| ApplicationError::Config {
                message: format!("INDTREE_DEFAULTS__PRECISION: out of range: {}", val),
            })?;
        }
        if let Ok(val) = config.get::<Vec<String>>("defaults.file_types") {
            settings.defaults.file_types = val;
        }
        if let Ok(val) = config.get_string("defaults.max_size") {
            settings.defaults.max_size = val;
        }
        if let Ok(val) = config.get_string("defaults.data_indicator_name") {
            settings.defaults.data_indicator_name = val;
        }
        if let Ok(val) = config.get_string("defaults.material_name") {
            settings.defaults.material_name = val;
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
        r#"# indtree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/indtree/indtree.toml  (defines your baseline)
#   Local:  file passed with --config        (per-project additions)
#   Env:    INDTREE_* environment variables   (explicit overrides)
#
# Array Merge Semantics:
#   Global config REPLACES compiled defaults.
#   Local config UNIONS with global.
#   Use "!item" in local config to REMOVE an inherited item:
#     file_types = ["Zip", "!Excel"]  # adds Zip, removes Excel

# Directory holding saved indicator systems (<system_id>.json)
# store_dir = "~/.indtree/systems"

# Id generation for new indicators and records: "uuid" or "sequential"
# id_strategy = "uuid"

[defaults]
# Threshold type for data indicators without one: "single" or "range"
# threshold_type = "single"

# Decimal places for data indicators without a precision
# precision = 2

# Allowed file types for supporting materials
# file_types = ["PDF", "Word", "Excel"]

# Upload size limit for supporting materials
# max_size = "10MB"

# Names given to records created without one
# data_indicator_name = "New data indicator"
# material_name = "New supporting material"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
