//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/doxnav/doxnav.toml`
//! 3. Local config: `<doc_dir>/.doxnav.toml` (next to the generated HTML)
//! 4. Environment variables: `DOXNAV_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;
use crate::domain::{KeyOrder, ScriptNames, DEFAULT_SHARD_SIZE};

/// Raw settings for intermediate parsing (`None` → not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub doc_dir: Option<PathBuf>,
    pub data_file: Option<String>,
    pub tree_var: Option<String>,
    pub index_var: Option<String>,
    pub index_prefix: Option<String>,
    pub shard_size: Option<usize>,
    pub key_order: Option<KeyOrder>,
    pub resolve_deferred: Option<bool>,
}

/// Unified configuration for doxnav.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the generated HTML and scripts (default: ".")
    pub doc_dir: PathBuf,
    /// Navigation data file inside `doc_dir`
    pub data_file: String,
    /// Variable holding the navigation tree
    pub tree_var: String,
    /// Variable holding the shard boundaries; shard page N declares `<index_var>N`
    pub index_var: String,
    /// Shard page file prefix; shard page N is `<index_prefix>N.js`
    pub index_prefix: String,
    /// Hrefs per shard page when rebuilding the index
    pub shard_size: usize,
    /// Key normalisation for shard boundaries and queries
    pub key_order: KeyOrder,
    /// Load deferred child scripts when loading the tree
    pub resolve_deferred: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            doc_dir: PathBuf::from("."),
            data_file: "navtreedata.js".into(),
            tree_var: "NAVTREE".into(),
            index_var: "NAVTREEINDEX".into(),
            index_prefix: "navtreeindex".into(),
            shard_size: DEFAULT_SHARD_SIZE,
            key_order: KeyOrder::Bytewise,
            resolve_deferred: true,
        }
    }
}

/// Get the XDG config directory for doxnav.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "doxnav").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("doxnav.toml"))
}

/// Get the path to the local config file in a documentation directory.
pub fn local_config_path(doc_dir: &Path) -> PathBuf {
    doc_dir.join(".doxnav.toml")
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

/// Expand shell variables and tilde in a path string.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    shellexpand::full(raw.as_ref())
        .map(|s| PathBuf::from(s.into_owned()))
        .unwrap_or_else(|_| path.to_path_buf())
}

impl Settings {
    /// Script variable names as configured.
    pub fn script_names(&self) -> ScriptNames {
        ScriptNames {
            tree: self.tree_var.clone(),
            index: self.index_var.clone(),
            ..ScriptNames::default()
        }
    }

    fn expand_paths(&mut self) {
        self.doc_dir = expand_path(&self.doc_dir);
    }

    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            doc_dir: overlay.doc_dir.clone().unwrap_or_else(|| self.doc_dir.clone()),
            data_file: overlay
                .data_file
                .clone()
                .unwrap_or_else(|| self.data_file.clone()),
            tree_var: overlay.tree_var.clone().unwrap_or_else(|| self.tree_var.clone()),
            index_var: overlay
                .index_var
                .clone()
                .unwrap_or_else(|| self.index_var.clone()),
            index_prefix: overlay
                .index_prefix
                .clone()
                .unwrap_or_else(|| self.index_prefix.clone()),
            shard_size: overlay.shard_size.unwrap_or(self.shard_size),
            key_order: overlay.key_order.unwrap_or(self.key_order),
            resolve_deferred: overlay.resolve_deferred.unwrap_or(self.resolve_deferred),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `doc_dir` - Optional documentation directory for local config
    pub fn load(doc_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("config: global {}", global_path.display());
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(dir) = doc_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                debug!("config: local {}", local_path.display());
                current = current.merge_with(&load_raw_settings(&local_path)?);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        current.validate()?;

        Ok(current)
    }

    /// Apply DOXNAV_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("DOXNAV")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("doc_dir") {
            settings.doc_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("data_file") {
            settings.data_file = val;
        }
        if let Ok(val) = config.get_string("tree_var") {
            settings.tree_var = val;
        }
        if let Ok(val) = config.get_string("index_var") {
            settings.index_var = val;
        }
        if let Ok(val) = config.get_string("index_prefix") {
            settings.index_prefix = val;
        }
        if let Ok(val) = config.get_int("shard_size") {
            settings.shard_size = usize::try_from(val).map_err(|_| ApplicationError::Config {
                message: format!("DOXNAV_SHARD_SIZE out of range: {val}"),
            })?;
        }
        if let Ok(val) = config.get_string("key_order") {
            settings.key_order = val
                .parse()
                .map_err(|message| ApplicationError::Config { message })?;
        }
        if let Ok(val) = config.get_bool("resolve_deferred") {
            settings.resolve_deferred = val;
        }

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        if self.shard_size == 0 {
            return Err(ApplicationError::Config {
                message: "shard_size must be at least 1".into(),
            });
        }
        if self.data_file.is_empty() || self.tree_var.is_empty() || self.index_var.is_empty() {
            return Err(ApplicationError::Config {
                message: "data_file, tree_var and index_var must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# doxnav configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/doxnav/doxnav.toml
#   Local:  <doc_dir>/.doxnav.toml
#   Env:    DOXNAV_* environment variables

# Directory with the generated HTML documentation
# doc_dir = "."

# Navigation data file inside doc_dir
# data_file = "navtreedata.js"

# Script variables
# tree_var = "NAVTREE"
# index_var = "NAVTREEINDEX"

# Shard pages are <index_prefix>N.js
# index_prefix = "navtreeindex"

# Hrefs per shard page when rebuilding the index
# shard_size = 250

# "bytewise" or "case-insensitive"
# key_order = "bytewise"

# Load <name>.js child scripts referenced from the tree
# resolve_deferred = true
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
