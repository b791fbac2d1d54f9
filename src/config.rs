//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/orgtree/orgtree.toml`
//! 3. Local config: file passed with `--config`
//! 4. Environment variables: `ORGTREE_*` prefix, `__` between sections
//!    (e.g. `ORGTREE_CACHE__DEFAULT_TTL_SECS=60`)

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::services::UnitKeyMatch;
use crate::application::ApplicationError;
use crate::domain::{BuildOptions, DEFAULT_MAX_DEPTH};

/// Default cache entry lifetime in seconds.
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// Cache behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheSettings {
    /// Lifetime applied when a caller passes no ttl
    pub default_ttl_secs: u64,
    /// How `invalidate_unit` matches keys
    pub unit_match: UnitKeyMatch,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl_secs: DEFAULT_TTL_SECS,
            unit_match: UnitKeyMatch::default(),
        }
    }
}

/// Limits for building trees from raw input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TreeSettings {
    pub max_depth: usize,
    /// Fail on a repeated unit id; when off the first occurrence wins,
    /// for nested documents and flat unit lists alike
    pub reject_duplicate_ids: bool,
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            reject_duplicate_ids: true,
        }
    }
}

impl TreeSettings {
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            max_depth: self.max_depth,
            reject_duplicate_ids: self.reject_duplicate_ids,
        }
    }
}

/// Unified configuration for orgtree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Settings {
    /// Unit data file used when the CLI gets no explicit file
    pub units_file: Option<PathBuf>,
    pub cache: CacheSettings,
    pub tree: TreeSettings,
}

/// Get the XDG config directory for orgtree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "orgtree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("orgtree.toml"))
}

impl Settings {
    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_config` - Optional explicit config file; must exist when given
    pub fn load(local_config: Option<&Path>) -> Result<Self, ApplicationError> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default(
                "cache.default_ttl_secs",
                defaults.cache.default_ttl_secs as i64,
            )
            .map_err(config_err)?
            .set_default("cache.unit_match", defaults.cache.unit_match.as_str())
            .map_err(config_err)?
            .set_default("tree.max_depth", defaults.tree.max_depth as i64)
            .map_err(config_err)?
            .set_default("tree.reject_duplicate_ids", defaults.tree.reject_duplicate_ids)
            .map_err(config_err)?;

        // 2. Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(File::from(global_path).required(false));
            }
        }

        // 3. Local config (explicit, so it must exist)
        if let Some(local) = local_config {
            builder = builder.add_source(
                File::from(local.to_path_buf())
                    .format(FileFormat::Toml)
                    .required(true),
            );
        }

        // 4. Environment variables
        builder = builder.add_source(
            Environment::with_prefix("ORGTREE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_err)?;
        let mut settings: Self = config.try_deserialize().map_err(config_err)?;

        settings.expand_paths();
        Ok(settings)
    }

    /// Expand `~`, `$VAR` and `${VAR}` in path-like fields.
    fn expand_paths(&mut self) {
        if let Some(path) = &self.units_file {
            self.units_file = Some(PathBuf::from(expand_env_vars(&path.to_string_lossy())));
        }
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# orgtree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/orgtree/orgtree.toml
#   Local:  file passed with --config
#   Env:    ORGTREE_* environment variables, e.g. ORGTREE_CACHE__DEFAULT_TTL_SECS=60

# Unit data file used when no file argument is given
# units_file = "~/data/units.json"

[cache]
# Lifetime of cached trees, statistics and unit contexts (seconds)
# default_ttl_secs = 3600

# Key matching for unit invalidation:
#   "segment"   - only keys whose id segment equals the unit id
#   "substring" - any key containing "_<id>" (legacy, also hits _10, _11, ...)
# unit_match = "segment"

[tree]
# Maximum nesting accepted when building hierarchies
# max_depth = 64

# Reject input where the same unit id appears twice;
# when false the first occurrence is kept
# reject_duplicate_ids = true
"#
        .to_string()
    }
}

/// Expand environment variables and `~` in a path string.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
