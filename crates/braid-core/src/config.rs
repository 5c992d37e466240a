use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use braid_util::errors::BraidError;

/// Environment variable that overrides `[resolve] env`.
pub const ENV_VAR: &str = "BRAID_ENV";

/// User configuration loaded from `~/.braid/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub resolve: ResolveConfig,
}

/// Resolution settings from `[resolve]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveConfig {
    /// Environment used to filter `only` dependencies. Unset keeps every dependency.
    #[serde(default)]
    pub env: Option<String>,
    /// Directory (relative to the project root) holding fetched dependencies.
    #[serde(default = "default_deps_path", rename = "deps-path")]
    pub deps_path: String,
    #[serde(default = "default_lockfile")]
    pub lockfile: String,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            env: None,
            deps_path: default_deps_path(),
            lockfile: default_lockfile(),
        }
    }
}

fn default_deps_path() -> String {
    "deps".to_string()
}

fn default_lockfile() -> String {
    "Braid.lock".to_string()
}

impl Config {
    /// Load the configuration from `~/.braid/config.toml`, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    pub fn load_from(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| BraidError::Config {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        toml::from_str(&content).map_err(|e| {
            BraidError::Config {
                message: format!("Failed to parse {}: {e}", path.display()),
            }
            .into()
        })
    }

    /// Returns the default path to the config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }

    /// The env to resolve for: `BRAID_ENV` first, then `[resolve] env`.
    pub fn effective_env(&self) -> Option<String> {
        std::env::var(ENV_VAR)
            .ok()
            .filter(|e| !e.is_empty())
            .or_else(|| self.resolve.env.clone())
    }
}

/// Returns the path to the Braid data directory (`~/.braid/`).
pub fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".braid")
}
