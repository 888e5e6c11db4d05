use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use galley_util::errors::{GalleyError, GalleyResult};

/// Global user configuration loaded from `~/.galley/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Universe used when neither a location nor the provisioning config names one.
    #[serde(default, rename = "default-universe")]
    pub default_universe: Option<String>,

    #[serde(default)]
    pub log: LogConfig,
}

/// Local artifact repository settings from `[repository]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default = "default_repository_name")]
    pub name: String,
    #[serde(default = "default_repository_dir")]
    pub dir: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            name: default_repository_name(),
            dir: default_repository_dir(),
        }
    }
}

fn default_repository_name() -> String {
    "local".to_string()
}

fn default_repository_dir() -> String {
    "~/.galley/repository".to_string()
}

/// Logging defaults from `[log]`; `RUST_LOG` takes precedence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl GlobalConfig {
    /// Load the global configuration from `~/.galley/config.toml`, or return defaults if the file doesn't exist.
    pub fn load() -> GalleyResult<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load from an explicit path, returning defaults if it doesn't exist.
    pub fn load_from(path: &Path) -> GalleyResult<Self> {
        if !path.is_file() {
            tracing::debug!("No global config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = galley_util::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| GalleyError::Config {
            message: format!("Failed to parse global config: {e}"),
        })
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }

    /// The repository directory with a leading `~` expanded.
    pub fn repository_root(&self) -> PathBuf {
        expand_home(&self.repository.dir)
    }
}

/// Returns the path to the Galley data directory (`~/.galley/`).
pub fn dirs_path() -> PathBuf {
    home_dir().join(".galley")
}

fn home_dir() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => home_dir().join(rest),
        None if path == "~" => home_dir(),
        None => PathBuf::from(path),
    }
}
