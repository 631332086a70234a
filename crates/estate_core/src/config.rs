//! Runtime configuration.
//!
//! A JSON file provides the base values (every field optional), then
//! `ESTATE_*` environment variables override them.

use crate::logging::default_log_level;
use crate::repo::CollisionPolicy;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "ESTATE_DB_PATH";
pub const ENV_ASSET_ROOT: &str = "ESTATE_ASSET_ROOT";
pub const ENV_PUBLIC_BASE_URL: &str = "ESTATE_PUBLIC_BASE_URL";
pub const ENV_LOG_LEVEL: &str = "ESTATE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "ESTATE_LOG_DIR";
pub const ENV_COLLISION_POLICY: &str = "ESTATE_COLLISION_POLICY";

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    InvalidValue {
        name: &'static str,
        value: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "cannot read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "cannot parse config `{}`: {source}", path.display())
            }
            Self::InvalidValue { name, value } => write!(f, "invalid value `{value}` for {name}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::InvalidValue { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    /// No directory means file logging stays off.
    pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

/// Settings used to construct the store clients at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// SQLite file; `None` keeps documents in memory.
    pub database_path: Option<PathBuf>,
    /// Directory of the blob store; `None` keeps assets in memory.
    pub asset_root: Option<PathBuf>,
    /// Base for asset URLs served from `asset_root`.
    pub public_base_url: Option<String>,
    pub collision_policy: CollisionPolicy,
    pub log: LogConfig,
}

impl CatalogConfig {
    /// Loads `path` (defaults when `None`) and applies env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_env_overrides(|name| std::env::var(name).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies overrides read through `lookup`; blank values are ignored.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = var(ENV_DB_PATH) {
            self.database_path = Some(PathBuf::from(value));
        }
        if let Some(value) = var(ENV_ASSET_ROOT) {
            self.asset_root = Some(PathBuf::from(value));
        }
        if let Some(value) = var(ENV_PUBLIC_BASE_URL) {
            self.public_base_url = Some(value);
        }
        if let Some(value) = var(ENV_LOG_LEVEL) {
            self.log.level = value;
        }
        if let Some(value) = var(ENV_LOG_DIR) {
            self.log.dir = Some(PathBuf::from(value));
        }
        if let Some(value) = var(ENV_COLLISION_POLICY) {
            self.collision_policy =
                CollisionPolicy::parse(&value).ok_or(ConfigError::InvalidValue {
                    name: ENV_COLLISION_POLICY,
                    value,
                })?;
        }
        Ok(self)
    }
}
