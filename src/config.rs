//! Startup configuration
//!
//! A JSON object naming the database file:
//!
//! ```json
//! { "path": "graph.db" }
//! ```
//!
//! Relative paths are resolved against the directory holding the config
//! file. Unknown keys are ignored.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that abort startup before any adapter is built.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config {} has no \"path\" entry", .0.display())]
    MissingPath(PathBuf),
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    path: Option<String>,
}

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Database file to expose
    pub path: PathBuf,
}

impl Config {
    /// Load and resolve a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_json(&text, base).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            ConfigError::MissingPath(_) => ConfigError::MissingPath(path.to_path_buf()),
            other => other,
        })
    }

    /// Parse config text, resolving a relative `path` against `base`.
    pub fn from_json(text: &str, base: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        let db = raw
            .path
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ConfigError::MissingPath(PathBuf::new()))?;

        let db = PathBuf::from(db);
        let path = if db.is_absolute() { db } else { base.join(db) };
        Ok(Self { path })
    }
}
