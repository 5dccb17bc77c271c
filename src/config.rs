/// Application configuration
///
/// Loaded once at startup from an optional JSON file. Every field has a
/// default so an empty `{}` (or no file at all) is a valid configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::policy::ErrorPolicy;

/// Directory name used under the platform data and pictures directories
const APP_DIR: &str = "photo-viewer";

/// Scheme registered for deep links
pub const DEFAULT_SCHEME: &str = "photoviewer";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// URI scheme accepted by the deep-link decoder
    pub scheme: String,
    /// Root directory holding one subdirectory per album
    pub gallery_root: PathBuf,
    /// Directory holding the album and key databases
    pub database_dir: PathBuf,
    /// Development mode: strict invariant checks and the `control` link
    pub development: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            gallery_root: default_gallery_root(),
            database_dir: default_database_dir(),
            development: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, or from the default location when
    /// `path` is `None`. A missing default file yields the defaults; a
    /// missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (default_database_dir().join("config.json"), false),
        };

        if !path.exists() {
            if explicit {
                return Err(AppError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let text = fs::read_to_string(&path)?;
        let config = Self::from_json(&text)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parse from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| AppError::Config(e.to_string()))
    }

    /// The invariant policy implied by the development flag
    pub fn error_policy(&self) -> ErrorPolicy {
        ErrorPolicy::for_development(self.development)
    }

    pub fn albums_db_path(&self) -> PathBuf {
        self.database_dir.join("albums.db")
    }

    pub fn keys_db_path(&self) -> PathBuf {
        self.database_dir.join("keys.db")
    }
}

/// ~/.local/share/photo-viewer on Linux, falling back to the home directory
fn default_database_dir() -> PathBuf {
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}

/// ~/Pictures/photo-viewer on Linux
fn default_gallery_root() -> PathBuf {
    let mut path = dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}
