//! Persisted tool configuration (`config.json`)

use crate::error::{AutoSpecError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Settings kept between runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the invoice folders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
}

impl AppConfig {
    /// `config.json` next to the running executable, or in the current
    /// directory when the executable location is unknown
    pub fn default_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_default()
            .join(CONFIG_FILE_NAME)
    }

    /// Load configuration from a JSON file; a missing file is an empty config
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Overwrite the file with this configuration
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// The configured directory, which must still exist
    pub fn base_dir(&self) -> Result<&Path> {
        let dir = self.base_dir.as_deref().ok_or(AutoSpecError::BaseDirUnset)?;
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(AutoSpecError::InvalidBaseDir(dir.to_path_buf()))
        }
    }

    /// Set the directory from user input, leaving the config untouched when
    /// the input is not an existing directory
    pub fn set_base_dir(&mut self, raw: &str) -> Result<&Path> {
        let dir = normalize_path(raw);
        if dir.as_os_str().is_empty() || !dir.is_dir() {
            return Err(AutoSpecError::InvalidBaseDir(dir));
        }

        Ok(self.base_dir.insert(dir).as_path())
    }

    pub fn clear_base_dir(&mut self) {
        self.base_dir = None;
    }
}

/// Trim whitespace and the quotes a pasted path often carries
pub fn normalize_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim().trim_matches('"').trim_matches('\'');
    PathBuf::from(trimmed)
}
