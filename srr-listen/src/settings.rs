//! Listener settings

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use srr_reader::ReaderConfig;

/// Settings persisted in `settings.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Reader configuration
    #[serde(default)]
    pub reader: ReaderConfig,
    /// Seconds between reconnect attempts
    #[serde(default = "default_retry_secs")]
    pub retry_secs: u64,
    /// Print events as JSON lines
    #[serde(default)]
    pub json: bool,
}

fn default_retry_secs() -> u64 {
    5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reader: ReaderConfig::default(),
            retry_secs: default_retry_secs(),
            json: false,
        }
    }
}

impl Settings {
    /// Get the XDG config directory for srr-listen
    /// Uses $XDG_CONFIG_HOME/srr-listen, falls back to ~/.config/srr-listen
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("srr-listen"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("srr-listen"))
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from disk, defaults if missing or unreadable
    pub fn load() -> Self {
        Self::settings_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<PathBuf, String> {
        let path =
            Self::settings_path().ok_or_else(|| "Could not determine settings path".to_string())?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create settings directory: {}", e))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        std::fs::write(path, json).map_err(|e| format!("Failed to write settings: {}", e))?;

        Ok(())
    }
}
