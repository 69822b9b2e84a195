use crate::SettingsError;
use labstore_core::DEFAULT_WARNING_PERCENT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What to do when the `can-move` query itself fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactCheckPolicy {
    /// Block the save until a check succeeds or the parent is reverted.
    #[default]
    FailClosed,
    /// Let the move through without a warning.
    FailOpen,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    pub server_url: String,
    pub csrf_token: Option<String>,
    pub impact_check_policy: ImpactCheckPolicy,
    pub capacity_warning_percent: u32,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_string(),
            csrf_token: None,
            impact_check_policy: ImpactCheckPolicy::default(),
            capacity_warning_percent: DEFAULT_WARNING_PERCENT,
        }
    }
}

impl ConsoleSettings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("labstore").join("settings.json"))
    }

    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Falls back to defaults when the file is missing or unreadable.
    pub fn load_from(path: &Path) -> Self {
        tracing::info!("Loading settings from {:?}", path);
        if !path.exists() {
            tracing::info!("Settings file not found, using defaults");
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => return settings,
                Err(e) => tracing::error!("Failed to parse settings: {}", e),
            },
            Err(e) => tracing::error!("Failed to read settings file: {}", e),
        }
        Self::default()
    }

    pub fn save(&self) -> Result<PathBuf, SettingsError> {
        let path = Self::default_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
