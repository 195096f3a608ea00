use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Editor tuning knobs.
///
/// The two debounce windows reconcile continuous typing with discrete
/// snapshots: the short window sets undo-step granularity, the long one
/// how eagerly the host is asked to persist. The placeholder is the markup
/// shown in an empty, unfocused editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Inactivity window before an undo snapshot is committed.
    #[serde(default = "default_history_debounce_ms")]
    pub history_debounce_ms: u64,
    /// Inactivity window before autosave fires.
    #[serde(default = "default_autosave_debounce_ms")]
    pub autosave_debounce_ms: u64,
    /// Markup shown when the document is empty and unfocused. A view-layer
    /// artifact, never persisted.
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

fn default_history_debounce_ms() -> u64 {
    200
}

fn default_autosave_debounce_ms() -> u64 {
    3000
}

fn default_placeholder() -> String {
    "<p>Add your notes…</p>".to_string()
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_debounce_ms: default_history_debounce_ms(),
            autosave_debounce_ms: default_autosave_debounce_ms(),
            placeholder: default_placeholder(),
        }
    }
}

impl EditorConfig {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let config: EditorConfig =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/marginalia");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }
}
