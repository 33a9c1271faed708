//! Configuration loading for tinywax.
#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Get the tinywax home directory (~/.tinywax).
pub fn get_home_dir() -> Result<PathBuf> {
    let home = directories::UserDirs::new()
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

    Ok(home.home_dir().join(".tinywax"))
}

/// Get the settings file path.
pub fn get_settings_path() -> Result<PathBuf> {
    Ok(get_home_dir()?.join("settings.json"))
}

/// Load settings from ~/.tinywax/settings.json
pub fn load_settings() -> Result<Settings> {
    load_settings_from(&get_settings_path()?)
}

/// Load settings from an explicit path.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "Settings file not found at {}. Run 'tinywax config init' first.",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)?;
    let settings: Settings = serde_json::from_str(&content)?;

    validate_settings(&settings)?;

    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.jukebox.max_choices == 0 {
        return Err(Error::Config(
            "jukebox.max_choices must be at least 1".to_string(),
        ));
    }
    if settings.jukebox.prompt_timeout_secs == 0 {
        return Err(Error::Config(
            "jukebox.prompt_timeout_secs must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Load settings or return default if not found.
pub fn load_settings_or_default() -> Settings {
    load_settings().unwrap_or_else(|e| {
        tracing::warn!("Failed to load settings: {}, using defaults", e);
        Settings::default()
    })
}

/// Write settings to disk as pretty JSON.
pub fn save_settings(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, content)?;
    tracing::debug!("Saved settings to {}", path.display());
    Ok(())
}

/// Channel configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ChannelConfig {
    pub bot_token: Option<String>,
}

/// Channels configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Channels {
    #[serde(default)]
    pub telegram: ChannelConfig,
}

/// Jukebox behavior knobs.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Jukebox {
    /// Seconds a disambiguation prompt stays open before expiring.
    #[serde(default = "default_prompt_timeout_secs")]
    pub prompt_timeout_secs: u64,

    /// Seconds before a cancellation acknowledgment is retracted.
    #[serde(default = "default_cancel_ack_secs")]
    pub cancel_ack_secs: u64,

    /// Maximum candidates offered in a disambiguation prompt.
    #[serde(default = "default_max_choices")]
    pub max_choices: usize,
}

fn default_prompt_timeout_secs() -> u64 {
    60
}

fn default_cancel_ack_secs() -> u64 {
    5
}

fn default_max_choices() -> usize {
    4
}

impl Default for Jukebox {
    fn default() -> Self {
        Self {
            prompt_timeout_secs: default_prompt_timeout_secs(),
            cancel_ack_secs: default_cancel_ack_secs(),
            max_choices: default_max_choices(),
        }
    }
}

/// DJ roster: sender ids allowed to run moderation commands.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Djs {
    #[serde(default)]
    pub sender_ids: Vec<i64>,
}

impl Djs {
    pub fn contains(&self, sender_id: i64) -> bool {
        self.sender_ids.contains(&sender_id)
    }
}

/// tinywax settings.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Settings {
    #[serde(default)]
    pub channels: Channels,

    #[serde(default)]
    pub jukebox: Jukebox,

    #[serde(default)]
    pub djs: Djs,
}
