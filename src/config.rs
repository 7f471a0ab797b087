//! Application configuration loaded from `config.toml`.
//!
//! Secrets (the bot token) are deliberately absent; they are read from the
//! environment right before use.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::{fs, path::Path};

/// Default bound on concurrently running script callbacks.
pub const DEFAULT_MAX_CONCURRENT_CALLBACKS: usize = 16;

/// Top-level configuration file layout.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct AppConfig {
    /// Script runtime settings
    #[serde(default)]
    pub runtime: RuntimeConfig,
    /// Discord connection settings
    #[serde(default)]
    pub bot: BotConfig,
}

/// Settings for the worker pool that runs script callbacks.
#[derive(Deserialize, Debug, Clone)]
pub struct RuntimeConfig {
    /// How many callbacks may execute at the same time
    #[serde(default = "default_max_concurrent_callbacks")]
    pub max_concurrent_callbacks: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_concurrent_callbacks: DEFAULT_MAX_CONCURRENT_CALLBACKS,
        }
    }
}

/// Settings for the Discord gateway connection.
#[derive(Deserialize, Debug, Clone)]
pub struct BotConfig {
    /// Register slash commands in this guild only (faster updates while developing)
    #[serde(default)]
    pub guild_id: Option<u64>,
    /// Request the privileged message content intent
    #[serde(default = "default_true")]
    pub message_content: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            guild_id: None,
            message_content: true,
        }
    }
}

const fn default_max_concurrent_callbacks() -> usize {
    DEFAULT_MAX_CONCURRENT_CALLBACKS
}

const fn default_true() -> bool {
    true
}

/// Reads and parses a TOML configuration file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = fs::read_to_string(path_ref)
        .map_err(|e| Error::Config(format!("Failed to read config file {path_ref:?}: {e}")))?;
    parse_config(&contents)
        .map_err(|e| Error::Config(format!("Failed to parse config file {path_ref:?}: {e}")))
}

/// Parses configuration from a TOML string.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let app_config: AppConfig =
        toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))?;
    if app_config.runtime.max_concurrent_callbacks == 0 {
        return Err(Error::Config(
            "runtime.max_concurrent_callbacks must be at least 1".to_string(),
        ));
    }
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_defaults_when_empty() -> Result<()> {
        let config = parse_config("")?;
        assert_eq!(
            config.runtime.max_concurrent_callbacks,
            DEFAULT_MAX_CONCURRENT_CALLBACKS
        );
        assert!(config.bot.guild_id.is_none());
        assert!(config.bot.message_content);
        Ok(())
    }

    #[test]
    fn test_parse_config_reads_all_sections() -> Result<()> {
        let config = parse_config(
            r#"
            [runtime]
            max_concurrent_callbacks = 4

            [bot]
            guild_id = 1234567890
            message_content = false
            "#,
        )?;
        assert_eq!(config.runtime.max_concurrent_callbacks, 4);
        assert_eq!(config.bot.guild_id, Some(1_234_567_890));
        assert!(!config.bot.message_content);
        Ok(())
    }

    #[test]
    fn test_parse_config_rejects_zero_workers() {
        let result = parse_config("[runtime]\nmax_concurrent_callbacks = 0\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("definitely/not/here.toml");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
