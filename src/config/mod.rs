pub mod model;

use crate::error::{BotError, Result};
use std::path::{Path, PathBuf};

pub use model::{normalize_channel, BotConfig, EventErrorPolicy};

/// Environment variable that overrides `oauth_token` from the file.
pub const OAUTH_ENV: &str = "CRABTMI_OAUTH";

fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("crabtmi")
        .join("config.toml")
}

/// Load the config from `path`, or from the per-user config directory.
pub fn load_config(path: Option<&Path>) -> Result<BotConfig> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);
    let contents = std::fs::read_to_string(&path)
        .map_err(|e| BotError::Config(format!("Failed to read config from {}: {}", path.display(), e)))?;
    let mut config = parse_config(&contents)?;
    if let Ok(token) = std::env::var(OAUTH_ENV) {
        config.oauth_token = token;
    }
    validate(&config)?;
    Ok(config)
}

/// Parse TOML config text and normalise the channel name.
pub fn parse_config(contents: &str) -> Result<BotConfig> {
    let mut config: BotConfig = toml::from_str(contents)
        .map_err(|e| BotError::Config(format!("Failed to parse config file: {}", e)))?;
    config.channel = normalize_channel(&config.channel);
    Ok(config)
}

pub fn validate(config: &BotConfig) -> Result<()> {
    for (field, value) in [
        ("oauth_token", &config.oauth_token),
        ("nickname", &config.nickname),
        ("channel", &config.channel),
    ] {
        if value.trim().is_empty() {
            return Err(BotError::Config(format!("{} is required", field)));
        }
    }
    Ok(())
}
