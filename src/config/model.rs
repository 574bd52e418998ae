//! Configuration data model.
//!
//! All structs derive `Serialize`/`Deserialize` for TOML persistence.
//! Only the credentials, nickname and channel have to be supplied.

use crate::irc::transport::DEFAULT_ENDPOINT;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happens when a ready or message callback returns an error.
/// Command callbacks are always isolated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventErrorPolicy {
    /// The error ends the session.
    #[default]
    Propagate,
    /// The error is logged and the session continues.
    Isolate,
}

/// Root bot configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub oauth_token: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub event_errors: EventErrorPolicy,
}

impl BotConfig {
    pub fn new(oauth_token: &str, nickname: &str, channel: &str) -> Self {
        Self {
            oauth_token: oauth_token.to_string(),
            nickname: nickname.to_string(),
            channel: normalize_channel(channel),
            endpoint: default_endpoint(),
            log_filter: default_log_filter(),
            event_errors: EventErrorPolicy::default(),
        }
    }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("oauth_token", &"{REDACTED}")
            .field("nickname", &self.nickname)
            .field("channel", &self.channel)
            .field("endpoint", &self.endpoint)
            .field("log_filter", &self.log_filter)
            .field("event_errors", &self.event_errors)
            .finish()
    }
}

/// Channel names always carry their leading `#`.
pub fn normalize_channel(channel: &str) -> String {
    let channel = channel.trim();
    if channel.is_empty() || channel.starts_with('#') {
        channel.to_string()
    } else {
        format!("#{}", channel)
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}
