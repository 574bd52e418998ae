//! Runtime actions available to callbacks.

use crate::error::Result;
use crate::irc::connection::Outbox;
use crate::irc::parser::ChatUser;
use std::sync::Arc;

/// Timeout applied by [`BotHandle::timeout_user`] when no duration is given.
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Origin marker that makes the server treat a `PRIVMSG` payload as a
/// moderation command.
const SYSTEM_ORIGIN: &str = ":tmi.twitch.tv";

/// Cheap, cloneable handle to the live session. Sends may be issued from any
/// number of callbacks at once; they are written in the order issued.
#[derive(Debug, Clone)]
pub struct BotHandle {
    outbox: Outbox,
    channel: Arc<str>,
    name: Arc<str>,
}

impl BotHandle {
    pub(crate) fn new(outbox: Outbox, channel: &str, name: &str) -> Self {
        Self {
            outbox,
            channel: Arc::from(channel),
            name: Arc::from(name),
        }
    }

    /// Display name the server resolved for this bot.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Send a chat line to the joined channel.
    pub fn send(&self, text: &str) -> Result<()> {
        self.outbox
            .send_line(format!("PRIVMSG {} :{}", self.channel, sanitize(text)))
    }

    /// Send a protocol line as-is.
    pub fn send_raw(&self, line: &str) -> Result<()> {
        self.outbox.send_line(sanitize(line))
    }

    fn send_priv(&self, text: &str) -> Result<()> {
        self.outbox.send_line(format!(
            "{} PRIVMSG {} :{}",
            SYSTEM_ORIGIN,
            self.channel,
            sanitize(text)
        ))
    }

    pub fn timeout_user(&self, user: &ChatUser, duration_secs: Option<u64>) -> Result<()> {
        let duration = duration_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        self.send_priv(&format!("/timeout {} {}", user.display_name, duration))
    }

    pub fn untimeout_user(&self, user: &ChatUser) -> Result<()> {
        self.send_priv(&format!("/untimeout {}", user.display_name))
    }

    pub fn clear_chat(&self) -> Result<()> {
        self.send_priv("/clear")
    }
}

/// Line breaks would split one send into several protocol lines.
fn sanitize(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}
