//! Per-invocation context handed to command callbacks.

use crate::bot::handle::BotHandle;
use crate::error::Result;
use crate::irc::commands::ParsedCommand;
use crate::irc::parser::{ChatMessage, ChatUser};
use std::sync::Arc;

/// Invocation context handed to a command callback.
#[derive(Debug, Clone)]
pub struct Context {
    pub message: Arc<ChatMessage>,
    pub command_name: String,
    /// Text after the command name, `None` when nothing follows it.
    pub params: Option<String>,
    pub bot: BotHandle,
}

impl Context {
    pub(crate) fn new(message: Arc<ChatMessage>, command: ParsedCommand, bot: BotHandle) -> Self {
        Self {
            message,
            command_name: command.name,
            params: command.params,
            bot,
        }
    }

    pub fn author(&self) -> &ChatUser {
        &self.message.user
    }

    pub fn content(&self) -> &str {
        &self.message.content
    }

    /// Reply in the channel the command came from.
    pub fn send(&self, text: &str) -> Result<()> {
        self.bot.send(text)
    }
}
