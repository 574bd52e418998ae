//! Event subscriptions and named commands.

use crate::bot::context::Context;
use crate::bot::handle::BotHandle;
use crate::error::{BotError, Result};
use crate::irc::parser::ChatMessage;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Logical event type a callback subscribes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Ready,
    Message,
    /// Accepted and stored, never fired by the runtime.
    Custom(String),
}

impl From<&str> for EventKind {
    fn from(name: &str) -> Self {
        match name {
            "ready" | "on_ready" => EventKind::Ready,
            "message" | "on_message" => EventKind::Message,
            other => EventKind::Custom(other.to_string()),
        }
    }
}

/// Payload delivered to event callbacks.
#[derive(Debug, Clone)]
pub enum Event {
    Ready,
    Message(Arc<ChatMessage>),
}

pub type EventCallback =
    Arc<dyn Fn(BotHandle, Event) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

pub type CommandCallback =
    Arc<dyn Fn(Context) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

#[derive(Clone)]
pub struct EventSubscription {
    pub kind: EventKind,
    pub callback: EventCallback,
}

#[derive(Clone)]
pub struct CommandHandler {
    pub name: String,
    pub callback: CommandCallback,
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler").field("name", &self.name).finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct Registry {
    events: Vec<EventSubscription>,
    commands: HashMap<String, CommandHandler>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_event(&mut self, kind: EventKind, callback: EventCallback) {
        info!(kind = ?kind, "Appended event callback");
        self.events.push(EventSubscription { kind, callback });
    }

    /// Insert a command. An existing entry with the same name is kept and
    /// the new one rejected.
    pub fn register_command(&mut self, name: &str, callback: CommandCallback) -> Result<()> {
        if self.commands.contains_key(name) {
            info!(command = name, "Command already registered");
            return Err(BotError::DuplicateCommand(name.to_string()));
        }
        self.commands.insert(
            name.to_string(),
            CommandHandler {
                name: name.to_string(),
                callback,
            },
        );
        info!(command = name, "Command registered");
        Ok(())
    }

    pub fn lookup_command(&self, name: &str) -> Option<&CommandHandler> {
        self.commands.get(name)
    }

    pub fn subscribers<'a>(&'a self, kind: &'a EventKind) -> impl Iterator<Item = &'a EventCallback> + 'a {
        self.events
            .iter()
            .filter(move |sub| &sub.kind == kind)
            .map(|sub| &sub.callback)
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }
}
