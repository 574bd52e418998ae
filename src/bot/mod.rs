//! Application-facing bot: callback registration and the run entry points.
//!
//! ```no_run
//! use crabtmi::{Bot, BotConfig, Context};
//!
//! async fn ping(ctx: Context) -> anyhow::Result<()> {
//!     ctx.send("pong")?;
//!     Ok(())
//! }
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut bot = Bot::new(BotConfig::new("oauth:token", "my_bot", "#my_channel"));
//! bot.command_fn(ping)?;
//! let runtime = tokio::runtime::Runtime::new()?;
//! bot.run_on(&runtime)?;
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod dispatcher;
pub mod handle;
pub mod registry;

use crate::config::BotConfig;
use crate::error::{BotError, Result};
use crate::irc::connection::Session;
use crate::irc::parser::ChatMessage;
use crate::irc::transport::Transport;
use context::Context;
use dispatcher::Dispatcher;
use futures::FutureExt;
use handle::BotHandle;
use registry::{Event, EventCallback, EventKind, Registry};
use std::future::Future;
use std::sync::Arc;

pub struct Bot {
    config: BotConfig,
    registry: Registry,
}

impl Bot {
    pub fn new(config: BotConfig) -> Self {
        Self {
            config,
            registry: Registry::new(),
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Called once after the channel is joined, before any chat line.
    pub fn on_ready<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(BotHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.registry
            .register_event(EventKind::Ready, Arc::new(move |bot: BotHandle, _event: Event| f(bot).boxed()));
        self
    }

    /// Called for every chat message, including the bot's own.
    pub fn on_message<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(BotHandle, Arc<ChatMessage>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let callback: EventCallback = Arc::new(move |bot: BotHandle, event: Event| match event {
            Event::Message(message) => f(bot, message).boxed(),
            Event::Ready => futures::future::ok(()).boxed(),
        });
        self.registry.register_event(EventKind::Message, callback);
        self
    }

    /// Subscribe to an event by name. `ready` and `message` (or their
    /// `on_` forms) are fired by the runtime; other names are stored only.
    pub fn on_event(&mut self, kind: impl Into<EventKind>, callback: EventCallback) -> &mut Self {
        self.registry.register_event(kind.into(), callback);
        self
    }

    /// Register a command under `name`.
    pub fn command<F, Fut>(&mut self, name: &str, f: F) -> Result<&mut Self>
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.registry
            .register_command(name, Arc::new(move |ctx: Context| f(ctx).boxed()))?;
        Ok(self)
    }

    /// Register a command named after the function passed in.
    pub fn command_fn<F, Fut>(&mut self, f: F) -> Result<&mut Self>
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let name = callback_name::<F>()?;
        self.command(&name, f)
    }

    /// Connect to the configured endpoint and run until the server closes
    /// the session.
    pub async fn run(self) -> Result<()> {
        let session = Session::open(&self.config.endpoint, &self.config.channel).await?;
        self.drive(session).await
    }

    /// Run over an already open transport.
    pub async fn run_with(self, transport: Transport) -> Result<()> {
        let session = Session::new(transport, &self.config.channel);
        self.drive(session).await
    }

    /// Block the current thread on `runtime` until the session ends.
    pub fn run_on(self, runtime: &tokio::runtime::Runtime) -> Result<()> {
        runtime.block_on(self.run())
    }

    async fn drive(self, mut session: Session) -> Result<()> {
        let Bot { config, registry } = self;
        let bot = session.handshake(&config.oauth_token, &config.nickname).await?;
        let dispatcher = Dispatcher::new(Arc::new(registry), config.event_errors);
        session.run(&dispatcher, &bot).await
    }
}

/// Name of a function item, e.g. `ping` for `my_bot::commands::ping`.
fn callback_name<F>() -> Result<String> {
    let full = std::any::type_name::<F>();
    let name = full.rsplit("::").next().unwrap_or(full);
    if full.contains("{{closure}}") || name.is_empty() {
        return Err(BotError::AnonymousCommand(full.to_string()));
    }
    Ok(name.to_string())
}
