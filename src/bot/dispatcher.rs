//! Routes parsed chat messages to event callbacks and at most one command.

use crate::bot::context::Context;
use crate::bot::handle::BotHandle;
use crate::bot::registry::{Event, EventKind, Registry};
use crate::config::EventErrorPolicy;
use crate::error::{BotError, Result};
use crate::irc::commands::parse_command;
use crate::irc::parser::ChatMessage;
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error};

pub struct Dispatcher {
    registry: Arc<Registry>,
    policy: EventErrorPolicy,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, policy: EventErrorPolicy) -> Self {
        Self { registry, policy }
    }

    /// Run every ready callback concurrently and wait for all of them.
    pub async fn fire_ready(&self, bot: &BotHandle) -> Result<()> {
        self.fan_out(&EventKind::Ready, bot, Event::Ready).await
    }

    /// Fan the message out to message callbacks, then run the matching
    /// command, if any. Command failures are logged and swallowed.
    pub async fn dispatch(&self, bot: &BotHandle, message: ChatMessage) -> Result<()> {
        let message = Arc::new(message);
        self.fan_out(&EventKind::Message, bot, Event::Message(message.clone()))
            .await?;

        if message.is_from_self {
            return Ok(());
        }
        let Some(parsed) = parse_command(&message.content) else {
            return Ok(());
        };
        let Some(handler) = self.registry.lookup_command(&parsed.name) else {
            debug!(command = %parsed.name, "Ignoring unknown command");
            return Ok(());
        };

        let name = handler.name.clone();
        let ctx = Context::new(message, parsed, bot.clone());
        let outcome = AssertUnwindSafe((handler.callback)(ctx)).catch_unwind().await;
        let source = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => e,
            Err(panic) => anyhow::anyhow!("panicked: {}", panic_message(panic.as_ref())),
        };
        let err = BotError::CommandExecution { name, source };
        error!(error = ?err, "Ignoring exception in command");
        Ok(())
    }

    async fn fan_out(&self, kind: &EventKind, bot: &BotHandle, event: Event) -> Result<()> {
        let results = join_all(
            self.registry
                .subscribers(kind)
                .map(|callback| callback(bot.clone(), event.clone())),
        )
        .await;

        let mut first_failure = None;
        for result in results {
            if let Err(e) = result {
                match self.policy {
                    EventErrorPolicy::Isolate => {
                        error!(kind = ?kind, error = ?e, "Ignoring exception in event callback")
                    }
                    EventErrorPolicy::Propagate => {
                        first_failure.get_or_insert(e);
                    }
                }
            }
        }
        match first_failure {
            Some(e) => Err(BotError::Callback(e)),
            None => Ok(()),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
