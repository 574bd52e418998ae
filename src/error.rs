//! Error types shared by the protocol layer and the bot runtime.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    /// A chat line was missing a required tag or carried an unparsable field.
    /// Only the offending line is dropped.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// A command with this name is already registered.
    #[error("Command {0} has already been registered")]
    DuplicateCommand(String),

    /// No name was given and none could be derived from the callback.
    #[error("Cannot derive a command name from {0}; pass one explicitly")]
    AnonymousCommand(String),

    /// A command callback failed. Logged by the dispatcher, never returned
    /// from the receive loop.
    #[error("Command {name} failed: {source:#}")]
    CommandExecution {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// A ready or message callback failed under the propagate policy.
    #[error("Event callback failed: {0:#}")]
    Callback(anyhow::Error),

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Transport error: {0}")]
    Transport(String),

    /// The outgoing half of the session is gone.
    #[error("Connection closed")]
    Closed,

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, BotError>;
