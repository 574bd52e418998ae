//! Twitch chat bot framework.
//!
//! One websocket session, one channel: the connection layer performs the
//! login handshake and runs the receive loop, the parser turns chat lines
//! into [`ChatMessage`]s, and the dispatcher fans them out to the callbacks
//! registered on a [`Bot`].

pub mod bot;
pub mod config;
pub mod error;
pub mod irc;
pub mod logging;

pub use bot::context::Context;
pub use bot::handle::BotHandle;
pub use bot::registry::{Event, EventCallback, EventKind};
pub use bot::Bot;
pub use config::{BotConfig, EventErrorPolicy};
pub use error::{BotError, Result};
pub use irc::parser::{ChatMessage, ChatUser};
