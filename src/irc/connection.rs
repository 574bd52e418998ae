//! Connection lifecycle: handshake state machine and the receive loop.

use crate::bot::dispatcher::Dispatcher;
use crate::bot::handle::BotHandle;
use crate::error::{BotError, Result};
use crate::irc::parser::{classify, command_token, parse_join_name, ChatMessage, LineKind, PONG_LINE};
use crate::irc::transport::Transport;
use crate::logging::{log_recv, log_send};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Capabilities requested after authentication.
pub const CAPABILITIES: &str = "twitch.tv/tags twitch.tv/commands";

/// Lifecycle states, in the order a session walks through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport. A [`Session`] never reports this state; it only exists
    /// while [`Session::open`] is still inside [`Transport::connect`].
    Disconnected,
    /// Transport open, nothing sent yet.
    Connecting,
    Authenticating,
    CapabilityRequest,
    Joining,
    Ready,
    Receiving,
    Closed,
}

impl ConnectionState {
    fn successor(self) -> Option<Self> {
        use ConnectionState::*;
        match self {
            Disconnected => Some(Connecting),
            Connecting => Some(Authenticating),
            Authenticating => Some(CapabilityRequest),
            CapabilityRequest => Some(Joining),
            Joining => Some(Ready),
            Ready => Some(Receiving),
            Receiving => Some(Closed),
            Closed => None,
        }
    }
}

/// Ordered, logged write path shared by the session and every [`BotHandle`].
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<String>,
}

impl Outbox {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }

    pub fn send_line(&self, line: impl Into<String>) -> Result<()> {
        let line = line.into();
        log_send(&line);
        self.tx.send(line).map_err(|_| BotError::Closed)
    }
}

/// The single chat session of this process.
pub struct Session {
    transport: Transport,
    outbox: Outbox,
    channel: String,
    name: String,
    state: ConnectionState,
}

impl Session {
    /// Open the transport to `endpoint`.
    pub async fn open(endpoint: &str, channel: &str) -> Result<Self> {
        info!(endpoint, "Connecting to chat service");
        let transport = Transport::connect(endpoint).await?;
        info!("Connected, authenticating");
        Ok(Self::new(transport, channel))
    }

    /// Wrap an already open transport. Construction means connected: the
    /// session leaves `Disconnected` here and is in `Connecting` until the
    /// handshake starts.
    pub fn new(transport: Transport, channel: &str) -> Self {
        let outbox = Outbox::new(transport.sender());
        let mut session = Self {
            transport,
            outbox,
            channel: channel.to_string(),
            name: String::new(),
            state: ConnectionState::Disconnected,
        };
        session.advance(ConnectionState::Connecting);
        session
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Own display name, empty until the join is acknowledged.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn advance(&mut self, next: ConnectionState) {
        debug_assert_eq!(self.state.successor(), Some(next), "illegal lifecycle transition");
        debug!(from = ?self.state, to = ?next, "Lifecycle transition");
        self.state = next;
    }

    /// Read one handshake frame, failing if the server hangs up.
    async fn read_ack(&mut self, step: &str) -> Result<String> {
        let frame = self
            .transport
            .recv()
            .await?
            .ok_or_else(|| BotError::Handshake(format!("connection closed while waiting for {}", step)))?;
        for line in frame.lines() {
            log_recv(line);
        }
        Ok(frame)
    }

    /// Authenticate, negotiate capabilities and join the channel. Returns the
    /// handle callbacks use to talk back to the server.
    pub async fn handshake(&mut self, oauth_token: &str, nickname: &str) -> Result<BotHandle> {
        self.advance(ConnectionState::Authenticating);
        self.outbox.send_line(format!("PASS {}", oauth_token))?;
        self.outbox.send_line(format!("NICK {}", nickname))?;
        self.read_ack("login acknowledgement").await?;

        self.advance(ConnectionState::CapabilityRequest);
        info!("Requesting tag and command capabilities");
        self.outbox.send_line(format!("CAP REQ :{}", CAPABILITIES))?;
        self.read_ack("capability acknowledgement").await?;

        self.advance(ConnectionState::Joining);
        info!(channel = %self.channel, "Authenticated, joining channel");
        self.outbox.send_line(format!("JOIN {}", self.channel))?;
        let ack = self.read_ack("join acknowledgement").await?;
        self.name = ack
            .lines()
            .filter(|line| command_token(line) == Some("JOIN"))
            .find_map(parse_join_name)
            .ok_or_else(|| BotError::Handshake(format!("no name in join acknowledgement '{}'", ack.trim())))?;
        info!(name = %self.name, "Joined");

        Ok(BotHandle::new(self.outbox.clone(), &self.channel, &self.name))
    }

    /// Fire ready callbacks, then process lines until the transport closes.
    pub async fn run(mut self, dispatcher: &Dispatcher, bot: &BotHandle) -> Result<()> {
        self.advance(ConnectionState::Ready);
        dispatcher.fire_ready(bot).await?;

        self.advance(ConnectionState::Receiving);
        while let Some(frame) = self.transport.recv().await? {
            for line in frame.lines().map(str::trim).filter(|l| !l.is_empty()) {
                self.handle_line(line, dispatcher, bot).await?;
            }
        }

        self.advance(ConnectionState::Closed);
        info!("Connection closed");
        Ok(())
    }

    async fn handle_line(&self, line: &str, dispatcher: &Dispatcher, bot: &BotHandle) -> Result<()> {
        log_recv(line);
        match classify(line) {
            LineKind::Ping => {
                debug!("Got PING, sending PONG");
                self.outbox.send_line(PONG_LINE)
            }
            LineKind::PrivMsg => match ChatMessage::parse(line, &self.name) {
                Ok(message) => dispatcher.dispatch(bot, message).await,
                Err(e) => {
                    warn!(error = %e, "Dropping chat line");
                    Ok(())
                }
            },
            LineKind::Numeric(_) | LineKind::Other => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::registry::Registry;
    use crate::config::EventErrorPolicy;
    use futures::channel::mpsc as fmpsc;
    use std::sync::Arc;

    fn session() -> (Session, fmpsc::UnboundedSender<Result<String>>, mpsc::UnboundedReceiver<String>) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = fmpsc::unbounded();
        let transport = Transport::from_parts(out_tx, in_rx);
        (Session::new(transport, "#chan"), in_tx, out_rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn test_new_session_is_connecting() {
        let (session, _in_tx, mut out_rx) = session();
        assert_eq!(session.state(), ConnectionState::Connecting);
        assert_eq!(session.name(), "");
        assert!(drain(&mut out_rx).is_empty());
    }

    #[test]
    fn test_lifecycle_order() {
        use ConnectionState::*;
        let mut walked = vec![Disconnected];
        while let Some(next) = walked.last().and_then(|state| state.successor()) {
            walked.push(next);
        }
        assert_eq!(
            walked,
            vec![Disconnected, Connecting, Authenticating, CapabilityRequest, Joining, Ready, Receiving, Closed]
        );
    }

    #[tokio::test]
    async fn test_handshake_sequence() {
        let (mut session, in_tx, mut out_rx) = session();
        assert_eq!(session.state(), ConnectionState::Connecting);

        in_tx.unbounded_send(Ok(":tmi.twitch.tv 001 bot :Welcome, GLHF!".into())).unwrap();
        in_tx.unbounded_send(Ok(":tmi.twitch.tv CAP * ACK :twitch.tv/tags twitch.tv/commands".into())).unwrap();
        in_tx
            .unbounded_send(Ok(":Sturdy_Bot!sturdy_bot@sturdy_bot.tmi.twitch.tv JOIN #chan\r\n".into()))
            .unwrap();

        let bot = session.handshake("oauth:secret", "sturdy_bot").await.unwrap();
        assert_eq!(session.state(), ConnectionState::Joining);
        assert_eq!(session.name(), "Sturdy_Bot");
        assert_eq!(bot.name(), "Sturdy_Bot");
        assert_eq!(
            drain(&mut out_rx),
            vec![
                "PASS oauth:secret",
                "NICK sturdy_bot",
                "CAP REQ :twitch.tv/tags twitch.tv/commands",
                "JOIN #chan",
            ]
        );
    }

    #[tokio::test]
    async fn test_handshake_fails_without_join_name() {
        let (mut session, in_tx, _out_rx) = session();
        in_tx.unbounded_send(Ok(":tmi.twitch.tv 001 bot :Welcome".into())).unwrap();
        in_tx.unbounded_send(Ok(":tmi.twitch.tv CAP * ACK :twitch.tv/tags".into())).unwrap();
        in_tx.unbounded_send(Ok(":tmi.twitch.tv NOTICE * :Login authentication failed".into())).unwrap();

        let err = session.handshake("oauth:bad", "bot").await.unwrap_err();
        assert!(matches!(err, BotError::Handshake(_)));
    }

    #[tokio::test]
    async fn test_handshake_fails_on_early_close() {
        let (mut session, in_tx, _out_rx) = session();
        drop(in_tx);
        let err = session.handshake("oauth:x", "bot").await.unwrap_err();
        assert!(matches!(err, BotError::Handshake(_)));
    }

    #[tokio::test]
    async fn test_ping_is_answered_and_not_dispatched() {
        let (mut session, in_tx, mut out_rx) = session();
        in_tx.unbounded_send(Ok("001".into())).unwrap();
        in_tx.unbounded_send(Ok("ACK".into())).unwrap();
        in_tx.unbounded_send(Ok(":bot!bot@bot.tmi.twitch.tv JOIN #chan".into())).unwrap();
        let bot = session.handshake("oauth:x", "bot").await.unwrap();
        drain(&mut out_rx);

        in_tx.unbounded_send(Ok("PING :tmi.twitch.tv\r\n".into())).unwrap();
        in_tx.unbounded_send(Ok(":tmi.twitch.tv 421 bot WHAT :Unknown command".into())).unwrap();
        drop(in_tx);

        let dispatcher = Dispatcher::new(Arc::new(Registry::new()), EventErrorPolicy::Propagate);
        session.run(&dispatcher, &bot).await.unwrap();
        assert_eq!(drain(&mut out_rx), vec!["PONG :tmi.twitch.tv"]);
    }
}
