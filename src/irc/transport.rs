//! Message-framed transport to the chat service.
//!
//! The session talks to the server through two halves: an ordered outgoing
//! line queue and a stream of inbound frames. Over the network the halves
//! are a split websocket with a writer task draining the queue; in tests they
//! are plain in-memory channels.

use crate::error::{BotError, Result};
use futures::stream::BoxStream;
use futures::{SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tracing::{debug, warn};

/// Default chat endpoint.
pub const DEFAULT_ENDPOINT: &str = "wss://irc-ws.chat.twitch.tv:443";

pub struct Transport {
    pub(crate) outgoing: mpsc::UnboundedSender<String>,
    pub(crate) incoming: BoxStream<'static, Result<String>>,
}

impl Transport {
    /// Build a transport from already-wired halves.
    pub fn from_parts<S>(outgoing: mpsc::UnboundedSender<String>, incoming: S) -> Self
    where
        S: Stream<Item = Result<String>> + Send + 'static,
    {
        Self {
            outgoing,
            incoming: incoming.boxed(),
        }
    }

    /// Open a websocket session to `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        // A second install attempt only means another component got there first.
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let (ws, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| BotError::Transport(format!("connect to {} failed: {}", url, e)))?;
        let (mut sink, stream) = ws.split();

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                if let Err(e) = sink.send(WsMessage::Text(line.into())).await {
                    warn!(error = %e, "Websocket write failed, stopping writer");
                    break;
                }
            }
            let _ = sink.close().await;
            debug!("Websocket writer finished");
        });

        Ok(Self::from_parts(tx, frames(stream)))
    }

    /// Read the next frame. `Ok(None)` means the server closed the session.
    pub async fn recv(&mut self) -> Result<Option<String>> {
        self.incoming.next().await.transpose()
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<String> {
        self.outgoing.clone()
    }
}

/// Text frames as lines. A close frame or a closed-connection error ends
/// the stream cleanly; other errors surface as `BotError::Transport`.
fn frames<S>(stream: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = std::result::Result<WsMessage, WsError>>,
{
    stream
        .take_while(|frame| {
            let open = match frame {
                Ok(WsMessage::Close(_)) => false,
                Err(e) => !is_closure(e),
                _ => true,
            };
            futures::future::ready(open)
        })
        .filter_map(|frame| {
            futures::future::ready(match frame {
                Ok(WsMessage::Text(text)) => Some(Ok(text.as_str().to_string())),
                Ok(_) => None,
                Err(e) => Some(Err(BotError::Transport(e.to_string()))),
            })
        })
}

fn is_closure(e: &WsError) -> bool {
    matches!(e, WsError::ConnectionClosed | WsError::AlreadyClosed)
}
