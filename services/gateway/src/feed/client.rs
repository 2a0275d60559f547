//! Sale feed websocket client
//!
//! Connects to the upstream socket.io endpoint, joins the sale feed and
//! hands every `saleFeed` batch to a [`SaleFeedHandler`]. Runs until the
//! shutdown channel flips, reconnecting with exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use futures::{SinkExt, StreamExt};
use sale_window::{FeedBatch, IngestionResult, SaleFeedHandler};
use serde_json::{Value, json};
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use super::protocol::{self, EnginePacket, OpenInfo, SocketPacket};
use crate::config::FeedConfig;

pub const SALE_FEED_EVENT: &str = "saleFeed";
pub const SALE_FEED_JOIN_EVENT: &str = "saleFeedJoin";

const INITIAL_RECONNECT_DELAY: Duration = Duration::from_secs(1);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(60);
/// Read deadline used until the server announces its ping schedule.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// How a session ended without a transport fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Shutdown,
    Closed,
}

/// What the session loop should do after one frame.
#[derive(Debug, PartialEq)]
enum FrameAction {
    Continue,
    /// Engine.io handshake; connect to the namespace.
    Opened(OpenInfo),
    Reply(String),
    /// Namespace connect acknowledged; join the feed.
    Connected,
    Close,
}

pub struct FeedClient {
    config: FeedConfig,
    handler: Arc<dyn SaleFeedHandler>,
}

impl FeedClient {
    pub fn new(config: FeedConfig, handler: Arc<dyn SaleFeedHandler>) -> Self {
        Self { config, handler }
    }

    /// Payload of the `saleFeedJoin` subscription.
    pub fn join_payload(&self) -> Value {
        json!({
            "currency": self.config.currency,
            "locale": self.config.locale,
            "appid": self.config.app_id,
        })
    }

    /// Run until `shutdown` becomes true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut reconnect_delay = INITIAL_RECONNECT_DELAY;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let wait = match self.connect_and_stream(&mut shutdown).await {
                Ok(SessionEnd::Shutdown) => break,
                Ok(SessionEnd::Closed) => {
                    info!("Sale feed closed by server, reconnecting");
                    reconnect_delay = INITIAL_RECONNECT_DELAY;
                    reconnect_delay
                }
                Err(e) => {
                    error!("Sale feed error: {:#}", e);
                    warn!(delay = ?reconnect_delay, "Reconnecting to sale feed");
                    let wait = reconnect_delay;
                    reconnect_delay = next_delay(reconnect_delay);
                    wait
                }
            };

            tokio::select! {
                _ = sleep(wait) => {}
                _ = shutdown.changed() => {}
            }
        }

        info!("Sale feed client stopped");
    }

    async fn connect_and_stream(&self, shutdown: &mut watch::Receiver<bool>) -> Result<SessionEnd> {
        info!(url = %self.config.url, "Connecting to sale feed");

        let (ws_stream, response) = connect_async(self.config.url.as_str())
            .await
            .context("Failed to connect to sale feed")?;
        info!(status = %response.status(), "Sale feed websocket connected");

        let (mut write, mut read) = ws_stream.split();
        let mut read_deadline = HANDSHAKE_TIMEOUT;
        let mut joined = false;

        loop {
            let message = tokio::select! {
                _ = shutdown.changed() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(SessionEnd::Shutdown);
                }
                next = timeout(read_deadline, read.next()) => match next {
                    Ok(message) => message,
                    Err(_) => bail!("No frame from sale feed within {:?}", read_deadline),
                },
            };

            let message = match message {
                Some(Ok(Message::Ping(payload))) => {
                    write
                        .send(Message::Pong(payload))
                        .await
                        .context("Failed to send websocket pong")?;
                    continue;
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "Sale feed sent close frame");
                    return closed(joined);
                }
                Some(Ok(message)) => message,
                Some(Err(e)) => return Err(e).context("Sale feed read failed"),
                None => return closed(joined),
            };

            match self.handle_frame(&message)? {
                FrameAction::Continue => {}
                FrameAction::Opened(info) => {
                    read_deadline = Duration::from_millis(
                        info.ping_interval.saturating_add(info.ping_timeout),
                    );
                    debug!(sid = %info.sid, ?read_deadline, "Engine.io session opened");
                    let connect =
                        protocol::encode_connect().context("Failed to encode namespace connect")?;
                    write
                        .send(Message::Binary(connect))
                        .await
                        .context("Failed to send namespace connect")?;
                }
                FrameAction::Reply(reply) => {
                    write
                        .send(Message::Text(reply))
                        .await
                        .context("Failed to reply to sale feed")?;
                }
                FrameAction::Connected => {
                    let join = protocol::encode_event(SALE_FEED_JOIN_EVENT, &self.join_payload())
                        .context("Failed to encode saleFeedJoin")?;
                    write
                        .send(Message::Binary(join))
                        .await
                        .context("Failed to join sale feed")?;
                    joined = true;
                    info!(
                        currency = %self.config.currency,
                        locale = %self.config.locale,
                        app_id = self.config.app_id,
                        "Joined sale feed"
                    );
                }
                FrameAction::Close => return closed(joined),
            }
        }
    }

    /// Interpret one websocket frame.
    ///
    /// Text frames carry engine.io control packets, binary frames carry
    /// msgpack socket.io packets. Undecodable frames are logged and skipped.
    fn handle_frame(&self, message: &Message) -> Result<FrameAction> {
        match message {
            Message::Text(text) => match protocol::decode_text(text) {
                Ok(packet) => Ok(self.on_engine_packet(packet)),
                Err(e) => {
                    warn!(error = %e, "Dropping undecodable sale feed text frame");
                    Ok(FrameAction::Continue)
                }
            },
            Message::Binary(data) => match protocol::decode_binary(data) {
                Ok(packet) => self.on_socket_packet(packet),
                Err(e) => {
                    warn!(error = %e, len = data.len(), "Dropping undecodable sale feed binary frame");
                    Ok(FrameAction::Continue)
                }
            },
            _ => Ok(FrameAction::Continue),
        }
    }

    fn on_engine_packet(&self, packet: EnginePacket) -> FrameAction {
        match packet {
            EnginePacket::Open(info) => FrameAction::Opened(info),
            EnginePacket::Ping(payload) => FrameAction::Reply(protocol::encode_pong(&payload)),
            EnginePacket::Close => FrameAction::Close,
            EnginePacket::Message(text) => {
                debug!(len = text.len(), "Ignoring text socket.io packet");
                FrameAction::Continue
            }
            EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => {
                FrameAction::Continue
            }
        }
    }

    fn on_socket_packet(&self, packet: SocketPacket) -> Result<FrameAction> {
        match packet {
            SocketPacket::Connect { .. } => Ok(FrameAction::Connected),
            SocketPacket::ConnectError { data, .. } => {
                Err(anyhow!("Sale feed refused namespace connect: {:?}", data))
            }
            SocketPacket::Disconnect { .. } => Ok(FrameAction::Close),
            SocketPacket::Event { name, args, .. } => {
                if name == SALE_FEED_EVENT {
                    self.dispatch(args);
                } else {
                    debug!(event = %name, "Ignoring sale feed event");
                }
                Ok(FrameAction::Continue)
            }
            SocketPacket::Ack { .. } => Ok(FrameAction::Continue),
        }
    }

    fn dispatch(&self, args: Vec<Value>) {
        let Some(payload) = args.into_iter().next() else {
            warn!("saleFeed event without payload");
            return;
        };

        let batch: FeedBatch = match serde_json::from_value(payload) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(error = %e, "Dropping malformed saleFeed payload");
                return;
            }
        };

        if let IngestionResult::Processed(report) = self.handler.on_batch(batch) {
            debug!(accepted = report.accepted, "saleFeed batch dispatched");
        }
    }
}

fn closed(joined: bool) -> Result<SessionEnd> {
    if joined {
        Ok(SessionEnd::Closed)
    } else {
        bail!("Sale feed closed before the subscription was established")
    }
}

fn next_delay(current: Duration) -> Duration {
    (current * 2).min(MAX_RECONNECT_DELAY)
}
