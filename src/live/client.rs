use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::events::{parse_server_message, RealtimeInputMessage, ServerEvent, SessionSetup};
use crate::audio::pcm;
use crate::error::{SessionError, SessionResult};

/// An open duplex connection: audio payloads go up, events come down.
///
/// Sends are fire-and-forget; ordering within the stream is preserved by
/// the transport, not by the caller.
pub struct LiveConnection {
    pub audio_tx: mpsc::Sender<String>,
    pub events: mpsc::Receiver<ServerEvent>,
}

/// Streaming conversation endpoint boundary.
///
/// The real implementation speaks WebSocket; tests substitute a pair of
/// in-memory channels.
#[async_trait]
pub trait LiveEndpoint: Send {
    async fn connect(&mut self, setup: SessionSetup) -> SessionResult<LiveConnection>;
}

/// WebSocket implementation of the live endpoint.
pub struct WsLiveEndpoint {
    url: String,
}

impl WsLiveEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl LiveEndpoint for WsLiveEndpoint {
    async fn connect(&mut self, setup: SessionSetup) -> SessionResult<LiveConnection> {
        info!("Connecting to live endpoint");

        let (ws_stream, _) = tokio_tungstenite::connect_async(self.url.as_str()).await?;

        let (mut ws_tx, mut ws_rx) = ws_stream.split();

        // First message on the wire is always the session setup.
        let setup_json = serde_json::to_string(&setup.to_message())
            .map_err(|e| SessionError::Connection(format!("failed to encode setup: {}", e)))?;
        ws_tx.send(Message::Text(setup_json.into())).await?;

        info!("Live endpoint connected, setup sent");

        let (audio_tx, mut audio_rx) = mpsc::channel::<String>(256);
        let (event_tx, event_rx) = mpsc::channel::<ServerEvent>(256);

        // Outbound: forward audio payloads until the session drops its
        // sender, then close the socket.
        tokio::spawn(async move {
            while let Some(payload) = audio_rx.recv().await {
                let message = RealtimeInputMessage::audio(pcm::CAPTURE_MIME_TYPE, payload);
                let text = match serde_json::to_string(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Failed to encode audio frame: {}", e);
                        continue;
                    }
                };
                if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                    warn!("Failed to send audio frame: {}", e);
                    break;
                }
            }
            debug!("Audio send path closed");
            let _ = ws_tx.close().await;
        });

        // Inbound: parse every message into typed events. A message that
        // fails to parse is logged and skipped; it must not end the
        // conversation.
        tokio::spawn(async move {
            loop {
                match ws_rx.next().await {
                    Some(Ok(Message::Text(text))) => match parse_server_message(&text) {
                        Ok(events) => {
                            for event in events {
                                if event_tx.send(event).await.is_err() {
                                    return;
                                }
                            }
                        }
                        Err(e) => {
                            warn!("Skipping unparseable server message: {}", e);
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame.map(|f| f.reason.to_string());
                        info!("Live endpoint closed the connection");
                        let _ = event_tx.send(ServerEvent::Closed(reason)).await;
                        return;
                    }
                    Some(Ok(_)) => {
                        // Ping/pong and binary frames carry nothing for us.
                    }
                    Some(Err(e)) => {
                        warn!("Live connection error: {}", e);
                        let _ = event_tx
                            .send(ServerEvent::ConnectionLost(e.to_string()))
                            .await;
                        return;
                    }
                    None => {
                        let _ = event_tx.send(ServerEvent::Closed(None)).await;
                        return;
                    }
                }
            }
        });

        Ok(LiveConnection {
            audio_tx,
            events: event_rx,
        })
    }
}
