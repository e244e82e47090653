//! Realtime channel: a trait seam plus a WebSocket implementation.
//!
//! Frames are plain JSON text `{"event": ..., "data": ...}`. There is no Socket.IO
//! handshake, packet prefix or polling fallback, so `WsTransport` cannot talk to a
//! Socket.IO server; point it at a WebSocket endpoint that uses this framing.

use super::protocol::{ClientEvent, ServerEvent};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

const EVENT_BUFFER: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("transport closed")]
    Closed,
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    fn is_connected(&self) -> bool;

    async fn emit(&self, event: ClientEvent) -> Result<(), TransportError>;
}

/// WebSocket transport speaking `{event, data}` JSON frames (not Socket.IO). Outgoing
/// frames go through a writer task; a reader task turns incoming text frames into
/// `ServerEvent`s and raises `Connected` / `Disconnected`.
pub struct WsTransport {
    outgoing: mpsc::UnboundedSender<Message>,
    connected: Arc<AtomicBool>,
}

impl WsTransport {
    /// Connect to `url`. The receiver starts with `Connected` and ends with `Disconnected`.
    pub async fn connect(url: &str) -> Result<(Self, mpsc::Receiver<ServerEvent>), TransportError> {
        let (ws, _) = tokio_tungstenite::connect_async(url).await?;
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        log::info!("realtime channel connected: {}", url);

        let connected = Arc::new(AtomicBool::new(true));
        let (mut sink, mut stream) = ws.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();

        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                if let Err(e) = sink.send(msg).await {
                    log::warn!("realtime send failed: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let reader_connected = connected.clone();
        let _ = events_tx.send(ServerEvent::Connected).await;
        tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                let msg = match frame {
                    Ok(m) => m,
                    Err(e) => {
                        log::warn!("realtime receive failed: {}", e);
                        break;
                    }
                };
                let text = match msg {
                    Message::Text(text) => text,
                    Message::Close(_) => break,
                    _ => continue,
                };
                match ServerEvent::from_frame(&text) {
                    Ok(Some(ev)) => {
                        if events_tx.send(ev).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => log::warn!("malformed realtime frame: {}", e),
                }
            }
            reader_connected.store(false, Ordering::SeqCst);
            let _ = events_tx.send(ServerEvent::Disconnected).await;
        });

        Ok((
            Self {
                outgoing: out_tx,
                connected,
            },
            events_rx,
        ))
    }
}

#[async_trait]
impl ChatTransport for WsTransport {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn emit(&self, event: ClientEvent) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Closed);
        }
        log::debug!("emit {}", event.name());
        self.outgoing
            .send(Message::Text(event.to_frame()))
            .map_err(|_| TransportError::Closed)
    }
}
