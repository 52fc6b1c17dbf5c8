use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

use super::channel::{Channel, Frame, Handlers, InboundHandler, CONNECT_EVENT, DISCONNECT_EVENT};
use crate::error::TransportError;

/// WebSocket client to the remote debugging service.
///
/// Outbound frames go through an unbounded queue drained by a writer task,
/// so `emit` is usable from synchronous code such as a property write.
pub struct SocketChannel {
    url: Url,
    outbound: RwLock<Option<mpsc::UnboundedSender<Frame>>>,
    handlers: Handlers,
    connected: AtomicBool,
    /// Set once the first connection succeeded; never cleared.
    opened: AtomicBool,
}

impl SocketChannel {
    pub fn new(url: Url) -> Arc<Self> {
        Arc::new(Self {
            url,
            outbound: RwLock::new(None),
            handlers: Handlers::default(),
            connected: AtomicBool::new(false),
            opened: AtomicBool::new(false),
        })
    }

    /// Builds the service url: `base?id=<webhook id>&type=app`.
    pub fn service_url(base: &str, webhook_id: &str) -> Result<Url, TransportError> {
        let mut url = Url::parse(base)?;
        url.query_pairs_mut()
            .append_pair("id", webhook_id)
            .append_pair("type", "app");
        Ok(url)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Opens the socket and starts the reader and writer tasks. Not retried:
    /// a failure here is for the caller to report.
    pub async fn connect(self: &Arc<Self>) -> Result<(), TransportError> {
        let (stream, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        let (mut sink, mut source) = stream.split();

        let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();
        *self.outbound.write() = Some(tx);
        self.connected.store(true, Ordering::SeqCst);
        self.opened.store(true, Ordering::SeqCst);
        info!(url = %self.url, "debugger socket connected");

        tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(e) => {
                        debug!(event = %frame.event, "dropping unserializable frame: {}", e);
                        continue;
                    }
                };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let this = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(message) = source.next().await {
                match message {
                    Ok(Message::Text(text)) => match serde_json::from_str::<Frame>(text.as_str()) {
                        Ok(frame) => {
                            this.handlers.dispatch(&frame.event, frame.payload);
                        }
                        Err(e) => debug!("ignoring malformed frame: {}", e),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("debugger socket error: {}", e);
                        break;
                    }
                }
            }
            this.connected.store(false, Ordering::SeqCst);
            this.outbound.write().take();
            warn!("debugger socket disconnected");
            this.handlers.dispatch(DISCONNECT_EVENT, serde_json::Value::Null);
        });

        self.handlers.dispatch(CONNECT_EVENT, serde_json::Value::Null);
        Ok(())
    }
}

impl Channel for SocketChannel {
    fn emit(&self, event: &str, payload: serde_json::Value) -> Result<(), TransportError> {
        let outbound = self.outbound.read();
        let Some(tx) = outbound.as_ref() else {
            return Err(if self.opened.load(Ordering::SeqCst) {
                TransportError::Disconnected
            } else {
                TransportError::NotInitialized
            });
        };
        tx.send(Frame {
            event: event.to_string(),
            payload,
        })
        .map_err(|_| TransportError::Disconnected)
    }

    fn on(&self, event: &str, handler: InboundHandler) {
        self.handlers.add(event, handler);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
