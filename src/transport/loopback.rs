use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::channel::{Channel, Frame, Handlers, InboundHandler, CONNECT_EVENT, DISCONNECT_EVENT};
use crate::error::TransportError;

/// In-process channel: records what is emitted and lets callers play the
/// remote side by injecting inbound events.
#[derive(Default)]
pub struct LoopbackChannel {
    sent: Mutex<Vec<Frame>>,
    handlers: Handlers,
    connected: AtomicBool,
    /// Set by the first `connect`; never cleared.
    opened: AtomicBool,
}

impl LoopbackChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the channel up and fires the local connect event.
    pub fn connect(&self) {
        self.connected.store(true, Ordering::SeqCst);
        self.opened.store(true, Ordering::SeqCst);
        self.handlers.dispatch(CONNECT_EVENT, serde_json::Value::Null);
    }

    pub fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.handlers.dispatch(DISCONNECT_EVENT, serde_json::Value::Null);
        }
    }

    /// Delivers `payload` as if the remote side had sent `event`.
    /// Returns how many handlers saw it.
    pub fn inject(&self, event: &str, payload: serde_json::Value) -> usize {
        self.handlers.dispatch(event, payload)
    }

    pub fn sent(&self) -> Vec<Frame> {
        self.sent.lock().clone()
    }

    /// Payloads emitted under `event`, oldest first.
    pub fn sent_for(&self, event: &str) -> Vec<serde_json::Value> {
        self.sent
            .lock()
            .iter()
            .filter(|frame| frame.event == event)
            .map(|frame| frame.payload.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl Channel for LoopbackChannel {
    fn emit(&self, event: &str, payload: serde_json::Value) -> Result<(), TransportError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(if self.opened.load(Ordering::SeqCst) {
                TransportError::Disconnected
            } else {
                TransportError::NotInitialized
            });
        }
        self.sent.lock().push(Frame {
            event: event.to_string(),
            payload,
        });
        Ok(())
    }

    fn on(&self, event: &str, handler: InboundHandler) {
        self.handlers.add(event, handler);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn emit_before_connect_is_not_initialized() {
        let channel = LoopbackChannel::new();
        let err = channel.emit("app.request", json!({})).unwrap_err();
        assert!(matches!(err, TransportError::NotInitialized));
        assert!(channel.sent().is_empty());
    }

    #[test]
    fn emit_after_disconnect_is_disconnected() {
        let channel = LoopbackChannel::new();
        channel.connect();
        channel.emit("app.request", json!(1)).unwrap();
        channel.disconnect();

        let err = channel.emit("app.request", json!(2)).unwrap_err();
        assert!(matches!(err, TransportError::Disconnected));
        assert_eq!(channel.sent_for("app.request"), vec![json!(1)]);
    }
}
