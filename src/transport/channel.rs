use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Dispatched locally once the channel is up.
pub const CONNECT_EVENT: &str = "connect";
/// Dispatched locally when the peer goes away.
pub const DISCONNECT_EVENT: &str = "disconnect";

pub type InboundHandler = Arc<dyn Fn(serde_json::Value) + Send + Sync>;

/// Duplex event channel to the remote UI.
pub trait Channel: Send + Sync {
    /// Queues `payload` under `event`. Never blocks.
    fn emit(&self, event: &str, payload: serde_json::Value) -> Result<(), TransportError>;

    fn on(&self, event: &str, handler: InboundHandler);

    fn is_connected(&self) -> bool;
}

/// Wire form of one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Event name to handler table shared by channel implementations.
#[derive(Default)]
pub(crate) struct Handlers {
    table: RwLock<HashMap<String, Vec<InboundHandler>>>,
}

impl Handlers {
    pub(crate) fn add(&self, event: &str, handler: InboundHandler) {
        self.table
            .write()
            .entry(event.to_string())
            .or_default()
            .push(handler);
    }

    /// Invokes every handler for `event`. The table lock is released before
    /// any handler runs, so handlers may register more handlers.
    pub(crate) fn dispatch(&self, event: &str, payload: serde_json::Value) -> usize {
        let handlers = self.table.read().get(event).cloned().unwrap_or_default();
        for handler in &handlers {
            handler(payload.clone());
        }
        handlers.len()
    }
}
