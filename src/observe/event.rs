use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation id stamped on a request before its context exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One observed write.
///
/// `path` is the dot-joined chain of keys from the wrapped root to the
/// written field; `key` is its last segment. `value` is captured at write
/// time, so later mutation of the written object does not alter it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub request_id: RequestId,
    pub key: String,
    pub value: serde_json::Value,
    pub path: String,
}

impl ChangeEvent {
    /// The `{key, value, path}` body sent to the remote UI.
    pub fn data(&self) -> serde_json::Value {
        serde_json::json!({
            "key": self.key,
            "value": self.value,
            "path": self.path,
        })
    }
}

/// Receiver of change events. Called synchronously from inside the write.
pub trait ChangeSink: Send + Sync {
    fn publish(&self, change: ChangeEvent);
}

impl<F> ChangeSink for F
where
    F: Fn(ChangeEvent) + Send + Sync,
{
    fn publish(&self, change: ChangeEvent) {
        self(change)
    }
}
