use std::sync::{Arc, Weak};

use serde_json::json;
use tracing::{debug, error, info, warn};

use super::config::{DebuggerConfig, DebuggerSettings};
use super::console::ConsoleTee;
use super::events::*;
use super::models::load_language_models;
use crate::observe::{ChangeEvent, ChangeSink, RequestId};
use crate::pipeline::{LifecycleListener, MockTransport, Pipeline, RequestControl};
use crate::transport::{Channel, CONNECT_EVENT, DISCONNECT_EVENT};

/// Transport-facing shell: forwards snapshots and change events, and
/// replays requests pushed by the remote UI.
pub struct RemoteBridge {
    channel: Arc<dyn Channel>,
    settings: DebuggerSettings,
    console: Option<Arc<ConsoleTee>>,
}

impl RemoteBridge {
    pub fn new(
        channel: Arc<dyn Channel>,
        settings: DebuggerSettings,
        console: Option<Arc<ConsoleTee>>,
    ) -> Self {
        Self {
            channel,
            settings,
            console,
        }
    }

    pub fn channel(&self) -> &Arc<dyn Channel> {
        &self.channel
    }

    /// Emission failures are logged and swallowed; they must never reach
    /// the request being processed.
    fn send(&self, event: &str, payload: serde_json::Value) {
        if let Err(e) = self.channel.emit(event, payload) {
            debug!(event, "debugger emission skipped: {}", e);
        }
    }

    /// Pushes config and language models, then arms console capture.
    pub fn on_connected(&self) {
        let config = DebuggerConfig::load_or_default(&self.settings.config_path);
        match serde_json::to_value(&config) {
            Ok(config) => self.send(DEBUGGER_CONFIG_RESPONSE, config),
            Err(e) => warn!("debugger config not serializable: {}", e),
        }

        if self.settings.language_model_enabled {
            match load_language_models(&self.settings.models_dir) {
                Ok(models) => self.send(LANGUAGE_MODEL_RESPONSE, serde_json::Value::Object(models)),
                Err(e) => error!("language models not sent: {}", e),
            }
        }

        if let Some(console) = &self.console {
            if console.arm(Arc::clone(&self.channel)) {
                info!("console output mirrored to remote debugger");
            }
        }
    }

    /// Subscribes to inbound events. Handlers hold weak references, so the
    /// channel does not keep the bridge or the pipeline alive.
    pub fn attach(self: &Arc<Self>, pipeline: &Arc<Pipeline>) {
        let bridge = Arc::downgrade(self);
        self.channel.on(
            CONNECT_EVENT,
            Arc::new(move |_: serde_json::Value| {
                if let Some(bridge) = bridge.upgrade() {
                    bridge.on_connected();
                }
            }),
        );
        self.channel.on(
            DISCONNECT_EVENT,
            Arc::new(|_: serde_json::Value| warn!("remote debugger connection lost")),
        );
        self.channel.on(
            DEBUGGING_AVAILABLE,
            Arc::new(|_: serde_json::Value| info!("remote debugger available")),
        );
        self.channel.on(
            DEBUGGING_UNAVAILABLE,
            Arc::new(|_: serde_json::Value| info!("remote debugger unavailable")),
        );

        let pipeline = Arc::downgrade(pipeline);
        self.channel.on(
            DEBUGGER_REQUEST,
            Arc::new(move |payload: serde_json::Value| replay(&pipeline, payload)),
        );
    }
}

/// Drives a remotely injected request through the normal entry point.
fn replay(pipeline: &Weak<Pipeline>, payload: serde_json::Value) {
    let Some(pipeline) = pipeline.upgrade() else {
        debug!("pipeline gone, dropping debugger request");
        return;
    };
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!("no async runtime available, dropping debugger request");
        return;
    };
    runtime.spawn(async move {
        let mut transport = MockTransport::new(payload);
        if let Err(e) = pipeline.handle(&mut transport).await {
            warn!("debugger request failed: {}", e);
        }
    });
}

fn envelope(request_id: Option<RequestId>, data: serde_json::Value) -> serde_json::Value {
    json!({ "requestId": request_id, "data": data })
}

impl LifecycleListener for RemoteBridge {
    fn request_received(&self, control: &RequestControl) {
        self.send(REQUEST, envelope(control.request_id, control.payload.clone()));
    }

    fn response_ready(&self, control: &RequestControl, response: &serde_json::Value) {
        self.send(RESPONSE, envelope(control.request_id, response.clone()));
    }
}

impl ChangeSink for RemoteBridge {
    fn publish(&self, change: ChangeEvent) {
        self.send(STATE_UPDATE, envelope(Some(change.request_id), change.data()));
    }
}
