//! Remote debugging: request tagging, context instrumentation and the bridge
//! to the remote UI.

pub mod bridge;
pub mod config;
pub mod console;
pub mod events;
pub mod installer;
pub mod models;
pub mod tagger;

use std::sync::Arc;

use tracing::info;

pub use bridge::RemoteBridge;
pub use config::{debugging_requested, read_webhook_id, DebuggerConfig, DebuggerSettings};
pub use console::{ConsoleTee, ConsoleWriter, TeeWriter};
pub use installer::SessionInstaller;
pub use models::load_language_models;
pub use tagger::RequestTagger;

use crate::error::DebuggerError;
use crate::observe::ObserveOptions;
use crate::pipeline::{HostKind, Pipeline, PipelineBuilder};
use crate::transport::Channel;

/// Entry point wiring tagger, installer and bridge into an app pipeline.
pub struct Debugger {
    bridge: Arc<RemoteBridge>,
    options: Arc<ObserveOptions>,
}

impl Debugger {
    pub fn new(
        channel: Arc<dyn Channel>,
        settings: DebuggerSettings,
        console: Option<Arc<ConsoleTee>>,
    ) -> Self {
        let options = Arc::new(settings.observe.clone());
        Self {
            bridge: Arc::new(RemoteBridge::new(channel, settings, console)),
            options,
        }
    }

    pub fn bridge(&self) -> &Arc<RemoteBridge> {
        &self.bridge
    }

    /// Adds tagging, instrumentation and lifecycle forwarding to `builder`.
    pub fn install(&self, builder: &mut PipelineBuilder) -> Result<(), DebuggerError> {
        if *builder.kind() != HostKind::App {
            return Err(DebuggerError::InvalidHost(builder.kind().to_string()));
        }
        builder
            .request_step(Arc::new(RequestTagger))
            .context_hook(Arc::new(SessionInstaller::new(
                Arc::clone(&self.options),
                self.bridge.clone(),
            )))
            .listener(self.bridge.clone());
        info!("remote debugger installed");
        Ok(())
    }

    /// Starts accepting remote events for the built pipeline.
    pub fn attach(&self, pipeline: &Arc<Pipeline>) {
        self.bridge.attach(pipeline);
    }
}
