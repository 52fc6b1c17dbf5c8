use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::control::{HostTransport, RequestControl};
use super::surface::Surface;
use crate::error::PipelineError;
use crate::observe::Value;

/// Runs once per inbound request, before any context object exists.
pub trait RequestStep: Send + Sync {
    fn before_context(&self, control: &mut RequestControl) -> Result<(), PipelineError>;
}

/// Receives each freshly constructed context and returns the value every
/// later stage will operate on.
pub trait ContextHook: Send + Sync {
    fn after_context(
        &self,
        control: &RequestControl,
        surface: &str,
        context: Value,
    ) -> Result<Value, PipelineError>;
}

pub trait LifecycleListener: Send + Sync {
    fn request_received(&self, _control: &RequestControl) {}

    fn response_ready(&self, _control: &RequestControl, _response: &serde_json::Value) {}
}

/// Application logic. Mutates the context however it likes.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, context: &Value) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostKind {
    App,
    Platform(String),
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostKind::App => f.write_str("app"),
            HostKind::Platform(name) => write!(f, "platform '{name}'"),
        }
    }
}

pub struct PipelineBuilder {
    kind: HostKind,
    surfaces: Vec<Arc<dyn Surface>>,
    request_steps: Vec<Arc<dyn RequestStep>>,
    context_hooks: Vec<Arc<dyn ContextHook>>,
    listeners: Vec<Arc<dyn LifecycleListener>>,
    handler: Option<Arc<dyn Handler>>,
}

impl PipelineBuilder {
    pub fn new(kind: HostKind) -> Self {
        Self {
            kind,
            surfaces: Vec::new(),
            request_steps: Vec::new(),
            context_hooks: Vec::new(),
            listeners: Vec::new(),
            handler: None,
        }
    }

    pub fn app() -> Self {
        Self::new(HostKind::App)
    }

    pub fn kind(&self) -> &HostKind {
        &self.kind
    }

    pub fn surface(&mut self, surface: Arc<dyn Surface>) -> &mut Self {
        self.surfaces.push(surface);
        self
    }

    pub fn request_step(&mut self, step: Arc<dyn RequestStep>) -> &mut Self {
        self.request_steps.push(step);
        self
    }

    pub fn context_hook(&mut self, hook: Arc<dyn ContextHook>) -> &mut Self {
        self.context_hooks.push(hook);
        self
    }

    pub fn listener(&mut self, listener: Arc<dyn LifecycleListener>) -> &mut Self {
        self.listeners.push(listener);
        self
    }

    pub fn handler(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.handler = Some(handler);
        self
    }

    pub fn build(self) -> Result<Pipeline, PipelineError> {
        let handler = self.handler.ok_or(PipelineError::MissingHandler)?;
        Ok(Pipeline {
            surfaces: self.surfaces,
            request_steps: self.request_steps,
            context_hooks: self.context_hooks,
            listeners: self.listeners,
            handler,
        })
    }
}

/// The request-handling sequence: tag, announce, construct, hook, populate,
/// handle, render, announce, respond.
pub struct Pipeline {
    surfaces: Vec<Arc<dyn Surface>>,
    request_steps: Vec<Arc<dyn RequestStep>>,
    context_hooks: Vec<Arc<dyn ContextHook>>,
    listeners: Vec<Arc<dyn LifecycleListener>>,
    handler: Arc<dyn Handler>,
}

impl Pipeline {
    /// Single entry point for real and replayed traffic alike.
    pub async fn handle(
        &self,
        transport: &mut dyn HostTransport,
    ) -> Result<serde_json::Value, PipelineError> {
        let mut control = RequestControl::new(transport.payload().clone());
        for step in &self.request_steps {
            step.before_context(&mut control)?;
        }
        for listener in &self.listeners {
            listener.request_received(&control);
        }

        let surface = self
            .surfaces
            .iter()
            .find(|surface| surface.accepts(&control.payload))
            .ok_or(PipelineError::NoSurface)?;
        control.surface = Some(surface.name().to_string());
        debug!(surface = surface.name(), request_id = ?control.request_id, "constructing context");

        let mut context = Value::Object(surface.create_context(&control));
        for hook in &self.context_hooks {
            context = hook.after_context(&control, surface.name(), context)?;
        }
        surface.populate(&control, &context);

        self.handler.handle(&context).await?;

        let response = surface.render_response(&context);
        for listener in &self.listeners {
            listener.response_ready(&control, &response);
        }
        info!(surface = surface.name(), request_id = ?control.request_id, "request handled");
        transport.respond(response.clone());
        Ok(response)
    }
}
