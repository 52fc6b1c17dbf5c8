//! Minimal host request pipeline.
//!
//! Stages that need to run for every request are injected through the
//! builder rather than patched onto shared state.

pub mod control;
pub mod stages;
pub mod surface;

pub use control::{HostTransport, MockTransport, RequestControl};
pub use stages::{
    ContextHook, Handler, HostKind, LifecycleListener, Pipeline, PipelineBuilder, RequestStep,
};
pub use surface::{Surface, WebhookSurface};
