use std::sync::Arc;

use tracing::debug;

use crate::error::PipelineError;
use crate::observe::{ChangeEvent, ChangeSink, Node, ObserveOptions, Observer, RequestId, Value};
use crate::pipeline::{ContextHook, RequestControl};

/// Swaps every freshly built context for an observed one.
///
/// Before wrapping, the top level of the context is published as if each
/// populated field had just been written, so a remote observer attaching
/// mid-session starts from the current state.
pub struct SessionInstaller {
    options: Arc<ObserveOptions>,
    sink: Arc<dyn ChangeSink>,
}

impl SessionInstaller {
    pub fn new(options: Arc<ObserveOptions>, sink: Arc<dyn ChangeSink>) -> Self {
        Self { options, sink }
    }

    /// Publishes the initial sync and returns `context` wrapped at the root.
    /// Scalars and already-observed values are returned untouched.
    pub fn instrument(&self, request_id: RequestId, context: Value) -> Value {
        let Value::Object(root) = &context else {
            return context;
        };
        self.initial_sync(request_id, root);
        let observer = Observer::new(request_id, Arc::clone(&self.options), Arc::clone(&self.sink));
        Value::Observed(observer.wrap(root, ""))
    }

    fn initial_sync(&self, request_id: RequestId, root: &Node) {
        for (key, value) in root.entries() {
            if self.options.is_ignored(&key) || !value.is_truthy() || value.is_empty_container() {
                continue;
            }
            self.sink.publish(ChangeEvent {
                request_id,
                path: key.clone(),
                value: value.to_json(),
                key,
            });
        }
    }
}

impl ContextHook for SessionInstaller {
    fn after_context(
        &self,
        control: &RequestControl,
        surface: &str,
        context: Value,
    ) -> Result<Value, PipelineError> {
        let request_id = control.request_id.ok_or(PipelineError::Untagged)?;
        debug!(surface, %request_id, "instrumenting context");
        Ok(self.instrument(request_id, context))
    }
}
