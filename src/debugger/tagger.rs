use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::observe::RequestId;
use crate::pipeline::{RequestControl, RequestStep};

/// Stamps each inbound request with a fresh correlation id.
#[derive(Debug, Default)]
pub struct RequestTagger;

impl RequestStep for RequestTagger {
    fn before_context(&self, control: &mut RequestControl) -> Result<(), PipelineError> {
        match control.request_id {
            Some(existing) => {
                // Events already emitted carry the first id; keep it.
                warn!(request_id = %existing, "request tagged twice, keeping first id");
            }
            None => {
                let request_id = RequestId::new();
                debug!(%request_id, "request tagged");
                control.request_id = Some(request_id);
            }
        }
        Ok(())
    }
}
