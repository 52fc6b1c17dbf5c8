pub mod debugger;
pub mod error;
pub mod observe;
pub mod pipeline;
pub mod transport;

pub use debugger::Debugger;
pub use error::{DebuggerError, PipelineError, TransportError};
pub use observe::{ChangeEvent, ChangeSink, Node, Observed, Observer, RequestId, Value};
