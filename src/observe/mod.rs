//! Live state-mutation observation.
//!
//! # INVARIANTS
//! Observation never changes program behaviour: every write reaches the
//! target, and reads return the same data the raw graph holds.
//! A wrapper belongs to exactly one request and one dot-path. A node shared
//! between requests, or reachable under two keys, is wrapped separately for
//! each, so events always carry the id and path they were made through.
//! Child wrappers are built lazily, on the first read of their slot.

pub mod event;
pub mod proxy;
pub mod recorder;
pub mod value;

pub use event::{ChangeEvent, ChangeSink, RequestId};
pub use proxy::{ObserveOptions, Observed, Observer, IS_OBSERVED_KEY, RAW_TARGET_KEY, TURN_CLASS};
pub use recorder::ChangeRecorder;
pub use value::{deep_equal, Node, Value};
