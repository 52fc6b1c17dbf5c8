//! Event names on the debugger channel.

pub const DEBUGGING_AVAILABLE: &str = "debugging.available";
pub const DEBUGGING_UNAVAILABLE: &str = "debugging.unavailable";
pub const DEBUGGER_REQUEST: &str = "debugger.request";

pub const LANGUAGE_MODEL_RESPONSE: &str = "app.language-model-response";
pub const DEBUGGER_CONFIG_RESPONSE: &str = "app.debugger-config-response";
pub const CONSOLE_LOG: &str = "app.console-log";
pub const REQUEST: &str = "app.request";
pub const RESPONSE: &str = "app.response";
pub const STATE_UPDATE: &str = "app.jovo-update";
