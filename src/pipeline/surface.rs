use serde_json::json;

use super::control::RequestControl;
use crate::observe::{Node, Value, TURN_CLASS};

/// A request-handling surface (platform). Builds the context object for the
/// requests it accepts and renders the final response from it.
pub trait Surface: Send + Sync {
    fn name(&self) -> &str;

    fn accepts(&self, payload: &serde_json::Value) -> bool;

    /// Constructs the fresh, raw context for one request.
    fn create_context(&self, control: &RequestControl) -> Node;

    /// Runs after context hooks, on whatever value the hooks returned.
    fn populate(&self, _control: &RequestControl, _context: &Value) {}

    fn render_response(&self, context: &Value) -> serde_json::Value;
}

/// Generic JSON surface: `{type, input, user: {id}, session: {data}}` in,
/// `{output, session: {data}}` out.
#[derive(Debug, Default)]
pub struct WebhookSurface;

impl WebhookSurface {
    pub const NAME: &'static str = "webhook";
}

impl Surface for WebhookSurface {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn accepts(&self, payload: &serde_json::Value) -> bool {
        payload.is_object()
    }

    fn create_context(&self, control: &RequestControl) -> Node {
        let payload = &control.payload;
        let user_id = payload
            .pointer("/user/id")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();

        Node::object()
            .with_class(TURN_CLASS)
            .with("$app", Node::object().with_class("App"))
            .with("$platform", Node::object().with_class("Platform").with("name", Self::NAME))
            .with("$request", Value::from(payload))
            .with("$type", payload.get("type").and_then(|t| t.as_str()).unwrap_or("INTENT"))
            .with("$user", Node::object().with("id", user_id))
            .with("$session", Node::object().with("data", Node::object()))
            .with("$output", Node::object())
    }

    fn populate(&self, control: &RequestControl, context: &Value) {
        if let Some(input) = control.payload.get("input") {
            context.set("$input", Value::from(input));
        }
        let data = context.path("$session.data");
        if let Some(stored) = control.payload.pointer("/session/data").and_then(|d| d.as_object()) {
            for (key, value) in stored {
                data.set(key, Value::from(value));
            }
        }
    }

    fn render_response(&self, context: &Value) -> serde_json::Value {
        json!({
            "output": context.get("$output").to_json(),
            "session": { "data": context.path("$session.data").to_json() },
        })
    }
}
