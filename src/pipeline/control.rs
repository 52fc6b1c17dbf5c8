use crate::observe::RequestId;

/// Per-request bookkeeping that exists before any context object does.
#[derive(Debug, Clone)]
pub struct RequestControl {
    pub payload: serde_json::Value,
    /// Correlation id, filled in by the tagging step.
    pub request_id: Option<RequestId>,
    /// Name of the surface that claimed the request.
    pub surface: Option<String>,
}

impl RequestControl {
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            payload,
            request_id: None,
            surface: None,
        }
    }
}

/// Host-side carrier of one request: hands over the payload, takes the response.
pub trait HostTransport: Send {
    fn payload(&self) -> &serde_json::Value;
    fn respond(&mut self, response: serde_json::Value);
}

/// In-process transport used for replayed and locally-fed requests.
#[derive(Debug, Clone)]
pub struct MockTransport {
    request: serde_json::Value,
    response: Option<serde_json::Value>,
}

impl MockTransport {
    pub fn new(request: serde_json::Value) -> Self {
        Self {
            request,
            response: None,
        }
    }

    pub fn response(&self) -> Option<&serde_json::Value> {
        self.response.as_ref()
    }

    pub fn into_response(self) -> Option<serde_json::Value> {
        self.response
    }
}

impl HostTransport for MockTransport {
    fn payload(&self) -> &serde_json::Value {
        &self.request
    }

    fn respond(&mut self, response: serde_json::Value) {
        self.response = Some(response);
    }
}
