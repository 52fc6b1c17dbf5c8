use std::collections::VecDeque;

use parking_lot::Mutex;

use super::event::{ChangeEvent, ChangeSink, RequestId};

const MAX_EVENTS: usize = 10_000;

/// Bounded in-memory sink. Oldest events fall off once the buffer is full.
#[derive(Debug)]
pub struct ChangeRecorder {
    buffer: Mutex<VecDeque<ChangeEvent>>,
}

impl ChangeRecorder {
    pub fn new() -> Self {
        Self {
            buffer: Mutex::new(VecDeque::with_capacity(256)),
        }
    }

    pub fn record(&self, event: ChangeEvent) {
        let mut buffer = self.buffer.lock();
        if buffer.len() >= MAX_EVENTS {
            buffer.pop_front();
        }
        buffer.push_back(event);
    }

    pub fn snapshot(&self) -> Vec<ChangeEvent> {
        self.buffer.lock().iter().cloned().collect()
    }

    pub fn for_request(&self, request_id: RequestId) -> Vec<ChangeEvent> {
        self.buffer
            .lock()
            .iter()
            .filter(|event| event.request_id == request_id)
            .cloned()
            .collect()
    }

    pub fn paths(&self) -> Vec<String> {
        self.buffer.lock().iter().map(|event| event.path.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}

impl Default for ChangeRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeSink for ChangeRecorder {
    fn publish(&self, change: ChangeEvent) {
        self.record(change);
    }
}
