use std::collections::VecDeque;
use std::sync::Mutex;

/// Unbounded strict-FIFO queue of operator directives.
#[derive(Debug, Default)]
pub struct OrderedQueue {
    inner: Mutex<VecDeque<String>>,
}

impl OrderedQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, text: impl Into<String>) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(text.into());
    }

    /// Pop the oldest directive. Never blocks.
    pub fn dequeue(&self) -> Option<String> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
