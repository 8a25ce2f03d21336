//! Progress and message sinks that remember what they were told

use golden_core::{MessageKind, MessageSink, ProgressSink, RunMessage};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct RecordingProgress {
    determinate: Mutex<Option<usize>>,
    reports: Mutex<Vec<(usize, String)>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total passed to `switch_to_determinate`, if it was called
    pub fn determinate_total(&self) -> Option<usize> {
        *lock(&self.determinate)
    }

    pub fn reports(&self) -> Vec<(usize, String)> {
        lock(&self.reports).clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn switch_to_determinate(&self, total: usize) {
        *lock(&self.determinate) = Some(total);
    }

    fn report(&self, current: usize, message: &str) {
        lock(&self.reports).push((current, message.to_string()));
    }
}

#[derive(Debug, Default)]
pub struct RecordingMessages {
    messages: Mutex<Vec<RunMessage>>,
}

impl RecordingMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<RunMessage> {
        lock(&self.messages).clone()
    }

    pub fn kinds(&self) -> Vec<MessageKind> {
        lock(&self.messages).iter().map(|m| m.kind).collect()
    }
}

impl MessageSink for RecordingMessages {
    fn post(&self, message: RunMessage) {
        lock(&self.messages).push(message);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
