//! Host collaborator interfaces
//!
//! The engine never walks directories, hashes bytes or persists labels by
//! itself. It calls these traits, which are passed in explicitly when a
//! [`crate::ComparisonJob`] is built.

use crate::error::{DigestError, LabelStoreError, TreeError};
use crate::types::{Digest, FileEntry, FileRef, Label, LabelColor};
use serde::Serialize;
use tracing::info;

/// A file collection (golden or dirty)
pub trait FileTree: Send + Sync {
    /// Display identity of the tree. The missing label name derives from it.
    fn name(&self) -> &str;

    /// Every entry in the tree, unordered
    fn list_all_files(&self) -> Result<Vec<FileRef>, TreeError>;

    /// Entries whose name and parent path equal the given key
    fn find_by_name_and_path(&self, name: &str, parent_path: &str)
        -> Result<Vec<FileRef>, TreeError>;
}

/// Content hashing primitive
pub trait DigestProvider: Send + Sync {
    fn compute(&self, file: &FileEntry) -> Result<Digest, DigestError>;
}

/// Durable label registry owned by the host
pub trait LabelStore: Send + Sync {
    /// Create a label. Returns [`LabelStoreError::AlreadyExists`] if a label
    /// with that display name exists.
    fn create(
        &self,
        name: &str,
        description: &str,
        color: LabelColor,
    ) -> Result<Label, LabelStoreError>;

    fn list_all(&self) -> Result<Vec<Label>, LabelStoreError>;

    /// Attach a label to a file. Applying the same pair twice is a no-op.
    fn apply(&self, file: &FileEntry, label: &Label, note: &str) -> Result<(), LabelStoreError>;

    /// Persist buffered changes. Called once at the end of every run.
    fn flush(&self) -> Result<(), LabelStoreError> {
        Ok(())
    }
}

/// Progress channel of the host job
pub trait ProgressSink: Send + Sync {
    fn switch_to_determinate(&self, total: usize);
    fn report(&self, current: usize, message: &str);
}

/// Kind of informational run notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Started,
    HashingStats,
    GeneralStats,
    Finished,
}

/// Informational notice posted to the host inbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl RunMessage {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Delivery of run notices. No delivery guarantee is expected.
pub trait MessageSink: Send + Sync {
    fn post(&self, message: RunMessage);
}

/// Progress sink that writes to the tracing log
#[derive(Debug, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn switch_to_determinate(&self, total: usize) {
        info!(total, "Comparison progress is determinate");
    }

    fn report(&self, current: usize, message: &str) {
        info!(current, "{}", message);
    }
}

/// Message sink that writes to the tracing log
#[derive(Debug, Default)]
pub struct TracingMessages;

impl MessageSink for TracingMessages {
    fn post(&self, message: RunMessage) {
        info!(kind = ?message.kind, "{}", message.text);
    }
}
