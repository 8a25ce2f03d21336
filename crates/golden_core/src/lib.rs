//! Golden Image Comparison Engine
//!
//! Compares a subject ("dirty") file tree against a trusted reference
//! ("golden") tree and labels every reference file by what happened to it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ ComparisonJob│──▶│WorkScheduler │──▶│  Classifier  │──▶│LabelRegistry │
//! │ (run driver) │   │ (worker pool)│   │ (per file)   │   │(get-or-create│
//! └──────────────┘   └──────────────┘   └──────┬───────┘   └──────────────┘
//!                                              │
//!                                  ┌───────────┴───────────┐
//!                                  ▼                       ▼
//!                           ┌─────────────┐         ┌─────────────┐
//!                           │ PathMatcher │         │ DigestCache │
//!                           └─────────────┘         └─────────────┘
//! ```
//!
//! # Core Concepts
//!
//! - **FileTree**: host-owned file collection, queried by `(name, parent_path)`
//! - **Digest**: opaque content fingerprint, memoized once per file
//! - **Label**: named, colored marker; created idempotently under races
//! - **RunStats**: concurrent counters read once the run ends
//!
//! Host collaborators are traits in [`host`]. Local implementations backed by
//! the filesystem live in [`fs_tree`], [`hashing`] and [`label_store`].

pub mod cancel;
pub mod classify;
pub mod config;
pub mod digest;
pub mod error;
pub mod fs_tree;
pub mod hashing;
pub mod host;
pub mod index;
pub mod job;
pub mod label_store;
pub mod matcher;
pub mod registry;
pub mod scheduler;
pub mod stats;
pub mod types;

// Re-exports for convenience
pub use cancel::CancellationToken;
pub use classify::Classifier;
pub use config::{CompareConfig, DigestAlgorithm, LabelConfig, LabelSpec};
pub use digest::DigestCache;
pub use error::{
    CompareError, DigestError, LabelStoreError, RegistryError, Result, TreeError,
};
pub use fs_tree::{FsTree, FsTreeOptions};
pub use hashing::FileDigester;
pub use host::{
    DigestProvider, FileTree, LabelStore, MessageKind, MessageSink, ProgressSink, RunMessage,
    TracingMessages, TracingProgress,
};
pub use index::PathIndex;
pub use job::{ComparisonJob, HostServices, RunReport};
pub use label_store::{JsonLabelStore, LabelAssignment};
pub use matcher::{MatchResult, PathMatcher};
pub use registry::{missing_label_name, LabelRegistry};
pub use scheduler::{ScheduleSummary, SchedulerConfig, WorkScheduler};
pub use stats::{RunStats, StatsSnapshot};
pub use types::{
    ComparisonOutcome, Digest, EntryKind, FileEntry, FileId, FileRef, Label, LabelColor, LabelId,
};
