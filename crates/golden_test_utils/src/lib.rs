//! Golden Test Utilities
//!
//! In-memory host collaborators for exercising the comparison engine without
//! touching the filesystem.
//!
//! # Usage
//!
//! ```rust,ignore
//! use golden_test_utils::{MemoryDigester, MemoryTreeBuilder, FakeLabelStore};
//!
//! let golden = MemoryTreeBuilder::new("golden").file("a/b.txt", b"v1").build_arc();
//! let dirty = MemoryTreeBuilder::new("laptop").file("a/b.txt", b"v2").build_arc();
//! let digests = MemoryDigester::from_trees(&[&golden, &dirty]);
//! ```

pub mod digest;
pub mod labels;
pub mod sinks;
pub mod tree;

// Re-exports for convenience
pub use digest::MemoryDigester;
pub use labels::{FakeLabelStore, RecordedAssignment};
pub use sinks::{RecordingMessages, RecordingProgress};
pub use tree::{MemoryTree, MemoryTreeBuilder};
