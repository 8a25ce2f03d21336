//! Per-file classification
//!
//! For one golden file: find its dirty counterpart, make sure both sides have
//! a digest, compare, and label. Every path returns an outcome; per-file
//! failures are logged and counted, never raised.

use crate::digest::DigestCache;
use crate::host::FileTree;
use crate::matcher::PathMatcher;
use crate::registry::LabelRegistry;
use crate::stats::RunStats;
use crate::types::{ComparisonOutcome, FileEntry, FileRef, Label};
use std::sync::Arc;
use tracing::{debug, warn};

pub const UNCHANGED_NOTE: &str = "";
pub const CHANGED_NOTE: &str =
    "The content of this file is different from its equivalent on the golden image.";
pub const MISSING_NOTE: &str = "The file exists on the golden image, but not on the dirty image.";

/// Classification engine shared by all workers
#[derive(Debug)]
pub struct Classifier {
    registry: Arc<LabelRegistry>,
    digests: DigestCache,
}

impl Classifier {
    pub fn new(registry: Arc<LabelRegistry>, digests: DigestCache) -> Self {
        Self { registry, digests }
    }

    pub fn registry(&self) -> &Arc<LabelRegistry> {
        &self.registry
    }

    /// Classify `golden` against `dirty_tree` and apply the resulting label.
    ///
    /// Unchanged and changed labels go on the dirty file; the golden tree is
    /// the immutable reference. The missing label goes on the golden file.
    pub fn classify(
        &self,
        golden: &FileRef,
        dirty_tree: &dyn FileTree,
        stats: &RunStats,
    ) -> ComparisonOutcome {
        let outcome = self.classify_inner(golden, dirty_tree, stats);
        stats.record_outcome(outcome);
        outcome
    }

    fn classify_inner(
        &self,
        golden: &FileRef,
        dirty_tree: &dyn FileTree,
        stats: &RunStats,
    ) -> ComparisonOutcome {
        if !golden.is_comparable() {
            return ComparisonOutcome::Skipped;
        }

        let dirty = match PathMatcher::find_counterpart(dirty_tree, golden) {
            Some(file) if file.is_comparable() => file,
            other => {
                if let Some(file) = other {
                    debug!(
                        path = %golden.tree_path(),
                        kind = file.kind().as_str(),
                        readable = file.is_readable(),
                        "Counterpart is not a readable regular file"
                    );
                }
                let label = self.registry.missing_label(dirty_tree.name());
                self.apply(golden, label, MISSING_NOTE, stats);
                return ComparisonOutcome::MissingInSubject;
            }
        };

        // Both are attempted so the hashing counters stay accurate
        if self.digests.ensure_digest(&dirty) {
            stats.record_hashed_subject();
        }
        if self.digests.ensure_digest(golden) {
            stats.record_hashed_golden();
        }

        let (Some(dirty_digest), Some(golden_digest)) = (dirty.digest(), golden.digest()) else {
            debug!(path = %golden.tree_path(), "Digest missing; comparison unresolved");
            stats.add_unresolved(Arc::clone(golden));
            return ComparisonOutcome::Incomparable;
        };

        if dirty_digest == golden_digest {
            let label = self.registry.unchanged_label();
            self.apply(&dirty, label, UNCHANGED_NOTE, stats);
            ComparisonOutcome::Unchanged
        } else {
            let label = self.registry.changed_label();
            self.apply(&dirty, label, CHANGED_NOTE, stats);
            ComparisonOutcome::Changed
        }
    }

    fn apply(
        &self,
        file: &FileEntry,
        label: Result<Label, crate::error::RegistryError>,
        note: &str,
        stats: &RunStats,
    ) {
        let label = match label {
            Ok(label) => label,
            Err(e) => {
                warn!(path = %file.tree_path(), error = %e, "Label unavailable; file left unlabeled");
                stats.record_label_failure();
                return;
            }
        };

        if let Err(e) = self.registry.store().apply(file, &label, note) {
            warn!(
                path = %file.tree_path(),
                label = %label.name,
                error = %e,
                "Failed to apply label; file left unlabeled"
            );
            stats.record_label_failure();
        }
    }
}
