//! Run accumulator
//!
//! Counters are atomics so workers never wait on each other to record a
//! result. The unresolved set sits behind a mutex held only for the insert.

use crate::types::{ComparisonOutcome, FileId, FileRef};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Counters for one comparison run
#[derive(Debug, Default)]
pub struct RunStats {
    total_reference_files: AtomicUsize,
    processed_files: AtomicUsize,
    hashed_golden_files: AtomicUsize,
    hashed_subject_files: AtomicUsize,
    unchanged: AtomicUsize,
    changed: AtomicUsize,
    missing: AtomicUsize,
    skipped: AtomicUsize,
    label_failures: AtomicUsize,
    /// Golden files classified incomparable
    unresolved: Mutex<HashMap<FileId, FileRef>>,
}

/// Point-in-time copy of [`RunStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_reference_files: usize,
    pub processed_files: usize,
    pub hashed_golden_files: usize,
    pub hashed_subject_files: usize,
    pub unchanged: usize,
    pub changed: usize,
    pub missing: usize,
    pub incomparable: usize,
    pub skipped: usize,
    pub label_failures: usize,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_total_reference_files(&self, total: usize) {
        self.total_reference_files.store(total, Ordering::Relaxed);
    }

    pub fn record_processed(&self) -> usize {
        self.processed_files.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_hashed_golden(&self) {
        self.hashed_golden_files.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hashed_subject(&self) {
        self.hashed_subject_files.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_label_failure(&self) {
        self.label_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Count an outcome. Incomparable files also need [`Self::add_unresolved`].
    pub fn record_outcome(&self, outcome: ComparisonOutcome) {
        let counter = match outcome {
            ComparisonOutcome::Unchanged => &self.unchanged,
            ComparisonOutcome::Changed => &self.changed,
            ComparisonOutcome::MissingInSubject => &self.missing,
            ComparisonOutcome::Skipped => &self.skipped,
            ComparisonOutcome::Incomparable => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_unresolved(&self, file: FileRef) {
        self.unresolved_guard().insert(file.id(), file);
    }

    pub fn processed_files(&self) -> usize {
        self.processed_files.load(Ordering::Relaxed)
    }

    /// Golden entries skipped as not comparable
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn unresolved_count(&self) -> usize {
        self.unresolved_guard().len()
    }

    /// Incomparable golden files, ordered by tree path
    pub fn unresolved(&self) -> Vec<FileRef> {
        let mut files: Vec<FileRef> = self.unresolved_guard().values().cloned().collect();
        files.sort_by_key(|f| f.tree_path());
        files
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_reference_files: self.total_reference_files.load(Ordering::Relaxed),
            processed_files: self.processed_files.load(Ordering::Relaxed),
            hashed_golden_files: self.hashed_golden_files.load(Ordering::Relaxed),
            hashed_subject_files: self.hashed_subject_files.load(Ordering::Relaxed),
            unchanged: self.unchanged.load(Ordering::Relaxed),
            changed: self.changed.load(Ordering::Relaxed),
            missing: self.missing.load(Ordering::Relaxed),
            incomparable: self.unresolved_count(),
            skipped: self.skipped.load(Ordering::Relaxed),
            label_failures: self.label_failures.load(Ordering::Relaxed),
        }
    }

    fn unresolved_guard(&self) -> std::sync::MutexGuard<'_, HashMap<FileId, FileRef>> {
        self.unresolved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
