//! Comparison run driver
//!
//! One [`ComparisonJob`] can process many runs. Static labels stay cached
//! between runs; the per-subject missing label is re-resolved each time.

use crate::cancel::CancellationToken;
use crate::classify::Classifier;
use crate::config::CompareConfig;
use crate::digest::DigestCache;
use crate::error::{CompareError, Result};
use crate::host::{
    DigestProvider, FileTree, LabelStore, MessageKind, MessageSink, ProgressSink, RunMessage,
};
use crate::registry::LabelRegistry;
use crate::scheduler::{SchedulerConfig, WorkScheduler};
use crate::stats::{RunStats, StatsSnapshot};
use crate::types::{ComparisonOutcome, FileRef};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Collaborators supplied by the host for every run
#[derive(Clone)]
pub struct HostServices {
    pub digests: Arc<dyn DigestProvider>,
    pub labels: Arc<dyn LabelStore>,
    pub progress: Arc<dyn ProgressSink>,
    pub messages: Arc<dyn MessageSink>,
}

/// Outcome of one comparison run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub golden_tree: String,
    pub dirty_tree: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub cancelled: bool,
    pub stats: StatsSnapshot,
    /// Tree paths of golden files whose comparison could not complete
    pub unresolved: Vec<String>,
}

impl RunReport {
    /// Golden files that got a definite classification
    pub fn classified(&self) -> usize {
        self.stats.unchanged + self.stats.changed + self.stats.missing
    }
}

pub struct ComparisonJob {
    services: HostServices,
    registry: Arc<LabelRegistry>,
    classifier: Arc<Classifier>,
    scheduler_config: SchedulerConfig,
}

impl ComparisonJob {
    pub fn new(services: HostServices, config: &CompareConfig) -> Self {
        let registry = Arc::new(LabelRegistry::new(
            Arc::clone(&services.labels),
            config.labels.clone(),
        ));
        let digests = DigestCache::new(Arc::clone(&services.digests));
        let classifier = Arc::new(Classifier::new(Arc::clone(&registry), digests));

        Self {
            services,
            registry,
            classifier,
            scheduler_config: config.scheduler(),
        }
    }

    pub fn registry(&self) -> &Arc<LabelRegistry> {
        &self.registry
    }

    /// Compare `dirty` against `golden` and label the results.
    ///
    /// Only a missing golden tree or a failed golden listing is an error.
    /// Cancellation returns `Ok` with `cancelled` set and no summary notices.
    pub fn process(
        &self,
        golden: Option<Arc<dyn FileTree>>,
        dirty: Arc<dyn FileTree>,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        let started_at = Utc::now();
        let clock = Instant::now();

        self.post(
            MessageKind::Started,
            format!(
                "Started golden image comparison of {} at {}",
                dirty.name(),
                started_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
        );

        let golden = golden.ok_or_else(|| {
            CompareError::Configuration("golden image tree is not set".to_string())
        })?;

        let files = golden
            .list_all_files()
            .map_err(|source| CompareError::Enumeration {
                tree: golden.name().to_string(),
                source,
            })?;

        info!(
            golden = golden.name(),
            dirty = dirty.name(),
            files = files.len(),
            "Starting comparison"
        );

        self.registry.reset_run_cache();
        let stats = Arc::new(RunStats::new());
        stats.set_total_reference_files(files.len());
        self.services.progress.switch_to_determinate(files.len());

        let eligible = partition_eligible(files, &stats);

        let scheduler = WorkScheduler::new(
            self.scheduler_config.clone(),
            Arc::clone(&self.classifier),
            Arc::clone(&self.services.progress),
        );
        let summary = scheduler.run(
            golden.name(),
            eligible,
            Arc::clone(&dirty),
            cancel,
            Arc::clone(&stats),
        )?;

        if let Err(e) = self.services.labels.flush() {
            warn!(error = %e, "Failed to persist labels");
        }

        let report = RunReport {
            golden_tree: golden.name().to_string(),
            dirty_tree: dirty.name().to_string(),
            started_at,
            finished_at: Utc::now(),
            duration_ms: clock.elapsed().as_millis() as u64,
            cancelled: summary.cancelled,
            stats: stats.snapshot(),
            unresolved: stats.unresolved().iter().map(|f| f.tree_path()).collect(),
        };

        if report.cancelled {
            info!(
                processed = report.stats.processed_files,
                submitted = summary.submitted,
                "Comparison cancelled"
            );
            return Ok(report);
        }

        self.post_summary(&report);
        info!(
            unchanged = report.stats.unchanged,
            changed = report.stats.changed,
            missing = report.stats.missing,
            incomparable = report.stats.incomparable,
            duration_ms = report.duration_ms,
            "Comparison finished"
        );
        Ok(report)
    }

    fn post_summary(&self, report: &RunReport) {
        let stats = &report.stats;
        self.post(
            MessageKind::HashingStats,
            format!(
                "Hashed {} golden image files and {} files of {}",
                stats.hashed_golden_files, stats.hashed_subject_files, report.dirty_tree
            ),
        );
        self.post(
            MessageKind::GeneralStats,
            format!(
                "Total files: {}, processed files: {}, comparison failures: {}",
                stats.total_reference_files, stats.processed_files, stats.incomparable
            ),
        );
        self.post(
            MessageKind::Finished,
            format!(
                "Finished golden image comparison of {} at {}",
                report.dirty_tree,
                report.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
        );
    }

    fn post(&self, kind: MessageKind, text: String) {
        self.services.messages.post(RunMessage::new(kind, text));
    }
}

/// Drop entries that cannot be compared, counting them as skipped
fn partition_eligible(files: Vec<FileRef>, stats: &RunStats) -> Vec<FileRef> {
    let mut eligible = Vec::with_capacity(files.len());
    for file in files {
        if file.is_comparable() {
            eligible.push(file);
        } else {
            stats.record_outcome(ComparisonOutcome::Skipped);
        }
    }
    eligible
}

impl std::fmt::Debug for ComparisonJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComparisonJob")
            .field("registry", &self.registry)
            .field("scheduler", &self.scheduler_config)
            .finish()
    }
}
