//! Bounded worker pool for classification tasks
//!
//! # Design
//!
//! - One task per eligible golden file, queued on an unbounded channel
//! - A fixed number of worker threads pull from the shared queue
//! - Workers report each finished task on a completion channel
//! - The calling thread waits on completions with a short poll tick so it
//!   can report progress at a coarse interval and notice cancellation
//! - Workers check the cancel token before starting a task, so nothing new
//!   starts once cancellation is requested; in-flight tasks finish
//!
//! The wait ends when every worker has exited, which happens once the queue
//! is drained or cancellation stops the workers. A worker that dies mid-task
//! drops its completion sender, so the wait can never hang on it.

use crate::cancel::CancellationToken;
use crate::classify::Classifier;
use crate::error::{CompareError, Result};
use crate::host::{FileTree, ProgressSink};
use crate::stats::RunStats;
use crate::types::{ComparisonOutcome, FileRef};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Upper bound on how long the waiting thread sleeps between cancel checks
const POLL_TICK: Duration = Duration::from_millis(250);

/// Submission re-checks cancellation every this many tasks
const SUBMIT_CANCEL_CHECK: usize = 1024;

/// Configuration for the worker pool
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Number of worker threads
    pub workers: usize,
    /// Minimum time between progress reports
    pub progress_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4),
            progress_interval: Duration::from_secs(2),
        }
    }
}

/// What the scheduler did with the files it was given
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleSummary {
    pub submitted: usize,
    pub completed: usize,
    pub cancelled: bool,
}

struct TaskDone {
    file: FileRef,
    outcome: ComparisonOutcome,
}

/// Fans classification tasks out over a bounded pool of threads
pub struct WorkScheduler {
    config: SchedulerConfig,
    classifier: Arc<Classifier>,
    progress: Arc<dyn ProgressSink>,
}

impl WorkScheduler {
    pub fn new(
        config: SchedulerConfig,
        classifier: Arc<Classifier>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            config,
            classifier,
            progress,
        }
    }

    /// Classify every file in `golden_files` against `dirty_tree`.
    ///
    /// `golden_tree` is the display name of the tree the files came from.
    /// Results accumulate in `stats`. Entries already counted as skipped in
    /// `stats` are included in every progress count, so the last report
    /// reaches the total the sink was switched to. Returns once all tasks are
    /// done, or once cancellation is observed and the in-flight tasks have
    /// finished.
    pub fn run(
        &self,
        golden_tree: &str,
        golden_files: Vec<FileRef>,
        dirty_tree: Arc<dyn FileTree>,
        cancel: &CancellationToken,
        stats: Arc<RunStats>,
    ) -> Result<ScheduleSummary> {
        if cancel.is_cancelled() {
            info!("Cancelled before scheduling");
            return Ok(ScheduleSummary {
                cancelled: true,
                ..Default::default()
            });
        }
        let skipped = stats.skipped();
        if golden_files.is_empty() {
            self.progress.report(skipped, "No comparable golden files");
            return Ok(ScheduleSummary::default());
        }

        let worker_count = self.config.workers.max(1).min(golden_files.len());
        let (task_tx, task_rx) = mpsc::channel::<FileRef>();
        let task_rx = Arc::new(Mutex::new(task_rx));
        let (done_tx, done_rx) = mpsc::channel::<TaskDone>();

        let handles =
            self.spawn_workers(worker_count, &task_rx, &done_tx, &dirty_tree, cancel, &stats);
        drop(done_tx);
        if handles.is_empty() {
            return Err(CompareError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "no classification worker could be started",
            )));
        }

        let submitted = Self::submit(golden_files, &task_tx, cancel);
        // Closing the queue lets workers exit once it drains
        drop(task_tx);
        debug!(submitted, workers = handles.len(), "Classification tasks queued");

        let (completed, cancelled) = self.wait(
            &done_rx,
            submitted,
            skipped,
            (golden_tree, dirty_tree.name()),
            cancel,
        );

        for handle in handles {
            if handle.join().is_err() {
                warn!("Classification worker panicked");
            }
        }

        // Tasks that finished after the wait stopped still count
        let completed = completed.max(stats.processed_files());
        self.progress.report(
            skipped + completed,
            &format!("Compared {completed} of {submitted} golden files"),
        );

        Ok(ScheduleSummary {
            submitted,
            completed,
            cancelled,
        })
    }

    fn spawn_workers(
        &self,
        count: usize,
        task_rx: &Arc<Mutex<Receiver<FileRef>>>,
        done_tx: &Sender<TaskDone>,
        dirty_tree: &Arc<dyn FileTree>,
        cancel: &CancellationToken,
        stats: &Arc<RunStats>,
    ) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(count);
        for idx in 0..count {
            let task_rx = Arc::clone(task_rx);
            let done_tx = done_tx.clone();
            let classifier = Arc::clone(&self.classifier);
            let dirty_tree = Arc::clone(dirty_tree);
            let cancel = cancel.clone();
            let stats = Arc::clone(stats);

            let spawned = thread::Builder::new()
                .name(format!("golden-worker-{idx}"))
                .spawn(move || {
                    worker_loop(
                        &task_rx,
                        &done_tx,
                        &classifier,
                        dirty_tree.as_ref(),
                        &cancel,
                        &stats,
                    )
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => warn!(worker = idx, error = %e, "Failed to spawn classification worker"),
            }
        }
        handles
    }

    fn submit(
        golden_files: Vec<FileRef>,
        task_tx: &Sender<FileRef>,
        cancel: &CancellationToken,
    ) -> usize {
        let mut submitted = 0;
        for (i, file) in golden_files.into_iter().enumerate() {
            if i % SUBMIT_CANCEL_CHECK == 0 && cancel.is_cancelled() {
                info!(submitted, "Cancelled while submitting tasks");
                break;
            }
            if task_tx.send(file).is_err() {
                // Every worker is gone
                break;
            }
            submitted += 1;
        }
        submitted
    }

    /// Returns (completed, cancelled)
    fn wait(
        &self,
        done_rx: &Receiver<TaskDone>,
        submitted: usize,
        skipped: usize,
        (golden_name, dirty_name): (&str, &str),
        cancel: &CancellationToken,
    ) -> (usize, bool) {
        let tick = self
            .config
            .progress_interval
            .min(POLL_TICK)
            .max(Duration::from_millis(1));
        let mut completed = 0usize;
        let mut last_report = Instant::now();
        let mut last_message = String::from("Comparing files with the golden image");

        while completed < submitted {
            match done_rx.recv_timeout(tick) {
                Ok(done) => {
                    completed += 1;
                    let path = done.file.tree_path();
                    last_message =
                        format!("Comparing {path} ({dirty_name}) with {path} ({golden_name})");
                    trace!(path = %path, outcome = %done.outcome, "Task finished");
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if cancel.is_cancelled() {
                info!(completed, submitted, "Cancellation observed; stopping wait");
                return (completed, true);
            }

            if last_report.elapsed() >= self.config.progress_interval {
                self.progress.report(skipped + completed, &last_message);
                last_report = Instant::now();
            }
        }

        (completed, cancel.is_cancelled())
    }
}

fn worker_loop(
    task_rx: &Mutex<Receiver<FileRef>>,
    done_tx: &Sender<TaskDone>,
    classifier: &Classifier,
    dirty_tree: &dyn FileTree,
    cancel: &CancellationToken,
    stats: &RunStats,
) {
    loop {
        let next = {
            let rx = task_rx.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            rx.recv()
        };
        let Ok(file) = next else {
            break;
        };
        if cancel.is_cancelled() {
            break;
        }

        let outcome = classifier.classify(&file, dirty_tree, stats);
        stats.record_processed();
        // The waiter may have stopped listening after cancellation
        let _ = done_tx.send(TaskDone { file, outcome });
    }
}

impl std::fmt::Debug for WorkScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkScheduler")
            .field("config", &self.config)
            .finish()
    }
}
