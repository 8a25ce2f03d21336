//! Compare command - label a dirty tree against a golden image
//!
//! Walks both directories, runs the comparison engine and prints a summary.
//! Ctrl-C stops scheduling new files; files already being compared finish
//! and the partial summary is printed.

use crate::cli::config::{load_config, resolve_label_store};
use crate::cli::error::HelpfulError;
use crate::cli::output::{color_for_outcome, format_duration_ms, print_table_colored};
use crate::cli::progress::BarProgress;
use anyhow::{Context, Result};
use chrono::Local;
use golden_core::{
    CancellationToken, ComparisonJob, ComparisonOutcome, DigestAlgorithm, FileDigester, FileTree,
    FsTree, FsTreeOptions, HostServices, JsonLabelStore, ProgressSink, RunReport,
    TracingMessages, TracingProgress,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Arguments for the compare command
#[derive(Debug)]
pub struct CompareArgs {
    pub config: Option<PathBuf>,
    pub golden: PathBuf,
    pub dirty: PathBuf,
    pub golden_name: Option<String>,
    pub dirty_name: Option<String>,
    pub workers: Option<usize>,
    pub algorithm: Option<DigestAlgorithm>,
    pub labels: Option<PathBuf>,
    pub json: bool,
    pub show_unresolved: bool,
}

/// Execute the compare command
pub fn run(args: CompareArgs) -> Result<()> {
    let golden_root = validate_tree_root(&args.golden, "golden")?;
    let dirty_root = validate_tree_root(&args.dirty, "dirty")?;

    let (mut config, _) = load_config(args.config.as_deref())?;
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(algorithm) = args.algorithm {
        config.digest_algorithm = algorithm;
    }
    config
        .validate()
        .map_err(|e| HelpfulError::new(e.to_string()).with_suggestion("TRY: --workers 4"))?;

    let options = FsTreeOptions {
        follow_symlinks: config.follow_symlinks,
        include_hidden: config.include_hidden,
    };
    let golden_name = args
        .golden_name
        .clone()
        .unwrap_or_else(|| tree_name(&golden_root, "golden"));
    let dirty_name = args
        .dirty_name
        .clone()
        .unwrap_or_else(|| tree_name(&dirty_root, "dirty"));

    let golden = FsTree::open(golden_name, &golden_root, options)
        .with_context(|| format!("Failed to read golden tree {}", args.golden.display()))?;
    let dirty = FsTree::open(dirty_name, &dirty_root, options)
        .with_context(|| format!("Failed to read dirty tree {}", args.dirty.display()))?;
    let walk_errors = golden.walk_errors() + dirty.walk_errors();
    let golden: Arc<dyn FileTree> = Arc::new(golden);
    let dirty: Arc<dyn FileTree> = Arc::new(dirty);

    let store_path = resolve_label_store(&config, args.labels.as_deref())?;
    let store = Arc::new(JsonLabelStore::open(&store_path).map_err(|e| {
        HelpfulError::label_store_unreadable(&store_path, &e.to_string())
    })?);

    let bar = (!args.json).then(|| Arc::new(BarProgress::new()));
    let progress: Arc<dyn ProgressSink> = match &bar {
        Some(bar) => bar.clone(),
        None => Arc::new(TracingProgress),
    };

    let services = HostServices {
        digests: Arc::new(FileDigester::new(config.digest_algorithm)),
        labels: store,
        progress,
        messages: Arc::new(TracingMessages),
    };

    let cancel = CancellationToken::new();
    install_signal_handlers(&cancel)?;

    info!(
        golden = %golden_root.display(),
        dirty = %dirty_root.display(),
        labels = %store_path.display(),
        workers = config.workers,
        algorithm = %config.digest_algorithm,
        "Running comparison"
    );
    let result = ComparisonJob::new(services, &config).process(Some(golden), dirty, &cancel);
    if let Some(bar) = &bar {
        bar.finish();
    }
    let report = result?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report, &store_path, walk_errors, args.show_unresolved);
    }
    Ok(())
}

/// Check a tree root and return its canonical form, so stored locators are
/// absolute paths
fn validate_tree_root(path: &Path, role: &str) -> Result<PathBuf> {
    if !path.exists() {
        return Err(HelpfulError::path_not_found(path).into());
    }
    if !path.is_dir() {
        return Err(HelpfulError::not_a_directory(path, role).into());
    }
    path.canonicalize()
        .with_context(|| format!("Failed to resolve {} tree {}", role, path.display()))
}

/// Display name for a tree: the directory's own name
fn tree_name(root: &Path, fallback: &str) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| fallback.to_string())
}

fn print_summary(
    report: &RunReport,
    store_path: &Path,
    walk_errors: usize,
    show_unresolved: bool,
) {
    let stats = &report.stats;

    println!();
    println!("Golden image: {}", report.golden_tree);
    println!("Dirty tree:   {}", report.dirty_tree);
    println!(
        "Started:      {}",
        report.started_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    );
    println!("Duration:     {}", format_duration_ms(report.duration_ms));
    println!();

    let outcome_row = |outcome: ComparisonOutcome, count: usize| {
        vec![
            (outcome.as_str().to_string(), color_for_outcome(outcome)),
            (count.to_string(), None),
        ]
    };
    print_table_colored(
        &["Outcome", "Files"],
        vec![
            outcome_row(ComparisonOutcome::Unchanged, stats.unchanged),
            outcome_row(ComparisonOutcome::Changed, stats.changed),
            outcome_row(ComparisonOutcome::MissingInSubject, stats.missing),
            outcome_row(ComparisonOutcome::Incomparable, stats.incomparable),
            outcome_row(ComparisonOutcome::Skipped, stats.skipped),
        ],
    );

    println!();
    println!(
        "{} golden entries, {} compared. Hashed {} golden and {} dirty files.",
        stats.total_reference_files,
        stats.processed_files,
        stats.hashed_golden_files,
        stats.hashed_subject_files
    );
    if walk_errors > 0 {
        println!(
            "WARNING: {} entries could not be read while listing the trees",
            walk_errors
        );
    }
    if stats.label_failures > 0 {
        println!(
            "WARNING: {} files could not be labeled (see log for details)",
            stats.label_failures
        );
    }
    println!("Labels saved to {}", store_path.display());

    if report.cancelled {
        println!();
        println!("Comparison was cancelled; counts cover the files compared so far.");
    }

    if show_unresolved && !report.unresolved.is_empty() {
        println!();
        println!("Files that could not be compared:");
        for path in &report.unresolved {
            println!("  {}", path);
        }
    } else if !report.unresolved.is_empty() {
        println!("TRY: --show-unresolved to list files that could not be hashed");
    }
}

/// Route SIGINT/SIGTERM to the run's cancel token
fn install_signal_handlers(cancel: &CancellationToken) -> Result<()> {
    #[cfg(unix)]
    {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals =
            Signals::new([SIGINT, SIGTERM]).context("Failed to install signal handlers")?;
        let cancel = cancel.clone();
        std::thread::Builder::new()
            .name("golden-signals".to_string())
            .spawn(move || {
                if let Some(sig) = signals.forever().next() {
                    info!("Received signal {}, cancelling comparison...", sig);
                    cancel.cancel();
                }
            })
            .context("Failed to spawn signal thread")?;
    }

    #[cfg(windows)]
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            info!("Received Ctrl+C, cancelling comparison...");
            cancel.cancel();
        })
        .context("Failed to install Ctrl+C handler")?;
    }

    Ok(())
}
