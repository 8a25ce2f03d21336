//! Concurrent runs: label convergence, cancellation and progress

mod support;

use golden_core::{
    CancellationToken, CompareConfig, CompareError, ComparisonJob, LabelColor, LabelSpec,
    MessageKind,
};
use golden_test_utils::{FakeLabelStore, MemoryTreeBuilder};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use support::{numbered_tree, Harness};

#[test]
fn test_concurrent_get_or_create_converges() {
    const CALLERS: usize = 8;
    let harness = Harness::new(MemoryTreeBuilder::new("golden"), MemoryTreeBuilder::new("laptop"))
        .with_labels(FakeLabelStore::with_create_race(CALLERS));
    let registry = harness.registry();
    let spec = LabelSpec::new("DI_DELETED_laptop", "gone", LabelColor::Lime);

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let spec = spec.clone();
            thread::spawn(move || registry.get_or_create(&spec).unwrap())
        })
        .collect();
    let ids: HashSet<_> = handles.into_iter().map(|h| h.join().unwrap().id).collect();

    assert_eq!(ids.len(), 1);
    assert_eq!(harness.labels.labels().len(), 1);
    assert_eq!(harness.labels.create_calls(), CALLERS);
    // Every loser fell back to the scan
    assert_eq!(harness.labels.list_calls(), CALLERS - 1);
}

#[test]
fn test_concurrent_static_label_first_use() {
    const CALLERS: usize = 8;
    let harness = Harness::new(MemoryTreeBuilder::new("golden"), MemoryTreeBuilder::new("laptop"))
        .with_labels(FakeLabelStore::with_create_race(CALLERS));
    let registry = harness.registry();

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.changed_label().unwrap())
        })
        .collect();
    let labels: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(labels.iter().all(|l| l == &labels[0]));
    assert_eq!(harness.labels.labels().len(), 1);
}

#[test]
fn test_full_run_creates_missing_label_once() {
    let harness = Harness::new(numbered_tree("golden", 500), MemoryTreeBuilder::new("laptop"));
    let job = harness.job(8);

    let report = job
        .process(harness.golden_tree(), harness.dirty_tree(), &CancellationToken::new())
        .unwrap();

    assert!(!report.cancelled);
    assert_eq!(report.stats.missing, 500);
    assert_eq!(report.stats.processed_files, 500);

    let labels = harness.labels.labels();
    assert_eq!(labels.len(), 1);
    assert_eq!(labels[0].name, "DI_DELETED_laptop");
    let assignments = harness.labels.assignments();
    assert_eq!(assignments.len(), 500);
    assert!(assignments.iter().all(|a| a.label_id == labels[0].id));
}

#[test]
fn test_mixed_run_counts_every_outcome() {
    let golden = MemoryTreeBuilder::new("golden")
        .dir("etc")
        .file("etc/hosts", b"127.0.0.1")
        .file("etc/passwd", b"root:x:0:0")
        .file("etc/shadow", b"root:*")
        .file("etc/motd", b"welcome")
        .unreadable_file("etc/secret", b"s");
    let dirty = MemoryTreeBuilder::new("laptop")
        .file("etc/hosts", b"127.0.0.1")
        .file("etc/passwd", b"root:x:0:0\nmallory:x:0:0")
        .file("etc/motd", b"welcome");
    let harness = Harness::new(golden, dirty);
    let motd = harness.golden.file("etc/motd").unwrap();
    harness.digests.fail_on(motd.locator());

    let report = harness
        .job(4)
        .process(harness.golden_tree(), harness.dirty_tree(), &CancellationToken::new())
        .unwrap();

    let stats = report.stats;
    assert_eq!(stats.total_reference_files, 6);
    assert_eq!(stats.skipped, 2);
    assert_eq!(stats.processed_files, 4);
    assert_eq!(stats.unchanged, 1);
    assert_eq!(stats.changed, 1);
    assert_eq!(stats.missing, 1);
    assert_eq!(stats.incomparable, 1);
    assert_eq!(report.unresolved, vec!["/etc/motd".to_string()]);
    assert_eq!(report.classified(), 3);

    assert_eq!(harness.progress.determinate_total(), Some(6));
    assert_eq!(harness.labels.flushes(), 1);
    assert_eq!(
        harness.messages.kinds(),
        vec![
            MessageKind::Started,
            MessageKind::HashingStats,
            MessageKind::GeneralStats,
            MessageKind::Finished,
        ]
    );
    let general = &harness.messages.messages()[2].text;
    assert!(general.contains("Total files: 6"), "{general}");
    assert!(general.contains("comparison failures: 1"), "{general}");
}

#[test]
fn test_cancellation_with_one_worker_stops_after_in_flight_task() {
    let token = CancellationToken::new();
    let hook_token = token.clone();
    // Every file has both sides, so each task makes two digest calls.
    // Call 20 is the golden side of the 10th task.
    let harness = Harness::with_digester(
        numbered_tree("golden", 1000),
        numbered_tree("laptop", 1000),
        move |d| {
            d.with_hook(move |call| {
                if call == 20 {
                    hook_token.cancel();
                }
            })
        },
    );

    let report = harness
        .job(1)
        .process(harness.golden_tree(), harness.dirty_tree(), &token)
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.stats.processed_files, 10);
    assert_eq!(report.stats.unchanged, 10);
    assert_eq!(harness.digests.calls(), 20);
    assert_eq!(harness.labels.assignments().len(), 10);
    // No summary notices for a cancelled run
    assert_eq!(harness.messages.kinds(), vec![MessageKind::Started]);
}

#[test]
fn test_cancellation_with_pool_lets_in_flight_tasks_finish() {
    const WORKERS: usize = 4;
    let token = CancellationToken::new();
    let hook_token = token.clone();
    let harness = Harness::with_digester(
        numbered_tree("golden", 1000),
        numbered_tree("laptop", 1000),
        move |d| {
            d.with_hook(move |call| {
                if call == 20 {
                    hook_token.cancel();
                }
            })
        },
    );

    let report = harness
        .job(WORKERS)
        .process(harness.golden_tree(), harness.dirty_tree(), &token)
        .unwrap();

    assert!(report.cancelled);
    let processed = report.stats.processed_files;
    // At most 9 tasks finished before call 20, plus at most one task per worker in flight
    assert!((10..=9 + WORKERS).contains(&processed), "processed = {processed}");
    assert!(processed < 1000);
    assert_eq!(report.stats.unchanged, processed);
}

#[test]
fn test_cancelled_before_start_does_no_work() {
    let harness = Harness::new(numbered_tree("golden", 50), numbered_tree("laptop", 50));
    let token = CancellationToken::new();
    token.cancel();

    let report = harness
        .job(4)
        .process(harness.golden_tree(), harness.dirty_tree(), &token)
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.stats.total_reference_files, 50);
    assert_eq!(report.stats.processed_files, 0);
    assert_eq!(harness.digests.calls(), 0);
}

#[test]
fn test_progress_reports_name_both_trees() {
    let harness = Harness::new(
        MemoryTreeBuilder::new("golden").file("a/b.txt", b"1"),
        MemoryTreeBuilder::new("laptop").file("a/b.txt", b"1"),
    );
    let config = CompareConfig {
        workers: 2,
        progress_interval_ms: 0,
        ..Default::default()
    };
    let job = ComparisonJob::new(harness.services(), &config);

    job.process(harness.golden_tree(), harness.dirty_tree(), &CancellationToken::new())
        .unwrap();

    let reports = harness.progress.reports();
    assert!(
        reports
            .iter()
            .any(|(_, msg)| msg == "Comparing /a/b.txt (laptop) with /a/b.txt (golden)"),
        "{reports:?}"
    );
    assert_eq!(reports.last().map(|(current, _)| *current), Some(1));
}

#[test]
fn test_progress_counts_skipped_entries_toward_total() {
    let harness = Harness::new(
        MemoryTreeBuilder::new("golden")
            .dir("a")
            .dir("a/sub")
            .file("a/b.txt", b"1"),
        MemoryTreeBuilder::new("laptop").file("a/b.txt", b"1"),
    );
    let config = CompareConfig {
        workers: 2,
        progress_interval_ms: 0,
        ..Default::default()
    };
    let job = ComparisonJob::new(harness.services(), &config);

    let report = job
        .process(harness.golden_tree(), harness.dirty_tree(), &CancellationToken::new())
        .unwrap();

    assert_eq!(report.stats.skipped, 2);
    assert_eq!(harness.progress.determinate_total(), Some(3));
    let reports = harness.progress.reports();
    assert_eq!(reports.last().map(|(current, _)| *current), Some(3), "{reports:?}");
    assert!(reports.iter().all(|(current, _)| *current >= 2));
}

#[test]
fn test_progress_completes_when_nothing_is_comparable() {
    let harness = Harness::new(
        MemoryTreeBuilder::new("golden").dir("etc").dir("var"),
        MemoryTreeBuilder::new("laptop"),
    );
    let job = ComparisonJob::new(harness.services(), &CompareConfig::default());

    let report = job
        .process(harness.golden_tree(), harness.dirty_tree(), &CancellationToken::new())
        .unwrap();

    assert_eq!(report.stats.processed_files, 0);
    assert_eq!(harness.progress.determinate_total(), Some(2));
    assert_eq!(
        harness.progress.reports().last().map(|(current, _)| *current),
        Some(2)
    );
}

#[test]
fn test_missing_golden_tree_is_configuration_error() {
    let harness = Harness::new(MemoryTreeBuilder::new("golden"), MemoryTreeBuilder::new("laptop"));

    let err = harness
        .job(2)
        .process(None, harness.dirty_tree(), &CancellationToken::new())
        .unwrap_err();

    assert!(matches!(err, CompareError::Configuration(_)));
    assert!(harness.labels.labels().is_empty());
}

#[test]
fn test_golden_listing_failure_is_run_error() {
    let harness = Harness::new(
        MemoryTreeBuilder::new("golden").file("a", b"x").fail_listing(),
        MemoryTreeBuilder::new("laptop"),
    );

    let err = harness
        .job(2)
        .process(harness.golden_tree(), harness.dirty_tree(), &CancellationToken::new())
        .unwrap_err();

    assert!(matches!(err, CompareError::Enumeration { ref tree, .. } if tree == "golden"));
}

#[test]
fn test_repeat_runs_reuse_labels() {
    let harness = Harness::new(
        MemoryTreeBuilder::new("golden")
            .file("a/same.txt", b"1")
            .file("a/gone.txt", b"2"),
        MemoryTreeBuilder::new("laptop").file("a/same.txt", b"1"),
    );
    let job = harness.job(2);

    for _ in 0..2 {
        let report = job
            .process(harness.golden_tree(), harness.dirty_tree(), &CancellationToken::new())
            .unwrap();
        assert_eq!(report.stats.unchanged, 1);
        assert_eq!(report.stats.missing, 1);
    }

    let names: HashSet<_> = harness.labels.labels().into_iter().map(|l| l.name).collect();
    assert_eq!(
        names,
        HashSet::from(["DI_Good".to_string(), "DI_DELETED_laptop".to_string()])
    );
    assert_eq!(harness.labels.assignments().len(), 2);
    // Second run: static label cached, missing label found by scan
    assert_eq!(harness.labels.create_calls(), 3);
}
