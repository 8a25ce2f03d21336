//! End-to-end runs against real directories and the JSON label store

use golden_core::{
    CancellationToken, CompareConfig, ComparisonJob, DigestAlgorithm, FileDigester, FileTree,
    FsTree, FsTreeOptions, HostServices, JsonLabelStore, LabelStore, TracingMessages,
    TracingProgress,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// golden: a/same.txt, a/changed.txt, a/gone.txt, top.txt
/// dirty:  a/same.txt, a/changed.txt (edited), top.txt, extra.txt
fn fixture() -> (TempDir, TempDir) {
    let golden = TempDir::new().unwrap();
    let dirty = TempDir::new().unwrap();

    write(golden.path(), "a/same.txt", "same");
    write(golden.path(), "a/changed.txt", "original");
    write(golden.path(), "a/gone.txt", "deleted later");
    write(golden.path(), "top.txt", "top");

    write(dirty.path(), "a/same.txt", "same");
    write(dirty.path(), "a/changed.txt", "tampered");
    write(dirty.path(), "top.txt", "top");
    write(dirty.path(), "extra.txt", "not in golden");

    (golden, dirty)
}

fn run(
    golden: &Path,
    dirty: &Path,
    store: Arc<JsonLabelStore>,
    algorithm: DigestAlgorithm,
) -> golden_core::RunReport {
    let config = CompareConfig {
        workers: 3,
        digest_algorithm: algorithm,
        ..Default::default()
    };
    let services = HostServices {
        digests: Arc::new(FileDigester::new(config.digest_algorithm)),
        labels: store,
        progress: Arc::new(TracingProgress),
        messages: Arc::new(TracingMessages),
    };
    let golden_tree: Arc<dyn FileTree> =
        Arc::new(FsTree::open("golden", golden, FsTreeOptions::default()).unwrap());
    let dirty_tree: Arc<dyn FileTree> =
        Arc::new(FsTree::open("workstation", dirty, FsTreeOptions::default()).unwrap());

    ComparisonJob::new(services, &config)
        .process(Some(golden_tree), dirty_tree, &CancellationToken::new())
        .unwrap()
}

fn label_names_for(store: &JsonLabelStore, path: &Path) -> Vec<String> {
    store
        .assignments_for(path)
        .into_iter()
        .filter_map(|a| store.label(a.label_id))
        .map(|l| l.name)
        .collect()
}

#[test]
fn test_directory_comparison_end_to_end() {
    let (golden, dirty) = fixture();
    let state = TempDir::new().unwrap();
    let store_path = state.path().join("labels.json");
    let store = Arc::new(JsonLabelStore::open(&store_path).unwrap());

    let report = run(golden.path(), dirty.path(), store.clone(), DigestAlgorithm::Md5);

    assert!(!report.cancelled);
    assert_eq!(report.golden_tree, "golden");
    assert_eq!(report.dirty_tree, "workstation");
    let stats = report.stats;
    // The `a` directory counts toward the total but is skipped
    assert_eq!(stats.total_reference_files, 5);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.processed_files, 4);
    assert_eq!(stats.unchanged, 2);
    assert_eq!(stats.changed, 1);
    assert_eq!(stats.missing, 1);
    assert_eq!(stats.incomparable, 0);
    assert_eq!(stats.hashed_golden_files, 3);
    assert_eq!(stats.hashed_subject_files, 3);

    assert_eq!(
        label_names_for(&store, &dirty.path().join("a/same.txt")),
        vec!["DI_Good"]
    );
    assert_eq!(
        label_names_for(&store, &dirty.path().join("a/changed.txt")),
        vec!["DI_Changed"]
    );
    assert_eq!(
        label_names_for(&store, &golden.path().join("a/gone.txt")),
        vec!["DI_DELETED_workstation"]
    );
    assert!(label_names_for(&store, &dirty.path().join("extra.txt")).is_empty());

    // The run flushed the store
    let reopened = JsonLabelStore::open(&store_path).unwrap();
    assert_eq!(reopened.list_all().unwrap().len(), 3);
    assert_eq!(reopened.assignments().len(), 4);
}

#[test]
fn test_second_run_reuses_persisted_labels() {
    let (golden, dirty) = fixture();
    let state = TempDir::new().unwrap();
    let store_path = state.path().join("labels.json");

    run(
        golden.path(),
        dirty.path(),
        Arc::new(JsonLabelStore::open(&store_path).unwrap()),
        DigestAlgorithm::Sha256,
    );
    let first = JsonLabelStore::open(&store_path).unwrap().list_all().unwrap();

    let report = run(
        golden.path(),
        dirty.path(),
        Arc::new(JsonLabelStore::open(&store_path).unwrap()),
        DigestAlgorithm::Blake3,
    );
    assert_eq!(report.stats.unchanged, 2);

    let reopened = JsonLabelStore::open(&store_path).unwrap();
    assert_eq!(reopened.list_all().unwrap(), first);
    assert_eq!(reopened.assignments().len(), 4);
}

#[test]
fn test_emptied_dirty_tree_marks_everything_missing() {
    let (golden, _) = fixture();
    let dirty = TempDir::new().unwrap();
    let store = Arc::new(JsonLabelStore::in_memory());

    let report = run(golden.path(), dirty.path(), store.clone(), DigestAlgorithm::Md5);

    assert_eq!(report.stats.missing, 4);
    assert_eq!(report.stats.hashed_golden_files, 0);
    let counts = store.assignment_counts();
    assert_eq!(counts.values().sum::<usize>(), 4);
}
