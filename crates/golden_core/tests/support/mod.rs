//! Shared wiring for engine integration tests
#![allow(dead_code)]

use golden_core::{
    Classifier, CompareConfig, ComparisonJob, DigestCache, FileTree, HostServices, LabelConfig,
    LabelRegistry, LabelStore,
};
use golden_test_utils::{
    FakeLabelStore, MemoryDigester, MemoryTree, MemoryTreeBuilder, RecordingMessages,
    RecordingProgress,
};
use std::sync::Arc;

pub struct Harness {
    pub golden: Arc<MemoryTree>,
    pub dirty: Arc<MemoryTree>,
    pub digests: Arc<MemoryDigester>,
    pub labels: Arc<FakeLabelStore>,
    pub progress: Arc<RecordingProgress>,
    pub messages: Arc<RecordingMessages>,
}

impl Harness {
    pub fn new(golden: MemoryTreeBuilder, dirty: MemoryTreeBuilder) -> Self {
        Self::with_digester(golden, dirty, |d| d)
    }

    /// Customize the digester built from both trees' content
    pub fn with_digester(
        golden: MemoryTreeBuilder,
        dirty: MemoryTreeBuilder,
        customize: impl FnOnce(MemoryDigester) -> MemoryDigester,
    ) -> Self {
        let golden = golden.build_arc();
        let dirty = dirty.build_arc();
        let digests = customize(MemoryDigester::from_trees(&[&golden, &dirty]));
        Self {
            golden,
            dirty,
            digests: Arc::new(digests),
            labels: Arc::new(FakeLabelStore::new()),
            progress: Arc::new(RecordingProgress::new()),
            messages: Arc::new(RecordingMessages::new()),
        }
    }

    pub fn with_labels(mut self, labels: FakeLabelStore) -> Self {
        self.labels = Arc::new(labels);
        self
    }

    pub fn registry(&self) -> Arc<LabelRegistry> {
        let store: Arc<dyn LabelStore> = self.labels.clone();
        Arc::new(LabelRegistry::new(store, LabelConfig::default()))
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.registry(), DigestCache::new(self.digests.clone()))
    }

    pub fn services(&self) -> HostServices {
        HostServices {
            digests: self.digests.clone(),
            labels: self.labels.clone(),
            progress: self.progress.clone(),
            messages: self.messages.clone(),
        }
    }

    pub fn job(&self, workers: usize) -> ComparisonJob {
        let config = CompareConfig {
            workers,
            ..Default::default()
        };
        ComparisonJob::new(self.services(), &config)
    }

    pub fn golden_tree(&self) -> Option<Arc<dyn FileTree>> {
        Some(self.golden.clone())
    }

    pub fn dirty_tree(&self) -> Arc<dyn FileTree> {
        self.dirty.clone()
    }
}

/// `count` files named `f0000.txt`.. under `data/`, each with distinct content
pub fn numbered_tree(name: &str, count: usize) -> MemoryTreeBuilder {
    (0..count).fold(MemoryTreeBuilder::new(name), |builder, i| {
        builder.file(&format!("data/f{i:04}.txt"), format!("content {i}").as_bytes())
    })
}
