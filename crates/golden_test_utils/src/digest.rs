//! Digest provider over in-memory content

use crate::tree::MemoryTree;
use golden_core::{Digest, DigestError, DigestProvider, FileEntry};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

type CallHook = Box<dyn Fn(usize) + Send + Sync>;

/// md5 of registered content, with failure injection and call counting
#[derive(Default)]
pub struct MemoryDigester {
    contents: Mutex<HashMap<PathBuf, Vec<u8>>>,
    failing: Mutex<HashSet<PathBuf>>,
    per_file: Mutex<HashMap<PathBuf, usize>>,
    calls: AtomicUsize,
    hook: Option<CallHook>,
}

impl MemoryDigester {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the content of every file in `trees`
    pub fn from_trees(trees: &[&MemoryTree]) -> Self {
        let digester = Self::new();
        for tree in trees {
            for (locator, content) in tree.contents() {
                digester.insert(locator.clone(), content.clone());
            }
        }
        digester
    }

    pub fn insert(&self, locator: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        lock(&self.contents).insert(locator.into(), content.into());
    }

    /// Hashing `locator` fails with an I/O error
    pub fn fail_on(&self, locator: impl Into<PathBuf>) {
        lock(&self.failing).insert(locator.into());
    }

    /// Run `hook` with the 1-based call number before every computation
    pub fn with_hook(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Total calls to [`DigestProvider::compute`]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, locator: &Path) -> usize {
        lock(&self.per_file).get(locator).copied().unwrap_or(0)
    }
}

impl DigestProvider for MemoryDigester {
    fn compute(&self, file: &FileEntry) -> Result<Digest, DigestError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        *lock(&self.per_file)
            .entry(file.locator().to_path_buf())
            .or_default() += 1;
        if let Some(hook) = &self.hook {
            hook(call);
        }

        let locator = file.locator();
        if lock(&self.failing).contains(locator) {
            return Err(DigestError::Io {
                path: locator.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "simulated read failure"),
            });
        }

        let contents = lock(&self.contents);
        let content = contents
            .get(locator)
            .ok_or_else(|| DigestError::Unavailable(locator.display().to_string()))?;
        Ok(Digest::from_bytes(md5::compute(content).0.to_vec()))
    }
}

impl std::fmt::Debug for MemoryDigester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDigester")
            .field("calls", &self.calls())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
