//! Path index over a tree listing
//!
//! Maps `(parent_path, name)` to the entries carrying that key. Entries under
//! one key keep insertion order, so "first result" means first inserted.

use crate::types::FileRef;
use std::collections::HashMap;

/// Composite-key index used by hosts to answer name+path lookups
#[derive(Debug, Default)]
pub struct PathIndex {
    by_parent: HashMap<String, HashMap<String, Vec<FileRef>>>,
    len: usize,
}

impl PathIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a listing
    pub fn build(files: impl IntoIterator<Item = FileRef>) -> Self {
        let mut index = Self::new();
        for file in files {
            index.insert(file);
        }
        index
    }

    pub fn insert(&mut self, file: FileRef) {
        self.by_parent
            .entry(file.parent_path().to_string())
            .or_default()
            .entry(file.name().to_string())
            .or_default()
            .push(file);
        self.len += 1;
    }

    /// All entries with the given key, in insertion order
    pub fn lookup(&self, name: &str, parent_path: &str) -> &[FileRef] {
        self.by_parent
            .get(parent_path)
            .and_then(|names| names.get(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of indexed entries
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of keys shared by more than one entry
    pub fn ambiguous_keys(&self) -> usize {
        self.by_parent
            .values()
            .flat_map(|names| names.values())
            .filter(|files| files.len() > 1)
            .count()
    }
}
