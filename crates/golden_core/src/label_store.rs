//! JSON-file label store
//!
//! # Storage Format
//!
//! ```text
//! {
//!   "nextId": 4,
//!   "labels": [ { "id": 1, "name": "DI_Good", ... } ],
//!   "assignments": [ { "labelId": 1, "file": "/data/dirty/a/b.txt", ... } ]
//! }
//! ```
//!
//! Changes are kept in memory and written by [`LabelStore::flush`]. Writes go
//! to a temp file next to the target and are renamed into place.

use crate::error::LabelStoreError;
use crate::host::LabelStore;
use crate::types::{FileEntry, Label, LabelColor, LabelId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// One label attached to one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelAssignment {
    pub label_id: LabelId,
    /// Host locator of the labeled file
    pub file: String,
    #[serde(default)]
    pub note: String,
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LabelDocument {
    next_id: u64,
    #[serde(default)]
    labels: Vec<Label>,
    #[serde(default)]
    assignments: Vec<LabelAssignment>,
}

impl Default for LabelDocument {
    fn default() -> Self {
        Self {
            next_id: 1,
            labels: Vec::new(),
            assignments: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    doc: LabelDocument,
    /// (label, file) pairs already present in `doc.assignments`
    applied: HashSet<(LabelId, String)>,
}

impl StoreState {
    fn from_doc(doc: LabelDocument) -> Self {
        let applied = doc
            .assignments
            .iter()
            .map(|a| (a.label_id, a.file.clone()))
            .collect();
        Self { doc, applied }
    }
}

/// Durable [`LabelStore`] backed by a single JSON file
#[derive(Debug)]
pub struct JsonLabelStore {
    path: Option<PathBuf>,
    state: RwLock<StoreState>,
    dirty: AtomicBool,
    write_lock: Mutex<()>,
}

impl JsonLabelStore {
    /// Open the store at `path`, starting empty if the file does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LabelStoreError> {
        let path = path.into();
        let doc = if path.exists() {
            let json = fs::read_to_string(&path)?;
            serde_json::from_str(&json)?
        } else {
            LabelDocument::default()
        };

        debug!(
            path = %path.display(),
            labels = doc.labels.len(),
            assignments = doc.assignments.len(),
            "Opened label store"
        );

        Ok(Self {
            path: Some(path),
            state: RwLock::new(StoreState::from_doc(doc)),
            dirty: AtomicBool::new(false),
            write_lock: Mutex::new(()),
        })
    }

    /// A store that never touches disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: RwLock::new(StoreState::default()),
            dirty: AtomicBool::new(false),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn label(&self, id: LabelId) -> Option<Label> {
        self.read().doc.labels.iter().find(|l| l.id == id).cloned()
    }

    pub fn assignments(&self) -> Vec<LabelAssignment> {
        self.read().doc.assignments.clone()
    }

    /// Assignments carried by the file with the given locator
    pub fn assignments_for(&self, locator: &Path) -> Vec<LabelAssignment> {
        let file = locator_key(locator);
        self.read()
            .doc
            .assignments
            .iter()
            .filter(|a| a.file == file)
            .cloned()
            .collect()
    }

    /// Number of files carrying each label. Labels with no files are included.
    pub fn assignment_counts(&self) -> BTreeMap<LabelId, usize> {
        let state = self.read();
        let mut counts: BTreeMap<LabelId, usize> =
            state.doc.labels.iter().map(|l| (l.id, 0)).collect();
        for assignment in &state.doc.assignments {
            *counts.entry(assignment.label_id).or_default() += 1;
        }
        counts
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LabelStore for JsonLabelStore {
    fn create(
        &self,
        name: &str,
        description: &str,
        color: LabelColor,
    ) -> Result<Label, LabelStoreError> {
        let mut state = self.write();
        if state.doc.labels.iter().any(|l| l.name == name) {
            return Err(LabelStoreError::AlreadyExists(name.to_string()));
        }

        let label = Label {
            id: LabelId(state.doc.next_id),
            name: name.to_string(),
            description: description.to_string(),
            color,
        };
        state.doc.next_id += 1;
        state.doc.labels.push(label.clone());
        self.dirty.store(true, Ordering::Release);
        Ok(label)
    }

    fn list_all(&self) -> Result<Vec<Label>, LabelStoreError> {
        Ok(self.read().doc.labels.clone())
    }

    fn apply(&self, file: &FileEntry, label: &Label, note: &str) -> Result<(), LabelStoreError> {
        let key = (label.id, locator_key(file.locator()));
        let mut state = self.write();
        if !state.doc.labels.iter().any(|l| l.id == label.id) {
            return Err(LabelStoreError::UnknownLabel(label.id));
        }
        if state.applied.contains(&key) {
            return Ok(());
        }

        state.doc.assignments.push(LabelAssignment {
            label_id: label.id,
            file: key.1.clone(),
            note: note.to_string(),
            applied_at: Utc::now(),
        });
        state.applied.insert(key);
        self.dirty.store(true, Ordering::Release);
        Ok(())
    }

    fn flush(&self) -> Result<(), LabelStoreError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        let json = {
            let state = self.read();
            serde_json::to_string_pretty(&state.doc)?
        };
        if let Err(e) = atomic_write(path, json.as_bytes()) {
            self.dirty.store(true, Ordering::Release);
            return Err(e.into());
        }

        debug!(path = %path.display(), "Persisted label store");
        Ok(())
    }
}

fn locator_key(locator: &Path) -> String {
    locator.to_string_lossy().into_owned()
}

/// Atomic write via temp file + rename
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let temp_path = parent.join(format!(".tmp_{}", uuid::Uuid::new_v4()));
    fs::write(&temp_path, content)?;
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntryKind, FileId};
    use std::sync::Arc;

    fn entry(locator: &str) -> FileEntry {
        FileEntry::new(FileId(1), "b.txt", "/a/", EntryKind::File, locator)
    }

    #[test]
    fn test_create_rejects_duplicate_name() {
        let store = JsonLabelStore::in_memory();
        let first = store.create("DI_Good", "good", LabelColor::Lime).unwrap();
        assert_eq!(first.id, LabelId(1));

        let err = store.create("DI_Good", "again", LabelColor::Red).unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(store.list_all().unwrap().len(), 1);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let store = JsonLabelStore::in_memory();
        let label = store.create("DI_Changed", "changed", LabelColor::Lime).unwrap();
        let file = entry("/dirty/a/b.txt");

        store.apply(&file, &label, "note").unwrap();
        store.apply(&file, &label, "note").unwrap();

        assert_eq!(store.assignments().len(), 1);
        assert_eq!(store.assignment_counts()[&label.id], 1);
        assert_eq!(store.assignments_for(Path::new("/dirty/a/b.txt")).len(), 1);
    }

    #[test]
    fn test_apply_unknown_label() {
        let store = JsonLabelStore::in_memory();
        let stray = Label {
            id: LabelId(42),
            name: "stray".to_string(),
            description: String::new(),
            color: LabelColor::None,
        };
        let err = store.apply(&entry("/x"), &stray, "").unwrap_err();
        assert!(matches!(err, LabelStoreError::UnknownLabel(LabelId(42))));
    }

    #[test]
    fn test_flush_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("labels.json");

        let store = JsonLabelStore::open(&path).unwrap();
        let label = store.create("DI_DELETED_laptop", "gone", LabelColor::Lime).unwrap();
        store.apply(&entry("/golden/a/b.txt"), &label, "missing").unwrap();
        store.flush().unwrap();

        let reopened = JsonLabelStore::open(&path).unwrap();
        assert_eq!(reopened.list_all().unwrap(), vec![label.clone()]);
        assert_eq!(reopened.assignments().len(), 1);

        // Reapplying after reload is still a no-op, and ids keep counting up
        reopened.apply(&entry("/golden/a/b.txt"), &label, "missing").unwrap();
        assert_eq!(reopened.assignments().len(), 1);
        let next = reopened.create("other", "", LabelColor::Red).unwrap();
        assert_eq!(next.id, LabelId(2));

        // No temp files left behind
        let leftovers = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp_"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_concurrent_create_keeps_one() {
        let store = Arc::new(JsonLabelStore::in_memory());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.create("race", "", LabelColor::Lime).is_ok())
            })
            .collect();
        let created = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(created, 1);
        assert_eq!(store.list_all().unwrap().len(), 1);
    }
}
