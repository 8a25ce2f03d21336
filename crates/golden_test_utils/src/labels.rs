//! Label store fake with race and failure injection

use golden_core::{FileEntry, FileId, Label, LabelColor, LabelId, LabelStore, LabelStoreError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Barrier, Mutex};

/// One recorded label application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAssignment {
    pub label_id: LabelId,
    pub label_name: String,
    pub file: FileId,
    pub note: String,
}

/// Holds the first `parties` creators until all of them have arrived
struct RaceGate {
    barrier: Barrier,
    parties: usize,
    arrived: AtomicUsize,
}

/// In-memory [`LabelStore`]
///
/// With [`FakeLabelStore::with_create_race`], the first N `create` calls
/// block until all N are inside `create`, so they race on the same name the
/// way concurrent host transactions do.
#[derive(Default)]
pub struct FakeLabelStore {
    labels: Mutex<Vec<Label>>,
    assignments: Mutex<Vec<RecordedAssignment>>,
    gate: Option<RaceGate>,
    create_calls: AtomicUsize,
    list_calls: AtomicUsize,
    apply_calls: AtomicUsize,
    flushes: AtomicUsize,
    fail_create: AtomicBool,
    fail_list: AtomicBool,
    fail_apply: AtomicBool,
}

impl FakeLabelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_create_race(parties: usize) -> Self {
        Self {
            gate: Some(RaceGate {
                barrier: Barrier::new(parties),
                parties,
                arrived: AtomicUsize::new(0),
            }),
            ..Self::default()
        }
    }

    /// Seed a label as if an earlier run had created it
    pub fn preload(&self, name: &str, color: LabelColor) -> Label {
        let mut labels = lock(&self.labels);
        let label = Label {
            id: LabelId(labels.len() as u64 + 1),
            name: name.to_string(),
            description: String::new(),
            color,
        };
        labels.push(label.clone());
        label
    }

    /// `create` fails with a backend error
    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_apply(&self, fail: bool) {
        self.fail_apply.store(fail, Ordering::SeqCst);
    }

    pub fn labels(&self) -> Vec<Label> {
        lock(&self.labels).clone()
    }

    pub fn label_named(&self, name: &str) -> Option<Label> {
        lock(&self.labels).iter().find(|l| l.name == name).cloned()
    }

    pub fn assignments(&self) -> Vec<RecordedAssignment> {
        lock(&self.assignments).clone()
    }

    /// Names of the labels applied to `file`
    pub fn labels_of(&self, file: FileId) -> Vec<String> {
        lock(&self.assignments)
            .iter()
            .filter(|a| a.file == file)
            .map(|a| a.label_name.clone())
            .collect()
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn apply_calls(&self) -> usize {
        self.apply_calls.load(Ordering::SeqCst)
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

impl LabelStore for FakeLabelStore {
    fn create(
        &self,
        name: &str,
        description: &str,
        color: LabelColor,
    ) -> Result<Label, LabelStoreError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            if gate.arrived.fetch_add(1, Ordering::SeqCst) < gate.parties {
                gate.barrier.wait();
            }
        }
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(LabelStoreError::Backend("create rejected".to_string()));
        }

        let mut labels = lock(&self.labels);
        if labels.iter().any(|l| l.name == name) {
            return Err(LabelStoreError::AlreadyExists(name.to_string()));
        }
        let label = Label {
            id: LabelId(labels.len() as u64 + 1),
            name: name.to_string(),
            description: description.to_string(),
            color,
        };
        labels.push(label.clone());
        Ok(label)
    }

    fn list_all(&self) -> Result<Vec<Label>, LabelStoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(LabelStoreError::Backend("list rejected".to_string()));
        }
        Ok(lock(&self.labels).clone())
    }

    fn apply(&self, file: &FileEntry, label: &Label, note: &str) -> Result<(), LabelStoreError> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_apply.load(Ordering::SeqCst) {
            return Err(LabelStoreError::Backend("apply rejected".to_string()));
        }

        let mut assignments = lock(&self.assignments);
        if assignments
            .iter()
            .any(|a| a.label_id == label.id && a.file == file.id())
        {
            return Ok(());
        }
        assignments.push(RecordedAssignment {
            label_id: label.id,
            label_name: label.name.clone(),
            file: file.id(),
            note: note.to_string(),
        });
        Ok(())
    }

    fn flush(&self) -> Result<(), LabelStoreError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl std::fmt::Debug for FakeLabelStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeLabelStore")
            .field("labels", &self.labels())
            .field("create_calls", &self.create_calls())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
