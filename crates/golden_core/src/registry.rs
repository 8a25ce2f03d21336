//! Idempotent label get-or-create
//!
//! Many workers may ask for the same label before it exists. Each caller
//! tries to create it; a caller that loses the race gets `AlreadyExists` from
//! the store and falls back to scanning the full label list for the display
//! name. The scan is read-only, so it is safe while other labels are being
//! created. All callers end up holding the one label the store kept.

use crate::config::{LabelConfig, LabelSpec};
use crate::error::RegistryError;
use crate::host::LabelStore;
use crate::types::Label;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, warn};

/// Name of the per-subject missing label
pub fn missing_label_name(prefix: &str, subject_tree: &str) -> String {
    format!("{prefix}{subject_tree}")
}

/// Resolves the labels a comparison applies.
///
/// Static labels are cached for the registry's lifetime. The dynamic missing
/// label is cached in a single slot that is cleared at the start of each run.
pub struct LabelRegistry {
    store: Arc<dyn LabelStore>,
    config: LabelConfig,
    unchanged: OnceLock<Label>,
    changed: OnceLock<Label>,
    missing_slot: Mutex<Option<Label>>,
}

impl LabelRegistry {
    pub fn new(store: Arc<dyn LabelStore>, config: LabelConfig) -> Self {
        Self {
            store,
            config,
            unchanged: OnceLock::new(),
            changed: OnceLock::new(),
            missing_slot: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<dyn LabelStore> {
        &self.store
    }

    pub fn config(&self) -> &LabelConfig {
        &self.config
    }

    /// Create the label, or return the existing one with the same name
    pub fn get_or_create(&self, spec: &LabelSpec) -> Result<Label, RegistryError> {
        let create_error = match self
            .store
            .create(&spec.name, &spec.description, spec.color)
        {
            Ok(label) => {
                debug!(label = %label.name, id = %label.id, "Created label");
                return Ok(label);
            }
            Err(e) if e.is_already_exists() => {
                debug!(label = %spec.name, "Label already exists; looking it up");
                None
            }
            Err(e) => {
                warn!(label = %spec.name, error = %e, "Label creation failed; looking it up");
                Some(e)
            }
        };

        let labels = self.store.list_all().map_err(|source| RegistryError::Lookup {
            name: spec.name.clone(),
            source,
        })?;

        labels
            .into_iter()
            .find(|label| label.name == spec.name)
            .ok_or(RegistryError::Unresolved {
                name: spec.name.clone(),
                source: create_error,
            })
    }

    /// Label for files whose digest matches the golden copy
    pub fn unchanged_label(&self) -> Result<Label, RegistryError> {
        self.cached(&self.unchanged, &self.config.unchanged)
    }

    /// Label for files whose digest differs from the golden copy
    pub fn changed_label(&self) -> Result<Label, RegistryError> {
        self.cached(&self.changed, &self.config.changed)
    }

    /// Label for golden files absent from `subject_tree`
    pub fn missing_label(&self, subject_tree: &str) -> Result<Label, RegistryError> {
        let name = missing_label_name(&self.config.missing_prefix, subject_tree);

        if let Some(label) = self.slot().as_ref().filter(|l| l.name == name) {
            return Ok(label.clone());
        }

        // Lock is not held across store calls
        let spec = LabelSpec::new(
            name,
            self.config.missing_description.clone(),
            self.config.missing_color,
        );
        let label = self.get_or_create(&spec)?;

        let mut slot = self.slot();
        match slot.as_ref() {
            Some(existing) if existing.name == label.name => Ok(existing.clone()),
            _ => {
                *slot = Some(label.clone());
                Ok(label)
            }
        }
    }

    /// Forget the per-run missing label
    pub fn reset_run_cache(&self) {
        *self.slot() = None;
    }

    fn cached(&self, cell: &OnceLock<Label>, spec: &LabelSpec) -> Result<Label, RegistryError> {
        if let Some(label) = cell.get() {
            return Ok(label.clone());
        }
        let label = self.get_or_create(spec)?;
        Ok(cell.get_or_init(|| label).clone())
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Label>> {
        self.missing_slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for LabelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelRegistry")
            .field("config", &self.config)
            .field("unchanged", &self.unchanged.get())
            .field("changed", &self.changed.get())
            .finish()
    }
}
