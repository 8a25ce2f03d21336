//! Error types for the comparison engine
//!
//! Only [`CompareError`] ends a run. The other types are per-file and get
//! absorbed into counters and logs by the classifier.

use crate::types::LabelId;
use std::io;
use thiserror::Error;

/// Run-level error
#[derive(Error, Debug)]
pub enum CompareError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to enumerate golden tree '{tree}': {source}")]
    Enumeration {
        tree: String,
        #[source]
        source: TreeError,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

/// Host tree listing or lookup failure
#[derive(Error, Debug)]
pub enum TreeError {
    #[error("lookup in tree '{tree}' failed: {message}")]
    Lookup { tree: String, message: String },
}

/// Content hashing failure. The digest stays unset.
#[derive(Error, Debug)]
pub enum DigestError {
    #[error("cannot hash {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("digest unavailable for {0}")]
    Unavailable(String),
}

/// Error reported by a host label store
#[derive(Error, Debug)]
pub enum LabelStoreError {
    /// Benign outcome of a creation race
    #[error("label '{0}' already exists")]
    AlreadyExists(String),

    #[error("unknown label id {0}")]
    UnknownLabel(LabelId),

    #[error("label store failure: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LabelStoreError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }
}

/// Get-or-create could not produce a label
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("label '{name}' could not be created and was not found")]
    Unresolved {
        name: String,
        #[source]
        source: Option<LabelStoreError>,
    },

    #[error("listing labels while resolving '{name}' failed: {source}")]
    Lookup {
        name: String,
        #[source]
        source: LabelStoreError,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CompareError>;
