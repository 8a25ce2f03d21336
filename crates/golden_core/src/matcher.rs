//! Golden-to-dirty file pairing
//!
//! A golden file is paired with the dirty entry that has the same name and
//! parent path. Entries with an empty name or parent path are never matched.
//! When the host returns several candidates the first one wins; host order is
//! not guaranteed to be stable, so that tie-break is arbitrary.

use crate::error::TreeError;
use crate::host::FileTree;
use crate::types::{FileEntry, FileRef};
use tracing::{debug, warn};

/// Detailed outcome of a counterpart lookup
#[derive(Debug)]
pub enum MatchResult {
    Found(FileRef),
    NotFound,
    /// Golden entry has no name or no parent path
    Untrusted,
    /// Host lookup failed; treated as no match
    LookupFailed(TreeError),
}

impl MatchResult {
    pub fn into_file(self) -> Option<FileRef> {
        match self {
            Self::Found(file) => Some(file),
            _ => None,
        }
    }
}

/// Resolves golden files to their dirty-tree counterparts
#[derive(Debug, Default, Clone, Copy)]
pub struct PathMatcher;

impl PathMatcher {
    /// Look up the counterpart of `file` in `tree`
    pub fn lookup(tree: &dyn FileTree, file: &FileEntry) -> MatchResult {
        if file.name().is_empty() || file.parent_path().is_empty() {
            return MatchResult::Untrusted;
        }

        match tree.find_by_name_and_path(file.name(), file.parent_path()) {
            Ok(candidates) => {
                if candidates.len() > 1 {
                    debug!(
                        tree = tree.name(),
                        path = %file.tree_path(),
                        candidates = candidates.len(),
                        "Several counterparts share the key; using the first"
                    );
                }
                candidates
                    .into_iter()
                    .next()
                    .map(MatchResult::Found)
                    .unwrap_or(MatchResult::NotFound)
            }
            Err(e) => MatchResult::LookupFailed(e),
        }
    }

    /// Counterpart of `file` in `tree`, or `None`.
    ///
    /// Lookup failures are logged and reported as no match.
    pub fn find_counterpart(tree: &dyn FileTree, file: &FileEntry) -> Option<FileRef> {
        match Self::lookup(tree, file) {
            MatchResult::LookupFailed(e) => {
                warn!(
                    tree = tree.name(),
                    path = %file.tree_path(),
                    error = %e,
                    "Counterpart lookup failed; treating as missing"
                );
                None
            }
            other => other.into_file(),
        }
    }
}
