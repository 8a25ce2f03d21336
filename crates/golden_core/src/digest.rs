//! Lazy digest computation over the host hashing primitive

use crate::host::DigestProvider;
use crate::types::FileEntry;
use std::sync::Arc;
use tracing::{debug, warn};

/// Computes a file digest on first use and memoizes it on the entry
#[derive(Clone)]
pub struct DigestCache {
    provider: Arc<dyn DigestProvider>,
}

impl DigestCache {
    pub fn new(provider: Arc<dyn DigestProvider>) -> Self {
        Self { provider }
    }

    /// Make sure `file` carries a digest.
    ///
    /// Returns true only when this call computed and stored the digest.
    /// Non-comparable entries and entries that already have a digest are left
    /// alone. Hashing failures are logged and leave the digest unset.
    pub fn ensure_digest(&self, file: &FileEntry) -> bool {
        if !file.is_comparable() || file.digest().is_some() {
            return false;
        }

        match self.provider.compute(file) {
            Ok(digest) => {
                let stored = file.store_digest(digest);
                if !stored {
                    debug!(path = %file.tree_path(), "Digest was stored concurrently");
                }
                stored
            }
            Err(e) => {
                warn!(
                    path = %file.tree_path(),
                    locator = %file.locator().display(),
                    error = %e,
                    "Failed to compute digest"
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for DigestCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestCache")
            .field("provider", &"<dyn DigestProvider>")
            .finish()
    }
}
