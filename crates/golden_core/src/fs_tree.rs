//! Directory-backed file tree
//!
//! # Design
//!
//! - Walk the root once with `walkdir` when the tree is opened
//! - Every entry below the root becomes a [`FileEntry`], directories included
//! - Keys use forward slashes relative to the root: a file at
//!   `<root>/a/b/c.txt` has name `c.txt` and parent path `/a/b/`
//! - Lookups go through a [`PathIndex`] built from the same listing
//!
//! The listing is a snapshot. Changes on disk after `open` are not seen.

use crate::error::{CompareError, Result, TreeError};
use crate::host::FileTree;
use crate::index::PathIndex;
use crate::types::{EntryKind, FileEntry, FileId, FileRef};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Walk options
#[derive(Debug, Clone, Copy)]
pub struct FsTreeOptions {
    pub follow_symlinks: bool,
    /// Whether entries whose name starts with `.` are listed
    pub include_hidden: bool,
}

impl Default for FsTreeOptions {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            include_hidden: true,
        }
    }
}

/// A file tree read from a local directory
#[derive(Debug)]
pub struct FsTree {
    name: String,
    root: PathBuf,
    files: Vec<FileRef>,
    index: PathIndex,
    walk_errors: usize,
}

impl FsTree {
    /// Walk `root` and build the tree. Entries the walker cannot read are
    /// logged and left out; only an unusable root is an error.
    pub fn open(name: impl Into<String>, root: &Path, options: FsTreeOptions) -> Result<Self> {
        let name = name.into();
        if !root.is_dir() {
            return Err(CompareError::Configuration(format!(
                "tree root '{}' is not a directory",
                root.display()
            )));
        }

        let walker = WalkDir::new(root)
            .follow_links(options.follow_symlinks)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| options.include_hidden || !is_hidden(entry));

        let mut files = Vec::new();
        let mut walk_errors = 0usize;
        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(tree = %name, error = %e, "Skipping unreadable entry");
                    walk_errors += 1;
                    continue;
                }
            };

            let Some(relative) = entry.path().strip_prefix(root).ok() else {
                continue;
            };
            let id = FileId(files.len() as u64 + 1);
            files.push(entry_to_file(id, &entry, relative).into_ref());
        }

        let index = PathIndex::build(files.iter().cloned());
        info!(
            tree = %name,
            root = %root.display(),
            entries = files.len(),
            ambiguous_keys = index.ambiguous_keys(),
            walk_errors,
            "Opened file tree"
        );

        Ok(Self {
            name,
            root: root.to_path_buf(),
            files,
            index,
            walk_errors,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Entries the walker reported errors for
    pub fn walk_errors(&self) -> usize {
        self.walk_errors
    }
}

impl FileTree for FsTree {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_all_files(&self) -> std::result::Result<Vec<FileRef>, TreeError> {
        Ok(self.files.clone())
    }

    fn find_by_name_and_path(
        &self,
        name: &str,
        parent_path: &str,
    ) -> std::result::Result<Vec<FileRef>, TreeError> {
        Ok(self.index.lookup(name, parent_path).to_vec())
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
}

fn entry_to_file(id: FileId, entry: &DirEntry, relative: &Path) -> FileEntry {
    let file_type = entry.file_type();
    let kind = if file_type.is_file() {
        EntryKind::File
    } else if file_type.is_dir() {
        EntryKind::Directory
    } else if file_type.is_symlink() {
        EntryKind::Symlink
    } else {
        EntryKind::Other
    };

    let name = entry.file_name().to_string_lossy().into_owned();
    let parent_path = parent_path_of(relative);

    let (readable, size) = match kind {
        EntryKind::File => {
            let readable = File::open(entry.path()).is_ok();
            if !readable {
                debug!(path = %entry.path().display(), "File is not readable");
            }
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            (readable, size)
        }
        _ => (true, 0),
    };

    FileEntry::new(id, name, parent_path, kind, entry.path())
        .with_readable(readable)
        .with_size(size)
}

/// `a/b/c.txt` -> `/a/b/`, `c.txt` -> `/`
fn parent_path_of(relative: &Path) -> String {
    let parts: Vec<String> = relative
        .parent()
        .map(|p| {
            p.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();

    if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", parts.join("/"))
    }
}
