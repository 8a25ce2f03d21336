//! In-memory file trees

use golden_core::{EntryKind, FileEntry, FileId, FileRef, FileTree, PathIndex, TreeError};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Ids are unique across every tree built in one test process
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A file tree held entirely in memory
#[derive(Debug)]
pub struct MemoryTree {
    name: String,
    files: Vec<FileRef>,
    index: PathIndex,
    contents: HashMap<PathBuf, Vec<u8>>,
    fail_lookups: bool,
    fail_listing: bool,
    lookups: AtomicUsize,
}

impl MemoryTree {
    /// First entry with the given `a/b.txt` style path
    pub fn file(&self, path: &str) -> Option<FileRef> {
        let (parent, name) = split_path(path);
        self.index.lookup(&name, &parent).first().cloned()
    }

    pub fn files(&self) -> &[FileRef] {
        &self.files
    }

    /// Content of every regular file, keyed by locator
    pub fn contents(&self) -> &HashMap<PathBuf, Vec<u8>> {
        &self.contents
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl FileTree for MemoryTree {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_all_files(&self) -> Result<Vec<FileRef>, TreeError> {
        if self.fail_listing {
            return Err(TreeError::Lookup {
                tree: self.name.clone(),
                message: "listing unavailable".to_string(),
            });
        }
        Ok(self.files.clone())
    }

    fn find_by_name_and_path(
        &self,
        name: &str,
        parent_path: &str,
    ) -> Result<Vec<FileRef>, TreeError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups {
            return Err(TreeError::Lookup {
                tree: self.name.clone(),
                message: format!("index offline while looking up {parent_path}{name}"),
            });
        }
        Ok(self.index.lookup(name, parent_path).to_vec())
    }
}

/// Builder for [`MemoryTree`]
///
/// Paths are written `a/b.txt`. Locators are `mem://<tree>/a/b.txt`.
pub struct MemoryTreeBuilder {
    name: String,
    files: Vec<FileRef>,
    contents: HashMap<PathBuf, Vec<u8>>,
    fail_lookups: bool,
    fail_listing: bool,
}

impl MemoryTreeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: Vec::new(),
            contents: HashMap::new(),
            fail_lookups: false,
            fail_listing: false,
        }
    }

    /// Add a readable regular file
    pub fn file(self, path: &str, content: &[u8]) -> Self {
        self.add_file(path, content, true)
    }

    /// Add a regular file the host reports as unreadable
    pub fn unreadable_file(self, path: &str, content: &[u8]) -> Self {
        self.add_file(path, content, false)
    }

    /// Add a directory entry
    pub fn dir(mut self, path: &str) -> Self {
        let (parent, name) = split_path(path);
        let locator = self.locator(path);
        self.files
            .push(FileEntry::new(next_id(), name, parent, EntryKind::Directory, locator).into_ref());
        self
    }

    /// Add an arbitrary entry, e.g. one with an empty name
    pub fn entry(
        mut self,
        name: &str,
        parent_path: &str,
        kind: EntryKind,
        content: &[u8],
    ) -> Self {
        let locator = PathBuf::from(format!("mem://{}{}{}", self.name, parent_path, name));
        if kind == EntryKind::File {
            self.contents.insert(locator.clone(), content.to_vec());
        }
        self.files
            .push(FileEntry::new(next_id(), name, parent_path, kind, locator).into_ref());
        self
    }

    /// Every name+path lookup fails with a host error
    pub fn fail_lookups(mut self) -> Self {
        self.fail_lookups = true;
        self
    }

    /// Listing the tree fails with a host error
    pub fn fail_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn build(self) -> MemoryTree {
        let index = PathIndex::build(self.files.iter().cloned());
        MemoryTree {
            name: self.name,
            files: self.files,
            index,
            contents: self.contents,
            fail_lookups: self.fail_lookups,
            fail_listing: self.fail_listing,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn build_arc(self) -> Arc<MemoryTree> {
        Arc::new(self.build())
    }

    fn add_file(mut self, path: &str, content: &[u8], readable: bool) -> Self {
        let (parent, name) = split_path(path);
        let locator = self.locator(path);
        // Duplicate paths get distinct locators so their content can differ
        let locator = if self.contents.contains_key(&locator) {
            PathBuf::from(format!("{}#{}", locator.display(), self.files.len()))
        } else {
            locator
        };
        self.contents.insert(locator.clone(), content.to_vec());
        self.files.push(
            FileEntry::new(next_id(), name, parent, EntryKind::File, locator)
                .with_readable(readable)
                .with_size(content.len() as u64)
                .into_ref(),
        );
        self
    }

    fn locator(&self, path: &str) -> PathBuf {
        PathBuf::from(format!("mem://{}/{}", self.name, path.trim_start_matches('/')))
    }
}

fn next_id() -> FileId {
    FileId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

/// `a/b/c.txt` -> (`/a/b/`, `c.txt`)
fn split_path(path: &str) -> (String, String) {
    let trimmed = path.trim_start_matches('/');
    match trimmed.rsplit_once('/') {
        Some((parent, name)) => (format!("/{parent}/"), name.to_string()),
        None => ("/".to_string(), trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("a/b.txt"), ("/a/".to_string(), "b.txt".to_string()));
        assert_eq!(split_path("top"), ("/".to_string(), "top".to_string()));
        assert_eq!(split_path("/x/y/z"), ("/x/y/".to_string(), "z".to_string()));
    }

    #[test]
    fn test_builder_and_lookup() {
        let tree = MemoryTreeBuilder::new("t")
            .dir("a")
            .file("a/b.txt", b"1")
            .file("a/b.txt", b"2")
            .build();

        assert_eq!(tree.files().len(), 3);
        let found = tree.find_by_name_and_path("b.txt", "/a/").unwrap();
        assert_eq!(found.len(), 2);
        assert_ne!(found[0].locator(), found[1].locator());
        assert_eq!(tree.lookup_calls(), 1);
    }
}
