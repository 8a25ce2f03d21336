//! Core types for golden image comparison
//!
//! Files are host-owned handles shared through [`FileRef`]. The engine never
//! copies file content; it only reads metadata and memoizes a digest.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

// ============================================================================
// File Types
// ============================================================================

/// Identifier of a file within one tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub u64);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of entry a tree listing produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
            Self::Other => "other",
        }
    }
}

/// Shared handle to a host file entry
pub type FileRef = Arc<FileEntry>;

/// A file (or directory, or other entry) inside a tree.
///
/// `digest` is set at most once. After a successful hash it is never
/// recomputed or overwritten.
#[derive(Debug)]
pub struct FileEntry {
    id: FileId,
    name: String,
    /// Parent directory in `/a/b/` form. Empty for synthetic entries.
    parent_path: String,
    kind: EntryKind,
    readable: bool,
    size: u64,
    /// Host location used by digest providers and label stores
    locator: PathBuf,
    digest: OnceLock<Digest>,
}

impl FileEntry {
    /// Create a readable entry with no digest
    pub fn new(
        id: FileId,
        name: impl Into<String>,
        parent_path: impl Into<String>,
        kind: EntryKind,
        locator: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            parent_path: parent_path.into(),
            kind,
            readable: true,
            size: 0,
            locator: locator.into(),
            digest: OnceLock::new(),
        }
    }

    pub fn with_readable(mut self, readable: bool) -> Self {
        self.readable = readable;
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Seed a digest the host already knows
    pub fn with_digest(self, digest: Digest) -> Self {
        let _ = self.digest.set(digest);
        self
    }

    pub fn into_ref(self) -> FileRef {
        Arc::new(self)
    }

    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent_path(&self) -> &str {
        &self.parent_path
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn locator(&self) -> &Path {
        &self.locator
    }

    pub fn is_regular_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_readable(&self) -> bool {
        self.readable
    }

    /// Regular and readable: the only entries that get compared or hashed
    pub fn is_comparable(&self) -> bool {
        self.is_regular_file() && self.readable
    }

    pub fn digest(&self) -> Option<&Digest> {
        self.digest.get()
    }

    /// Store a freshly computed digest. Returns false if one was already set.
    pub(crate) fn store_digest(&self, digest: Digest) -> bool {
        self.digest.set(digest).is_ok()
    }

    /// Unique path inside the tree (`parent_path` + `name`)
    pub fn tree_path(&self) -> String {
        format!("{}{}", self.parent_path, self.name)
    }
}

// ============================================================================
// Digest
// ============================================================================

/// Opaque content fingerprint. Compared by exact byte equality.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Digest(Box<[u8]>);

impl Digest {
    pub fn from_bytes(bytes: impl Into<Box<[u8]>>) -> Self {
        Self(bytes.into())
    }

    /// Parse a hex string as produced by [`Digest::to_hex`]
    pub fn from_hex(hex_str: &str) -> Option<Self> {
        hex::decode(hex_str).ok().map(|bytes| Self(bytes.into_boxed_slice()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

// ============================================================================
// Label Types
// ============================================================================

/// Stable identity of a label within a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LabelId(pub u64);

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display colors a label can carry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelColor {
    None,
    White,
    Silver,
    Gray,
    Black,
    Red,
    Maroon,
    Yellow,
    Olive,
    #[default]
    Lime,
    Green,
    Aqua,
    Teal,
    Blue,
    Navy,
    Fuchsia,
    Purple,
}

impl LabelColor {
    pub const ALL: [LabelColor; 17] = [
        Self::None,
        Self::White,
        Self::Silver,
        Self::Gray,
        Self::Black,
        Self::Red,
        Self::Maroon,
        Self::Yellow,
        Self::Olive,
        Self::Lime,
        Self::Green,
        Self::Aqua,
        Self::Teal,
        Self::Blue,
        Self::Navy,
        Self::Fuchsia,
        Self::Purple,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::White => "white",
            Self::Silver => "silver",
            Self::Gray => "gray",
            Self::Black => "black",
            Self::Red => "red",
            Self::Maroon => "maroon",
            Self::Yellow => "yellow",
            Self::Olive => "olive",
            Self::Lime => "lime",
            Self::Green => "green",
            Self::Aqua => "aqua",
            Self::Teal => "teal",
            Self::Blue => "blue",
            Self::Navy => "navy",
            Self::Fuchsia => "fuchsia",
            Self::Purple => "purple",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.to_lowercase();
        Self::ALL.into_iter().find(|c| c.as_str() == lower)
    }
}

/// A named classification marker. Identity is `id`, not `name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: LabelId,
    pub name: String,
    pub description: String,
    pub color: LabelColor,
}

// ============================================================================
// Outcome
// ============================================================================

/// Classification of one golden-tree file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOutcome {
    /// Digests match; the dirty file gets the unchanged label
    Unchanged,
    /// Digests differ; the dirty file gets the changed label
    Changed,
    /// No usable counterpart; the golden file gets the run's missing label
    MissingInSubject,
    /// At least one digest is unavailable; no label
    Incomparable,
    /// Golden entry is not a regular readable file; no label, no hashing
    Skipped,
}

impl ComparisonOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unchanged => "unchanged",
            Self::Changed => "changed",
            Self::MissingInSubject => "missing_in_subject",
            Self::Incomparable => "incomparable",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for ComparisonOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: EntryKind) -> FileEntry {
        FileEntry::new(FileId(1), "b.txt", "/a/", kind, "/tmp/a/b.txt")
    }

    #[test]
    fn test_comparable_requires_regular_and_readable() {
        assert!(entry(EntryKind::File).is_comparable());
        assert!(!entry(EntryKind::Directory).is_comparable());
        assert!(!entry(EntryKind::File).with_readable(false).is_comparable());
    }

    #[test]
    fn test_digest_is_set_once() {
        let file = entry(EntryKind::File);
        assert!(file.store_digest(Digest::from_bytes(vec![1, 2])));
        assert!(!file.store_digest(Digest::from_bytes(vec![3, 4])));
        assert_eq!(file.digest().map(|d| d.as_bytes()), Some(&[1u8, 2][..]));
    }

    #[test]
    fn test_digest_hex() {
        let digest = Digest::from_bytes(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(digest.to_hex(), "deadbeef");
        assert_eq!(Digest::from_hex("deadbeef"), Some(digest));
        assert!(Digest::from_hex("zz").is_none());
    }

    #[test]
    fn test_tree_path() {
        assert_eq!(entry(EntryKind::File).tree_path(), "/a/b.txt");
    }

    #[test]
    fn test_label_color_parse() {
        assert_eq!(LabelColor::parse("LIME"), Some(LabelColor::Lime));
        assert_eq!(LabelColor::parse("fuchsia"), Some(LabelColor::Fuchsia));
        assert!(LabelColor::parse("chartreuse").is_none());
        for color in LabelColor::ALL {
            assert_eq!(LabelColor::parse(color.as_str()), Some(color));
        }
    }
}
